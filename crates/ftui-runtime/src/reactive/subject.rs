#![forbid(unsafe_code)]

//! Multicast notification streams.
//!
//! A [`Subject<T>`] delivers each `next` value to every current observer and
//! ends with a single terminal `complete`. Observers are held through
//! [`Subscription`] guards that unsubscribe on drop.
//!
//! # Invariants
//!
//! 1. Observers are notified in subscription order.
//! 2. After `complete()`, `next()` is ignored and every observer has been
//!    released.
//! 3. Subscribing to a completed subject runs the completion callback
//!    immediately, so late subscribers never wait forever.
//! 4. An observer removed during a notification pass is not called for the
//!    remainder of that pass.
//! 5. Re-entrant `next()` from inside an observer is delivered to every
//!    observer except the one currently running.
//!
//! # Example
//!
//! ```
//! use ftui_runtime::reactive::Subject;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let closed = Subject::<u32>::new();
//! let seen = Rc::new(Cell::new(0));
//!
//! let s = Rc::clone(&seen);
//! let sub = closed.subscribe(move |v| s.set(*v));
//! closed.next(&7);
//! assert_eq!(seen.get(), 7);
//!
//! drop(sub);
//! closed.next(&9);
//! assert_eq!(seen.get(), 7);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type NextFn<T> = Box<dyn FnMut(&T)>;
type CompleteFn = Box<dyn FnOnce()>;

struct Observer<T> {
    id: u64,
    active: Cell<bool>,
    next: RefCell<NextFn<T>>,
    complete: RefCell<Option<CompleteFn>>,
}

struct SubjectInner<T> {
    observers: Vec<Rc<Observer<T>>>,
    next_id: u64,
    closed: bool,
}

/// A multicast stream with an explicit terminal notification.
pub struct Subject<T> {
    inner: Rc<RefCell<SubjectInner<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SubjectInner {
                observers: Vec::new(),
                next_id: 1,
                closed: false,
            })),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Subject")
            .field("observers", &inner.observers.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

impl<T: 'static> Subject<T> {
    /// Create an open subject with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe values. Completion is ignored.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, next: impl FnMut(&T) + 'static) -> Subscription {
        self.subscribe_with(next, || {})
    }

    /// Observe values and the terminal completion.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_with(
        &self,
        next: impl FnMut(&T) + 'static,
        complete: impl FnOnce() + 'static,
    ) -> Subscription {
        if self.is_closed() {
            complete();
            return Subscription::empty();
        }
        let observer = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            let observer = Rc::new(Observer {
                id,
                active: Cell::new(true),
                next: RefCell::new(Box::new(next)),
                complete: RefCell::new(Some(Box::new(complete))),
            });
            inner.observers.push(Rc::clone(&observer));
            observer
        };
        let subject = Rc::downgrade(&self.inner);
        let id = observer.id;
        let weak_observer = Rc::downgrade(&observer);
        Subscription::new(move || {
            if let Some(observer) = weak_observer.upgrade() {
                observer.active.set(false);
            }
            remove_observer(&subject, id);
        })
    }

    /// Deliver `value` to every active observer. Ignored once completed.
    pub fn next(&self, value: &T) {
        let observers = {
            let inner = self.inner.borrow();
            if inner.closed {
                return;
            }
            inner.observers.clone()
        };
        for observer in observers {
            if !observer.active.get() {
                continue;
            }
            if let Ok(mut next) = observer.next.try_borrow_mut() {
                next(value);
            }
        }
    }

    /// Terminate the stream, notifying and releasing every observer.
    pub fn complete(&self) {
        let observers = {
            let mut inner = self.inner.borrow_mut();
            if inner.closed {
                return;
            }
            inner.closed = true;
            std::mem::take(&mut inner.observers)
        };
        for observer in observers {
            if !observer.active.replace(false) {
                continue;
            }
            let complete = observer.complete.borrow_mut().take();
            if let Some(complete) = complete {
                complete();
            }
        }
    }

    /// Emit one final value and complete.
    pub fn next_and_complete(&self, value: &T) {
        self.next(value);
        self.complete();
    }

    /// Whether `complete()` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    /// Number of live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }
}

fn remove_observer<T>(subject: &Weak<RefCell<SubjectInner<T>>>, id: u64) {
    let Some(inner) = subject.upgrade() else {
        return;
    };
    // The observer may be mid-notification; release its slot without dropping
    // it while the inner borrow is held.
    let removed = {
        let mut inner = inner.borrow_mut();
        inner
            .observers
            .iter()
            .position(|o| o.id == id)
            .map(|index| inner.observers.remove(index))
    };
    drop(removed);
}

/// RAII guard for an observer registration.
///
/// Dropping the guard unsubscribes. Use [`Subscription::detach`] to keep the
/// observer alive for as long as the subject itself.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

impl Subscription {
    fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A subscription that does nothing on drop.
    pub fn empty() -> Self {
        Self { unsubscribe: None }
    }

    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    /// Keep the observer registered without holding the guard.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observers_notified_in_order() {
        let subject = Subject::<u8>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = Rc::clone(&log);
        let _a = subject.subscribe(move |v| l1.borrow_mut().push(("a", *v)));
        let l2 = Rc::clone(&log);
        let _b = subject.subscribe(move |v| l2.borrow_mut().push(("b", *v)));
        subject.next(&1);
        assert_eq!(*log.borrow(), vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn complete_is_terminal() {
        let subject = Subject::<u8>::new();
        let completions = Rc::new(Cell::new(0));
        let values = Rc::new(Cell::new(0));
        let c = Rc::clone(&completions);
        let v = Rc::clone(&values);
        subject
            .subscribe_with(move |_| v.set(v.get() + 1), move || c.set(c.get() + 1))
            .detach();
        subject.next_and_complete(&3);
        subject.next(&4);
        subject.complete();
        assert_eq!(values.get(), 1);
        assert_eq!(completions.get(), 1);
        assert_eq!(subject.observer_count(), 0);
        assert!(subject.is_closed());
    }

    #[test]
    fn late_subscriber_gets_completion() {
        let subject = Subject::<()>::new();
        subject.complete();
        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        let _sub = subject.subscribe_with(|_| {}, move || d.set(true));
        assert!(done.get());
    }

    #[test]
    fn unsubscribe_during_notification_skips_observer() {
        let subject = Subject::<()>::new();
        let later: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let hits = Rc::new(Cell::new(0));

        let slot = Rc::clone(&later);
        subject
            .subscribe(move |_| {
                slot.borrow_mut().take();
            })
            .detach();
        let h = Rc::clone(&hits);
        *later.borrow_mut() = Some(subject.subscribe(move |_| h.set(h.get() + 1)));

        subject.next(&());
        assert_eq!(hits.get(), 0);
        assert_eq!(subject.observer_count(), 1);
    }

    #[test]
    fn reentrant_next_skips_running_observer() {
        let subject = Subject::<u8>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let s = subject.clone();
        let l = Rc::clone(&log);
        subject
            .subscribe(move |v| {
                l.borrow_mut().push(("outer", *v));
                if *v == 1 {
                    s.next(&2);
                }
            })
            .detach();
        let l = Rc::clone(&log);
        subject
            .subscribe(move |v| l.borrow_mut().push(("other", *v)))
            .detach();
        subject.next(&1);
        assert_eq!(
            *log.borrow(),
            vec![("outer", 1), ("other", 2), ("other", 1)]
        );
    }

    #[test]
    fn dropping_subject_releases_detached_observers() {
        let subject = Subject::<()>::new();
        let token = Rc::new(());
        let held = Rc::clone(&token);
        subject.subscribe(move |_| {
            let _ = &held;
        })
        .detach();
        assert_eq!(Rc::strong_count(&token), 2);
        drop(subject);
        assert_eq!(Rc::strong_count(&token), 1);
    }

    #[test]
    fn subscription_outliving_subject_is_harmless() {
        let subject = Subject::<()>::new();
        let sub = subject.subscribe(|_| {});
        drop(subject);
        sub.unsubscribe();
    }
}
