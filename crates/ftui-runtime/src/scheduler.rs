#![forbid(unsafe_code)]

//! Single-threaded task scheduler on a virtual clock.
//!
//! The [`Scheduler`] orders the three kinds of deferred work dialogs rely on:
//!
//! - **Microtasks** ([`Scheduler::queue_microtask`]): run as soon as the
//!   current synchronous work finishes, in FIFO order.
//! - **After-render callbacks** ([`Scheduler::after_next_render`]): run once
//!   the microtask queue is empty, modelling "rendering has stabilized".
//! - **Timers** ([`Scheduler::set_timeout`]): run when the virtual clock
//!   reaches their deadline. Ties run in registration order.
//!
//! Time only moves when the host calls [`Scheduler::advance`] (or
//! [`FrameClock::tick`] in a real event loop), which keeps every ordering
//! deterministic under test.
//!
//! # Invariants
//!
//! 1. All microtasks run before any after-render callback.
//! 2. Microtasks queued by a timer callback run before the next timer fires.
//! 3. A cancelled timer never runs; cancelling twice is a no-op.
//! 4. Nested `flush()` calls from inside a task are no-ops; the outer flush
//!    drains everything.
//!
//! # Example
//!
//! ```
//! use ftui_runtime::scheduler::Scheduler;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let l = Rc::clone(&log);
//! scheduler.set_timeout(Duration::from_millis(10), move || l.borrow_mut().push("timer"));
//! let l = Rc::clone(&log);
//! scheduler.after_next_render(move || l.borrow_mut().push("render"));
//! let l = Rc::clone(&log);
//! scheduler.queue_microtask(move || l.borrow_mut().push("micro"));
//!
//! scheduler.advance(Duration::from_millis(10));
//! assert_eq!(*log.borrow(), vec!["micro", "render", "timer"]);
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

type Task = Box<dyn FnOnce()>;

/// Upper bound on timers fired by one `run_until_idle` call.
const MAX_IDLE_TIMERS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct TimerKey {
    deadline: Duration,
    seq: u64,
}

#[derive(Default)]
struct SchedulerInner {
    now: Duration,
    microtasks: VecDeque<Task>,
    render_callbacks: VecDeque<Task>,
    timers: BTreeMap<TimerKey, Task>,
    next_seq: u64,
    flushing: bool,
}

/// Cheap-to-clone handle to a shared task queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("now", &inner.now)
            .field("microtasks", &inner.microtasks.len())
            .field("render_callbacks", &inner.render_callbacks.len())
            .field("timers", &inner.timers.len())
            .finish()
    }
}

/// Handle to a pending timer.
#[derive(Clone)]
pub struct TimerHandle {
    key: TimerKey,
    scheduler: Weak<RefCell<SchedulerInner>>,
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("deadline", &self.key.deadline)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl TimerHandle {
    /// Cancel the timer. Returns `true` if it was still pending.
    pub fn cancel(&self) -> bool {
        let Some(inner) = self.scheduler.upgrade() else {
            return false;
        };
        let removed = inner.borrow_mut().timers.remove(&self.key);
        removed.is_some()
    }

    /// Whether the timer has neither fired nor been cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.scheduler
            .upgrade()
            .is_some_and(|inner| inner.borrow().timers.contains_key(&self.key))
    }

    /// Virtual time at which the timer fires.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.key.deadline
    }
}

impl Scheduler {
    /// Create a scheduler with its clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Queue a task to run once the current synchronous work completes.
    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.inner.borrow_mut().microtasks.push_back(Box::new(task));
    }

    /// Queue a task to run once pending microtasks have drained.
    pub fn after_next_render(&self, task: impl FnOnce() + 'static) {
        self.inner
            .borrow_mut()
            .render_callbacks
            .push_back(Box::new(task));
    }

    /// Run `task` once the virtual clock has advanced by `delay`.
    pub fn set_timeout(&self, delay: Duration, task: impl FnOnce() + 'static) -> TimerHandle {
        let mut inner = self.inner.borrow_mut();
        let key = TimerKey {
            deadline: inner.now + delay,
            seq: inner.next_seq,
        };
        inner.next_seq += 1;
        inner.timers.insert(key, Box::new(task));
        TimerHandle {
            key,
            scheduler: Rc::downgrade(&self.inner),
        }
    }

    /// Number of timers that have not fired or been cancelled.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Whether any microtask, after-render callback, or timer is queued.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        let inner = self.inner.borrow();
        !inner.microtasks.is_empty() || !inner.render_callbacks.is_empty() || !inner.timers.is_empty()
    }

    /// Run microtasks and after-render callbacks until both queues are empty.
    pub fn flush(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.flushing {
                return;
            }
            inner.flushing = true;
        }
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                inner
                    .microtasks
                    .pop_front()
                    .or_else(|| inner.render_callbacks.pop_front())
            };
            match next {
                Some(task) => task(),
                None => break,
            }
        }
        self.inner.borrow_mut().flushing = false;
    }

    /// Advance the clock by `by`, firing every timer that comes due.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        self.flush();
        while let Some(task) = self.pop_timer_due_by(target) {
            task();
            self.flush();
        }
        self.inner.borrow_mut().now = target;
        self.flush();
    }

    /// Flush and fire all timers regardless of deadline, moving the clock forward.
    pub fn run_until_idle(&self) {
        self.flush();
        for _ in 0..MAX_IDLE_TIMERS {
            let Some(task) = self.pop_timer_due_by(Duration::MAX) else {
                return;
            };
            task();
            self.flush();
        }
        tracing::warn!(
            limit = MAX_IDLE_TIMERS,
            "scheduler did not go idle; timers keep rescheduling"
        );
    }

    fn pop_timer_due_by(&self, limit: Duration) -> Option<Task> {
        let mut inner = self.inner.borrow_mut();
        let key = *inner.timers.keys().next()?;
        if key.deadline > limit {
            return None;
        }
        let task = inner.timers.remove(&key)?;
        inner.now = inner.now.max(key.deadline);
        Some(task)
    }
}

/// Drives a [`Scheduler`] from wall-clock time in a host event loop.
#[derive(Debug)]
pub struct FrameClock {
    scheduler: Scheduler,
    last: web_time::Instant,
}

impl FrameClock {
    /// Start measuring from now.
    #[must_use]
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            last: web_time::Instant::now(),
        }
    }

    /// Advance the scheduler by the wall time elapsed since the previous tick.
    pub fn tick(&mut self) -> Duration {
        let now = web_time::Instant::now();
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        self.scheduler.advance(elapsed);
        elapsed
    }
}
