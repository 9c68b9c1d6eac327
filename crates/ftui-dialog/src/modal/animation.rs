#![forbid(unsafe_code)]

//! Enter/exit transitions for dialog containers.
//!
//! An [`AnimationDriver`] runs one transition per call and reports it through
//! two [`AnimationEvent`]s: `Started`, then `Done`. The container turns those
//! into its own open/close lifecycle.
//!
//! | Driver | `Started` | `Done` |
//! |--------|-----------|--------|
//! | [`TimedAnimationDriver`] | next microtask | after `duration` (next microtask when zero) |
//! | [`ManualAnimationDriver`] | next microtask | only when [`finish`](ManualAnimationDriver::finish) is called |
//!
//! # Failure Modes
//!
//! A driver is allowed to never report `Done` (the host view went away
//! mid-transition). Closing dialogs arm a fallback timer for exactly that
//! case.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use ftui_dom::NodeId;
use ftui_runtime::Scheduler;

/// Target state of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionState {
    Enter,
    Exit,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationPhase {
    Started,
    Done,
}

/// One transition lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationEvent {
    pub phase: AnimationPhase,
    pub to_state: TransitionState,
    pub total_time: Duration,
}

/// Callback receiving the events of one transition.
pub type AnimationCallback = Rc<dyn Fn(AnimationEvent)>;

/// Runs container transitions.
pub trait AnimationDriver {
    /// Start transitioning `element` to `to_state` over `duration`.
    fn start(
        &self,
        element: NodeId,
        to_state: TransitionState,
        duration: Duration,
        on_event: AnimationCallback,
    );
}

fn queue_started(
    scheduler: &Scheduler,
    to_state: TransitionState,
    duration: Duration,
    on_event: &AnimationCallback,
) {
    let started = Rc::clone(on_event);
    scheduler.queue_microtask(move || {
        started(AnimationEvent {
            phase: AnimationPhase::Started,
            to_state,
            total_time: duration,
        });
    });
}

/// Completes every transition after its duration on the scheduler clock.
#[derive(Debug, Clone)]
pub struct TimedAnimationDriver {
    scheduler: Scheduler,
}

impl TimedAnimationDriver {
    #[must_use]
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }
}

impl AnimationDriver for TimedAnimationDriver {
    fn start(
        &self,
        element: NodeId,
        to_state: TransitionState,
        duration: Duration,
        on_event: AnimationCallback,
    ) {
        tracing::trace!(element = element.index(), ?to_state, ?duration, "transition started");
        queue_started(&self.scheduler, to_state, duration, &on_event);
        let done = move || {
            on_event(AnimationEvent {
                phase: AnimationPhase::Done,
                to_state,
                total_time: duration,
            });
        };
        if duration.is_zero() {
            self.scheduler.queue_microtask(done);
        } else {
            self.scheduler.set_timeout(duration, done);
        }
    }
}

struct PendingTransition {
    element: NodeId,
    to_state: TransitionState,
    duration: Duration,
    on_event: AnimationCallback,
}

/// Holds transitions until the host finishes them explicitly.
///
/// Useful for hosts that drive animations themselves, and for exercising
/// the close fallback when a transition never completes.
#[derive(Clone)]
pub struct ManualAnimationDriver {
    scheduler: Scheduler,
    pending: Rc<RefCell<Vec<PendingTransition>>>,
}

impl fmt::Debug for ManualAnimationDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualAnimationDriver")
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}

impl ManualAnimationDriver {
    #[must_use]
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            pending: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Number of transitions awaiting [`finish`](Self::finish).
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Report `Done` for every pending transition of `element` to `to_state`.
    ///
    /// Returns how many transitions finished.
    pub fn finish(&self, element: NodeId, to_state: TransitionState) -> usize {
        let finished: Vec<PendingTransition> = {
            let mut pending = self.pending.borrow_mut();
            let (done, rest): (Vec<_>, Vec<_>) = pending
                .drain(..)
                .partition(|t| t.element == element && t.to_state == to_state);
            *pending = rest;
            done
        };
        for transition in &finished {
            (transition.on_event)(AnimationEvent {
                phase: AnimationPhase::Done,
                to_state: transition.to_state,
                total_time: transition.duration,
            });
        }
        finished.len()
    }
}

impl AnimationDriver for ManualAnimationDriver {
    fn start(
        &self,
        element: NodeId,
        to_state: TransitionState,
        duration: Duration,
        on_event: AnimationCallback,
    ) {
        queue_started(&self.scheduler, to_state, duration, &on_event);
        self.pending.borrow_mut().push(PendingTransition {
            element,
            to_state,
            duration,
            on_event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftui_dom::Document;

    fn recorder() -> (Rc<RefCell<Vec<AnimationPhase>>>, AnimationCallback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        (log, Rc::new(move |event: AnimationEvent| l.borrow_mut().push(event.phase)))
    }

    #[test]
    fn timed_driver_reports_after_duration() {
        let scheduler = Scheduler::new();
        let element = Document::new().create_element("div");
        let driver = TimedAnimationDriver::new(scheduler.clone());
        let (log, callback) = recorder();

        driver.start(element, TransitionState::Enter, Duration::from_millis(150), callback);
        scheduler.flush();
        assert_eq!(*log.borrow(), vec![AnimationPhase::Started]);
        scheduler.advance(Duration::from_millis(149));
        assert_eq!(log.borrow().len(), 1);
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(*log.borrow(), vec![AnimationPhase::Started, AnimationPhase::Done]);
    }

    #[test]
    fn zero_duration_finishes_on_microtasks() {
        let scheduler = Scheduler::new();
        let element = Document::new().create_element("div");
        let driver = TimedAnimationDriver::new(scheduler.clone());
        let (log, callback) = recorder();

        driver.start(element, TransitionState::Exit, Duration::ZERO, callback);
        assert!(log.borrow().is_empty());
        scheduler.flush();
        assert_eq!(*log.borrow(), vec![AnimationPhase::Started, AnimationPhase::Done]);
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn manual_driver_waits_for_finish() {
        let scheduler = Scheduler::new();
        let element = Document::new().create_element("div");
        let driver = ManualAnimationDriver::new(scheduler.clone());
        let (log, callback) = recorder();

        driver.start(element, TransitionState::Exit, Duration::from_millis(75), callback);
        scheduler.run_until_idle();
        assert_eq!(*log.borrow(), vec![AnimationPhase::Started]);
        assert_eq!(driver.finish(element, TransitionState::Enter), 0);
        assert_eq!(driver.finish(element, TransitionState::Exit), 1);
        assert_eq!(driver.pending(), 0);
        assert_eq!(*log.borrow(), vec![AnimationPhase::Started, AnimationPhase::Done]);
    }
}
