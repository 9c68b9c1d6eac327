#![forbid(unsafe_code)]

//! Event-loop primitives for FrankenTUI dialogs.
//!
//! - [`scheduler`]: microtasks, after-render callbacks, and timers on a
//!   virtual clock.
//! - [`reactive`]: multicast subjects and RAII subscriptions.

pub mod reactive;
pub mod scheduler;

pub use reactive::{Subject, Subscription};
pub use scheduler::{FrameClock, Scheduler, TimerHandle};
