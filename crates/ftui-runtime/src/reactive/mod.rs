#![forbid(unsafe_code)]

//! Reactive notification primitives for FrankenTUI.
//!
//! - [`Subject`]: a multicast stream of values with a terminal completion.
//! - [`Subscription`]: RAII guard that automatically unsubscribes on drop.
//!
//! # Architecture
//!
//! `Subject<T>` uses `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Observers are snapshotted before each notification pass so callbacks may
//! subscribe, unsubscribe, or emit without tripping a borrow.

pub mod subject;

pub use subject::{Subject, Subscription};
