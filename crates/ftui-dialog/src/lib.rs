#![forbid(unsafe_code)]

//! Modal dialogs for FrankenTUI documents.
//!
//! The [`modal`] module holds the dialog service and everything it is built
//! from. The most used types are re-exported here.

pub mod modal;

pub use modal::{
    AnyDialogRef, AutoFocus, Dialog, DialogConfig, DialogError, DialogHost, DialogRef,
    DialogState, HeadlessOverlay, RestoreFocus,
};
