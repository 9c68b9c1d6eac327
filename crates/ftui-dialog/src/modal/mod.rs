#![forbid(unsafe_code)]

//! Modal dialogs: service, per-dialog handles, container, and the overlay,
//! portal, and animation seams they run on.
//!
//! # Lifecycle
//!
//! [`Dialog::open_component`], [`Dialog::open_template`], and
//! [`Dialog::open_dom`] return a [`DialogRef`]. The ref moves through
//! `Open → Closing → Closed`; closing waits for the exit transition or, if
//! that never reports back, a fallback timer.
//!
//! # Focus Management
//!
//! - **Auto-focus**: applied after the next render per [`AutoFocus`]
//! - **Focus trap**: each container owns a [`ftui_a11y::ConfigurableFocusTrap`];
//!   only the newest open dialog's trap is active
//! - **Focus restore**: per [`RestoreFocus`], unless focus already moved
//!   somewhere else while the dialog closed
//! - **Escape to close**: unless `disable_close` is set
//!
//! # Example
//!
//! ```
//! use ftui_dialog::modal::{Dialog, DialogConfig, DialogHost};
//! use ftui_dom::Document;
//! use ftui_runtime::Scheduler;
//!
//! let doc = Document::new();
//! let scheduler = Scheduler::new();
//! let (host, _overlay) = DialogHost::headless(&doc, &scheduler);
//! let dialog = Dialog::new(host);
//!
//! let confirm = dialog
//!     .open_template::<bool>(
//!         |ctx| {
//!             let ok = ctx.content.append(ctx.content.host, "button");
//!             ctx.content.doc.set_attribute(ok, "id", "ok");
//!         },
//!         DialogConfig::new().with_aria_label("Confirm"),
//!     )
//!     .expect("fresh id");
//! scheduler.run_until_idle();
//! confirm.close(Some(true));
//! scheduler.run_until_idle();
//! assert!(dialog.open_dialogs().is_empty());
//! ```

mod animation;
mod config;
mod container;
mod dialog;
mod dialog_ref;
mod overlay;
mod portal;
mod stack;

pub use animation::{
    AnimationCallback, AnimationDriver, AnimationEvent, AnimationPhase, ManualAnimationDriver,
    TimedAnimationDriver, TransitionState,
};
pub use config::{
    AutoFocus, DEFAULT_ENTER_DURATION, DEFAULT_EXIT_DURATION, DialogConfig, DialogConfigHandle,
    DialogData, DialogPosition, DialogRole, DialogSize, Direction, RestoreFocus,
};
pub use container::{ContainerEvent, ContainerState, DIALOG_CONTAINER_CLASS, DialogContainer};
pub use dialog::{Dialog, DialogError, DialogHost};
pub use dialog_ref::{AnyDialogRef, CLOSE_FALLBACK_SLACK, DialogRef, DialogState, OpenDialog};
pub use overlay::{
    HeadlessOverlay, HeadlessOverlayRef, OVERLAY_BACKDROP_CLASS, OVERLAY_CONTAINER_CLASS,
    OVERLAY_HOST_CLASS, Overlay, OverlayConfig, OverlayRef,
};
pub use portal::{ComponentPortal, ComponentRef, ContentContext, DomPortal, TemplateContext, TemplatePortal};
pub use stack::{DialogScope, DialogSerial, OpenDialogStack};
