#![forbid(unsafe_code)]

//! Dialog configuration.
//!
//! Every knob is optional. A [`DialogConfig`] passed to `open()` is merged
//! over the service-level defaults with [`DialogConfig::merged_over`]; the
//! accessor methods then resolve whatever is still unset to the built-in
//! default.
//!
//! | Knob | Default |
//! |------|---------|
//! | `role` | `dialog` |
//! | `aria_modal` | `true` |
//! | `has_backdrop` | `true` |
//! | `disable_close` | `false` |
//! | `close_on_navigation` | `true` |
//! | `close_on_destroy` | `true` |
//! | `close_on_overlay_detachments` | `true` |
//! | `auto_focus` | first tabbable element |
//! | `restore_focus` | previously focused element |
//! | enter / exit transition | 150ms / 75ms |
//!
//! With the `serde` feature the plain-data part of the config can be loaded
//! from JSON or TOML. `data`, `injector`, `providers`, and element restore
//! targets are runtime-only and skipped.

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use ftui_dom::{Injector, NodeId, Provider};

/// Default duration of the enter transition.
pub const DEFAULT_ENTER_DURATION: Duration = Duration::from_millis(150);
/// Default duration of the exit transition.
pub const DEFAULT_EXIT_DURATION: Duration = Duration::from_millis(75);

/// Where focus goes once the dialog content is attached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum AutoFocus {
    /// Focus the dialog container itself.
    Dialog,
    /// Focus the first tabbable element (honoring `ftui-focus-initial`).
    #[default]
    FirstTabbable,
    /// Focus the first heading.
    FirstHeading,
    /// Focus the first element matching a selector.
    Selector(String),
}

impl From<bool> for AutoFocus {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::FirstTabbable
        } else {
            Self::Dialog
        }
    }
}

impl From<&str> for AutoFocus {
    fn from(value: &str) -> Self {
        match value {
            "dialog" => Self::Dialog,
            "first-tabbable" => Self::FirstTabbable,
            "first-heading" => Self::FirstHeading,
            selector => Self::Selector(selector.to_owned()),
        }
    }
}

/// Where focus goes once the dialog has closed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum RestoreFocus {
    /// Leave focus wherever it ends up.
    Disabled,
    /// Refocus the element that had focus before the dialog opened.
    #[default]
    Previous,
    /// Focus the first element in the document matching a selector.
    Selector(String),
    /// Focus a specific element.
    #[cfg_attr(feature = "serde", serde(skip))]
    Element(NodeId),
}

impl From<bool> for RestoreFocus {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Previous
        } else {
            Self::Disabled
        }
    }
}

/// ARIA role of the dialog container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DialogRole {
    #[default]
    Dialog,
    AlertDialog,
}

impl DialogRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dialog => "dialog",
            Self::AlertDialog => "alertdialog",
        }
    }
}

/// Layout direction made available to dialog content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }
}

/// Offsets overriding the default centered position. Values are CSS lengths.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DialogPosition {
    pub top: Option<String>,
    pub bottom: Option<String>,
    pub left: Option<String>,
    pub right: Option<String>,
}

impl DialogPosition {
    #[must_use]
    pub fn top(mut self, value: impl Into<String>) -> Self {
        self.top = Some(value.into());
        self
    }

    #[must_use]
    pub fn bottom(mut self, value: impl Into<String>) -> Self {
        self.bottom = Some(value.into());
        self
    }

    #[must_use]
    pub fn left(mut self, value: impl Into<String>) -> Self {
        self.left = Some(value.into());
        self
    }

    #[must_use]
    pub fn right(mut self, value: impl Into<String>) -> Self {
        self.right = Some(value.into());
        self
    }
}

/// Size bounds of the overlay pane. Values are CSS lengths.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DialogSize {
    pub width: Option<String>,
    pub height: Option<String>,
    pub min_width: Option<String>,
    pub min_height: Option<String>,
    pub max_width: Option<String>,
    pub max_height: Option<String>,
}

impl DialogSize {
    fn merged_over(&self, defaults: &Self) -> Self {
        Self {
            width: self.width.clone().or_else(|| defaults.width.clone()),
            height: self.height.clone().or_else(|| defaults.height.clone()),
            min_width: self.min_width.clone().or_else(|| defaults.min_width.clone()),
            min_height: self.min_height.clone().or_else(|| defaults.min_height.clone()),
            max_width: self.max_width.clone().or_else(|| defaults.max_width.clone()),
            max_height: self.max_height.clone().or_else(|| defaults.max_height.clone()),
        }
    }
}

/// Arbitrary data handed to dialog content.
#[derive(Clone)]
pub struct DialogData(Rc<dyn Any>);

impl DialogData {
    pub fn new<T: Any>(value: T) -> Self {
        Self(Rc::new(value))
    }

    /// Borrow the data as `T`, if that is its type.
    #[must_use]
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for DialogData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DialogData(..)")
    }
}

/// Configuration for one dialog, or the defaults of a dialog service.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DialogConfig {
    /// Unique id; generated when absent.
    pub id: Option<String>,
    pub role: Option<DialogRole>,
    pub aria_modal: Option<bool>,
    pub aria_label: Option<String>,
    pub aria_labelledby: Option<String>,
    pub aria_describedby: Option<String>,
    pub size: DialogSize,
    pub position: Option<DialogPosition>,
    pub panel_class: Option<Vec<String>>,
    pub backdrop_class: Option<Vec<String>>,
    pub has_backdrop: Option<bool>,
    pub disable_close: Option<bool>,
    pub close_on_navigation: Option<bool>,
    pub close_on_destroy: Option<bool>,
    pub close_on_overlay_detachments: Option<bool>,
    pub auto_focus: Option<AutoFocus>,
    pub restore_focus: Option<RestoreFocus>,
    pub direction: Option<Direction>,
    #[cfg_attr(feature = "serde", serde(with = "duration_ms"))]
    pub enter_animation_duration: Option<Duration>,
    #[cfg_attr(feature = "serde", serde(with = "duration_ms"))]
    pub exit_animation_duration: Option<Duration>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub data: Option<DialogData>,
    /// Parent injector for the dialog's content.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub injector: Option<Injector>,
    /// Extra providers visible to the dialog's content.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub providers: Vec<Provider>,
}

impl DialogConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill every unset knob from `defaults`.
    #[must_use]
    pub fn merged_over(&self, defaults: &DialogConfig) -> DialogConfig {
        fn pick<T: Clone>(value: &Option<T>, fallback: &Option<T>) -> Option<T> {
            value.clone().or_else(|| fallback.clone())
        }
        DialogConfig {
            id: self.id.clone(),
            role: self.role.or(defaults.role),
            aria_modal: self.aria_modal.or(defaults.aria_modal),
            aria_label: pick(&self.aria_label, &defaults.aria_label),
            aria_labelledby: pick(&self.aria_labelledby, &defaults.aria_labelledby),
            aria_describedby: pick(&self.aria_describedby, &defaults.aria_describedby),
            size: self.size.merged_over(&defaults.size),
            position: pick(&self.position, &defaults.position),
            panel_class: pick(&self.panel_class, &defaults.panel_class),
            backdrop_class: pick(&self.backdrop_class, &defaults.backdrop_class),
            has_backdrop: self.has_backdrop.or(defaults.has_backdrop),
            disable_close: self.disable_close.or(defaults.disable_close),
            close_on_navigation: self.close_on_navigation.or(defaults.close_on_navigation),
            close_on_destroy: self.close_on_destroy.or(defaults.close_on_destroy),
            close_on_overlay_detachments: self
                .close_on_overlay_detachments
                .or(defaults.close_on_overlay_detachments),
            auto_focus: pick(&self.auto_focus, &defaults.auto_focus),
            restore_focus: pick(&self.restore_focus, &defaults.restore_focus),
            direction: self.direction.or(defaults.direction),
            enter_animation_duration: self
                .enter_animation_duration
                .or(defaults.enter_animation_duration),
            exit_animation_duration: self
                .exit_animation_duration
                .or(defaults.exit_animation_duration),
            data: pick(&self.data, &defaults.data),
            injector: pick(&self.injector, &defaults.injector),
            providers: if self.providers.is_empty() {
                defaults.providers.clone()
            } else {
                self.providers.clone()
            },
        }
    }

    // --- builder ---

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: DialogRole) -> Self {
        self.role = Some(role);
        self
    }

    #[must_use]
    pub fn with_aria_modal(mut self, modal: bool) -> Self {
        self.aria_modal = Some(modal);
        self
    }

    #[must_use]
    pub fn with_aria_label(mut self, label: impl Into<String>) -> Self {
        self.aria_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_aria_labelledby(mut self, id: impl Into<String>) -> Self {
        self.aria_labelledby = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_aria_describedby(mut self, id: impl Into<String>) -> Self {
        self.aria_describedby = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: impl Into<String>) -> Self {
        self.size.width = Some(width.into());
        self
    }

    #[must_use]
    pub fn with_height(mut self, height: impl Into<String>) -> Self {
        self.size.height = Some(height.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: DialogSize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: DialogPosition) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn with_panel_class(mut self, class: impl Into<String>) -> Self {
        self.panel_class
            .get_or_insert_with(Vec::new)
            .push(class.into());
        self
    }

    #[must_use]
    pub fn with_backdrop_class(mut self, class: impl Into<String>) -> Self {
        self.backdrop_class
            .get_or_insert_with(Vec::new)
            .push(class.into());
        self
    }

    #[must_use]
    pub fn with_backdrop(mut self, has_backdrop: bool) -> Self {
        self.has_backdrop = Some(has_backdrop);
        self
    }

    #[must_use]
    pub fn with_disable_close(mut self, disable: bool) -> Self {
        self.disable_close = Some(disable);
        self
    }

    #[must_use]
    pub fn with_close_on_navigation(mut self, close: bool) -> Self {
        self.close_on_navigation = Some(close);
        self
    }

    #[must_use]
    pub fn with_close_on_destroy(mut self, close: bool) -> Self {
        self.close_on_destroy = Some(close);
        self
    }

    #[must_use]
    pub fn with_close_on_overlay_detachments(mut self, close: bool) -> Self {
        self.close_on_overlay_detachments = Some(close);
        self
    }

    #[must_use]
    pub fn with_auto_focus(mut self, auto_focus: impl Into<AutoFocus>) -> Self {
        self.auto_focus = Some(auto_focus.into());
        self
    }

    #[must_use]
    pub fn with_restore_focus(mut self, restore_focus: impl Into<RestoreFocus>) -> Self {
        self.restore_focus = Some(restore_focus.into());
        self
    }

    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    #[must_use]
    pub fn with_enter_animation_duration(mut self, duration: Duration) -> Self {
        self.enter_animation_duration = Some(duration);
        self
    }

    #[must_use]
    pub fn with_exit_animation_duration(mut self, duration: Duration) -> Self {
        self.exit_animation_duration = Some(duration);
        self
    }

    #[must_use]
    pub fn with_data<T: Any>(mut self, data: T) -> Self {
        self.data = Some(DialogData::new(data));
        self
    }

    #[must_use]
    pub fn with_injector(mut self, injector: Injector) -> Self {
        self.injector = Some(injector);
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    // --- resolved values ---

    #[must_use]
    pub fn role(&self) -> DialogRole {
        self.role.unwrap_or_default()
    }

    #[must_use]
    pub fn aria_modal(&self) -> bool {
        self.aria_modal.unwrap_or(true)
    }

    #[must_use]
    pub fn has_backdrop(&self) -> bool {
        self.has_backdrop.unwrap_or(true)
    }

    #[must_use]
    pub fn disable_close(&self) -> bool {
        self.disable_close.unwrap_or(false)
    }

    #[must_use]
    pub fn close_on_navigation(&self) -> bool {
        self.close_on_navigation.unwrap_or(true)
    }

    #[must_use]
    pub fn close_on_destroy(&self) -> bool {
        self.close_on_destroy.unwrap_or(true)
    }

    #[must_use]
    pub fn close_on_overlay_detachments(&self) -> bool {
        self.close_on_overlay_detachments.unwrap_or(true)
    }

    #[must_use]
    pub fn auto_focus(&self) -> AutoFocus {
        self.auto_focus.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn restore_focus(&self) -> RestoreFocus {
        self.restore_focus.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn enter_duration(&self) -> Duration {
        self.enter_animation_duration
            .unwrap_or(DEFAULT_ENTER_DURATION)
    }

    #[must_use]
    pub fn exit_duration(&self) -> Duration {
        self.exit_animation_duration.unwrap_or(DEFAULT_EXIT_DURATION)
    }
}

/// Shared, read-only view of a dialog's resolved config, injectable into
/// dialog content.
#[derive(Debug, Clone)]
pub struct DialogConfigHandle(pub Rc<DialogConfig>);

impl std::ops::Deref for DialogConfigHandle {
    type Target = DialogConfig;

    fn deref(&self) -> &DialogConfig {
        &self.0
    }
}

#[cfg(feature = "serde")]
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
