use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use time::{Duration, OffsetDateTime};

/// A button rendered on a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub label: String,
    pub handler: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<String>,
}

/// Fully resolved enter/leave transition for one toast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Animation {
    pub enter_duration: u64,
    pub enter_easing: String,
    pub enter_transition_classes: String,
    pub enter_from: String,
    pub enter_to: String,
    pub leave_duration: u64,
    pub leave_easing: String,
    pub leave_transition_classes: String,
    pub leave_from: String,
    pub leave_to: String,
    pub delay: u64,
    pub hooks: BTreeMap<String, Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform_origin: Option<String>,
}

/// One queued toast with all of its display attributes resolved.
///
/// Identity and timing fields never change after creation; `dismissed` is the
/// only state transition and it only goes from false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(rename = "message", alias = "text")]
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) title: Option<String>,
    pub(crate) priority: String,
    #[serde(rename = "duration")]
    pub(crate) duration_ms: u64,
    pub(crate) position: String,
    pub(crate) bg_color: String,
    pub(crate) text_color: String,
    pub(crate) icon: String,
    #[serde(default)]
    pub(crate) sound: Option<String>,
    pub(crate) auto_dismiss: bool,
    pub(crate) pause_on_hover: bool,
    pub(crate) show_progress_bar: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
    #[serde(default)]
    pub(crate) dismissed: bool,
    #[serde(default)]
    pub(crate) animation: Animation,
    #[serde(default)]
    pub(crate) layout: BTreeMap<String, String>,
    #[serde(default = "default_close_button")]
    pub(crate) close_button_enabled: bool,
    #[serde(default)]
    pub(crate) sound_volume: Option<f64>,
    #[serde(default)]
    pub(crate) sound_loop: Option<bool>,
    #[serde(default = "default_aria_role")]
    pub(crate) aria_role: String,
    #[serde(default)]
    pub(crate) actions: Vec<Action>,
    #[serde(default)]
    pub(crate) custom_data: Map<String, Value>,
}

const fn default_close_button() -> bool {
    true
}

fn default_aria_role() -> String {
    "status".to_string()
}

impl Toast {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn priority(&self) -> &str {
        &self.priority
    }

    #[must_use]
    pub const fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    #[must_use]
    pub fn position(&self) -> &str {
        &self.position
    }

    #[must_use]
    pub fn bg_color(&self) -> &str {
        &self.bg_color
    }

    #[must_use]
    pub fn text_color(&self) -> &str {
        &self.text_color
    }

    #[must_use]
    pub fn icon(&self) -> &str {
        &self.icon
    }

    #[must_use]
    pub fn sound(&self) -> Option<&str> {
        self.sound.as_deref()
    }

    #[must_use]
    pub const fn auto_dismiss(&self) -> bool {
        self.auto_dismiss
    }

    #[must_use]
    pub const fn pause_on_hover(&self) -> bool {
        self.pause_on_hover
    }

    #[must_use]
    pub const fn show_progress_bar(&self) -> bool {
        self.show_progress_bar
    }

    #[must_use]
    pub const fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    #[must_use]
    pub const fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    #[must_use]
    pub const fn animation(&self) -> &Animation {
        &self.animation
    }

    #[must_use]
    pub const fn layout(&self) -> &BTreeMap<String, String> {
        &self.layout
    }

    #[must_use]
    pub const fn close_button_enabled(&self) -> bool {
        self.close_button_enabled
    }

    #[must_use]
    pub const fn sound_volume(&self) -> Option<f64> {
        self.sound_volume
    }

    #[must_use]
    pub const fn sound_loop(&self) -> Option<bool> {
        self.sound_loop
    }

    #[must_use]
    pub fn aria_role(&self) -> &str {
        &self.aria_role
    }

    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    #[must_use]
    pub const fn custom_data(&self) -> &Map<String, Value> {
        &self.custom_data
    }

    pub const fn mark_dismissed(&mut self) {
        self.dismissed = true;
    }

    /// The instant this toast auto-expires, if it ever does.
    #[must_use]
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        if !self.auto_dismiss || self.duration_ms == 0 {
            return None;
        }
        let duration = Duration::milliseconds(i64::try_from(self.duration_ms).ok()?);
        self.created_at.checked_add(duration)
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at().is_some_and(|expires_at| now >= expires_at)
    }

    /// Age in milliseconds relative to `now`. Negative if created in the future.
    #[must_use]
    pub fn age_ms(&self, now: OffsetDateTime) -> i128 {
        (now - self.created_at).whole_milliseconds()
    }

    /// Whether the toast outlived the global queue lifetime. A lifetime of zero never expires.
    #[must_use]
    pub fn exceeds_lifetime(&self, now: OffsetDateTime, lifetime_ms: u64) -> bool {
        lifetime_ms > 0 && self.age_ms(now) > i128::from(lifetime_ms)
    }

    /// Whether the toast is still eligible for display and storage.
    #[must_use]
    pub fn is_live_at(&self, now: OffsetDateTime, lifetime_ms: u64) -> bool {
        !self.dismissed && !self.is_expired_at(now) && !self.exceeds_lifetime(now, lifetime_ms)
    }

    /// Rebuilds a toast from its stored JSON shape.
    ///
    /// # Errors
    /// Returns an error if a required field is missing or a value has the wrong shape.
    pub fn from_record(record: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(record)
    }

    /// # Errors
    /// Returns an error if custom data cannot be represented as JSON.
    pub fn to_record(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
