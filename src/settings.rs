use crate::domain::toast::Action;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Toast settings shipped with the binary, used when no settings file is given.
pub const BUNDLED_SETTINGS: &str = include_str!("../config/toasts.json");

/// Sections that must be present (as objects) for the toast queue to start.
pub const REQUIRED_SECTIONS: [&str; 8] =
    ["animations", "behavior", "close_button", "display", "progress_bar", "queue", "sounds", "types"];

const FALLBACK_PRIORITIES: [&str; 3] = ["high", "normal", "low"];

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read toast settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed toast settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Toast settings section \"{0}\" is missing or invalid")]
    MissingSection(&'static str),
    #[error("Invalid toast settings: {0}")]
    Invalid(String),
}

/// The nested toast configuration. Loaded once at startup and shared immutably.
#[derive(Debug, Clone, Deserialize)]
pub struct ToastSettings {
    #[serde(default = "default_session_key")]
    pub session_key: String,
    pub animations: AnimationSettings,
    pub behavior: BehaviorSettings,
    pub close_button: CloseButtonSettings,
    pub display: DisplaySettings,
    pub progress_bar: ProgressBarSettings,
    pub queue: QueueSettings,
    pub sounds: SoundSettings,
    pub types: TypeSettings,
}

fn default_session_key() -> String {
    "toastify_messages".to_string()
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimationSettings {
    pub preset: Option<String>,
    #[serde(default)]
    pub presets: BTreeMap<String, AnimationPreset>,
    #[serde(default)]
    pub global: AnimationGlobals,
}

/// A named animation preset. Every field is optional and falls back to [`AnimationGlobals`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimationPreset {
    pub enter_transition_classes: Option<String>,
    pub enter_easing: Option<String>,
    pub enter_duration: Option<u64>,
    pub enter_from: Option<String>,
    pub enter_to: Option<String>,
    pub leave_transition_classes: Option<String>,
    pub leave_easing: Option<String>,
    pub leave_duration: Option<u64>,
    pub leave_from: Option<String>,
    pub leave_to: Option<String>,
    pub delay: Option<u64>,
    pub hooks: Option<BTreeMap<String, Option<String>>>,
    pub transform_origin: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimationGlobals {
    pub default_enter_duration: Option<u64>,
    pub default_enter_easing: Option<String>,
    pub default_leave_duration: Option<u64>,
    pub default_leave_easing: Option<String>,
    pub default_transition_classes: Option<String>,
    #[serde(default)]
    pub enable_js_hooks_globally: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BehaviorSettings {
    pub auto_dismiss: Option<bool>,
    pub pause_on_hover: Option<bool>,
    #[serde(default)]
    pub pause_on_window_blur: bool,
    #[serde(default)]
    pub reverse_order_on_stack: bool,
    pub aria_live_region: Option<String>,
    #[serde(default)]
    pub allow_swipe_to_dismiss: bool,
    #[serde(default = "default_true")]
    pub clear_all_on_navigate: bool,
    #[serde(default)]
    pub duplicate_detection: DuplicateDetection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DuplicateDetection {
    #[serde(default)]
    pub enabled: bool,
    /// Window in milliseconds within which an identical toast is a duplicate.
    #[serde(default = "default_duplicate_threshold")]
    pub duration_threshold: u64,
}

const fn default_duplicate_threshold() -> u64 {
    1000
}

impl Default for DuplicateDetection {
    fn default() -> Self {
        Self { enabled: false, duration_threshold: default_duplicate_threshold() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloseButtonSettings {
    pub enabled: Option<bool>,
    pub aria_label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplaySettings {
    pub default_duration: Option<i64>,
    pub position: Option<String>,
    pub mobile_position: Option<String>,
    pub max_width: Option<String>,
    pub mobile_max_width: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressBarSettings {
    pub enabled: Option<bool>,
    pub height: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    #[serde(default = "default_max_toasts")]
    pub max_toasts: usize,
    /// Maximum displayed toasts of one type. Zero disables the cap.
    #[serde(default)]
    pub per_type_limit: usize,
    /// Maximum age of any record in milliseconds. Zero disables the cap.
    #[serde(default)]
    pub lifetime: u64,
    #[serde(default)]
    pub priority: PrioritySettings,
}

const fn default_max_toasts() -> usize {
    5
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrioritySettings {
    #[serde(default)]
    pub enabled: bool,
    /// Ordered from most to least important.
    #[serde(default)]
    pub levels: Vec<PriorityLevel>,
    #[serde(default)]
    pub overflow_behavior: OverflowBehavior,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriorityLevel {
    pub name: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowBehavior {
    #[default]
    Strict,
    /// Accepted for compatibility; selection still applies strict skipping.
    Distribute,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SoundSettings {
    #[serde(default)]
    pub global: SoundGlobals,
    #[serde(default)]
    pub assets: BTreeMap<String, SoundAsset>,
    /// Maps a toast type to a key in `assets`.
    #[serde(default)]
    pub types: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SoundGlobals {
    #[serde(default)]
    pub enabled: bool,
    pub base_path: Option<String>,
    pub default_sound: Option<String>,
    pub default_volume: Option<f64>,
    pub default_loop: Option<bool>,
    pub throttle_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SoundAsset {
    pub src: Option<String>,
    pub volume: Option<f64>,
    #[serde(rename = "loop")]
    pub looped: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeSettings {
    #[serde(default)]
    pub defaults: TypeEntry,
    #[serde(default)]
    pub layouts: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(flatten)]
    pub kinds: BTreeMap<String, TypeEntry>,
}

/// Per-type overrides. `defaults` uses the same shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeEntry {
    pub bg: Option<String>,
    pub icon: Option<String>,
    pub duration: Option<i64>,
    pub text_color: Option<String>,
    pub show_progress: Option<bool>,
    pub dismissible: Option<bool>,
    pub position: Option<String>,
    pub layout_preset: Option<String>,
    pub aria_role: Option<String>,
    pub close_button: Option<bool>,
    pub sound: Option<TypeSound>,
    pub priority: Option<String>,
    pub animation_preset: Option<String>,
    pub actions: Option<Vec<Action>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeSound {
    pub src: Option<String>,
    pub volume: Option<f64>,
    #[serde(rename = "loop")]
    pub looped: Option<bool>,
}

impl ToastSettings {
    /// Loads settings from `path`, or the bundled defaults when no path is given.
    ///
    /// # Errors
    /// Returns `SettingsError` if the file cannot be read or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|source| SettingsError::Io { path: path.to_path_buf(), source })?;
                tracing::info!(path = %path.display(), "Loading toast settings");
                Self::from_json_str(&raw)
            }
            None => Self::bundled(),
        }
    }

    /// # Errors
    /// Returns `SettingsError` only if the bundled document is broken.
    pub fn bundled() -> Result<Self, SettingsError> {
        Self::from_json_str(BUNDLED_SETTINGS)
    }

    /// # Errors
    /// Returns `SettingsError::Parse` on malformed JSON, or a validation error.
    pub fn from_json_str(raw: &str) -> Result<Self, SettingsError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Validates the raw document section by section before decoding it.
    ///
    /// # Errors
    /// Returns `SettingsError::MissingSection` for an absent or non-object section,
    /// `SettingsError::Invalid` for empty essential sections or inconsistent priority levels.
    pub fn from_value(value: Value) -> Result<Self, SettingsError> {
        let Some(root) = value.as_object() else {
            return Err(SettingsError::Invalid("settings document must be an object".into()));
        };

        for section in REQUIRED_SECTIONS {
            if !root.get(section).is_some_and(Value::is_object) {
                tracing::error!(section, "Toast settings section is missing or invalid");
                return Err(SettingsError::MissingSection(section));
            }
        }

        for essential in ["types", "display"] {
            if root.get(essential).and_then(Value::as_object).is_some_and(serde_json::Map::is_empty) {
                return Err(SettingsError::Invalid(format!("essential section \"{essential}\" is empty")));
            }
        }

        let settings: Self = serde_json::from_value(value)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let priority = &self.queue.priority;
        let mut seen = HashSet::new();
        for level in &priority.levels {
            if level.name.trim().is_empty() {
                return Err(SettingsError::Invalid("priority level names cannot be empty".into()));
            }
            if !seen.insert(level.name.as_str()) {
                return Err(SettingsError::Invalid(format!("duplicate priority level \"{}\"", level.name)));
            }
        }

        if priority.enabled && priority.levels.is_empty() {
            tracing::warn!("Priority queuing is enabled without levels; defaulting to high, normal, low");
        }
        if priority.overflow_behavior == OverflowBehavior::Distribute {
            tracing::warn!("Priority overflow behavior \"distribute\" is not supported; applying strict limits");
        }

        Ok(())
    }

    /// Valid priorities, most important first.
    #[must_use]
    pub fn priority_order(&self) -> Vec<String> {
        let priority = &self.queue.priority;
        if priority.enabled && !priority.levels.is_empty() {
            priority.levels.iter().map(|level| level.name.clone()).collect()
        } else {
            FALLBACK_PRIORITIES.iter().map(ToString::to_string).collect()
        }
    }

    /// Display limits per priority level. Empty when priority queuing is disabled.
    #[must_use]
    pub fn priority_limits(&self) -> BTreeMap<String, usize> {
        let priority = &self.queue.priority;
        if !priority.enabled {
            return BTreeMap::new();
        }
        priority.levels.iter().filter_map(|level| level.limit.map(|limit| (level.name.clone(), limit))).collect()
    }

    #[must_use]
    pub fn type_entry(&self, kind: &str) -> Option<&TypeEntry> {
        self.types.kinds.get(kind)
    }
}
