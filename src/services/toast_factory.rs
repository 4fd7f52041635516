use crate::domain::clock::truncate_to_millis;
use crate::domain::resolve::resolve;
use crate::domain::toast::{Action, Animation, Toast};
use crate::settings::{AnimationPreset, AnimationSettings, ToastSettings, TypeEntry, TypeSound};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use time::OffsetDateTime;

const FALLBACK_ANIMATION: &str = "fade";
const FALLBACK_LAYOUT: &str = "default";
const FALLBACK_PRIORITY: &str = "low";
const CUSTOM_DEFAULT_TYPE: &str = "default";

/// Caller overrides for a new toast. Unset fields fall back to configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastOptions {
    #[serde(default)]
    pub title: Option<String>,
    /// Milliseconds. Negative values are treated as zero.
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub auto_dismiss: Option<bool>,
    #[serde(default)]
    pub pause_on_hover: Option<bool>,
    #[serde(default)]
    pub show_progress_bar: Option<bool>,
    #[serde(default)]
    pub animation_preset: Option<String>,
    #[serde(default)]
    pub layout_preset: Option<String>,
    #[serde(default)]
    pub sound_asset: Option<String>,
    /// Replaces the type's configured actions only when non-empty.
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub custom_data: Option<Map<String, Value>>,
}

impl ToastOptions {
    #[must_use]
    pub fn titled(title: Option<&str>, duration: Option<i64>) -> Self {
        Self { title: title.map(ToString::to_string), duration, ..Self::default() }
    }

    /// Splits a free-form option map into a toast type and overrides.
    ///
    /// The type comes from the `type` key (default `"default"`). When no
    /// `customData` is given, every other key is kept as custom data.
    ///
    /// # Errors
    /// Returns an error if a recognized option has the wrong JSON shape.
    pub fn from_custom(title: Option<&str>, mut options: Map<String, Value>) -> Result<(String, Self), serde_json::Error> {
        let kind = match options.remove("type") {
            Some(Value::String(kind)) => kind,
            Some(Value::Null) | None => CUSTOM_DEFAULT_TYPE.to_string(),
            Some(other) => return Err(serde::de::Error::custom(format!("toast type must be a string, got {other}"))),
        };

        let mut parsed: Self = serde_json::from_value(Value::Object(options.clone()))?;
        if parsed.custom_data.is_none() {
            parsed.custom_data = Some(options);
        }
        if title.is_some() {
            parsed.title = title.map(ToString::to_string);
        }

        Ok((kind, parsed))
    }
}

/// Sound attributes after asset lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ResolvedSound {
    pub(crate) path: Option<String>,
    pub(crate) volume: Option<f64>,
    pub(crate) looped: Option<bool>,
}

/// Builds toast records by layering overrides over configuration.
#[derive(Debug, Clone)]
pub struct ToastFactory {
    settings: Arc<ToastSettings>,
    valid_priorities: Vec<String>,
}

impl ToastFactory {
    #[must_use]
    pub fn new(settings: Arc<ToastSettings>) -> Self {
        let valid_priorities = settings.priority_order();
        Self { settings, valid_priorities }
    }

    /// Creates a fresh toast of `kind` stamped at `now`.
    #[must_use]
    pub fn build(&self, kind: &str, text: &str, options: ToastOptions, now: OffsetDateTime) -> Toast {
        let kind = kind.to_lowercase();
        let settings = &self.settings;

        let missing = TypeEntry::default();
        let entry = settings.type_entry(&kind).unwrap_or_else(|| {
            tracing::warn!(kind = %kind, "Toast type not configured; applying defaults");
            &missing
        });
        let defaults = &settings.types.defaults;

        let priority = self.resolve_priority(
            &kind,
            resolve(options.priority, entry.priority.clone(), defaults.priority.clone(), None, FALLBACK_PRIORITY.into()),
        );

        let duration = resolve(options.duration, entry.duration, defaults.duration, settings.display.default_duration, 5000);
        let duration_ms = u64::try_from(duration).unwrap_or(0);

        let auto_dismiss =
            resolve(options.auto_dismiss, entry.dismissible, defaults.dismissible, settings.behavior.auto_dismiss, true);
        let pause_on_hover = resolve(options.pause_on_hover, None, None, settings.behavior.pause_on_hover, true);
        let show_progress_bar = resolve(
            options.show_progress_bar,
            entry.show_progress,
            defaults.show_progress,
            settings.progress_bar.enabled,
            true,
        );

        let bg_color = resolve(None, entry.bg.clone(), defaults.bg.clone(), None, "bg-gray-800".into());
        let text_color = resolve(None, entry.text_color.clone(), defaults.text_color.clone(), None, "text-white".into());
        let icon = resolve(None, entry.icon.clone(), defaults.icon.clone(), None, String::new());
        let aria_role = resolve(
            None,
            entry.aria_role.clone(),
            defaults.aria_role.clone(),
            settings.behavior.aria_live_region.clone(),
            "status".into(),
        );
        let position =
            resolve(None, entry.position.clone(), defaults.position.clone(), settings.display.position.clone(), "top-right".into());
        let close_button_enabled =
            resolve(None, entry.close_button, defaults.close_button, settings.close_button.enabled, true);

        let animation_name = resolve(
            options.animation_preset,
            entry.animation_preset.clone(),
            defaults.animation_preset.clone(),
            settings.animations.preset.clone(),
            FALLBACK_ANIMATION.into(),
        );
        let layout_name = resolve(
            options.layout_preset,
            entry.layout_preset.clone(),
            defaults.layout_preset.clone(),
            None,
            FALLBACK_LAYOUT.into(),
        );

        let type_sound = entry.sound.as_ref().or(defaults.sound.as_ref());
        let sound = self.resolve_sound(&kind, options.sound_asset.as_deref(), type_sound);

        let actions = if options.actions.is_empty() {
            entry.actions.clone().or_else(|| defaults.actions.clone()).unwrap_or_default()
        } else {
            options.actions
        };

        Toast {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            text: text.to_string(),
            title: options.title,
            priority,
            duration_ms,
            position,
            bg_color,
            text_color,
            icon,
            sound: sound.path,
            auto_dismiss,
            pause_on_hover,
            show_progress_bar,
            created_at: truncate_to_millis(now),
            dismissed: false,
            animation: self.resolve_animation(&animation_name),
            layout: self.resolve_layout(&layout_name),
            close_button_enabled,
            sound_volume: sound.volume,
            sound_loop: sound.looped,
            aria_role,
            actions,
            custom_data: options.custom_data.unwrap_or_default(),
        }
    }

    fn resolve_priority(&self, kind: &str, priority: String) -> String {
        if self.valid_priorities.contains(&priority) {
            return priority;
        }
        let lowest = self.valid_priorities.last().map_or(FALLBACK_PRIORITY, String::as_str);
        tracing::warn!(kind = %kind, priority = %priority, fallback = %lowest, "Invalid toast priority");
        lowest.to_string()
    }

    pub(crate) fn resolve_animation(&self, name: &str) -> Animation {
        let animations = &self.settings.animations;
        let preset = animations.presets.get(name).cloned().unwrap_or_else(|| {
            tracing::warn!(preset = %name, "Animation preset not found; falling back to fade");
            animations.presets.get(FALLBACK_ANIMATION).cloned().unwrap_or_default()
        });
        merge_animation(preset, animations)
    }

    pub(crate) fn resolve_layout(&self, name: &str) -> BTreeMap<String, String> {
        let layouts = &self.settings.types.layouts;
        if let Some(layout) = layouts.get(name) {
            return layout.clone();
        }
        tracing::warn!(preset = %name, "Layout preset not found; falling back to default");
        layouts.get(FALLBACK_LAYOUT).cloned().unwrap_or_default()
    }

    pub(crate) fn resolve_sound(&self, kind: &str, explicit: Option<&str>, type_sound: Option<&TypeSound>) -> ResolvedSound {
        let sounds = &self.settings.sounds;
        if !sounds.global.enabled {
            return ResolvedSound::default();
        }

        let key = explicit
            .or_else(|| type_sound.and_then(|s| s.src.as_deref()))
            .or_else(|| sounds.types.get(kind).map(String::as_str))
            .or(sounds.global.default_sound.as_deref());
        let Some(key) = key else {
            return ResolvedSound::default();
        };

        let Some((asset, src)) = sounds.assets.get(key).and_then(|asset| asset.src.as_deref().map(|src| (asset, src)))
        else {
            tracing::warn!(kind = %kind, asset = %key, "Sound asset not found");
            return ResolvedSound::default();
        };

        let base_path = sounds.global.base_path.as_deref().unwrap_or("sounds");
        let volume = type_sound
            .and_then(|s| s.volume)
            .or(asset.volume)
            .or(sounds.global.default_volume)
            .unwrap_or(1.0)
            .clamp(0.0, 1.0);
        let looped =
            type_sound.and_then(|s| s.looped).or(asset.looped).or(sounds.global.default_loop).unwrap_or(false);

        ResolvedSound { path: Some(web_path(base_path, src)), volume: Some(volume), looped: Some(looped) }
    }
}

fn merge_animation(preset: AnimationPreset, animations: &AnimationSettings) -> Animation {
    let global = &animations.global;
    let transition = global.default_transition_classes.clone().unwrap_or_else(|| "transition".into());

    Animation {
        enter_duration: preset.enter_duration.or(global.default_enter_duration).unwrap_or(300),
        enter_easing: preset
            .enter_easing
            .or_else(|| global.default_enter_easing.clone())
            .unwrap_or_else(|| "ease-out".into()),
        enter_transition_classes: preset.enter_transition_classes.unwrap_or_else(|| transition.clone()),
        enter_from: preset.enter_from.unwrap_or_default(),
        enter_to: preset.enter_to.unwrap_or_default(),
        leave_duration: preset.leave_duration.or(global.default_leave_duration).unwrap_or(200),
        leave_easing: preset
            .leave_easing
            .or_else(|| global.default_leave_easing.clone())
            .unwrap_or_else(|| "ease-in".into()),
        leave_transition_classes: preset.leave_transition_classes.unwrap_or(transition),
        leave_from: preset.leave_from.unwrap_or_default(),
        leave_to: preset.leave_to.unwrap_or_default(),
        delay: preset.delay.unwrap_or(0),
        hooks: preset.hooks.unwrap_or_default(),
        transform_origin: preset.transform_origin,
    }
}

/// Joins path segments into an absolute web path without doubled slashes.
fn web_path(base_path: &str, src: &str) -> String {
    let joined: Vec<&str> =
        [base_path, src].iter().flat_map(|part| part.split('/')).filter(|segment| !segment.is_empty()).collect();
    format!("/{}", joined.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::toast::fixtures::epoch_plus;
    use serde_json::json;

    fn factory_with(mutate: impl FnOnce(&mut Value)) -> ToastFactory {
        let mut value: Value = serde_json::from_str(crate::settings::BUNDLED_SETTINGS).unwrap();
        mutate(&mut value);
        ToastFactory::new(Arc::new(ToastSettings::from_value(value).unwrap()))
    }

    fn factory() -> ToastFactory {
        factory_with(|_| {})
    }

    #[test]
    fn test_type_configuration_applies() {
        let toast = factory().build("ERROR", "Boom", ToastOptions::default(), epoch_plus(0));

        assert_eq!(toast.kind(), "error");
        assert_eq!(toast.priority(), "high");
        assert_eq!(toast.duration_ms(), 6000);
        assert_eq!(toast.bg_color(), "bg-red-600 dark:bg-red-700");
        assert_eq!(toast.aria_role(), "alert");
        assert_eq!(toast.actions().len(), 1);
        assert_eq!(toast.animation().enter_from, "opacity-0 translate-y-2 sm:translate-y-0 sm:translate-x-2");
    }

    #[test]
    fn test_explicit_overrides_win() {
        let options = ToastOptions {
            duration: Some(1234),
            priority: Some("low".into()),
            auto_dismiss: Some(false),
            pause_on_hover: Some(false),
            show_progress_bar: Some(false),
            actions: vec![Action { label: "Undo".into(), handler: "undo".into(), classes: None }],
            ..ToastOptions::default()
        };

        let toast = factory().build("error", "Boom", options, epoch_plus(0));

        assert_eq!(toast.duration_ms(), 1234);
        assert_eq!(toast.priority(), "low");
        assert!(!toast.auto_dismiss());
        assert!(!toast.pause_on_hover());
        assert!(!toast.show_progress_bar());
        assert_eq!(toast.actions()[0].label, "Undo");
    }

    #[test]
    fn test_type_defaults_layer_applies_when_type_is_silent() {
        let toast = factory().build("success", "Saved", ToastOptions::default(), epoch_plus(0));

        // success sets no close_button or layout_preset; types.defaults provides them.
        assert!(toast.close_button_enabled());
        assert_eq!(toast.layout().get("wrapper_classes").unwrap(), "p-4 rounded-lg shadow-lg flex items-center space-x-4");
    }

    #[test]
    fn test_global_layer_applies_when_type_and_defaults_are_silent() {
        let f = factory_with(|v| {
            v["types"]["defaults"] = json!({});
            v["display"]["default_duration"] = json!(7777);
            v["behavior"]["aria_live_region"] = json!("assertive");
        });

        let toast = f.build("warning", "Careful", ToastOptions::default(), epoch_plus(0));

        assert_eq!(toast.duration_ms(), 4000);
        assert_eq!(toast.aria_role(), "assertive");
        assert_eq!(toast.position(), "top-right");

        let unknown = f.build("mystery", "Hm", ToastOptions::default(), epoch_plus(0));
        assert_eq!(unknown.duration_ms(), 7777);
        assert_eq!(unknown.priority(), "low");
    }

    #[test]
    fn test_unknown_type_uses_hard_fallbacks() {
        let f = factory_with(|v| v["types"]["defaults"] = json!({}));

        let toast = f.build("mystery", "Hm", ToastOptions::default(), epoch_plus(0));

        assert_eq!(toast.bg_color(), "bg-gray-800");
        assert_eq!(toast.text_color(), "text-white");
        assert_eq!(toast.icon(), "");
        assert!(toast.actions().is_empty());
    }

    #[test]
    fn test_negative_duration_clamps_to_zero() {
        let options = ToastOptions { duration: Some(-50), ..ToastOptions::default() };
        let toast = factory().build("info", "x", options, epoch_plus(0));

        assert_eq!(toast.duration_ms(), 0);
    }

    #[test]
    fn test_invalid_priority_coerces_to_lowest_level() {
        let options = ToastOptions { priority: Some("urgent".into()), ..ToastOptions::default() };
        let toast = factory().build("info", "x", options, epoch_plus(0));
        assert_eq!(toast.priority(), "low");

        let f = factory_with(|v| {
            v["queue"]["priority"]["levels"] = json!([{ "name": "p1" }, { "name": "p2" }, { "name": "p9" }]);
        });
        let toast = f.build("info", "x", ToastOptions::default(), epoch_plus(0));
        assert_eq!(toast.priority(), "p9");
    }

    #[test]
    fn test_sound_resolution() {
        let error = factory().build("error", "x", ToastOptions::default(), epoch_plus(0));
        assert_eq!(error.sound(), Some("/sounds/toastify/error.mp3"));
        assert_eq!(error.sound_volume(), Some(0.8));
        assert_eq!(error.sound_loop(), Some(false));

        let critical = factory().build("critical", "x", ToastOptions::default(), epoch_plus(0));
        assert_eq!(critical.sound_loop(), Some(true));

        let explicit = ToastOptions { sound_asset: Some("dismiss".into()), ..ToastOptions::default() };
        let custom = factory().build("default", "x", explicit, epoch_plus(0));
        assert_eq!(custom.sound(), Some("/sounds/toastify/dismiss.mp3"));
        assert_eq!(custom.sound_volume(), Some(0.5));
    }

    #[test]
    fn test_sound_from_type_mapping() {
        // custom_notification has no sound.src of its own.
        let toast = factory().build("custom_notification", "x", ToastOptions::default(), epoch_plus(0));

        assert_eq!(toast.sound(), Some("/sounds/toastify/custom_alert.mp3"));
        assert_eq!(toast.sound_volume(), Some(0.7));
        assert_eq!(toast.sound_loop(), Some(true));
    }

    #[test]
    fn test_sound_mapping_wins_over_default_sound() {
        let f = factory_with(|v| v["sounds"]["types"]["default"] = json!("success"));
        let toast = f.build("default", "x", ToastOptions::default(), epoch_plus(0));

        assert_eq!(toast.sound(), Some("/sounds/toastify/success.mp3"));
        assert_eq!(toast.sound_volume(), Some(0.9));
    }

    #[test]
    fn test_unmapped_type_falls_back_to_default_sound() {
        let f = factory_with(|v| v["sounds"]["global"]["default_sound"] = json!("dismiss"));
        let toast = f.build("reminder", "x", ToastOptions::default(), epoch_plus(0));

        assert_eq!(toast.sound(), Some("/sounds/toastify/dismiss.mp3"));
        assert_eq!(toast.sound_volume(), Some(0.5));
        assert_eq!(toast.sound_loop(), Some(false));
    }

    #[test]
    fn test_missing_sound_asset_yields_no_sound() {
        let explicit = ToastOptions { sound_asset: Some("kazoo".into()), ..ToastOptions::default() };
        let toast = factory().build("default", "x", explicit, epoch_plus(0));

        assert!(toast.sound().is_none());
        assert!(toast.sound_volume().is_none());
    }

    #[test]
    fn test_sounds_disabled() {
        let f = factory_with(|v| v["sounds"]["global"]["enabled"] = json!(false));
        let toast = f.build("error", "x", ToastOptions::default(), epoch_plus(0));

        assert!(toast.sound().is_none());
    }

    #[test]
    fn test_sound_volume_is_clamped() {
        let f = factory_with(|v| v["sounds"]["assets"]["notification"]["volume"] = json!(3.5));
        let toast = f.build("default", "x", ToastOptions::default(), epoch_plus(0));

        assert_eq!(toast.sound_volume(), Some(1.0));
    }

    #[test]
    fn test_missing_animation_preset_falls_back_to_fade() {
        let options = ToastOptions { animation_preset: Some("wobble".into()), ..ToastOptions::default() };
        let toast = factory().build("info", "x", options, epoch_plus(0));

        assert_eq!(toast.animation().enter_from, "opacity-0");
        assert_eq!(toast.animation().enter_to, "opacity-100");
    }

    #[test]
    fn test_animation_preset_merges_over_globals() {
        let f = factory_with(|v| {
            v["animations"]["presets"]["minimal"] = json!({ "enter_from": "a", "enter_to": "b" });
            v["animations"]["global"]["default_enter_duration"] = json!(450);
        });
        let options = ToastOptions { animation_preset: Some("minimal".into()), ..ToastOptions::default() };
        let animation = f.build("info", "x", options, epoch_plus(0)).animation().clone();

        assert_eq!(animation.enter_duration, 450);
        assert_eq!(animation.leave_duration, 200);
        assert_eq!(animation.enter_easing, "ease-out");
        assert_eq!(animation.enter_transition_classes, "transition");
        assert_eq!(animation.enter_from, "a");
    }

    #[test]
    fn test_missing_layout_falls_back_to_default() {
        let options = ToastOptions { layout_preset: Some("poster".into()), ..ToastOptions::default() };
        let toast = factory().build("info", "x", options, epoch_plus(0));

        assert!(!toast.layout().contains_key("action_container_classes"));
        assert!(toast.layout().contains_key("wrapper_classes"));

        let f = factory_with(|v| v["types"]["layouts"] = json!({}));
        assert!(f.build("info", "x", ToastOptions::default(), epoch_plus(0)).layout().is_empty());
    }

    #[test]
    fn test_created_at_is_truncated_to_millis() {
        let now = epoch_plus(5) + time::Duration::nanoseconds(123_456);
        let toast = factory().build("info", "x", ToastOptions::default(), now);

        assert_eq!(toast.created_at(), epoch_plus(5));
    }

    #[test]
    fn test_web_path_trims_slashes() {
        assert_eq!(web_path("sounds/toastify/", "/error.mp3"), "/sounds/toastify/error.mp3");
        assert_eq!(web_path("", "ping.mp3"), "/ping.mp3");
    }

    #[test]
    fn test_custom_options_mapping() {
        let options = json!({ "type": "custom_notification", "duration": 100, "orderId": 7 });
        let (kind, parsed) = ToastOptions::from_custom(Some("Heads up"), options.as_object().unwrap().clone()).unwrap();

        assert_eq!(kind, "custom_notification");
        assert_eq!(parsed.duration, Some(100));
        assert_eq!(parsed.title.as_deref(), Some("Heads up"));

        let custom_data = parsed.custom_data.unwrap();
        assert_eq!(custom_data.get("orderId"), Some(&json!(7)));
        assert!(!custom_data.contains_key("type"));
    }

    #[test]
    fn test_custom_options_explicit_custom_data() {
        let options = json!({ "customData": { "a": 1 }, "b": 2 });
        let (kind, parsed) = ToastOptions::from_custom(None, options.as_object().unwrap().clone()).unwrap();

        assert_eq!(kind, "default");
        assert_eq!(Value::Object(parsed.custom_data.unwrap()), json!({ "a": 1 }));
    }

    #[test]
    fn test_custom_options_reject_wrong_shapes() {
        let bad_duration = json!({ "duration": "soon" });
        assert!(ToastOptions::from_custom(None, bad_duration.as_object().unwrap().clone()).is_err());

        let bad_type = json!({ "type": 3 });
        assert!(ToastOptions::from_custom(None, bad_type.as_object().unwrap().clone()).is_err());
    }
}
