use crate::domain::toast::Toast;
use crate::error::Result;
use crate::services::toast_service::ToastService;
use crate::settings::ToastSettings;
use serde::Serialize;

/// Display settings a frontend needs to render the toast container.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSettings {
    pub position: String,
    pub mobile_position: String,
    pub max_width: String,
    pub mobile_max_width: String,
    pub reverse_order: bool,
    pub pause_on_window_blur: bool,
    pub allow_swipe_to_dismiss: bool,
    pub sound_throttle_ms: u64,
    pub enable_js_hooks: bool,
    pub close_button_aria_label: String,
    pub progress_bar_height: String,
}

impl ContainerSettings {
    #[must_use]
    pub fn from_settings(settings: &ToastSettings) -> Self {
        let display = &settings.display;
        let behavior = &settings.behavior;
        let position = display.position.clone().unwrap_or_else(|| "bottom-right".into());
        let max_width = display.max_width.clone().unwrap_or_else(|| "max-w-md".into());

        Self {
            mobile_position: display.mobile_position.clone().unwrap_or_else(|| position.clone()),
            mobile_max_width: display.mobile_max_width.clone().unwrap_or_else(|| max_width.clone()),
            position,
            max_width,
            reverse_order: behavior.reverse_order_on_stack,
            pause_on_window_blur: behavior.pause_on_window_blur,
            allow_swipe_to_dismiss: behavior.allow_swipe_to_dismiss,
            sound_throttle_ms: settings.sounds.global.throttle_ms.unwrap_or(0),
            enable_js_hooks: settings.animations.global.enable_js_hooks_globally,
            close_button_aria_label: settings
                .close_button
                .aria_label
                .clone()
                .unwrap_or_else(|| "Close notification".into()),
            progress_bar_height: settings.progress_bar.height.clone().unwrap_or_else(|| "h-1".into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerSnapshot {
    pub toasts: Vec<Toast>,
    pub settings: ContainerSettings,
}

/// Frontend-facing view over a session's queue.
#[derive(Clone, Debug)]
pub struct ContainerService {
    toasts: ToastService,
    settings: ContainerSettings,
    clear_on_navigate: bool,
}

impl ContainerService {
    #[must_use]
    pub fn new(toasts: ToastService) -> Self {
        let settings = ContainerSettings::from_settings(toasts.settings());
        let clear_on_navigate = toasts.settings().behavior.clear_all_on_navigate;
        Self { toasts, settings, clear_on_navigate }
    }

    /// # Errors
    /// Returns `AppError::Store` if the session cannot be read.
    pub async fn snapshot(&self, session_id: &str) -> Result<ContainerSnapshot> {
        let toasts = self.toasts.get(session_id).await?;
        Ok(ContainerSnapshot { toasts, settings: self.settings.clone() })
    }

    /// Handles a page navigation: clears the session when configured to, then refreshes.
    ///
    /// # Errors
    /// Returns `AppError::Store` if the session cannot be read or written.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn navigate(&self, session_id: &str) -> Result<ContainerSnapshot> {
        if self.clear_on_navigate {
            self.toasts.clear(session_id).await?;
        }
        self.snapshot(session_id).await
    }

    /// Dismisses one toast and returns the refreshed container.
    ///
    /// # Errors
    /// Returns `AppError::Store` if the session cannot be read or written.
    pub async fn dismiss(&self, session_id: &str, id: &str) -> Result<ContainerSnapshot> {
        self.toasts.dismiss(session_id, id).await?;
        self.snapshot(session_id).await
    }
}
