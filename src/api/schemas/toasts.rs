use crate::domain::toast::Toast;
use crate::services::ToastOptions;
use serde::{Deserialize, Serialize};

fn default_kind() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateToastRequest {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(alias = "text")]
    pub message: String,
    #[serde(flatten)]
    pub options: ToastOptions,
}

#[derive(Debug, Serialize)]
pub struct ToastListResponse {
    pub toasts: Vec<Toast>,
}
