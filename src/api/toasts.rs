use crate::api::AppState;
use crate::api::middleware::SessionId;
use crate::api::schemas::toasts::{CreateToastRequest, ToastListResponse};
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

/// Lists the toasts to display for the session, in display order.
///
/// # Errors
/// Returns `AppError::Store` if the session cannot be read.
pub async fn list_toasts(session: SessionId, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let toasts = state.toast_service.get(session.as_str()).await?;
    Ok(Json(ToastListResponse { toasts }))
}

/// Queues a new toast for the session.
///
/// # Errors
/// Returns `AppError::BadRequest` if the body is not a valid toast request.
/// Returns `AppError::Store` if the session cannot be written.
pub async fn create_toast(
    session: SessionId,
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateToastRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload?;
    let toast = state.toast_service.add(session.as_str(), &payload.kind, &payload.message, payload.options).await?;
    Ok((StatusCode::CREATED, Json(toast)))
}

/// # Errors
/// Returns `AppError::Store` if the session cannot be written.
pub async fn clear_toasts(session: SessionId, State(state): State<AppState>) -> Result<impl IntoResponse> {
    state.toast_service.clear(session.as_str()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Dismisses one toast. Unknown ids succeed without effect.
///
/// # Errors
/// Returns `AppError::Store` if the session cannot be read or written.
pub async fn dismiss_toast(
    session: SessionId,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.toast_service.dismiss(session.as_str(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
/// Returns `AppError::Store` if the session cannot be read.
pub async fn container(session: SessionId, State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.container_service.snapshot(session.as_str()).await?))
}

/// # Errors
/// Returns `AppError::Store` if the session cannot be read or written.
pub async fn navigate(session: SessionId, State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.container_service.navigate(session.as_str()).await?))
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}
