use crate::api::AppState;
use crate::error::AppError;
use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Request, request::Parts},
};
use tower_http::request_id::{MakeRequestId, RequestId};

const MAX_SESSION_ID_LEN: usize = 128;

/// The caller's session, taken from the configured session header.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

impl SessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_session_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SESSION_ID_LEN
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

impl FromRequestParts<AppState> for SessionId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(&state.session_header)
            .ok_or_else(|| AppError::BadRequest(format!("Missing {} header", state.session_header)))?;

        let value = header.to_str().map_err(|_| AppError::BadRequest("Invalid session id".into()))?.trim();
        if !is_valid_session_id(value) {
            return Err(AppError::BadRequest("Invalid session id".into()));
        }

        Ok(Self(value.to_string()))
    }
}

/// Keeps a caller-supplied `x-request-id`, otherwise generates a UUID.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeRequestUuidOrHeader;

impl MakeRequestId for MakeRequestUuidOrHeader {
    fn make_request_id<B>(&mut self, request: &Request<B>) -> Option<RequestId> {
        if let Some(existing) = request.headers().get("x-request-id")
            && !existing.is_empty()
        {
            return Some(RequestId::new(existing.clone()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}
