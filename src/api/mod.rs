use crate::services::{ContainerService, HealthService, ToastService};
use axum::body::Body;
use axum::http::{HeaderName, Request};
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod health;
pub mod middleware;
pub mod schemas;
pub mod toasts;

#[derive(Clone, Debug)]
pub struct AppState {
    pub toast_service: ToastService,
    pub container_service: ContainerService,
    pub session_header: HeaderName,
}

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub health_service: HealthService,
}

/// Configures and returns the toast API router.
pub fn app_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/toasts", get(toasts::list_toasts).post(toasts::create_toast).delete(toasts::clear_toasts))
        .route("/toasts/{id}", delete(toasts::dismiss_toast))
        .route("/container", get(toasts::container))
        .route("/container/navigate", post(toasts::navigate));

    Router::new()
        .nest("/v1", api_routes)
        .fallback(toasts::not_found)
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static("x-request-id")))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .map(|id| id.header_value().to_str().unwrap_or_default())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                        let status = response.status();
                        tracing::Span::current().record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(HeaderName::from_static("x-request-id"), middleware::MakeRequestUuidOrHeader))
        .with_state(state)
}

pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new().route("/livez", get(health::livez)).route("/readyz", get(health::readyz)).with_state(state)
}
