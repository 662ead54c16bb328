//! MA Furniture catalog server library.
//!
//! Serves the product catalog, sections, and session-backed carts as a JSON
//! REST API, plus uploaded product images. The binary in `main.rs` adds
//! Sentry, logging, and the listener around [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::Span;

use config::ServerConfig;
use middleware::request_id::REQUEST_ID_HEADER;
use state::AppState;

/// Build the application router with every layer except Sentry.
pub fn app(state: AppState, session_store: SqliteStore) -> Router {
    let session_layer = middleware::create_session_layer(session_store, state.config());
    let uploads = ServeDir::new(&state.config().upload_dir);

    Router::new()
        .merge(routes::routes())
        .nest_service("/uploads", uploads)
        .layer(session_layer)
        .layer(DefaultBodyLimit::max(state.config().max_body_bytes))
        .layer(cors_layer(state.config()))
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// CORS for the shop pages. Credentials are allowed so the session cookie
/// carrying the cart is sent cross-origin.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
}
