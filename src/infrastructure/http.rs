//! HTTP transport for the request counter.
//!
//! Routes:
//! - `GET /counter` records the request and returns the count of the requests
//!   before it in the current window, wrapped in a `data` envelope.
//! - `GET /health-check` returns a fixed plain text message.
//!
//! Failures are logged with their cause and answered with a generic error
//! body; internal details never reach the client.

use crate::application::ports::RequestCounter;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Error code reported for every internal failure.
pub const INTERNAL_ERROR_CODE: &str = "1001";

/// Response body wrapper, serialized as `{"data": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Body returned when a request could not be served.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error_code: &'static str,
    pub error_message: &'static str,
}

impl ErrorBody {
    fn internal() -> Self {
        Self {
            error_code: INTERNAL_ERROR_CODE,
            error_message: "internal error",
        }
    }
}

#[derive(Clone)]
struct HttpState {
    counter: Arc<dyn RequestCounter>,
    health_message: Arc<str>,
}

/// Build the router serving the counter and the health check.
pub fn router(counter: Arc<dyn RequestCounter>, health_message: &str) -> Router {
    let state = HttpState {
        counter,
        health_message: Arc::from(health_message),
    };

    Router::new()
        .route(
            "/counter",
            get(count_request).fallback(unsupported_method),
        )
        .route("/health-check", any(health))
        .with_state(state)
}

async fn count_request(State(state): State<HttpState>) -> Response {
    match state.counter.request_count() {
        Ok(count) => (StatusCode::OK, Json(Envelope { data: count })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to count request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope {
                    data: ErrorBody::internal(),
                }),
            )
                .into_response()
        }
    }
}

async fn unsupported_method() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "unsupported http method")
}

async fn health(State(state): State<HttpState>) -> String {
    state.health_message.to_string()
}
