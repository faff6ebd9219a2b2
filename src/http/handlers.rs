//! Axum HTTP handlers for the web server
//!
//! Provides the JSON-RPC endpoint at `/`, the CORS preflight response, and
//! general metadata endpoints.

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::errors::{INVALID_REQUEST, PARSE_ERROR};
use crate::mcp::rpc::json_rpc_error;
use crate::mcp::server::Outcome;
use crate::AppState;

pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: String,
    pub version: String,
    pub transport: &'static str,
    pub mcp_endpoint: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    let identity = state.dispatcher.identity();
    Json(DiscoveryResponse {
        name: identity.name.clone(),
        version: identity.version.clone(),
        transport: "http",
        mcp_endpoint: "/",
    })
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn cors_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

pub async fn rpc_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "rejecting undecodable request body");
            return (
                StatusCode::OK,
                Json(json_rpc_error(None, PARSE_ERROR, "Parse error")),
            )
                .into_response();
        }
    };

    if !payload.is_object() {
        return (
            StatusCode::OK,
            Json(json_rpc_error(None, INVALID_REQUEST, "Invalid Request")),
        )
            .into_response();
    }

    match state.dispatcher.handle_value(payload).await {
        Outcome::Respond(response) => (StatusCode::OK, Json(response)).into_response(),
        Outcome::Silent => StatusCode::NO_CONTENT.into_response(),
        Outcome::Shutdown => {
            state.shutdown.notify_one();
            StatusCode::NO_CONTENT.into_response()
        }
    }
}
