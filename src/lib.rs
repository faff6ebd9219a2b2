use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::sync::Notify;

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;

use mcp::server::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub shutdown: Arc<Notify>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            shutdown: Arc::new(Notify::new()),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            post(http::handlers::rpc_endpoint)
                .get(http::handlers::discovery)
                .options(http::handlers::preflight),
        )
        .route("/health", get(http::handlers::health))
        .layer(middleware::from_fn(http::handlers::cors_headers))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
