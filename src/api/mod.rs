//! API routes and handlers
//!
//! This module defines all HTTP endpoints and their routing.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::{middleware, AppState};

mod health;
mod hwid;
mod interactions;

pub use health::{DatabaseProbe, PlatformMode, Readiness};
pub use hwid::{BindHwidRequest, BindHwidResponse};

/// Public API routes (no signature required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::readiness))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
}

/// Routes called by the gateway relay; the body must carry a valid signature
pub fn signed_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/interactions", post(interactions::handle_interaction))
        .route("/hwid/bind", post(hwid::bind_hwid))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::signature_middleware,
        ))
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .nest("/api/v1", public_routes())
        .nest("/api/v1", signed_routes(state.clone()))
        .layer(trace_layer)
        .with_state(state)
}
