//! Interaction ingress

use axum::{body::Bytes, extract::State, Json};

use crate::handlers::handle_event;
use crate::models::{InboundEvent, Reply};
use crate::utils::AppResult;
use crate::AppState;

/// Run one relayed interaction and return the reply to render.
///
/// Domain failures come back as a 200 with an error reply; only a malformed
/// body is an HTTP error.
pub(super) async fn handle_interaction(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<Reply>> {
    let event: InboundEvent = serde_json::from_slice(&body)?;
    Ok(Json(handle_event(&state, event).await))
}
