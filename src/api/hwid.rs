//! HWID binding endpoint used by the script loader backend

use axum::{body::Bytes, extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::AppResult;
use crate::AppState;

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct BindHwidRequest {
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    #[validate(length(min = 1, max = 128))]
    pub hwid: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BindHwidResponse {
    pub user_id: String,
    pub hwid: String,
    pub expires_at: DateTime<Utc>,
}

pub(super) async fn bind_hwid(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<BindHwidResponse>> {
    let req: BindHwidRequest = serde_json::from_slice(&body)?;
    req.validate()?;

    let entitlement = state.entitlements().bind_hwid(&req.user_id, &req.hwid).await?;

    Ok(Json(BindHwidResponse {
        user_id: entitlement.user_id,
        hwid: req.hwid,
        expires_at: entitlement.expires_at,
    }))
}
