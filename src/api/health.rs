//! Liveness and readiness probes

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::{db, AppState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum DatabaseProbe {
    Up,
    Down(String),
}

/// Whether deliveries can reach the chat platform at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformMode {
    Configured,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    pub version: String,
    pub database: DatabaseProbe,
    pub platform: PlatformMode,
}

impl Readiness {
    /// Only the database gates readiness; a disabled platform fails
    /// deliveries, not mutations.
    pub fn new(database: DatabaseProbe, platform: PlatformMode) -> Self {
        Self {
            ready: database == DatabaseProbe::Up,
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            platform,
        }
    }

    fn status_code(&self) -> StatusCode {
        if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// 200 with a [`Readiness`] body once the database answers, 503 otherwise
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let database = match db::ping(&state.db).await {
        Ok(()) => DatabaseProbe::Up,
        Err(e) => DatabaseProbe::Down(format!("{:#}", e)),
    };
    let platform = match state.config.platform {
        Some(_) => PlatformMode::Configured,
        None => PlatformMode::Disabled,
    };

    let report = Readiness::new(database, platform);
    (report.status_code(), Json(report))
}
