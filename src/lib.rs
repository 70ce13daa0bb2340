//! Keygate Library
//!
//! Core of a licensing/whitelist chat bot: API-key login, redeemable access
//! keys, time-bounded entitlements, blacklists and HWID binding.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod platform;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
use platform::ChatPlatform;
use services::{
    AuthorityService, EntitlementService, KeyService, PanelService, SessionService, UserLocks,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Outbound chat platform
    pub platform: Arc<dyn ChatPlatform>,
    /// Per-user mutation locks
    pub locks: UserLocks,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool, platform: Arc<dyn ChatPlatform>) -> Self {
        Self {
            config,
            db,
            platform,
            locks: UserLocks::new(),
        }
    }

    pub fn keys(&self) -> KeyService {
        KeyService::new(self.db.clone(), self.config.bot.clone(), self.locks.clone())
    }

    pub fn entitlements(&self) -> EntitlementService {
        EntitlementService::new(self.db.clone(), self.config.bot.clone(), self.locks.clone())
    }

    pub fn sessions(&self) -> SessionService {
        SessionService::new(self.db.clone(), self.locks.clone())
    }

    pub fn authority(&self) -> AuthorityService {
        AuthorityService::new(self.db.clone(), self.config.bot.primary_owner_id.clone())
    }

    pub fn panel(&self) -> PanelService {
        PanelService::new(
            self.db.clone(),
            self.config.bot.default_script_template.clone(),
        )
    }
}
