//! Business logic services

pub mod authority;
pub mod entitlements;
pub mod keys;
pub mod locks;
pub mod panel;
pub mod sessions;

pub use authority::AuthorityService;
pub use entitlements::EntitlementService;
pub use keys::KeyService;
pub use locks::UserLocks;
pub use panel::PanelService;
pub use sessions::SessionService;
