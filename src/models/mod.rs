//! Data models

mod blacklist;
mod entitlement;
mod interaction;
mod key;
mod panel;
mod session;

pub use blacklist::*;
pub use entitlement::*;
pub use interaction::*;
pub use key::*;
pub use panel::*;
pub use session::*;
