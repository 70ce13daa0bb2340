//! Middleware components
//!
//! This module contains middleware for:
//! - Ingress signature verification (HMAC-SHA256)

pub mod signature;

pub use signature::{sign, signature_middleware, verify_signature, SIGNATURE_HEADER};
