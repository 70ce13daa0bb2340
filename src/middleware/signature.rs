//! Request signature verification
//!
//! The gateway relay signs every request body with HMAC-SHA256 using the
//! shared `ingress.signing_secret` and sends the digest as
//! `X-Keygate-Signature: sha256=<hex>`.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

use crate::utils::error::ErrorResponse;
use crate::AppState;

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "X-Keygate-Signature";

/// Largest body the ingress will buffer for verification
const MAX_BODY_BYTES: usize = 256 * 1024;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Missing signature header")]
    Missing,
    #[error("Invalid signature")]
    Invalid,
    #[error("Request body too large or unreadable")]
    Body,
}

impl IntoResponse for SignatureError {
    fn into_response(self) -> Response {
        let status = match self {
            SignatureError::Missing | SignatureError::Invalid => StatusCode::UNAUTHORIZED,
            SignatureError::Body => StatusCode::PAYLOAD_TOO_LARGE,
        };
        let body = ErrorResponse::new("invalid_signature", self.to_string());
        (status, Json(body)).into_response()
    }
}

/// `sha256=<hex>` signature of `payload`
pub fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        // HMAC accepts keys of any length
        Err(_) => return String::new(),
    };
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a `sha256=<hex>` signature
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let signature = match signature.strip_prefix("sha256=") {
        Some(s) => s,
        None => return false,
    };

    let signature_bytes = match hex::decode(signature) {
        Ok(b) => b,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };

    mac.update(payload);
    mac.verify_slice(&signature_bytes).is_ok()
}

/// Reject requests whose body does not match the signature header
pub async fn signature_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, SignatureError> {
    let (parts, body) = request.into_parts();

    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::Missing)?
        .to_string();

    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| SignatureError::Body)?;

    if !verify_signature(&state.config.ingress.signing_secret, &bytes, &signature) {
        warn!(path = %parts.uri.path(), "Rejected request with bad signature");
        return Err(SignatureError::Invalid);
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}
