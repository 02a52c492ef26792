//! Caller identity extraction.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::Identity;

use crate::error::ApiError;

/// Header carrying the authenticated caller's identity.
pub const CALLER_HEADER: &str = "x-caller-identity";

/// The identity a request acts on behalf of.
///
/// Authentication happens upstream; the registry trusts the
/// `x-caller-identity` header it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| ApiError::Unauthenticated(format!("missing {CALLER_HEADER} header")))?;

        let text = value
            .to_str()
            .map_err(|_| ApiError::BadRequest(format!("{CALLER_HEADER} is not valid text")))?;

        let identity = text
            .trim()
            .parse::<Identity>()
            .map_err(|e| ApiError::BadRequest(format!("Invalid {CALLER_HEADER}: {e}")))?;

        Ok(Caller(identity))
    }
}
