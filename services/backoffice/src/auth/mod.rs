//! Back-office request authentication.
//!
//! # Purpose
//! Resolves the caller identity set by the upstream gateway and checks the
//! shared token on the internal listener.
pub mod principal;

use crate::api::error::{ApiError, api_internal_message, api_unauthorized};
use axum::http::HeaderMap;
pub use principal::{
    Caller, IdentityError, Role, USER_ID_HEADER, USER_ROLE_HEADER, caller_from_headers,
};

pub const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

pub fn require_caller(headers: &HeaderMap) -> Result<Caller, ApiError> {
    caller_from_headers(headers).map_err(|err| api_unauthorized(&err.to_string()))
}

pub fn require_internal_token(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    let token = match headers.get(INTERNAL_TOKEN_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| api_unauthorized("invalid internal token"))?,
        None => return Err(api_unauthorized("missing internal token")),
    };
    let expected = expected.ok_or_else(|| api_internal_message("internal token not configured"))?;
    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        return Err(api_unauthorized("invalid internal token"));
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}
