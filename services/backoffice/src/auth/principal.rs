//! Caller identity forwarded by the upstream auth gateway.
//!
//! # Purpose
//! Reads the broker id and role from request headers. The back office does no
//! authorization beyond scoping every query and write to the caller id.
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Broker,
    Support,
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "broker" | "corretor" => Ok(Role::Broker),
            "support" | "suporte" => Ok(Role::Support),
            other => Err(IdentityError::UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("missing caller identity")]
    Missing,
    #[error("malformed identity header")]
    Malformed,
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, IdentityError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .ok_or(IdentityError::Missing)?
        .to_str()
        .map_err(|_| IdentityError::Malformed)?
        .trim();
    if user_id.is_empty() {
        return Err(IdentityError::Missing);
    }
    let role = match headers.get(USER_ROLE_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| IdentityError::Malformed)?
            .parse()?,
        None => Role::default(),
    };
    Ok(Caller {
        user_id: user_id.to_string(),
        role,
    })
}
