/*
 * Responsibility
 * - /auth 系の request/response DTO
 * - validate() は形式チェックのみ (資格情報の正否は service 側)
 */
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::services::auth::{IssuedToken, Principal};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// Never print the password.
impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.username.trim().is_empty() {
            return Err("username is required");
        }
        if self.password.is_empty() {
            return Err("password is required");
        }
        if self.username.len() > 256 || self.password.len() > 1024 {
            return Err("credentials too long");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    /// Always "Bearer"
    pub token_type: &'static str,
    /// Seconds until expiry.
    pub expires_in: u64,
    pub username: String,
}

impl From<IssuedToken> for LoginResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            access_token: issued.access_token,
            token_type: issued.token_type,
            expires_in: issued.expires_in,
            username: issued.username,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PrincipalResponse {
    pub user_id: String,
    pub username: String,
    pub roles: BTreeSet<String>,
}

impl From<Principal> for PrincipalResponse {
    fn from(p: Principal) -> Self {
        Self {
            user_id: p.user_id,
            username: p.username,
            roles: p.roles,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<PrincipalResponse>,
}

#[derive(Deserialize)]
pub struct RevokeRequest {
    pub token: String,
}
