//! Per-request authentication.
//!
//! NoToken → Anonymous
//! TokenPresent → decode fails → Rejected
//! TokenValid → revoked (or registry failure) → Rejected
//! IdentityResolved → subject unknown (or lookup failure) → Rejected
//! otherwise → Bound
//!
//! Every rejection looks the same to the client. The reason is only logged.

use std::sync::Arc;

use axum::http::{HeaderMap, header};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::repos::identity::IdentityStore;
use crate::services::auth::context::Principal;
use crate::services::auth::error::AuthError;
use crate::services::auth::revocation::RevocationRegistry;
use crate::services::auth::token_codec::TokenCodec;

/// The verified bearer token of a bound request. Logout revokes exactly this token.
#[derive(Clone, Debug)]
pub struct BearerCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub jti: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Authenticated {
    pub principal: Principal,
    pub credential: BearerCredential,
}

#[derive(Clone, Debug)]
pub enum AuthOutcome {
    /// No usable bearer credential. Not a failure.
    Anonymous,
    Bound(Authenticated),
    /// Terminal. The request must not reach any handler.
    Rejected,
}

/// Extract `<token>` from `Authorization: Bearer <token>`.
///
/// Anything else (missing header, other scheme, empty token, non-ASCII bytes)
/// counts as no credential at all.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[derive(Clone)]
pub struct RequestAuthenticator {
    codec: Arc<TokenCodec>,
    revocations: Arc<dyn RevocationRegistry>,
    identities: Arc<dyn IdentityStore>,
}

impl RequestAuthenticator {
    pub fn new(
        codec: Arc<TokenCodec>,
        revocations: Arc<dyn RevocationRegistry>,
        identities: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            codec,
            revocations,
            identities,
        }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let Some(token) = bearer_token(headers) else {
            return AuthOutcome::Anonymous;
        };

        match self.verify(token).await {
            Ok(authenticated) => AuthOutcome::Bound(authenticated),
            Err(err) => {
                match &err {
                    AuthError::Revocation(_) | AuthError::Identity(_) => {
                        warn!(error = ?err, "bearer verification backend failure")
                    }
                    _ => debug!(error = %err, "bearer token rejected"),
                }
                AuthOutcome::Rejected
            }
        }
    }

    /// Decode, check revocation, resolve the subject. Detailed errors, for logging only.
    pub async fn verify(&self, token: &str) -> Result<Authenticated, AuthError> {
        let claims = self.codec.decode(token)?;

        if self.revocations.is_revoked(token).await? {
            return Err(AuthError::Revoked);
        }

        let identity = self
            .identities
            .find_by_subject(&claims.sub)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        let expires_at = claims.expires_at();
        Ok(Authenticated {
            principal: Principal::from(identity),
            credential: BearerCredential {
                token: token.to_string(),
                expires_at,
                jti: claims.jti,
            },
        })
    }
}
