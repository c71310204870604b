use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::auth::revocation::RevocationError;

/// Failures of the token codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Bad signing key or unsignable claims. A configuration fault, not a client error.
    #[error("token encoding failed: {0}")]
    Encoding(String),
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

/// Failures of login and per-request verification.
///
/// The variants exist for server-side logs. Callers outside this module only ever
/// see a generic unauthorized outcome for them (see `AppError`).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("token revoked")]
    Revoked,

    #[error("token subject no longer resolves to an identity")]
    UnknownSubject,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("revocation registry failure: {0}")]
    Revocation(#[from] RevocationError),

    #[error("identity lookup failure: {0}")]
    Identity(#[from] RepoError),
}
