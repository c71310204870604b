use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::services::cache::CacheError;

/// Tokens invalidated before their natural expiry.
///
/// - `is_revoked(t)` is `true` once `revoke(t, ..)` has returned, for every caller.
/// - An entry may disappear only after the token's `expires_at` (plus the verification
///   leeway the registry was built with). Dropping it earlier would un-revoke the token.
/// - `Err(_)` is a backend failure; the request path treats it as a rejection (fail-closed).
#[async_trait]
pub trait RevocationRegistry: Send + Sync {
    // Backend name for logging.
    fn backend_name(&self) -> &'static str;

    // Idempotent: revoking an already revoked token succeeds.
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), RevocationError>;

    async fn is_revoked(&self, token: &str) -> Result<bool, RevocationError>;

    // Drop entries whose tokens can no longer verify. Returns how many were dropped.
    // Backends that expire entries on their own keep the default.
    async fn sweep(&self) -> Result<usize, RevocationError> {
        Ok(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Registry key for a raw token: base64url(SHA-256(token)).
///
/// Raw tokens are bearer credentials, so they are never stored or logged as-is.
pub fn fingerprint(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_distinct() {
        assert_eq!(fingerprint("a.b.c"), fingerprint("a.b.c"));
        assert_ne!(fingerprint("a.b.c"), fingerprint("a.b.d"));
        // 32 bytes → 43 chars without padding
        assert_eq!(fingerprint("a.b.c").len(), 43);
    }
}
