use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::services::auth::revocation::registry::{
    RevocationError, RevocationRegistry, fingerprint,
};
use crate::services::cache::{CacheClient, ValkeyClient};

/// Valkey-backed revocation registry (Redis protocol).
///
/// Each entry is written with `EX` set to the token's remaining lifetime plus grace,
/// so the server evicts it once the token can no longer verify. Survives restarts
/// and is shared by every instance pointing at the same Valkey.
#[derive(Clone)]
pub struct ValkeyRevocationRegistry<C: CacheClient> {
    cache: Arc<C>,
    // Optional key prefix to avoid collisions across environments
    prefix: String,
    grace_seconds: i64,
}

impl ValkeyRevocationRegistry<ValkeyClient> {
    pub async fn connect(redis_url: &str, grace_seconds: u64) -> Result<Self, RevocationError> {
        let client = ValkeyClient::new(redis_url).await?;
        Ok(Self::new_with_cache(
            Arc::new(client),
            "auth:revoked",
            grace_seconds,
        ))
    }
}

impl<C: CacheClient> ValkeyRevocationRegistry<C> {
    pub fn new_with_cache(cache: Arc<C>, prefix: impl Into<String>, grace_seconds: u64) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            grace_seconds: i64::try_from(grace_seconds).unwrap_or(i64::MAX),
        }
    }

    pub fn key(&self, token: &str) -> String {
        format!("{}:{}", self.prefix, fingerprint(token))
    }

    pub async fn revoke_at(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), RevocationError> {
        let remaining = expires_at
            .timestamp()
            .saturating_add(self.grace_seconds)
            .saturating_sub(now.timestamp());

        // Already unverifiable: nothing to remember.
        let Ok(remaining) = u64::try_from(remaining) else {
            return Ok(());
        };
        if remaining == 0 {
            return Ok(());
        }

        // NX keeps the call idempotent; an existing entry already covers the same token.
        self.cache
            .set_if_absent_with_ttl(
                &self.key(token),
                &expires_at.timestamp().to_string(),
                Duration::from_secs(remaining),
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl<C: CacheClient> RevocationRegistry for ValkeyRevocationRegistry<C> {
    fn backend_name(&self) -> &'static str {
        self.cache.backend_name()
    }

    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), RevocationError> {
        self.revoke_at(token, expires_at, Utc::now()).await
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, RevocationError> {
        Ok(self.cache.exists(&self.key(token)).await?)
    }
}
