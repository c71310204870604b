use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::services::auth::revocation::registry::{
    RevocationError, RevocationRegistry, fingerprint,
};

/// In-process revocation set, keyed by token fingerprint and indexed by expiry.
///
/// Memory is bounded by the number of revoked tokens that are still verifiable:
/// entries past `exp + grace` are dropped lazily on lookup and by [`sweep_at`](Self::sweep_at).
/// Contents do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryRevocationRegistry {
    // fingerprint -> exp (unix seconds)
    entries: RwLock<HashMap<String, i64>>,
    grace_seconds: i64,
}

impl MemoryRevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `grace_seconds` must be at least the token verification leeway.
    pub fn with_grace(grace_seconds: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            grace_seconds: i64::try_from(grace_seconds).unwrap_or(i64::MAX),
        }
    }

    fn evictable(&self, exp: i64, now: i64) -> bool {
        exp.saturating_add(self.grace_seconds) <= now
    }

    pub fn revoke_at(&self, token: &str, expires_at: DateTime<Utc>) {
        let exp = expires_at.timestamp();
        // A poisoned lock still holds a consistent map: every write below is a single insert/remove.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(fingerprint(token))
            .and_modify(|current| *current = (*current).max(exp))
            .or_insert(exp);
    }

    pub fn is_revoked_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        let key = fingerprint(token);
        let now = now.timestamp();

        let exp = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(&key) {
                Some(exp) => *exp,
                None => return false,
            }
        };

        if !self.evictable(exp, now) {
            return true;
        }

        // Lazy eviction. Re-check under the write lock: a concurrent revoke may have extended it.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&key) {
            Some(exp) if self.evictable(*exp, now) => {
                entries.remove(&key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let now = now.timestamp();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, exp| !self.evictable(*exp, now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationRegistry for MemoryRevocationRegistry {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), RevocationError> {
        self.revoke_at(token, expires_at);
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, RevocationError> {
        Ok(self.is_revoked_at(token, Utc::now()))
    }

    async fn sweep(&self) -> Result<usize, RevocationError> {
        Ok(self.sweep_at(Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use chrono::Duration;

    use super::*;

    fn in_one_hour() -> DateTime<Utc> {
        Utc::now() + Duration::hours(1)
    }

    #[tokio::test]
    async fn revoked_token_is_reported() {
        let registry = MemoryRevocationRegistry::new();
        assert!(!registry.is_revoked("t1").await.unwrap());

        registry.revoke("t1", in_one_hour()).await.unwrap();

        assert!(registry.is_revoked("t1").await.unwrap());
        assert!(!registry.is_revoked("t2").await.unwrap());
    }

    #[tokio::test]
    async fn revoking_twice_is_a_no_op() {
        let registry = MemoryRevocationRegistry::new();
        registry.revoke("t1", in_one_hour()).await.unwrap();
        registry.revoke("t1", in_one_hour()).await.unwrap();

        assert!(registry.is_revoked("t1").await.unwrap());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn entries_survive_until_expiry_plus_grace() {
        let registry = MemoryRevocationRegistry::with_grace(30);
        let now = Utc::now();
        let exp = now + Duration::seconds(60);
        registry.revoke_at("t1", exp);

        assert!(registry.is_revoked_at("t1", now));
        assert!(registry.is_revoked_at("t1", exp));
        assert!(registry.is_revoked_at("t1", exp + Duration::seconds(29)));
        assert_eq!(registry.len(), 1);

        assert!(!registry.is_revoked_at("t1", exp + Duration::seconds(30)));
        assert!(registry.is_empty());
    }

    #[test]
    fn sweep_only_drops_expired_entries() {
        let registry = MemoryRevocationRegistry::new();
        let now = Utc::now();
        registry.revoke_at("old", now - Duration::seconds(1));
        registry.revoke_at("live", now + Duration::seconds(60));

        assert_eq!(registry.sweep_at(now), 1);
        assert!(registry.is_revoked_at("live", now));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn re_revoking_keeps_the_later_expiry() {
        let registry = MemoryRevocationRegistry::new();
        let now = Utc::now();
        registry.revoke_at("t1", now + Duration::seconds(60));
        registry.revoke_at("t1", now + Duration::seconds(10));

        assert!(registry.is_revoked_at("t1", now + Duration::seconds(30)));
    }

    #[test]
    fn concurrent_readers_see_every_revocation() {
        let registry = Arc::new(MemoryRevocationRegistry::new());
        let exp = in_one_hour();
        let tokens: Vec<String> = (0..200).map(|i| format!("token-{i}")).collect();
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let tokens = tokens.clone();
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    while !done.load(Ordering::Acquire) {
                        for token in &tokens {
                            registry.is_revoked_at(token, Utc::now());
                        }
                    }
                })
            })
            .collect();

        let writer = {
            let registry = Arc::clone(&registry);
            let tokens = tokens.clone();
            thread::spawn(move || {
                for token in &tokens {
                    registry.revoke_at(token, exp);
                    // visible to this thread as soon as revoke returns
                    assert!(registry.is_revoked_at(token, Utc::now()));
                }
            })
        };

        writer.join().unwrap();
        done.store(true, Ordering::Release);
        for reader in readers {
            reader.join().unwrap();
        }

        let checks: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let tokens = tokens.clone();
                thread::spawn(move || tokens.iter().all(|t| registry.is_revoked_at(t, Utc::now())))
            })
            .collect();
        for check in checks {
            assert!(check.join().unwrap());
        }
        assert_eq!(registry.len(), tokens.len());
    }
}
