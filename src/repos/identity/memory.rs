use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::repos::error::RepoError;
use crate::repos::identity::store::{Identity, IdentityStore};

struct Account {
    identity: Identity,
    password_digest: [u8; 32],
}

/// In-process identity store for tests and local development.
///
/// Passwords are kept as SHA-256 digests; this is not a production password store.
#[derive(Default)]
pub struct MemoryIdentityStore {
    // username -> account
    accounts: RwLock<HashMap<String, Account>>,
}

impl std::fmt::Debug for MemoryIdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIdentityStore").finish_non_exhaustive()
    }
}

fn digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

// Compares every byte regardless of where the first difference is.
fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identity: Identity, password: &str) {
        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        accounts.insert(
            identity.username.clone(),
            Account {
                identity,
                password_digest: digest(password),
            },
        );
    }

    /// Returns `true` when an account was removed.
    pub fn remove(&self, username: &str) -> bool {
        self.accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(username)
            .is_some()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, RepoError> {
        let presented = digest(password);
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);

        let found = match accounts.get(username) {
            Some(account) if digests_match(&account.password_digest, &presented) => {
                Some(account.identity.clone())
            }
            Some(_) => None,
            None => {
                // same amount of work as a wrong password
                std::hint::black_box(digests_match(
                    std::hint::black_box(&digest("")),
                    &presented,
                ));
                None
            }
        };

        Ok(found)
    }

    async fn find_by_subject(&self, subject: &str) -> Result<Option<Identity>, RepoError> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        Ok(accounts
            .values()
            .find(|account| account.identity.id == subject)
            .map(|account| account.identity.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity {
            id: "u-1".into(),
            username: "alice".into(),
            roles: ["USER".to_string()].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn finds_by_credentials_and_subject() {
        let store = MemoryIdentityStore::new();
        store.insert(alice(), "s3cret");

        assert_eq!(
            store.find_by_credentials("alice", "s3cret").await.unwrap(),
            Some(alice())
        );
        assert_eq!(store.find_by_subject("u-1").await.unwrap(), Some(alice()));
        assert_eq!(store.find_by_subject("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let store = MemoryIdentityStore::new();
        store.insert(alice(), "s3cret");

        assert_eq!(store.find_by_credentials("alice", "nope").await.unwrap(), None);
        assert_eq!(store.find_by_credentials("bob", "s3cret").await.unwrap(), None);
    }

    #[tokio::test]
    async fn removed_account_no_longer_resolves() {
        let store = MemoryIdentityStore::new();
        store.insert(alice(), "s3cret");

        assert!(store.remove("alice"));
        assert!(!store.remove("alice"));
        assert_eq!(store.find_by_subject("u-1").await.unwrap(), None);
    }
}
