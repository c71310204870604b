use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::repos::error::RepoError;

/// A known account, as far as authentication is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable identifier. Used as the token subject.
    pub id: String,
    pub username: String,
    pub roles: BTreeSet<String>,
}

/// Identity lookup owned by the persistence layer.
///
/// How passwords are stored and compared is the implementation's business.
/// `find_by_credentials` must answer `Ok(None)` both for an unknown username and for a
/// wrong password, and should take comparable time for the two.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, RepoError>;

    async fn find_by_subject(&self, subject: &str) -> Result<Option<Identity>, RepoError>;
}
