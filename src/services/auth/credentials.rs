use std::sync::Arc;

use tracing::{debug, info};

use crate::repos::identity::IdentityStore;
use crate::services::auth::error::AuthError;
use crate::services::auth::token_codec::TokenCodec;

/// Service-level result of a successful login.
///
/// Handlers map this into the HTTP DTO.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user_id: String,
    pub username: String,
}

/// Username/password login.
#[derive(Clone)]
pub struct CredentialAuthenticator {
    codec: Arc<TokenCodec>,
    identities: Arc<dyn IdentityStore>,
}

impl CredentialAuthenticator {
    pub fn new(codec: Arc<TokenCodec>, identities: Arc<dyn IdentityStore>) -> Self {
        Self { codec, identities }
    }

    /// Verify the pair with the identity store and issue a token for the resolved identity.
    ///
    /// An unknown username and a wrong password both yield `AuthError::InvalidCredentials`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedToken, AuthError> {
        let Some(identity) = self
            .identities
            .find_by_credentials(username, password)
            .await?
        else {
            debug!(username = %username, "login rejected: credentials did not match");
            return Err(AuthError::InvalidCredentials);
        };

        let ttl = self.codec.ttl_seconds();
        let access_token = self.codec.issue(&identity.id, &identity.roles, ttl)?;

        info!(user_id = %identity.id, "token issued");

        Ok(IssuedToken {
            access_token,
            token_type: "Bearer",
            expires_in: ttl,
            user_id: identity.id,
            username: identity.username,
        })
    }
}
