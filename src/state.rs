/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - codec / revocation registry / login / request gate
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::repos::identity::IdentityStore;
use crate::services::auth::{
    CredentialAuthenticator, RequestAuthenticator, RevocationRegistry, TokenCodec,
};

#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub revocations: Arc<dyn RevocationRegistry>,
    pub login: CredentialAuthenticator,
    pub gate: RequestAuthenticator,
}

impl AppState {
    pub fn new(
        codec: Arc<TokenCodec>,
        revocations: Arc<dyn RevocationRegistry>,
        identities: Arc<dyn IdentityStore>,
    ) -> Self {
        let login = CredentialAuthenticator::new(codec.clone(), identities.clone());
        let gate = RequestAuthenticator::new(codec.clone(), revocations.clone(), identities);
        Self {
            codec,
            revocations,
            login,
            gate,
        }
    }
}
