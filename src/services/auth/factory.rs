//! Factory: build the token codec and the revocation registry from application `Config`.
use std::sync::Arc;

use tracing::info;

use crate::config::{Config, RevocationBackend};
use crate::services::auth::error::TokenError;
use crate::services::auth::revocation::{
    MemoryRevocationRegistry, RevocationError, RevocationRegistry, ValkeyRevocationRegistry,
};
use crate::services::auth::token_codec::TokenCodec;

pub fn build_token_codec(config: &Config) -> Result<Arc<TokenCodec>, TokenError> {
    let codec = TokenCodec::new(
        &config.jwt_secret,
        config.access_token_ttl_seconds,
        config.access_token_leeway_seconds,
    )?;
    Ok(Arc::new(codec))
}

/// Entries are kept for the verification leeway past expiry, so a revoked token never
/// becomes valid again inside the leeway window.
pub async fn build_revocation_registry(
    config: &Config,
) -> Result<Arc<dyn RevocationRegistry>, RevocationError> {
    let grace = config.access_token_leeway_seconds;

    let registry: Arc<dyn RevocationRegistry> = match &config.revocation_backend {
        RevocationBackend::Memory => Arc::new(MemoryRevocationRegistry::with_grace(grace)),
        RevocationBackend::Valkey { url } => {
            Arc::new(ValkeyRevocationRegistry::connect(url, grace).await?)
        }
    };

    info!(backend = registry.backend_name(), "revocation registry ready");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{Duration, Utc};

    use super::*;

    fn config(overrides: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = [
            ("DATABASE_URL", "postgres://localhost/market"),
            ("JWT_SECRET", "a2tra2tra2tra2tra2tra2tra2tra2tra2tra2tra2s="),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in overrides {
            vars.insert(k.to_string(), v.to_string());
        }
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn codec_takes_ttl_and_leeway_from_config() {
        let codec = build_token_codec(&config(&[
            ("ACCESS_TOKEN_TTL_SECONDS", "120"),
            ("ACCESS_TOKEN_LEEWAY_SECONDS", "5"),
        ]))
        .unwrap();

        assert_eq!(codec.ttl_seconds(), 120);
        assert_eq!(codec.leeway_seconds(), 5);
    }

    #[test]
    fn short_secret_fails_startup() {
        // 16 bytes
        let err = build_token_codec(&config(&[("JWT_SECRET", "MDEyMzQ1Njc4OWFiY2RlZg==")]))
            .unwrap_err();
        assert!(matches!(err, TokenError::Encoding(_)));
    }

    #[test]
    fn configured_secret_is_the_one_used() {
        let other = "cXFxcXFxcXFxcXFxcXFxcXFxcXFxcXFxcXFxcXFxcXE=";
        let default_codec = build_token_codec(&config(&[])).unwrap();
        let other_codec = build_token_codec(&config(&[("JWT_SECRET", other)])).unwrap();

        let token = other_codec
            .issue("u-1", &Default::default(), 60)
            .unwrap();
        assert!(other_codec.decode(&token).is_ok());
        assert_eq!(default_codec.decode(&token), Err(TokenError::InvalidSignature));
    }

    #[tokio::test]
    async fn memory_backend_is_the_default() {
        let registry = build_revocation_registry(&config(&[])).await.unwrap();
        assert_eq!(registry.backend_name(), "memory");

        registry
            .revoke("a.b.c", Utc::now() + Duration::minutes(5))
            .await
            .unwrap();
        assert!(registry.is_revoked("a.b.c").await.unwrap());
    }
}
