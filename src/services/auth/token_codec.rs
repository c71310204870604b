//! Signed identity tokens (HS256 JWS).
//!
//! Issuance and verification share one symmetric key derived from the
//! configured base64 secret. Any change to the header or claims segments
//! invalidates the signature.

use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::services::auth::error::TokenError;

/// HMAC-SHA256 wants at least as many key bytes as the digest size.
pub const MIN_SECRET_BYTES: usize = 32;

/// Upper bound for a token's lifetime (one year).
pub const MAX_TTL_SECONDS: u64 = 366 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// An `exp` outside chrono's range maps to the far future, so a revocation
    /// entry built from it is never evicted early.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
    leeway_seconds: u64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl TokenCodec {
    /// Build a codec from a base64 secret (standard alphabet, or URL-safe without padding).
    ///
    /// Fails with `TokenError::Encoding` when the secret does not decode, is shorter than
    /// [`MIN_SECRET_BYTES`], or when `ttl_seconds` is zero or above [`MAX_TTL_SECONDS`].
    pub fn new(secret_b64: &str, ttl_seconds: u64, leeway_seconds: u64) -> Result<Self, TokenError> {
        let secret = secret_b64.trim();
        if secret.is_empty() {
            return Err(TokenError::Encoding("signing secret is empty".into()));
        }

        let key = STANDARD
            .decode(secret)
            .or_else(|_| URL_SAFE_NO_PAD.decode(secret))
            .map_err(|_| TokenError::Encoding("signing secret is not valid base64".into()))?;

        if key.len() < MIN_SECRET_BYTES {
            return Err(TokenError::Encoding(format!(
                "signing secret must decode to at least {MIN_SECRET_BYTES} bytes (got {})",
                key.len()
            )));
        }
        check_ttl(ttl_seconds)?;

        // `exp` is checked by `decode_at` against the caller's clock, with an explicit leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iat", "exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
            validation,
            ttl_seconds,
            leeway_seconds,
        })
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn leeway_seconds(&self) -> u64 {
        self.leeway_seconds
    }

    pub fn issue(
        &self,
        subject: &str,
        roles: &BTreeSet<String>,
        ttl_seconds: u64,
    ) -> Result<String, TokenError> {
        self.issue_at(subject, roles, ttl_seconds, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: &str,
        roles: &BTreeSet<String>,
        ttl_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if subject.trim().is_empty() {
            return Err(TokenError::Encoding("subject must not be empty".into()));
        }
        check_ttl(ttl_seconds)?;
        let ttl = i64::try_from(ttl_seconds)
            .map_err(|_| TokenError::Encoding("token ttl out of range".into()))?;

        let iat = now.timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            roles: roles.clone(),
            iat,
            exp: iat.saturating_add(ttl),
            jti: Some(Uuid::new_v4().to_string()),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign token");
            TokenError::Encoding(e.to_string())
        })
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Verify the signature, parse the claims and check `exp` against `now`.
    ///
    /// The token is valid only while `exp + leeway > now`.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed);
        };

        // Structure first, so that any failure left over from jsonwebtoken is about the signature.
        let header: serde_json::Value = decode_segment(header)?;
        if !header.is_object() {
            return Err(TokenError::Malformed);
        }
        let parsed: Claims = decode_segment(claims)?;
        if parsed.sub.trim().is_empty() || parsed.exp <= parsed.iat {
            return Err(TokenError::Malformed);
        }
        // Non-canonical encodings must not verify as the same signature bytes.
        URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::Base64(_) => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })?;

        let leeway = i64::try_from(self.leeway_seconds).unwrap_or(i64::MAX);
        if data.claims.exp.saturating_add(leeway) <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }

    pub fn subject(&self, token: &str) -> Result<String, TokenError> {
        self.decode(token).map(|claims| claims.sub)
    }
}

fn check_ttl(ttl_seconds: u64) -> Result<(), TokenError> {
    if ttl_seconds == 0 {
        return Err(TokenError::Encoding("token ttl must be positive".into()));
    }
    if ttl_seconds > MAX_TTL_SECONDS {
        return Err(TokenError::Encoding(format!(
            "token ttl must not exceed {MAX_TTL_SECONDS} seconds"
        )));
    }
    Ok(())
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    // 32 bytes of 'k'
    const SECRET: &str = "a2tra2tra2tra2tra2tra2tra2tra2tra2tra2tra2s=";
    const OTHER_SECRET: &str = "cXFxcXFxcXFxcXFxcXFxcXFxcXFxcXFxcXFxcXFxcXE=";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, 3600, 0).unwrap()
    }

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn issue_then_decode_preserves_subject_and_roles() {
        let codec = codec();
        let roles = roles(&["USER", "SELLER"]);
        let token = codec.issue("alice", &roles, 3600).unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, roles);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(claims.jti.is_some());
        assert_eq!(codec.subject(&token).unwrap(), "alice");
    }

    #[test]
    fn token_has_three_url_safe_segments() {
        let token = codec().issue("alice", &roles(&["USER"]), 60).unwrap();
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec();
        let issued = Utc::now() - Duration::hours(2);
        let token = codec.issue_at("alice", &roles(&["USER"]), 3600, issued).unwrap();

        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn exp_must_be_strictly_in_the_future() {
        let codec = codec();
        let now = Utc::now();
        let token = codec.issue_at("alice", &roles(&[]), 60, now).unwrap();

        assert!(codec.decode_at(&token, now + Duration::seconds(59)).is_ok());
        assert_eq!(
            codec.decode_at(&token, now + Duration::seconds(60)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn leeway_extends_validity_explicitly() {
        let codec = TokenCodec::new(SECRET, 3600, 30).unwrap();
        let now = Utc::now();
        let token = codec.issue_at("alice", &roles(&[]), 60, now).unwrap();

        assert!(codec.decode_at(&token, now + Duration::seconds(80)).is_ok());
        assert_eq!(
            codec.decode_at(&token, now + Duration::seconds(90)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn any_single_character_change_in_signature_is_detected() {
        let codec = codec();
        let token = codec.issue("alice", &roles(&["USER"]), 3600).unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;

        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert_eq!(
                codec.decode(&tampered),
                Err(TokenError::InvalidSignature),
                "position {i}"
            );
        }
    }

    #[test]
    fn tampered_claims_fail_signature_check() {
        let codec = codec();
        let token = codec.issue("alice", &roles(&["USER"]), 3600).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged = Claims {
            sub: "alice".into(),
            roles: roles(&["ADMIN"]),
            ..codec.decode(&token).unwrap()
        };
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

        assert_eq!(codec.decode(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn token_signed_with_another_key_is_rejected() {
        let other = TokenCodec::new(OTHER_SECRET, 3600, 0).unwrap();
        let token = other.issue("alice", &roles(&["USER"]), 3600).unwrap();

        assert_eq!(codec().decode(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.###.$$$", "e30.e30.AAAA"] {
            assert_eq!(codec.decode(token), Err(TokenError::Malformed), "{token:?}");
        }
    }

    #[test]
    fn secret_must_be_base64_and_long_enough() {
        assert!(matches!(
            TokenCodec::new("not base64 at all!", 60, 0),
            Err(TokenError::Encoding(_))
        ));
        // "short" → 5 bytes
        assert!(matches!(
            TokenCodec::new("c2hvcnQ=", 60, 0),
            Err(TokenError::Encoding(_))
        ));
        assert!(matches!(TokenCodec::new("", 60, 0), Err(TokenError::Encoding(_))));
    }

    #[test]
    fn zero_ttl_is_refused() {
        assert!(matches!(
            TokenCodec::new(SECRET, 0, 0),
            Err(TokenError::Encoding(_))
        ));
        assert!(matches!(
            codec().issue("alice", &roles(&[]), 0),
            Err(TokenError::Encoding(_))
        ));
    }

    #[test]
    fn oversized_ttl_is_refused() {
        assert!(matches!(
            TokenCodec::new(SECRET, 10_000_000_000_000, 0),
            Err(TokenError::Encoding(_))
        ));
        assert!(matches!(
            codec().issue("alice", &roles(&[]), MAX_TTL_SECONDS + 1),
            Err(TokenError::Encoding(_))
        ));
        assert!(codec().issue("alice", &roles(&[]), MAX_TTL_SECONDS).is_ok());
    }

    #[test]
    fn out_of_range_exp_maps_to_the_far_future() {
        let claims = Claims {
            sub: "alice".into(),
            roles: roles(&[]),
            iat: 0,
            exp: i64::MAX,
            jti: None,
        };
        assert_eq!(claims.expires_at(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn empty_subject_is_refused() {
        assert!(matches!(
            codec().issue("  ", &roles(&[]), 60),
            Err(TokenError::Encoding(_))
        ));
    }

    #[test]
    fn debug_does_not_print_key_material() {
        let printed = format!("{:?}", codec());
        assert!(!printed.contains("key"));
    }
}
