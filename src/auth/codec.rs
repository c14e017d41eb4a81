use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims embedded in every issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id.
    pub sub: String,
    pub kind: TokenKind,
    /// Unique per issuance, so two tokens minted in the same second for the
    /// same identity still differ. Rotation depends on this.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Encodes, decodes, and verifies signed time-bounded identity tokens.
///
/// Access and refresh tokens are signed with separate secrets, so a leaked
/// access secret cannot mint refresh tokens. Verification is pure: it never
/// consults the store.
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        if config.access_secret.is_empty() || config.refresh_secret.is_empty() {
            return Err(Error::Config("token secrets must not be empty".into()));
        }
        if config.access_ttl_secs >= config.refresh_ttl_secs {
            return Err(Error::Config(
                "access TTL must be shorter than refresh TTL".into(),
            ));
        }

        Ok(Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        })
    }

    pub fn issue(&self, identity_id: &str, kind: TokenKind) -> Result<String> {
        let now = Utc::now().timestamp();
        let (key, ttl) = match kind {
            TokenKind::Access => (&self.access_encoding, self.access_ttl_secs),
            TokenKind::Refresh => (&self.refresh_encoding, self.refresh_ttl_secs),
        };

        let claims = Claims {
            sub: identity_id.to_string(),
            kind,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + ttl,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(|e| Error::Config(format!("failed to sign token: {e}")))
    }

    /// Verifies a token and returns the embedded identity id. A token whose
    /// embedded kind does not match `expected` is treated as malformed.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<String> {
        let key = match expected {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => Error::Expired,
                ErrorKind::InvalidSignature => Error::InvalidSignature,
                _ => Error::MalformedToken,
            }
        })?;

        if data.claims.kind != expected {
            return Err(Error::MalformedToken);
        }

        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(&AuthConfig {
            access_secret: "access-secret".to_string(),
            refresh_secret: "refresh-secret".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 864_000,
        })
        .unwrap()
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let codec = codec();

        let access = codec.issue("id-1", TokenKind::Access).unwrap();
        let refresh = codec.issue("id-1", TokenKind::Refresh).unwrap();

        assert_eq!(codec.verify(&access, TokenKind::Access).unwrap(), "id-1");
        assert_eq!(codec.verify(&refresh, TokenKind::Refresh).unwrap(), "id-1");
    }

    #[test]
    fn back_to_back_issuance_yields_distinct_tokens() {
        let codec = codec();
        let first = codec.issue("id-1", TokenKind::Refresh).unwrap();
        let second = codec.issue("id-1", TokenKind::Refresh).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let codec = codec();
        let access = codec.issue("id-1", TokenKind::Access).unwrap();

        // Signed with the access secret, so the refresh key fails the
        // signature check before the kind claim is even reached.
        assert!(matches!(
            codec.verify(&access, TokenKind::Refresh),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn kind_claim_is_checked_even_with_shared_secret() {
        let codec = TokenCodec::new(&AuthConfig {
            access_secret: "shared".to_string(),
            refresh_secret: "shared".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 864_000,
        })
        .unwrap();

        let access = codec.issue("id-1", TokenKind::Access).unwrap();
        assert!(matches!(
            codec.verify(&access, TokenKind::Refresh),
            Err(Error::MalformedToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "id-1".to_string(),
            kind: TokenKind::Access,
            jti: "stale".to_string(),
            iat: now - 120,
            exp: now - 60,
        };
        let stale = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .unwrap();

        assert!(matches!(
            codec.verify(&stale, TokenKind::Access),
            Err(Error::Expired)
        ));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let codec = codec();
        let token = codec.issue("id-1", TokenKind::Access).unwrap();

        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert!(codec.verify(&tampered, TokenKind::Access).is_err());

        assert!(matches!(
            codec.verify("not-a-jwt", TokenKind::Access),
            Err(Error::MalformedToken)
        ));
    }

    #[test]
    fn misconfigured_ttls_are_rejected() {
        let result = TokenCodec::new(&AuthConfig {
            access_secret: "a".to_string(),
            refresh_secret: "b".to_string(),
            access_ttl_secs: 1000,
            refresh_ttl_secs: 1000,
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
