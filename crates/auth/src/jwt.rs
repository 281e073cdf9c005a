//! HS256 token issuing and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use thiserror::Error;

use storefront_core::UserId;

use crate::{validate_claims, JwtClaims, Role, TokenKind, TokenValidationError};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token encoding failed: {0}")]
    Encode(jsonwebtoken::errors::Error),

    #[error("token is malformed or its signature is invalid: {0}")]
    Decode(jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a raw token string and yields its claims.
///
/// The HTTP middleware depends on this trait only.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// Access + refresh token pair returned by login/refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Shared-secret HS256 signer/verifier.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue(&self, user_id: UserId, role: Role, kind: TokenKind, now: DateTime<Utc>) -> Result<String, JwtError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = JwtClaims::new(user_id, role, kind, now, ttl);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(JwtError::Encode)
    }

    pub fn issue_pair(&self, user_id: UserId, role: Role, now: DateTime<Utc>) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, role, TokenKind::Access, now)?,
            refresh_token: self.issue(user_id, role, TokenKind::Refresh, now)?,
            access_expires_at: now + self.access_ttl,
            refresh_expires_at: now + self.refresh_ttl,
        })
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        // Time checks are done against the caller's clock in `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation).map_err(JwtError::Decode)?;
        validate_claims(&data.claims, kind, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> Hs256Jwt {
        Hs256Jwt::new(b"test-secret", Duration::minutes(15), Duration::days(30))
    }

    #[test]
    fn issued_access_token_validates() {
        let now = Utc::now();
        let user = UserId::new();
        let token = jwt().issue(user, Role::Admin, TokenKind::Access, now).unwrap();

        let claims = jwt().validate(&token, TokenKind::Access, now).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let now = Utc::now();
        let other = Hs256Jwt::new(b"other", Duration::minutes(15), Duration::days(30));
        let token = other.issue(UserId::new(), Role::Customer, TokenKind::Access, now).unwrap();

        assert!(matches!(jwt().validate(&token, TokenKind::Access, now), Err(JwtError::Decode(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = jwt().issue(UserId::new(), Role::Customer, TokenKind::Access, now).unwrap();

        let later = now + Duration::minutes(16);
        assert!(matches!(
            jwt().validate(&token, TokenKind::Access, later),
            Err(JwtError::Claims(TokenValidationError::Expired))
        ));
    }

    #[test]
    fn pair_tokens_have_distinct_kinds() {
        let now = Utc::now();
        let pair = jwt().issue_pair(UserId::new(), Role::Customer, now).unwrap();

        assert!(jwt().validate(&pair.refresh_token, TokenKind::Refresh, now).is_ok());
        assert!(jwt().validate(&pair.refresh_token, TokenKind::Access, now).is_err());
        assert_eq!(pair.refresh_expires_at - now, Duration::days(30));
    }
}
