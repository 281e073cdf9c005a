use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::UserId;

use crate::Role;

/// Which of the two tokens a claim set belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims model (transport-agnostic).
///
/// `iat`/`exp` are unix seconds, as registered JWT claims require.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the user id.
    pub sub: UserId,

    /// Role at the time the token was issued.
    pub role: Role,

    pub kind: TokenKind,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(sub: UserId, role: Role, kind: TokenKind, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            sub,
            role,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("wrong token kind: expected {expected:?}, got {actual:?}")]
    WrongKind { expected: TokenKind, actual: TokenKind },
}

/// Deterministically validate JWT claims.
///
/// Note: this validates the *claims* only. Signature verification / decoding
/// happens in [`crate::jwt`].
pub fn validate_claims(
    claims: &JwtClaims,
    expected: TokenKind,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if claims.kind != expected {
        return Err(TokenValidationError::WrongKind {
            expected,
            actual: claims.kind,
        });
    }
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(kind: TokenKind, now: DateTime<Utc>) -> JwtClaims {
        JwtClaims::new(UserId::new(), Role::Customer, kind, now, Duration::minutes(15))
    }

    #[test]
    fn valid_inside_window() {
        let now = Utc::now();
        let c = claims(TokenKind::Access, now);
        assert_eq!(validate_claims(&c, TokenKind::Access, now + Duration::minutes(1)), Ok(()));
    }

    #[test]
    fn expired_at_exp() {
        let now = Utc::now();
        let c = claims(TokenKind::Access, now);
        assert_eq!(
            validate_claims(&c, TokenKind::Access, now + Duration::minutes(15)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn future_iat_is_rejected() {
        let now = Utc::now();
        let c = claims(TokenKind::Access, now + Duration::minutes(5));
        assert_eq!(
            validate_claims(&c, TokenKind::Access, now),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let now = Utc::now();
        let c = claims(TokenKind::Refresh, now);
        assert!(matches!(
            validate_claims(&c, TokenKind::Access, now),
            Err(TokenValidationError::WrongKind { .. })
        ));
    }
}
