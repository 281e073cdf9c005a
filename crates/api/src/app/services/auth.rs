use chrono::Utc;
use tracing::{info, instrument, warn};

use storefront_auth::{
    hash_password, normalize_email, verify_password, JwtValidator, NewUser, TokenKind, TokenPair, User,
};
use storefront_core::UserId;

use super::AppServices;
use crate::app::errors::{ApiError, ApiResult};

const BAD_CREDENTIALS: &str = "invalid email or password";

impl AppServices {
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: NewUser) -> ApiResult<User> {
        registration.validate()?;

        let email = normalize_email(&registration.email);
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict("email already registered".to_string()));
        }

        let hash = hash_password(&registration.password)?;
        let user = registration.into_user(hash, Utc::now());
        self.store.insert_user(&user).await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<(User, TokenPair)> {
        let Some(user) = self.store.find_user_by_email(&normalize_email(email)).await? else {
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };
        if !verify_password(&user.password_hash, password)? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        let tokens = self.jwt.issue_pair(user.id, user.role, Utc::now())?;
        info!(user_id = %user.id, "user logged in");
        Ok((user, tokens))
    }

    /// Trade a refresh token for a new pair. The role is re-read from the store.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<(User, TokenPair)> {
        let now = Utc::now();
        let claims = self.jwt.validate(refresh_token, TokenKind::Refresh, now)?;
        let user = self
            .store
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("account no longer exists".to_string()))?;

        let tokens = self.jwt.issue_pair(user.id, user.role, now)?;
        Ok((user, tokens))
    }

    pub async fn current_user(&self, user_id: UserId) -> ApiResult<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("account no longer exists".to_string()))
    }
}
