use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use storefront_auth::{Principal, Role};
use storefront_core::UserId;

use crate::app::errors::ApiError;

/// The authenticated caller, attached to the request by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    principal: Principal,
}

impl CurrentUser {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            principal: Principal::new(user_id, role),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn is_admin(&self) -> bool {
        self.principal.is_admin()
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
    }
}
