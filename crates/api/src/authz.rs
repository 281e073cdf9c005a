//! Handler-side permission checks.
//!
//! Handlers call these before touching services, keeping the domain and
//! infra crates auth-agnostic.

use storefront_auth::{authorize, Permission};

use crate::app::errors::ApiError;
use crate::context::CurrentUser;

/// Require `permission` for the current caller.
pub fn require(user: &CurrentUser, permission: &Permission) -> Result<(), ApiError> {
    authorize(user.principal(), permission)?;
    Ok(())
}

/// Records owned by someone else look absent to non-admins.
pub fn ensure_owner(user: &CurrentUser, owner: storefront_core::UserId, what: &str) -> Result<(), ApiError> {
    if user.principal().owns_or_admin(owner) {
        Ok(())
    } else {
        Err(ApiError::not_found(what))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_auth::permissions::{CART_MANAGE, CATALOG_WRITE};
    use storefront_auth::Role;
    use storefront_core::UserId;

    #[test]
    fn customers_lack_admin_permissions() {
        let customer = CurrentUser::new(UserId::new(), Role::Customer);
        assert!(require(&customer, &CART_MANAGE).is_ok());
        assert!(matches!(require(&customer, &CATALOG_WRITE), Err(ApiError::Forbidden(_))));

        let admin = CurrentUser::new(UserId::new(), Role::Admin);
        assert!(require(&admin, &CATALOG_WRITE).is_ok());
    }

    #[test]
    fn foreign_records_are_not_found() {
        let owner = UserId::new();
        let stranger = CurrentUser::new(UserId::new(), Role::Customer);
        assert!(matches!(ensure_owner(&stranger, owner, "order"), Err(ApiError::NotFound(_))));
        assert!(ensure_owner(&CurrentUser::new(owner, Role::Customer), owner, "order").is_ok());
    }
}
