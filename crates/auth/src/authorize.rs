use std::collections::HashSet;

use thiserror::Error;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for a single permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %principal.user_id,
            role = %principal.role,
            permission = %required,
            "authorization denied"
        );
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{CART_MANAGE, CATALOG_WRITE, ORDERS_MANAGE};
    use crate::Role;
    use storefront_core::UserId;

    #[test]
    fn admin_has_wildcard() {
        let admin = Principal::new(UserId::new(), Role::Admin);
        assert!(authorize(&admin, &CATALOG_WRITE).is_ok());
        assert!(authorize(&admin, &Permission::new("anything.at.all")).is_ok());
    }

    #[test]
    fn customer_cannot_manage_catalog_or_orders() {
        let customer = Principal::new(UserId::new(), Role::Customer);
        assert!(authorize(&customer, &CART_MANAGE).is_ok());
        assert_eq!(
            authorize(&customer, &CATALOG_WRITE),
            Err(AuthzError::Forbidden("catalog.write".to_string()))
        );
        assert!(authorize(&customer, &ORDERS_MANAGE).is_err());
    }

    #[test]
    fn ownership_check() {
        let owner = UserId::new();
        let customer = Principal::new(owner, Role::Customer);
        let stranger = Principal::new(UserId::new(), Role::Customer);
        let admin = Principal::new(UserId::new(), Role::Admin);

        assert!(customer.owns_or_admin(owner));
        assert!(!stranger.owns_or_admin(owner));
        assert!(admin.owns_or_admin(owner));
    }
}
