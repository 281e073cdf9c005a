use storefront_core::UserId;

use crate::{permissions_for, Permission, Role};

/// A fully resolved principal for authorization decisions.
///
/// Built from verified token claims; carries the permissions its role grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            permissions: permissions_for(role),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this principal may act on a record owned by `owner`.
    pub fn owns_or_admin(&self, owner: UserId) -> bool {
        self.user_id == owner || self.is_admin()
    }
}
