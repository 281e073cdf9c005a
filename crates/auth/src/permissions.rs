use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "orders.place").
/// A special wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn new_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const WILDCARD: Permission = Permission::new_static("*");

pub const PROFILE_MANAGE: Permission = Permission::new_static("profile.manage");
pub const ADDRESSES_MANAGE: Permission = Permission::new_static("addresses.manage");
pub const CART_MANAGE: Permission = Permission::new_static("cart.manage");
pub const ORDERS_PLACE: Permission = Permission::new_static("orders.place");
pub const PAYMENTS_CREATE: Permission = Permission::new_static("payments.create");

pub const USERS_MANAGE: Permission = Permission::new_static("users.manage");
pub const CATALOG_WRITE: Permission = Permission::new_static("catalog.write");
pub const ORDERS_MANAGE: Permission = Permission::new_static("orders.manage");
pub const PARCELS_MANAGE: Permission = Permission::new_static("parcels.manage");
pub const UPLOADS_WRITE: Permission = Permission::new_static("uploads.write");

/// Static role → permission policy.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![WILDCARD],
        Role::Customer => vec![
            PROFILE_MANAGE,
            ADDRESSES_MANAGE,
            CART_MANAGE,
            ORDERS_PLACE,
            PAYMENTS_CREATE,
        ],
    }
}
