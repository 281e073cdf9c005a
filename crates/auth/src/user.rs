//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, UserId};

use crate::Role;

pub const MIN_PASSWORD_LEN: usize = 8;

/// A registered account. The password hash never leaves the service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Registration input after transport-level validation.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub name: String,
}

impl NewUser {
    /// Check the rules a DTO decorator cannot express.
    pub fn validate(&self) -> DomainResult<()> {
        if self.password != self.password_confirm {
            return Err(DomainError::validation("passwords do not match"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }
        Ok(())
    }

    /// Build the stored record from an already-computed password hash.
    pub fn into_user(self, password_hash: String, now: DateTime<Utc>) -> User {
        User {
            id: UserId::new(),
            email: normalize_email(&self.email),
            password_hash,
            name: self.name.trim().to_string(),
            phone: None,
            role: Role::Customer,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Self-service profile update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl UserPatch {
    pub fn apply(self, user: &mut User, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("name must not be empty"));
            }
            user.name = name.to_string();
        }
        if let Some(phone) = self.phone {
            let phone = phone.trim();
            user.phone = (!phone.is_empty()).then(|| phone.to_string());
        }
        user.updated_at = now;
        Ok(())
    }
}

/// Emails are compared case-insensitively; store them lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
