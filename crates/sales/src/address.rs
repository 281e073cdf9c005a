use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{AddressId, DomainError, DomainResult, Entity, UserId, ValueObject};

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub recipient: String,
    pub phone: String,
    pub country: String,
    pub city: String,
    pub street: String,
    pub postal_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Address {
    type Id = AddressId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Address {
    pub fn snapshot(&self) -> AddressSnapshot {
        AddressSnapshot {
            recipient: self.recipient.clone(),
            phone: self.phone.clone(),
            country: self.country.clone(),
            city: self.city.clone(),
            street: self.street.clone(),
            postal_code: self.postal_code.clone(),
        }
    }
}

/// Copy of an address frozen into an order, so later edits don't rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub recipient: String,
    pub phone: String,
    pub country: String,
    pub city: String,
    pub street: String,
    pub postal_code: String,
}

impl ValueObject for AddressSnapshot {}

#[derive(Debug, Clone, Default)]
pub struct NewAddress {
    pub recipient: String,
    pub phone: String,
    pub country: String,
    pub city: String,
    pub street: String,
    pub postal_code: String,
    pub is_default: bool,
}

impl NewAddress {
    pub fn into_address(self, user_id: UserId, now: DateTime<Utc>) -> DomainResult<Address> {
        Ok(Address {
            id: AddressId::new(),
            user_id,
            recipient: required("recipient", &self.recipient)?,
            phone: required("phone", &self.phone)?,
            country: required("country", &self.country)?,
            city: required("city", &self.city)?,
            street: required("street", &self.street)?,
            postal_code: required("postal_code", &self.postal_code)?,
            is_default: self.is_default,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddressPatch {
    pub recipient: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub is_default: Option<bool>,
}

impl AddressPatch {
    pub fn apply(self, address: &mut Address) -> DomainResult<()> {
        let fields = [
            ("recipient", self.recipient, &mut address.recipient),
            ("phone", self.phone, &mut address.phone),
            ("country", self.country, &mut address.country),
            ("city", self.city, &mut address.city),
            ("street", self.street, &mut address.street),
            ("postal_code", self.postal_code, &mut address.postal_code),
        ];
        for (name, value, slot) in fields {
            if let Some(value) = value {
                *slot = required(name, &value)?;
            }
        }
        if let Some(is_default) = self.is_default {
            address.is_default = is_default;
        }
        Ok(())
    }
}

fn required(field: &str, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}
