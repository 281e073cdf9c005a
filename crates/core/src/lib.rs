//! `storefront-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod page;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    AddressId, CartItemId, CategoryId, OrderId, OrderItemId, ParcelId, PaymentId, ProductId,
    UserId, VariantId,
};
pub use money::{Currency, Money};
pub use page::{Page, PageRequest};
pub use value_object::ValueObject;
