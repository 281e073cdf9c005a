//! Catalog domain module: categories, products, variants and stock rules.
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod category;
pub mod filter;
pub mod product;
pub mod slug;
pub mod stock;

pub use category::{Category, CategoryPatch, NewCategory};
pub use filter::{ProductFilter, ProductSort};
pub use product::{NewProduct, NewVariant, Product, ProductPatch, ProductVariant, VariantPatch};
pub use slug::slugify;
pub use stock::Purchasable;
