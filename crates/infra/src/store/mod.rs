//! Persistence: repository traits and their in-memory / Postgres backends.
//!
//! Services only ever talk to these traits. Operations that touch several
//! tables (`place_order`, `settle_payment`, `record_parcel_status`) are
//! atomic in every implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use storefront_auth::User;
use storefront_catalog::{Category, Product, ProductFilter, ProductVariant};
use storefront_core::{
    AddressId, CartItemId, CategoryId, DomainError, OrderId, Page, PageRequest, ParcelId, PaymentId,
    ProductId, UserId, VariantId,
};
use storefront_payments::{Payment, PaymentStatus, Settlement};
use storefront_sales::{Address, CartItem, Order, OrderStatus};
use storefront_shipping::{Parcel, ParcelEvent};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of deleting a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductRemoval {
    Deleted,
    /// Orders reference the product, so it was hidden instead.
    Deactivated,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, user: &User) -> StoreResult<()>;
    async fn list_users(&self, page: PageRequest) -> StoreResult<Page<User>>;
    /// Fails with `Conflict` when the user has orders.
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;
}

#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn list_addresses(&self, user_id: UserId) -> StoreResult<Vec<Address>>;
    async fn get_address(&self, id: AddressId) -> StoreResult<Option<Address>>;
    /// Insert or update. A default address clears the user's other defaults.
    async fn save_address(&self, address: &Address) -> StoreResult<()>;
    async fn delete_address(&self, id: AddressId) -> StoreResult<()>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>>;
    async fn insert_category(&self, category: &Category) -> StoreResult<()>;
    async fn update_category(&self, category: &Category) -> StoreResult<()>;
    /// Fails with `Conflict` while products reference the category.
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()>;

    async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> StoreResult<Page<Product>>;
    /// Product with its variants.
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;
    async fn get_products(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>>;
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    /// Product row only; variants are managed separately.
    async fn update_product(&self, product: &Product) -> StoreResult<()>;
    async fn delete_product(&self, id: ProductId) -> StoreResult<ProductRemoval>;

    async fn insert_variant(&self, variant: &ProductVariant) -> StoreResult<()>;
    async fn update_variant(&self, variant: &ProductVariant) -> StoreResult<()>;
    async fn delete_variant(&self, product_id: ProductId, id: VariantId) -> StoreResult<()>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn cart_items(&self, user_id: UserId) -> StoreResult<Vec<CartItem>>;
    async fn get_cart_item(&self, id: CartItemId) -> StoreResult<Option<CartItem>>;
    /// Insert or update by id.
    async fn save_cart_item(&self, item: &CartItem) -> StoreResult<()>;
    async fn delete_cart_item(&self, id: CartItemId) -> StoreResult<()>;
    async fn clear_cart(&self, user_id: UserId) -> StoreResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order with its items and empty the owner's cart.
    async fn place_order(&self, order: &Order) -> StoreResult<()>;
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;
    async fn list_orders_for_user(&self, user_id: UserId, page: PageRequest) -> StoreResult<Page<Order>>;
    async fn list_orders(&self, status: Option<OrderStatus>, page: PageRequest) -> StoreResult<Page<Order>>;
    /// Move the order from `from` to `to`.
    ///
    /// Fails with `Conflict` when the order is no longer in `from`.
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Fails with `Conflict` when the external id is already recorded or
    /// the order already has an open (pending or waiting) payment.
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()>;
    async fn get_payment(&self, id: PaymentId) -> StoreResult<Option<Payment>>;
    async fn find_payment_by_external_id(&self, external_id: &str) -> StoreResult<Option<Payment>>;
    async fn payments_for_order(&self, order_id: OrderId) -> StoreResult<Vec<Payment>>;
    async fn update_payment(&self, payment: &Payment) -> StoreResult<()>;
    async fn delete_payment(&self, id: PaymentId) -> StoreResult<()>;

    /// Apply a settlement if the payment is still in `from`.
    ///
    /// The order side is checked against the order's status at write time
    /// ([`Settlement::against_order`]): the payment is updated, the order
    /// moves only when it still can, and stock is taken (clamped at zero)
    /// only together with that move. Returns what was applied, or `None`
    /// without changes when the payment already moved on.
    async fn settle_payment(
        &self,
        id: PaymentId,
        from: PaymentStatus,
        settlement: &Settlement,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Settlement>>;
}

#[async_trait]
pub trait ParcelStore: Send + Sync {
    /// Fails with `Conflict` when the order already has a parcel or the
    /// tracking number is taken.
    async fn insert_parcel(&self, parcel: &Parcel) -> StoreResult<()>;
    async fn get_parcel(&self, id: ParcelId) -> StoreResult<Option<Parcel>>;
    async fn parcel_for_order(&self, order_id: OrderId) -> StoreResult<Option<Parcel>>;
    async fn find_parcel_by_tracking(&self, tracking_number: &str) -> StoreResult<Option<Parcel>>;

    /// Persist the parcel's new status, append `event`, and move the order
    /// from `order_from` to `order_status`.
    ///
    /// Fails with `Conflict`, changing nothing, when the order is no longer
    /// in `order_from`.
    async fn record_parcel_status(
        &self,
        parcel: &Parcel,
        event: &ParcelEvent,
        order_from: OrderStatus,
        order_status: Option<OrderStatus>,
    ) -> StoreResult<()>;
}

/// Everything the API needs from persistence.
pub trait Store:
    UserStore + AddressStore + CatalogStore + CartStore + OrderStore + PaymentStore + ParcelStore
{
}

impl<T> Store for T where
    T: UserStore + AddressStore + CatalogStore + CartStore + OrderStore + PaymentStore + ParcelStore
{
}

/// Subtract `quantity` from `stock`, never going below zero.
///
/// The second value is true when the subtraction had to be clamped.
pub fn decrement_clamped(stock: i64, quantity: i64) -> (i64, bool) {
    let next = stock - quantity;
    if next < 0 { (0, true) } else { (next, false) }
}

/// Error for a compare-and-set on an order whose status moved on.
pub fn order_moved(expected: OrderStatus, actual: OrderStatus) -> StoreError {
    StoreError::Conflict(format!("order is {actual}, no longer {expected}"))
}
