//! Request/response DTOs and their mapping to and from domain types.
//!
//! Request bodies carry `validator` rules checked by
//! [`crate::app::extract::ValidatedJson`]; domain constructors then apply
//! the rules a decorator cannot express.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use storefront_auth::{NewUser, TokenPair, User, UserPatch};
use storefront_catalog::{
    Category, CategoryPatch, NewCategory, NewProduct, NewVariant, Product, ProductFilter, ProductPatch,
    ProductVariant, VariantPatch,
};
use storefront_core::{CategoryId, Page, PageRequest};
use storefront_payments::Payment;
use storefront_sales::{Address, AddressPatch, AddressSnapshot, CartLine, CartSummary, NewAddress, Order, OrderItem};
use storefront_shipping::{Parcel, ParcelEvent};

use crate::app::errors::ApiError;

// ---- shared ----

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    ProductPage = PageResponse<ProductResponse>,
    OrderPage = PageResponse<OrderResponse>,
    UserPage = PageResponse<UserResponse>
)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PageResponse<T> {
    pub fn from_page<U>(page: Page<U>) -> Self
    where
        T: From<U>,
    {
        let page = page.map(T::from);
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ---- auth & users ----

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub password: String,
    pub password_confirm: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

impl From<RegisterRequest> for NewUser {
    fn from(req: RegisterRequest) -> Self {
        NewUser {
            email: req.email,
            password: req.password,
            password_confirm: req.password_confirm,
            name: req.name,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

impl From<UpdateProfileRequest> for UserPatch {
    fn from(req: UpdateProfileRequest) -> Self {
        UserPatch {
            name: req.name,
            phone: req.phone,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    /// `customer` or `admin`.
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: *user.id.as_uuid(),
            email: user.email,
            name: user.name,
            phone: user.phone,
            role: user.role.as_str().to_string(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl AuthResponse {
    pub fn new(user: User, tokens: TokenPair) -> Self {
        Self {
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer",
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        }
    }
}

// ---- addresses ----

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAddressRequest {
    #[validate(length(min = 1, max = 200))]
    pub recipient: String,
    #[validate(length(min = 1, max = 32))]
    pub phone: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 300))]
    pub street: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

impl From<CreateAddressRequest> for NewAddress {
    fn from(req: CreateAddressRequest) -> Self {
        NewAddress {
            recipient: req.recipient,
            phone: req.phone,
            country: req.country,
            city: req.city,
            street: req.street,
            postal_code: req.postal_code,
            is_default: req.is_default,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAddressRequest {
    #[validate(length(min = 1, max = 200))]
    pub recipient: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub country: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub street: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: Option<String>,
    pub is_default: Option<bool>,
}

impl From<UpdateAddressRequest> for AddressPatch {
    fn from(req: UpdateAddressRequest) -> Self {
        AddressPatch {
            recipient: req.recipient,
            phone: req.phone,
            country: req.country,
            city: req.city,
            street: req.street,
            postal_code: req.postal_code,
            is_default: req.is_default,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressResponse {
    pub id: Uuid,
    pub recipient: String,
    pub phone: String,
    pub country: String,
    pub city: String,
    pub street: String,
    pub postal_code: String,
    pub is_default: bool,
}

impl From<Address> for AddressResponse {
    fn from(a: Address) -> Self {
        Self {
            id: *a.id.as_uuid(),
            recipient: a.recipient,
            phone: a.phone,
            country: a.country,
            city: a.city,
            street: a.street,
            postal_code: a.postal_code,
            is_default: a.is_default,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingAddressResponse {
    pub recipient: String,
    pub phone: String,
    pub country: String,
    pub city: String,
    pub street: String,
    pub postal_code: String,
}

impl From<AddressSnapshot> for ShippingAddressResponse {
    fn from(a: AddressSnapshot) -> Self {
        Self {
            recipient: a.recipient,
            phone: a.phone,
            country: a.country,
            city: a.city,
            street: a.street,
            postal_code: a.postal_code,
        }
    }
}

// ---- catalog ----

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl From<CreateCategoryRequest> for NewCategory {
    fn from(req: CreateCategoryRequest) -> Self {
        NewCategory {
            name: req.name,
            slug: req.slug,
            description: req.description,
            parent_id: req.parent_id.map(CategoryId::from_uuid),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl From<UpdateCategoryRequest> for CategoryPatch {
    fn from(req: UpdateCategoryRequest) -> Self {
        CategoryPatch {
            name: req.name,
            slug: req.slug,
            description: req.description,
            parent_id: req.parent_id.map(CategoryId::from_uuid),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: *c.id.as_uuid(),
            name: c.name,
            slug: c.slug,
            description: c.description,
            parent_id: c.parent_id.map(|p| *p.as_uuid()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    /// Minor units.
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub in_stock: Option<bool>,
    /// Honoured for admins only.
    pub include_inactive: Option<bool>,
    /// `newest`, `price_asc`, `price_desc` or `name`.
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductQuery {
    pub fn filter(&self) -> Result<ProductFilter, ApiError> {
        let sort = match self.sort.as_deref() {
            Some(raw) => raw.parse().map_err(ApiError::Validation)?,
            None => Default::default(),
        };
        Ok(ProductFilter {
            category_id: self.category_id.map(CategoryId::from_uuid),
            search: self.search.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            in_stock: self.in_stock.unwrap_or(false),
            include_inactive: self.include_inactive.unwrap_or(false),
            sort,
        })
    }

    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 300))]
    pub name: String,
    #[validate(length(min = 1, max = 300))]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Minor units.
    #[validate(range(min = 1))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl From<CreateProductRequest> for NewProduct {
    fn from(req: CreateProductRequest) -> Self {
        NewProduct {
            category_id: req.category_id.map(CategoryId::from_uuid),
            name: req.name,
            slug: req.slug,
            description: req.description,
            price: req.price,
            stock: req.stock,
            images: req.images,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 300))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub slug: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: Option<i64>,
    pub images: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl From<UpdateProductRequest> for ProductPatch {
    fn from(req: UpdateProductRequest) -> Self {
        ProductPatch {
            category_id: req.category_id.map(CategoryId::from_uuid),
            name: req.name,
            slug: req.slug,
            description: req.description,
            price: req.price,
            stock: req.stock,
            images: req.images,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVariantRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(range(min = 1))]
    pub price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: i64,
}

impl From<CreateVariantRequest> for NewVariant {
    fn from(req: CreateVariantRequest) -> Self {
        NewVariant {
            name: req.name,
            sku: req.sku,
            price: req.price,
            stock: req.stock,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVariantRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[validate(range(min = 1))]
    pub price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: Option<i64>,
}

impl From<UpdateVariantRequest> for VariantPatch {
    fn from(req: UpdateVariantRequest) -> Self {
        VariantPatch {
            name: req.name,
            sku: req.sku,
            price: req.price,
            stock: req.stock,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VariantResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub price: Option<i64>,
    pub stock: i64,
}

impl From<ProductVariant> for VariantResponse {
    fn from(v: ProductVariant) -> Self {
        Self {
            id: *v.id.as_uuid(),
            product_id: *v.product_id.as_uuid(),
            name: v.name,
            sku: v.sku,
            price: v.price,
            stock: v.stock,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: i64,
    pub stock: i64,
    /// Sum of variant stock when the product has variants.
    pub total_stock: i64,
    pub images: Vec<String>,
    pub is_active: bool,
    pub variants: Vec<VariantResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        let total_stock = p.total_stock();
        Self {
            id: *p.id.as_uuid(),
            category_id: p.category_id.map(|c| *c.as_uuid()),
            name: p.name,
            slug: p.slug,
            description: p.description,
            price: p.price,
            stock: p.stock,
            total_stock,
            images: p.images,
            is_active: p.is_active,
            variants: p.variants.into_iter().map(Into::into).collect(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteProductResponse {
    pub id: Uuid,
    /// `deleted`, or `deactivated` when orders reference the product.
    pub outcome: &'static str,
}

// ---- cart ----

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 1000))]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemRequest {
    /// Zero removes the line.
    #[validate(range(min = 0, max = 1000))]
    pub quantity: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub name: String,
    pub image: Option<String>,
    pub quantity: i64,
    pub unit_price: i64,
    pub line_total: i64,
    pub available: i64,
    pub purchasable: bool,
}

impl From<CartLine> for CartLineResponse {
    fn from(line: CartLine) -> Self {
        Self {
            id: *line.item.id.as_uuid(),
            product_id: *line.item.product_id.as_uuid(),
            variant_id: line.item.variant_id.map(|v| *v.as_uuid()),
            name: line.name,
            image: line.image,
            quantity: line.item.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
            available: line.available,
            purchasable: line.purchasable,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub item_count: i64,
    pub total: i64,
    pub currency: String,
}

impl From<CartSummary> for CartResponse {
    fn from(summary: CartSummary) -> Self {
        Self {
            lines: summary.lines.into_iter().map(Into::into).collect(),
            item_count: summary.item_count,
            total: summary.total.amount(),
            currency: summary.total.currency().as_str().to_string(),
        }
    }
}

// ---- orders ----

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    pub address_id: Uuid,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i64,
    pub line_total: i64,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(i: OrderItem) -> Self {
        Self {
            id: *i.id.as_uuid(),
            product_id: *i.product_id.as_uuid(),
            variant_id: i.variant_id.map(|v| *v.as_uuid()),
            name: i.name,
            unit_price: i.unit_price,
            quantity: i.quantity,
            line_total: i.line_total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total: i64,
    pub currency: String,
    pub shipping_address: ShippingAddressResponse,
    pub comment: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: *o.id.as_uuid(),
            user_id: *o.user_id.as_uuid(),
            status: o.status.as_str().to_string(),
            total: o.total,
            currency: o.currency.as_str().to_string(),
            shipping_address: o.shipping_address.into(),
            comment: o.comment,
            items: o.items.into_iter().map(Into::into).collect(),
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

// ---- payments ----

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub provider: String,
    pub external_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    /// Where to send the customer to pay.
    pub confirmation_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: *p.id.as_uuid(),
            order_id: *p.order_id.as_uuid(),
            provider: p.provider,
            external_id: p.external_id,
            amount: p.amount,
            currency: p.currency.as_str().to_string(),
            status: p.status.as_str().to_string(),
            confirmation_url: p.confirmation_url,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    /// `applied` or `ignored`.
    pub result: &'static str,
}

// ---- parcels ----

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateParcelRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub carrier: String,
    #[validate(length(min = 4, max = 64))]
    pub tracking_number: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ParcelStatusRequest {
    pub status: String,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParcelEventResponse {
    pub status: String,
    pub location: Option<String>,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

impl From<ParcelEvent> for ParcelEventResponse {
    fn from(e: ParcelEvent) -> Self {
        Self {
            status: e.status.as_str().to_string(),
            location: e.location,
            note: e.note,
            at: e.at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParcelResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub carrier: String,
    pub tracking_number: String,
    pub status: String,
    pub events: Vec<ParcelEventResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Parcel> for ParcelResponse {
    fn from(p: Parcel) -> Self {
        Self {
            id: *p.id.as_uuid(),
            order_id: *p.order_id.as_uuid(),
            carrier: p.carrier,
            tracking_number: p.tracking_number,
            status: p.status.as_str().to_string(),
            events: p.events.into_iter().map(Into::into).collect(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Public tracking view: no order id.
#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingResponse {
    pub carrier: String,
    pub tracking_number: String,
    pub status: String,
    pub events: Vec<ParcelEventResponse>,
}

impl From<Parcel> for TrackingResponse {
    fn from(p: Parcel) -> Self {
        Self {
            carrier: p.carrier,
            tracking_number: p.tracking_number,
            status: p.status.as_str().to_string(),
            events: p.events.into_iter().map(Into::into).collect(),
        }
    }
}

// ---- uploads ----

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_catalog::ProductSort;

    #[test]
    fn register_request_rules() {
        let req = RegisterRequest {
            email: "not-an-email".into(),
            password: "short".into(),
            password_confirm: "short".into(),
            name: "".into(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("name"));
    }

    #[test]
    fn product_query_parses_sort_and_defaults() {
        let q = ProductQuery {
            sort: Some("price_desc".into()),
            ..Default::default()
        };
        let filter = q.filter().unwrap();
        assert_eq!(filter.sort, ProductSort::PriceDesc);
        assert!(!filter.in_stock);
        assert!(!filter.include_inactive);

        let bad = ProductQuery {
            sort: Some("random".into()),
            ..Default::default()
        };
        assert!(matches!(bad.filter(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn add_cart_item_defaults_to_one() {
        let req: AddCartItemRequest =
            serde_json::from_value(serde_json::json!({ "product_id": Uuid::now_v7() })).unwrap();
        assert_eq!(req.quantity, 1);
        assert!(req.validate().is_ok());
    }
}
