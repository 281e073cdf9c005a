//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` unique violation | `Conflict` | duplicate email, slug, SKU, tracking number, cart line |
//! | `23503` foreign key violation | `Conflict` / `NotFound` | deleting a referenced row / inserting with a dangling reference |
//! | `23514` check violation | `Domain` | negative stock, non-positive price |
//! | anything else | `Database` | connectivity, pool closed, decode failures |
//!
//! Multi-table operations run in a single transaction.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use storefront_auth::{Role, User};
use storefront_catalog::{Category, Product, ProductFilter, ProductSort, ProductVariant};
use storefront_core::{
    AddressId, CartItemId, CategoryId, Currency, DomainError, OrderId, OrderItemId, Page, PageRequest,
    ParcelId, PaymentId, ProductId, UserId, VariantId,
};
use storefront_payments::{Payment, PaymentStatus, Settlement};
use storefront_sales::{Address, AddressSnapshot, CartItem, Order, OrderItem, OrderStatus};
use storefront_shipping::{Parcel, ParcelEvent, ParcelStatus};

use super::{
    AddressStore, CartStore, CatalogStore, OrderStore, ParcelStore, PaymentStore, ProductRemoval,
    StoreError, StoreResult, UserStore, decrement_clamped, order_moved,
};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    #[instrument(skip(url))]
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the SQL migrations bundled with this crate.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))?;
        info!("database migrations applied");
        Ok(())
    }

    async fn begin(&self, operation: &str) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error(operation, e))
    }

    async fn load_variants(&self, products: &mut [Product]) -> StoreResult<()> {
        if products.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = products.iter().map(|p| *p.id.as_uuid()).collect();
        let rows: Vec<VariantRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, name, sku, price, stock
            FROM product_variants
            WHERE product_id = ANY($1)
            ORDER BY sku ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_variants", e))?;

        let mut by_product: HashMap<ProductId, Vec<ProductVariant>> = HashMap::new();
        for VariantRow(v) in rows {
            by_product.entry(v.product_id).or_default().push(v);
        }
        for p in products.iter_mut() {
            p.variants = by_product.remove(&p.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn load_items(&self, orders: &mut [Order]) -> StoreResult<()> {
        if orders.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = orders.iter().map(|o| *o.id.as_uuid()).collect();
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, product_id, variant_id, name, unit_price, quantity, line_total
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_order_items", e))?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for OrderItemRow(item) in rows {
            by_order.entry(item.order_id).or_default().push(item);
        }
        for o in orders.iter_mut() {
            o.items = by_order.remove(&o.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn load_events(&self, parcel: &mut Parcel) -> StoreResult<()> {
        let rows: Vec<ParcelEventRow> = sqlx::query_as(
            r#"
            SELECT status, location, note, at
            FROM parcel_events
            WHERE parcel_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(*parcel.id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_parcel_events", e))?;
        parcel.events = rows.into_iter().map(|r| r.0).collect();
        Ok(())
    }

    async fn fetch_parcel(&self, column: &'static str, value: ParcelKey<'_>) -> StoreResult<Option<Parcel>> {
        let sql = format!(
            "SELECT id, order_id, carrier, tracking_number, status, created_at, updated_at FROM parcels WHERE {column} = $1"
        );
        let query = sqlx::query_as::<_, ParcelRow>(&sql);
        let query = match value {
            ParcelKey::Uuid(id) => query.bind(id),
            ParcelKey::Text(text) => query.bind(text),
        };
        let row = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_parcel", e))?;
        match row {
            Some(ParcelRow(mut parcel)) => {
                self.load_events(&mut parcel).await?;
                Ok(Some(parcel))
            }
            None => Ok(None),
        }
    }

    async fn page_orders(
        &self,
        operation: &'static str,
        user_id: Option<UserId>,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<Order>> {
        let user = user_id.map(|u| *u.as_uuid());
        let status = status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE ($1::uuid IS NULL OR user_id = $1) AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(user)
        .bind(status)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;

        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, status, total, currency, shipping_address, comment, created_at, updated_at
            FROM orders
            WHERE ($1::uuid IS NULL OR user_id = $1) AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user)
        .bind(status)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;

        let mut orders: Vec<Order> = rows.into_iter().map(|r| r.0).collect();
        self.load_items(&mut orders).await?;
        Ok(Page::new(orders, total as u64, page))
    }
}

enum ParcelKey<'a> {
    Uuid(Uuid),
    Text(&'a str),
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, phone, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, password_hash, name, phone, role, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user", e))?;
        Ok(row.map(|r| r.0))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, password_hash, name, phone, role, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        Ok(row.map(|r| r.0))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, name = $4, phone = $5, role = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(*user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        expect_one(result.rows_affected(), "user")
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<Page<User>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, password_hash, name, phone, role, created_at, updated_at
            FROM users
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;
        Ok(Page::new(rows.into_iter().map(|r| r.0).collect(), total as u64, page))
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        expect_one(result.rows_affected(), "user")
    }
}

#[async_trait]
impl AddressStore for PostgresStore {
    async fn list_addresses(&self, user_id: UserId) -> StoreResult<Vec<Address>> {
        let rows: Vec<AddressRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, recipient, phone, country, city, street, postal_code, is_default, created_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at ASC
            "#,
        )
        .bind(*user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_addresses", e))?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn get_address(&self, id: AddressId) -> StoreResult<Option<Address>> {
        let row: Option<AddressRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, recipient, phone, country, city, street, postal_code, is_default, created_at
            FROM addresses
            WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_address", e))?;
        Ok(row.map(|r| r.0))
    }

    #[instrument(skip(self, address), fields(address_id = %address.id), err)]
    async fn save_address(&self, address: &Address) -> StoreResult<()> {
        let mut tx = self.begin("save_address").await?;
        if address.is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND id <> $2")
                .bind(*address.user_id.as_uuid())
                .bind(*address.id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("clear_default_address", e))?;
        }
        sqlx::query(
            r#"
            INSERT INTO addresses (id, user_id, recipient, phone, country, city, street, postal_code, is_default, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                recipient = EXCLUDED.recipient,
                phone = EXCLUDED.phone,
                country = EXCLUDED.country,
                city = EXCLUDED.city,
                street = EXCLUDED.street,
                postal_code = EXCLUDED.postal_code,
                is_default = EXCLUDED.is_default
            "#,
        )
        .bind(*address.id.as_uuid())
        .bind(*address.user_id.as_uuid())
        .bind(&address.recipient)
        .bind(&address.phone)
        .bind(&address.country)
        .bind(&address.city)
        .bind(&address.street)
        .bind(&address.postal_code)
        .bind(address.is_default)
        .bind(address.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("save_address", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn delete_address(&self, id: AddressId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_address", e))?;
        expect_one(result.rows_affected(), "address")
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, name, slug, description, parent_id, created_at, updated_at FROM categories ORDER BY name, id",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, name, slug, description, parent_id, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_category", e))?;
        Ok(row.map(|r| r.0))
    }

    #[instrument(skip(self, category), fields(slug = %category.slug), err)]
    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug, description, parent_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.parent_id.map(|p| *p.as_uuid()))
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn update_category(&self, category: &Category) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, slug = $3, description = $4, parent_id = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(*category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.parent_id.map(|p| *p.as_uuid()))
        .bind(category.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_category", e))?;
        expect_one(result.rows_affected(), "category")
    }

    #[instrument(skip(self), err)]
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        expect_one(result.rows_affected(), "category")
    }

    #[instrument(skip(self, filter), err)]
    async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> StoreResult<Page<Product>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p WHERE TRUE");
        push_product_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let mut select = QueryBuilder::<Postgres>::new(
            "SELECT p.id, p.category_id, p.name, p.slug, p.description, p.price, p.stock, p.images, \
             p.is_active, p.created_at, p.updated_at FROM products p WHERE TRUE",
        );
        push_product_filter(&mut select, filter);
        select.push(match filter.sort {
            ProductSort::Newest => " ORDER BY p.created_at DESC, p.id DESC",
            ProductSort::PriceAsc => " ORDER BY p.price ASC, p.created_at DESC, p.id DESC",
            ProductSort::PriceDesc => " ORDER BY p.price DESC, p.created_at DESC, p.id DESC",
            ProductSort::Name => " ORDER BY LOWER(p.name) ASC, p.created_at DESC, p.id DESC",
        });
        select.push(" LIMIT ").push_bind(page.limit() as i64);
        select.push(" OFFSET ").push_bind(page.offset() as i64);

        let rows: Vec<ProductRow> = select
            .build_query_as()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let mut products: Vec<Product> = rows.into_iter().map(|r| r.0).collect();
        self.load_variants(&mut products).await?;
        Ok(Page::new(products, total as u64, page))
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.get_products(&[id]).await?.into_iter().next())
    }

    async fn get_products(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, category_id, name, slug, description, price, stock, images, is_active, created_at, updated_at
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(uuids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_products", e))?;
        let mut products: Vec<Product> = rows.into_iter().map(|r| r.0).collect();
        self.load_variants(&mut products).await?;
        Ok(products)
    }

    #[instrument(skip(self, product), fields(slug = %product.slug), err)]
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut tx = self.begin("insert_product").await?;
        sqlx::query(
            r#"
            INSERT INTO products (id, category_id, name, slug, description, price, stock, images, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(product.category_id.map(|c| *c.as_uuid()))
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(Json(&product.images))
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        for variant in &product.variants {
            insert_variant_row(&mut tx, variant).await?;
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET category_id = $2, name = $3, slug = $4, description = $5, price = $6, stock = $7,
                images = $8, is_active = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(product.category_id.map(|c| *c.as_uuid()))
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(Json(&product.images))
        .bind(product.is_active)
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        expect_one(result.rows_affected(), "product")
    }

    #[instrument(skip(self), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<ProductRemoval> {
        let mut tx = self.begin("delete_product").await?;
        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)")
                .bind(*id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_product", e))?;

        let result = if referenced {
            sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        } else {
            sqlx::query("DELETE FROM products WHERE id = $1")
        }
        .bind(*id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_product", e))?;
        expect_one(result.rows_affected(), "product")?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(if referenced {
            ProductRemoval::Deactivated
        } else {
            ProductRemoval::Deleted
        })
    }

    #[instrument(skip(self, variant), fields(sku = %variant.sku), err)]
    async fn insert_variant(&self, variant: &ProductVariant) -> StoreResult<()> {
        let mut tx = self.begin("insert_variant").await?;
        insert_variant_row(&mut tx, variant).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self, variant), fields(variant_id = %variant.id), err)]
    async fn update_variant(&self, variant: &ProductVariant) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE product_variants SET name = $3, sku = $4, price = $5, stock = $6 WHERE id = $1 AND product_id = $2",
        )
        .bind(*variant.id.as_uuid())
        .bind(*variant.product_id.as_uuid())
        .bind(&variant.name)
        .bind(&variant.sku)
        .bind(variant.price)
        .bind(variant.stock)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_variant", e))?;
        expect_one(result.rows_affected(), "variant")
    }

    #[instrument(skip(self), err)]
    async fn delete_variant(&self, product_id: ProductId, id: VariantId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM product_variants WHERE id = $1 AND product_id = $2")
            .bind(*id.as_uuid())
            .bind(*product_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_variant", e))?;
        expect_one(result.rows_affected(), "variant")
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn cart_items(&self, user_id: UserId) -> StoreResult<Vec<CartItem>> {
        let rows: Vec<CartItemRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, product_id, variant_id, quantity, created_at, updated_at
            FROM cart_items
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(*user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("cart_items", e))?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn get_cart_item(&self, id: CartItemId) -> StoreResult<Option<CartItem>> {
        let row: Option<CartItemRow> = sqlx::query_as(
            "SELECT id, user_id, product_id, variant_id, quantity, created_at, updated_at FROM cart_items WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_cart_item", e))?;
        Ok(row.map(|r| r.0))
    }

    async fn save_cart_item(&self, item: &CartItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, variant_id, quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(*item.id.as_uuid())
        .bind(*item.user_id.as_uuid())
        .bind(*item.product_id.as_uuid())
        .bind(item.variant_id.map(|v| *v.as_uuid()))
        .bind(item.quantity)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_cart_item", e))?;
        Ok(())
    }

    async fn delete_cart_item(&self, id: CartItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_cart_item", e))?;
        expect_one(result.rows_affected(), "cart item")
    }

    async fn clear_cart(&self, user_id: UserId) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(*user_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[instrument(skip(self, order), fields(order_id = %order.id, items = order.items.len()), err)]
    async fn place_order(&self, order: &Order) -> StoreResult<()> {
        let mut tx = self.begin("place_order").await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, total, currency, shipping_address, comment, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(*order.id.as_uuid())
        .bind(*order.user_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.total)
        .bind(order.currency.as_str())
        .bind(Json(&order.shipping_address))
        .bind(&order.comment)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, variant_id, name, unit_price, quantity, line_total, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(*item.id.as_uuid())
            .bind(*item.order_id.as_uuid())
            .bind(*item.product_id.as_uuid())
            .bind(item.variant_id.map(|v| *v.as_uuid()))
            .bind(&item.name)
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.line_total)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(*order.user_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, status, total, currency, shipping_address, comment, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        let Some(OrderRow(order)) = row else {
            return Ok(None);
        };
        let mut orders = [order];
        self.load_items(&mut orders).await?;
        let [order] = orders;
        Ok(Some(order))
    }

    async fn list_orders_for_user(&self, user_id: UserId, page: PageRequest) -> StoreResult<Page<Order>> {
        self.page_orders("list_orders_for_user", Some(user_id), None, page).await
    }

    async fn list_orders(&self, status: Option<OrderStatus>, page: PageRequest) -> StoreResult<Page<Order>> {
        self.page_orders("list_orders", None, status, page).await
    }

    #[instrument(skip(self), err)]
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tx = self.begin("update_order_status").await?;
        let current = lock_order_status(&mut tx, *id.as_uuid()).await?;
        if current != from {
            return Err(order_moved(from, current));
        }
        set_order_status(&mut tx, *id.as_uuid(), from, to, at).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

#[async_trait]
impl PaymentStore for PostgresStore {
    #[instrument(skip(self, payment), fields(payment_id = %payment.id, order_id = %payment.order_id), err)]
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, provider, external_id, amount, currency, status, confirmation_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(*payment.id.as_uuid())
        .bind(*payment.order_id.as_uuid())
        .bind(&payment.provider)
        .bind(&payment.external_id)
        .bind(payment.amount)
        .bind(payment.currency.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.confirmation_url)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_payment", e))?;
        Ok(())
    }

    async fn get_payment(&self, id: PaymentId) -> StoreResult<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, provider, external_id, amount, currency, status, confirmation_url, created_at, updated_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_payment", e))?;
        Ok(row.map(|r| r.0))
    }

    async fn find_payment_by_external_id(&self, external_id: &str) -> StoreResult<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, provider, external_id, amount, currency, status, confirmation_url, created_at, updated_at
            FROM payments
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_payment_by_external_id", e))?;
        Ok(row.map(|r| r.0))
    }

    async fn payments_for_order(&self, order_id: OrderId) -> StoreResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, provider, external_id, amount, currency, status, confirmation_url, created_at, updated_at
            FROM payments
            WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(*order_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("payments_for_order", e))?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    #[instrument(skip(self, payment), fields(payment_id = %payment.id, status = %payment.status), err)]
    async fn update_payment(&self, payment: &Payment) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET external_id = $2, status = $3, confirmation_url = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(*payment.id.as_uuid())
        .bind(&payment.external_id)
        .bind(payment.status.as_str())
        .bind(&payment.confirmation_url)
        .bind(payment.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_payment", e))?;
        expect_one(result.rows_affected(), "payment")
    }

    #[instrument(skip(self), err)]
    async fn delete_payment(&self, id: PaymentId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_payment", e))?;
        expect_one(result.rows_affected(), "payment")
    }

    #[instrument(
        skip(self, settlement),
        fields(
            to = %settlement.payment_status,
            order_status = ?settlement.order_status,
            decrement_stock = settlement.decrement_stock
        ),
        err
    )]
    async fn settle_payment(
        &self,
        id: PaymentId,
        from: PaymentStatus,
        settlement: &Settlement,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Settlement>> {
        let mut tx = self.begin("settle_payment").await?;

        let order_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE payments SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2 RETURNING order_id",
        )
        .bind(*id.as_uuid())
        .bind(from.as_str())
        .bind(settlement.payment_status.as_str())
        .bind(at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("settle_payment", e))?;

        let Some(order_id) = order_id else {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payments WHERE id = $1)")
                .bind(*id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("settle_payment", e))?;
            if !exists {
                return Err(StoreError::NotFound("payment"));
            }
            debug!(payment_id = %id, expected = %from, "payment already moved on");
            return Ok(None);
        };

        let current = lock_order_status(&mut tx, order_id).await?;
        let applied = settlement.against_order(current);
        if applied != *settlement {
            warn!(
                %order_id,
                %current,
                wanted = ?settlement.order_status,
                "order cannot follow payment; leaving it unchanged"
            );
        }
        if let Some(status) = applied.order_status {
            set_order_status(&mut tx, order_id, current, status, at).await?;
        }
        if applied.decrement_stock {
            decrement_order_stock(&mut tx, order_id).await?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(Some(applied))
    }
}

#[async_trait]
impl ParcelStore for PostgresStore {
    #[instrument(skip(self, parcel), fields(order_id = %parcel.order_id), err)]
    async fn insert_parcel(&self, parcel: &Parcel) -> StoreResult<()> {
        let mut tx = self.begin("insert_parcel").await?;
        sqlx::query(
            r#"
            INSERT INTO parcels (id, order_id, carrier, tracking_number, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*parcel.id.as_uuid())
        .bind(*parcel.order_id.as_uuid())
        .bind(&parcel.carrier)
        .bind(&parcel.tracking_number)
        .bind(parcel.status.as_str())
        .bind(parcel.created_at)
        .bind(parcel.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_parcel", e))?;

        for event in &parcel.events {
            insert_event_row(&mut tx, parcel.id, event).await?;
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn get_parcel(&self, id: ParcelId) -> StoreResult<Option<Parcel>> {
        self.fetch_parcel("id", ParcelKey::Uuid(*id.as_uuid())).await
    }

    async fn parcel_for_order(&self, order_id: OrderId) -> StoreResult<Option<Parcel>> {
        self.fetch_parcel("order_id", ParcelKey::Uuid(*order_id.as_uuid())).await
    }

    async fn find_parcel_by_tracking(&self, tracking_number: &str) -> StoreResult<Option<Parcel>> {
        self.fetch_parcel("tracking_number", ParcelKey::Text(tracking_number)).await
    }

    #[instrument(skip(self, parcel, event), fields(parcel_id = %parcel.id, status = %event.status), err)]
    async fn record_parcel_status(
        &self,
        parcel: &Parcel,
        event: &ParcelEvent,
        order_from: OrderStatus,
        order_status: Option<OrderStatus>,
    ) -> StoreResult<()> {
        let mut tx = self.begin("record_parcel_status").await?;
        let order_id = *parcel.order_id.as_uuid();
        let current = lock_order_status(&mut tx, order_id).await?;
        if current != order_from {
            return Err(order_moved(order_from, current));
        }

        let result = sqlx::query("UPDATE parcels SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(*parcel.id.as_uuid())
            .bind(parcel.status.as_str())
            .bind(parcel.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_parcel", e))?;
        expect_one(result.rows_affected(), "parcel")?;

        insert_event_row(&mut tx, parcel.id, event).await?;

        if let Some(status) = order_status {
            set_order_status(&mut tx, order_id, current, status, event.at).await?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn push_product_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if !filter.include_inactive {
        qb.push(" AND p.is_active");
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND p.category_id = ").push_bind(*category_id.as_uuid());
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if filter.in_stock {
        qb.push(
            " AND (CASE WHEN EXISTS (SELECT 1 FROM product_variants v WHERE v.product_id = p.id) \
             THEN (SELECT SUM(v.stock) FROM product_variants v WHERE v.product_id = p.id) \
             ELSE p.stock END) > 0",
        );
    }
    if let Some(needle) = filter.search_needle() {
        let pattern = format!("%{needle}%");
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

async fn insert_variant_row(tx: &mut Transaction<'static, Postgres>, variant: &ProductVariant) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO product_variants (id, product_id, name, sku, price, stock)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(*variant.id.as_uuid())
    .bind(*variant.product_id.as_uuid())
    .bind(&variant.name)
    .bind(&variant.sku)
    .bind(variant.price)
    .bind(variant.stock)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_variant", e))?;
    Ok(())
}

async fn insert_event_row(
    tx: &mut Transaction<'static, Postgres>,
    parcel_id: ParcelId,
    event: &ParcelEvent,
) -> StoreResult<()> {
    sqlx::query("INSERT INTO parcel_events (parcel_id, status, location, note, at) VALUES ($1, $2, $3, $4, $5)")
        .bind(*parcel_id.as_uuid())
        .bind(event.status.as_str())
        .bind(&event.location)
        .bind(&event.note)
        .bind(event.at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_parcel_event", e))?;
    Ok(())
}

/// Lock the order row for the rest of the transaction and read its status.
async fn lock_order_status(tx: &mut Transaction<'static, Postgres>, order_id: Uuid) -> StoreResult<OrderStatus> {
    let raw: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_order", e))?;
    let raw = raw.ok_or(StoreError::NotFound("order"))?;
    raw.parse()
        .map_err(|e| StoreError::Database(format!("order {order_id} has unreadable status: {e}")))
}

async fn set_order_status(
    tx: &mut Transaction<'static, Postgres>,
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
    at: DateTime<Utc>,
) -> StoreResult<()> {
    let result = sqlx::query("UPDATE orders SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2")
        .bind(order_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_order_status", e))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict(format!("order {order_id} is no longer {from}")));
    }
    Ok(())
}

/// Take every item of an order off stock, locking each row first.
async fn decrement_order_stock(tx: &mut Transaction<'static, Postgres>, order_id: Uuid) -> StoreResult<()> {
    let items: Vec<(Uuid, Option<Uuid>, i64)> = sqlx::query_as(
        "SELECT product_id, variant_id, quantity FROM order_items WHERE order_id = $1 ORDER BY position",
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("load_order_items", e))?;

    for (product_id, variant_id, quantity) in items {
        let (table, id) = match variant_id {
            Some(variant_id) => ("product_variants", variant_id),
            None => ("products", product_id),
        };
        let stock: Option<i64> = sqlx::query_scalar(&format!("SELECT stock FROM {table} WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("lock_stock", e))?;

        let Some(stock) = stock else {
            warn!(%product_id, ?variant_id, "ordered item no longer exists; stock not decremented");
            continue;
        };
        let (next, clamped) = decrement_clamped(stock, quantity);
        if clamped {
            warn!(%product_id, ?variant_id, requested = quantity, available = stock, "stock clamped at zero");
        }
        sqlx::query(&format!("UPDATE {table} SET stock = $2 WHERE id = $1"))
            .bind(id)
            .bind(next)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("decrement_stock", e))?;
    }
    Ok(())
}

fn expect_one(rows_affected: u64, what: &'static str) -> StoreResult<()> {
    if rows_affected == 0 {
        return Err(StoreError::NotFound(what));
    }
    Ok(())
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(unique_message(&constraint)),
                Some("23503") => foreign_key_error(operation, &constraint),
                Some("23514") => StoreError::Domain(DomainError::validation(format!(
                    "{operation}: check constraint {constraint} violated"
                ))),
                _ => StoreError::Database(format!("database error in {}: {}", operation, db_err.message())),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Database(format!("connection pool closed in {}", operation)),
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn unique_message(constraint: &str) -> String {
    match constraint {
        "users_email_key" => "email already registered",
        "categories_slug_key" => "category slug is taken",
        "products_slug_key" => "product slug is taken",
        "product_variants_sku_key" => "sku is taken",
        "cart_items_target" => "item is already in the cart",
        "payments_external_id_key" => "external payment id already recorded",
        "payments_one_open_per_order" => "order already has an open payment",
        "parcels_order_id_key" => "order already has a parcel",
        "parcels_tracking_number_key" => "tracking number is taken",
        "addresses_one_default" => "user already has a default address",
        _ => "duplicate record",
    }
    .to_string()
}

fn foreign_key_error(operation: &str, constraint: &str) -> StoreError {
    let deleting = operation.starts_with("delete");
    match constraint {
        "orders_user_id_fkey" if deleting => StoreError::Conflict("user has orders".to_string()),
        "products_category_id_fkey" if deleting => StoreError::Conflict("category has products".to_string()),
        "order_items_product_id_fkey" if deleting => StoreError::Conflict("product has orders".to_string()),
        "products_category_id_fkey" => StoreError::NotFound("category"),
        "categories_parent_id_fkey" => StoreError::NotFound("parent category"),
        "product_variants_product_id_fkey" => StoreError::NotFound("product"),
        "payments_order_id_fkey" | "parcels_order_id_fkey" => StoreError::NotFound("order"),
        _ => StoreError::Conflict(format!("{operation}: referenced record ({constraint})")),
    }
}

fn decode<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.to_string().into(),
    })
}

fn currency(row: &PgRow) -> Result<Currency, sqlx::Error> {
    let raw: String = row.try_get("currency")?;
    Currency::new(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: "currency".to_string(),
        source: e.to_string().into(),
    })
}

// SQLx row types

struct UserRow(User);

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow(User {
            id: UserId::from_uuid(row.try_get("id")?),
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            role: decode::<Role>(row, "role")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

struct AddressRow(Address);

impl<'r> FromRow<'r, PgRow> for AddressRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AddressRow(Address {
            id: AddressId::from_uuid(row.try_get("id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            recipient: row.try_get("recipient")?,
            phone: row.try_get("phone")?,
            country: row.try_get("country")?,
            city: row.try_get("city")?,
            street: row.try_get("street")?,
            postal_code: row.try_get("postal_code")?,
            is_default: row.try_get("is_default")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

struct CategoryRow(Category);

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let parent: Option<Uuid> = row.try_get("parent_id")?;
        Ok(CategoryRow(Category {
            id: CategoryId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            description: row.try_get("description")?,
            parent_id: parent.map(CategoryId::from_uuid),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

struct ProductRow(Product);

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let category: Option<Uuid> = row.try_get("category_id")?;
        let Json(images): Json<Vec<String>> = row.try_get("images")?;
        Ok(ProductRow(Product {
            id: ProductId::from_uuid(row.try_get("id")?),
            category_id: category.map(CategoryId::from_uuid),
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            images,
            is_active: row.try_get("is_active")?,
            variants: Vec::new(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

struct VariantRow(ProductVariant);

impl<'r> FromRow<'r, PgRow> for VariantRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(VariantRow(ProductVariant {
            id: VariantId::from_uuid(row.try_get("id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
        }))
    }
}

struct CartItemRow(CartItem);

impl<'r> FromRow<'r, PgRow> for CartItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let variant: Option<Uuid> = row.try_get("variant_id")?;
        Ok(CartItemRow(CartItem {
            id: CartItemId::from_uuid(row.try_get("id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            variant_id: variant.map(VariantId::from_uuid),
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

struct OrderRow(Order);

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let Json(shipping_address): Json<AddressSnapshot> = row.try_get("shipping_address")?;
        Ok(OrderRow(Order {
            id: OrderId::from_uuid(row.try_get("id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            status: decode::<OrderStatus>(row, "status")?,
            total: row.try_get("total")?,
            currency: currency(row)?,
            shipping_address,
            comment: row.try_get("comment")?,
            items: Vec::new(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

struct OrderItemRow(OrderItem);

impl<'r> FromRow<'r, PgRow> for OrderItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let variant: Option<Uuid> = row.try_get("variant_id")?;
        Ok(OrderItemRow(OrderItem {
            id: OrderItemId::from_uuid(row.try_get("id")?),
            order_id: OrderId::from_uuid(row.try_get("order_id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            variant_id: variant.map(VariantId::from_uuid),
            name: row.try_get("name")?,
            unit_price: row.try_get("unit_price")?,
            quantity: row.try_get("quantity")?,
            line_total: row.try_get("line_total")?,
        }))
    }
}

struct PaymentRow(Payment);

impl<'r> FromRow<'r, PgRow> for PaymentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PaymentRow(Payment {
            id: PaymentId::from_uuid(row.try_get("id")?),
            order_id: OrderId::from_uuid(row.try_get("order_id")?),
            provider: row.try_get("provider")?,
            external_id: row.try_get("external_id")?,
            amount: row.try_get("amount")?,
            currency: currency(row)?,
            status: decode::<PaymentStatus>(row, "status")?,
            confirmation_url: row.try_get("confirmation_url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

struct ParcelRow(Parcel);

impl<'r> FromRow<'r, PgRow> for ParcelRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ParcelRow(Parcel {
            id: ParcelId::from_uuid(row.try_get("id")?),
            order_id: OrderId::from_uuid(row.try_get("order_id")?),
            carrier: row.try_get("carrier")?,
            tracking_number: row.try_get("tracking_number")?,
            status: decode::<ParcelStatus>(row, "status")?,
            events: Vec::new(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

struct ParcelEventRow(ParcelEvent);

impl<'r> FromRow<'r, PgRow> for ParcelEventRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ParcelEventRow(ParcelEvent {
            status: decode::<ParcelStatus>(row, "status")?,
            location: row.try_get("location")?,
            note: row.try_get("note")?,
            at: row.try_get("at")?,
        }))
    }
}
