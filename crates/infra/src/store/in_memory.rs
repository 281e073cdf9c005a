use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use storefront_auth::User;
use storefront_catalog::{Category, Product, ProductFilter, ProductVariant};
use storefront_core::{
    AddressId, CartItemId, CategoryId, Entity, OrderId, Page, PageRequest, ParcelId, PaymentId, ProductId,
    UserId, VariantId,
};
use storefront_payments::{Payment, PaymentStatus, Settlement};
use storefront_sales::{Address, CartItem, Order, OrderStatus};
use storefront_shipping::{Parcel, ParcelEvent};

use super::{
    AddressStore, CartStore, CatalogStore, OrderStore, ParcelStore, PaymentStore, ProductRemoval,
    StoreError, StoreResult, UserStore, decrement_clamped, order_moved,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    addresses: HashMap<AddressId, Address>,
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    cart: HashMap<CartItemId, CartItem>,
    orders: HashMap<OrderId, Order>,
    payments: HashMap<PaymentId, Payment>,
    parcels: HashMap<ParcelId, Parcel>,
}

impl Tables {
    fn product_has_orders(&self, id: ProductId) -> bool {
        self.orders
            .values()
            .any(|o| o.items.iter().any(|i| i.product_id == id))
    }

    fn sku_taken(&self, sku: &str, except: VariantId) -> bool {
        self.products
            .values()
            .flat_map(|p| p.variants.iter())
            .any(|v| v.sku == sku && v.id != except)
    }

    fn decrement_stock(&mut self, order_id: OrderId) {
        let Some(order) = self.orders.get(&order_id) else {
            return;
        };
        let decrements = order.stock_decrements();
        for d in decrements {
            let Some(product) = self.products.get_mut(&d.product_id) else {
                warn!(product_id = %d.product_id, "ordered product no longer exists; stock not decremented");
                continue;
            };
            let stock = match d.variant_id {
                Some(variant_id) => match product.variant_mut(variant_id) {
                    Some(v) => &mut v.stock,
                    None => {
                        warn!(%variant_id, "ordered variant no longer exists; stock not decremented");
                        continue;
                    }
                },
                None => &mut product.stock,
            };
            let (next, clamped) = decrement_clamped(*stock, d.quantity);
            if clamped {
                warn!(product_id = %d.product_id, requested = d.quantity, available = *stock, "stock clamped at zero");
            }
            *stock = next;
        }
    }
}

/// Insert or replace a record under its own id.
fn upsert<E: Entity + Clone>(table: &mut HashMap<E::Id, E>, record: &E) {
    table.insert(record.id().clone(), record.clone());
}

/// Process-local store for dev and tests.
///
/// A single lock over every table; multi-table operations hold the write
/// lock for their whole duration.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Database("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Database("store lock poisoned".to_string()))
    }
}

fn page_of<T: Clone>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    Page::new(page.slice(&items), total, page)
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        upsert(&mut t.users, user);
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut t = self.write()?;
        let slot = t.users.get_mut(&user.id).ok_or(StoreError::NotFound("user"))?;
        *slot = user.clone();
        Ok(())
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<Page<User>> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page_of(users, page))
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.users.contains_key(&id) {
            return Err(StoreError::NotFound("user"));
        }
        if t.orders.values().any(|o| o.user_id == id) {
            return Err(StoreError::Conflict("user has orders".to_string()));
        }
        t.users.remove(&id);
        t.addresses.retain(|_, a| a.user_id != id);
        t.cart.retain(|_, c| c.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl AddressStore for InMemoryStore {
    async fn list_addresses(&self, user_id: UserId) -> StoreResult<Vec<Address>> {
        let mut list: Vec<Address> = self
            .read()?
            .addresses
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.is_default.cmp(&a.is_default).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(list)
    }

    async fn get_address(&self, id: AddressId) -> StoreResult<Option<Address>> {
        Ok(self.read()?.addresses.get(&id).cloned())
    }

    async fn save_address(&self, address: &Address) -> StoreResult<()> {
        let mut t = self.write()?;
        if address.is_default {
            for other in t.addresses.values_mut() {
                if other.user_id == address.user_id && other.id != address.id {
                    other.is_default = false;
                }
            }
        }
        upsert(&mut t.addresses, address);
        Ok(())
    }

    async fn delete_address(&self, id: AddressId) -> StoreResult<()> {
        self.write()?
            .addresses
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("address"))
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let mut list: Vec<Category> = self.read()?.categories.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.categories.values().any(|c| c.slug == category.slug) {
            return Err(StoreError::Conflict(format!("category slug '{}' is taken", category.slug)));
        }
        upsert(&mut t.categories, category);
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.categories.values().any(|c| c.slug == category.slug && c.id != category.id) {
            return Err(StoreError::Conflict(format!("category slug '{}' is taken", category.slug)));
        }
        let slot = t.categories.get_mut(&category.id).ok_or(StoreError::NotFound("category"))?;
        *slot = category.clone();
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.categories.contains_key(&id) {
            return Err(StoreError::NotFound("category"));
        }
        if t.products.values().any(|p| p.category_id == Some(id)) {
            return Err(StoreError::Conflict("category has products".to_string()));
        }
        t.categories.remove(&id);
        for child in t.categories.values_mut() {
            if child.parent_id == Some(id) {
                child.parent_id = None;
            }
        }
        Ok(())
    }

    async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> StoreResult<Page<Product>> {
        let mut products: Vec<Product> = self
            .read()?
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        filter.sort(&mut products);
        Ok(page_of(products, page))
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let t = self.read()?;
        Ok(ids.iter().filter_map(|id| t.products.get(id).cloned()).collect())
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.products.values().any(|p| p.slug == product.slug) {
            return Err(StoreError::Conflict(format!("product slug '{}' is taken", product.slug)));
        }
        if let Some(category_id) = product.category_id {
            if !t.categories.contains_key(&category_id) {
                return Err(StoreError::NotFound("category"));
            }
        }
        upsert(&mut t.products, product);
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.products.values().any(|p| p.slug == product.slug && p.id != product.id) {
            return Err(StoreError::Conflict(format!("product slug '{}' is taken", product.slug)));
        }
        if let Some(category_id) = product.category_id {
            if !t.categories.contains_key(&category_id) {
                return Err(StoreError::NotFound("category"));
            }
        }
        let slot = t.products.get_mut(&product.id).ok_or(StoreError::NotFound("product"))?;
        let variants = std::mem::take(&mut slot.variants);
        *slot = Product {
            variants,
            ..product.clone()
        };
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<ProductRemoval> {
        let mut t = self.write()?;
        if !t.products.contains_key(&id) {
            return Err(StoreError::NotFound("product"));
        }
        if t.product_has_orders(id) {
            if let Some(p) = t.products.get_mut(&id) {
                p.is_active = false;
                p.updated_at = Utc::now();
            }
            return Ok(ProductRemoval::Deactivated);
        }
        t.products.remove(&id);
        t.cart.retain(|_, c| c.product_id != id);
        Ok(ProductRemoval::Deleted)
    }

    async fn insert_variant(&self, variant: &ProductVariant) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.sku_taken(&variant.sku, variant.id) {
            return Err(StoreError::Conflict(format!("sku '{}' is taken", variant.sku)));
        }
        let product = t
            .products
            .get_mut(&variant.product_id)
            .ok_or(StoreError::NotFound("product"))?;
        product.variants.push(variant.clone());
        Ok(())
    }

    async fn update_variant(&self, variant: &ProductVariant) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.sku_taken(&variant.sku, variant.id) {
            return Err(StoreError::Conflict(format!("sku '{}' is taken", variant.sku)));
        }
        let slot = t
            .products
            .get_mut(&variant.product_id)
            .and_then(|p| p.variant_mut(variant.id))
            .ok_or(StoreError::NotFound("variant"))?;
        *slot = variant.clone();
        Ok(())
    }

    async fn delete_variant(&self, product_id: ProductId, id: VariantId) -> StoreResult<()> {
        let mut t = self.write()?;
        let product = t.products.get_mut(&product_id).ok_or(StoreError::NotFound("product"))?;
        let before = product.variants.len();
        product.variants.retain(|v| v.id != id);
        if product.variants.len() == before {
            return Err(StoreError::NotFound("variant"));
        }
        t.cart.retain(|_, c| c.variant_id != Some(id));
        Ok(())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn cart_items(&self, user_id: UserId) -> StoreResult<Vec<CartItem>> {
        let mut items: Vec<CartItem> = self
            .read()?
            .cart
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn get_cart_item(&self, id: CartItemId) -> StoreResult<Option<CartItem>> {
        Ok(self.read()?.cart.get(&id).cloned())
    }

    async fn save_cart_item(&self, item: &CartItem) -> StoreResult<()> {
        let mut t = self.write()?;
        let duplicate = t
            .cart
            .values()
            .any(|c| c.user_id == item.user_id && c.id != item.id && c.same_target(item.product_id, item.variant_id));
        if duplicate {
            return Err(StoreError::Conflict("item is already in the cart".to_string()));
        }
        upsert(&mut t.cart, item);
        Ok(())
    }

    async fn delete_cart_item(&self, id: CartItemId) -> StoreResult<()> {
        self.write()?
            .cart
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("cart item"))
    }

    async fn clear_cart(&self, user_id: UserId) -> StoreResult<()> {
        self.write()?.cart.retain(|_, c| c.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn place_order(&self, order: &Order) -> StoreResult<()> {
        let mut t = self.write()?;
        upsert(&mut t.orders, order);
        t.cart.retain(|_, c| c.user_id != order.user_id);
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId, page: PageRequest) -> StoreResult<Page<Order>> {
        let mut orders: Vec<Order> = self
            .read()?
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(page_of(orders, page))
    }

    async fn list_orders(&self, status: Option<OrderStatus>, page: PageRequest) -> StoreResult<Page<Order>> {
        let mut orders: Vec<Order> = self
            .read()?
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(page_of(orders, page))
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut t = self.write()?;
        let order = t.orders.get_mut(&id).ok_or(StoreError::NotFound("order"))?;
        if order.status != from {
            return Err(order_moved(from, order.status));
        }
        order.status = to;
        order.updated_at = at;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.orders.contains_key(&payment.order_id) {
            return Err(StoreError::NotFound("order"));
        }
        let open = t
            .payments
            .values()
            .any(|p| p.order_id == payment.order_id && p.id != payment.id && !p.status.is_final());
        if open && !payment.status.is_final() {
            return Err(StoreError::Conflict("order already has an open payment".to_string()));
        }
        upsert(&mut t.payments, payment);
        Ok(())
    }

    async fn get_payment(&self, id: PaymentId) -> StoreResult<Option<Payment>> {
        Ok(self.read()?.payments.get(&id).cloned())
    }

    async fn find_payment_by_external_id(&self, external_id: &str) -> StoreResult<Option<Payment>> {
        Ok(self
            .read()?
            .payments
            .values()
            .find(|p| p.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn payments_for_order(&self, order_id: OrderId) -> StoreResult<Vec<Payment>> {
        let mut list: Vec<Payment> = self
            .read()?
            .payments
            .values()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn update_payment(&self, payment: &Payment) -> StoreResult<()> {
        let mut t = self.write()?;
        if let Some(external_id) = payment.external_id.as_deref() {
            let taken = t
                .payments
                .values()
                .any(|p| p.id != payment.id && p.external_id.as_deref() == Some(external_id));
            if taken {
                return Err(StoreError::Conflict("external payment id already recorded".to_string()));
            }
        }
        let slot = t.payments.get_mut(&payment.id).ok_or(StoreError::NotFound("payment"))?;
        *slot = payment.clone();
        Ok(())
    }

    async fn delete_payment(&self, id: PaymentId) -> StoreResult<()> {
        self.write()?
            .payments
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("payment"))
    }

    async fn settle_payment(
        &self,
        id: PaymentId,
        from: PaymentStatus,
        settlement: &Settlement,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Settlement>> {
        let mut guard = self.write()?;
        let t = &mut *guard;
        let payment = t.payments.get_mut(&id).ok_or(StoreError::NotFound("payment"))?;
        if payment.status != from {
            debug!(payment_id = %id, current = %payment.status, expected = %from, "payment already moved on");
            return Ok(None);
        }
        let order = t.orders.get_mut(&payment.order_id).ok_or(StoreError::NotFound("order"))?;
        let applied = settlement.against_order(order.status);
        if applied != *settlement {
            warn!(
                order_id = %order.id,
                current = %order.status,
                wanted = ?settlement.order_status,
                "order cannot follow payment; leaving it unchanged"
            );
        }

        payment.status = applied.payment_status;
        payment.updated_at = at;
        if let Some(status) = applied.order_status {
            order.status = status;
            order.updated_at = at;
        }
        let order_id = order.id;
        if applied.decrement_stock {
            t.decrement_stock(order_id);
        }
        Ok(Some(applied))
    }
}

#[async_trait]
impl ParcelStore for InMemoryStore {
    async fn insert_parcel(&self, parcel: &Parcel) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.parcels.values().any(|p| p.order_id == parcel.order_id) {
            return Err(StoreError::Conflict("order already has a parcel".to_string()));
        }
        if t.parcels.values().any(|p| p.tracking_number == parcel.tracking_number) {
            return Err(StoreError::Conflict("tracking number is taken".to_string()));
        }
        upsert(&mut t.parcels, parcel);
        Ok(())
    }

    async fn get_parcel(&self, id: ParcelId) -> StoreResult<Option<Parcel>> {
        Ok(self.read()?.parcels.get(&id).cloned())
    }

    async fn parcel_for_order(&self, order_id: OrderId) -> StoreResult<Option<Parcel>> {
        Ok(self.read()?.parcels.values().find(|p| p.order_id == order_id).cloned())
    }

    async fn find_parcel_by_tracking(&self, tracking_number: &str) -> StoreResult<Option<Parcel>> {
        Ok(self
            .read()?
            .parcels
            .values()
            .find(|p| p.tracking_number == tracking_number)
            .cloned())
    }

    async fn record_parcel_status(
        &self,
        parcel: &Parcel,
        event: &ParcelEvent,
        order_from: OrderStatus,
        order_status: Option<OrderStatus>,
    ) -> StoreResult<()> {
        let mut guard = self.write()?;
        let t = &mut *guard;
        let order = t.orders.get_mut(&parcel.order_id).ok_or(StoreError::NotFound("order"))?;
        if order.status != order_from {
            return Err(order_moved(order_from, order.status));
        }
        let slot = t.parcels.get_mut(&parcel.id).ok_or(StoreError::NotFound("parcel"))?;

        let mut updated = parcel.clone();
        if updated.events.last() != Some(event) {
            updated.events.push(event.clone());
        }
        *slot = updated;
        if let Some(status) = order_status {
            order.status = status;
            order.updated_at = event.at;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_auth::NewUser;
    use storefront_catalog::{NewProduct, NewVariant};
    use storefront_core::Currency;
    use storefront_payments::settlement;
    use storefront_sales::{NewAddress, build_order};
    use storefront_shipping::ParcelStatus;

    fn user() -> User {
        NewUser {
            email: format!("{}@example.com", UserId::new()),
            password: "password1".into(),
            password_confirm: "password1".into(),
            name: "Test".into(),
        }
        .into_user("hash".into(), Utc::now())
    }

    fn product(stock: i64) -> Product {
        NewProduct {
            name: format!("Item {}", ProductId::new()),
            price: 1000,
            stock,
            is_active: true,
            ..Default::default()
        }
        .into_product(Utc::now())
        .unwrap()
    }

    fn address(user_id: UserId) -> Address {
        NewAddress {
            recipient: "Ivan".into(),
            phone: "+7900".into(),
            country: "RU".into(),
            city: "Moscow".into(),
            street: "Arbat 1".into(),
            postal_code: "119002".into(),
            is_default: false,
        }
        .into_address(user_id, Utc::now())
        .unwrap()
    }

    async fn placed_order(store: &InMemoryStore, p: &Product, qty: i64) -> Order {
        let u = user();
        store.insert_user(&u).await.unwrap();
        let item = CartItem::new(u.id, p.id, None, qty, Utc::now());
        store.save_cart_item(&item).await.unwrap();
        let order = build_order(u.id, [(&item, Some(p))], &address(u.id), None, Currency::rub(), Utc::now()).unwrap();
        store.place_order(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = InMemoryStore::new();
        let u = user();
        store.insert_user(&u).await.unwrap();
        let mut dup = user();
        dup.email = u.email.clone();
        assert!(matches!(store.insert_user(&dup).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn default_address_is_exclusive() {
        let store = InMemoryStore::new();
        let uid = UserId::new();
        let mut a = address(uid);
        a.is_default = true;
        let mut b = address(uid);
        b.is_default = true;
        store.save_address(&a).await.unwrap();
        store.save_address(&b).await.unwrap();

        let list = store.list_addresses(uid).await.unwrap();
        assert_eq!(list.iter().filter(|x| x.is_default).count(), 1);
        assert!(store.get_address(b.id).await.unwrap().unwrap().is_default);
    }

    #[tokio::test]
    async fn place_order_clears_cart() {
        let store = InMemoryStore::new();
        let p = product(5);
        store.insert_product(&p).await.unwrap();
        let order = placed_order(&store, &p, 2).await;

        assert!(store.cart_items(order.user_id).await.unwrap().is_empty());
        assert_eq!(store.get_order(order.id).await.unwrap().unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn settlement_decrements_stock_once() {
        let store = InMemoryStore::new();
        let p = product(5);
        store.insert_product(&p).await.unwrap();
        let order = placed_order(&store, &p, 2).await;

        let payment = Payment::pending(order.id, order.total_money(), Utc::now());
        store.insert_payment(&payment).await.unwrap();

        let s = settlement(PaymentStatus::Pending, PaymentStatus::Succeeded).unwrap();
        assert_eq!(store.settle_payment(payment.id, PaymentStatus::Pending, &s, Utc::now()).await.unwrap(), Some(s));
        assert_eq!(store.settle_payment(payment.id, PaymentStatus::Pending, &s, Utc::now()).await.unwrap(), None);

        assert_eq!(store.get_product(p.id).await.unwrap().unwrap().stock, 3);
        assert_eq!(store.get_order(order.id).await.unwrap().unwrap().status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn stock_decrement_clamps_at_zero() {
        let store = InMemoryStore::new();
        let p = product(3);
        store.insert_product(&p).await.unwrap();
        let order = placed_order(&store, &p, 3).await;

        let mut drained = store.get_product(p.id).await.unwrap().unwrap();
        drained.stock = 1;
        store.update_product(&drained).await.unwrap();

        let payment = Payment::pending(order.id, order.total_money(), Utc::now());
        store.insert_payment(&payment).await.unwrap();
        let s = settlement(PaymentStatus::Pending, PaymentStatus::Succeeded).unwrap();
        store.settle_payment(payment.id, PaymentStatus::Pending, &s, Utc::now()).await.unwrap();

        assert_eq!(store.get_product(p.id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn ordered_product_is_deactivated_not_deleted() {
        let store = InMemoryStore::new();
        let ordered = product(5);
        let spare = product(5);
        store.insert_product(&ordered).await.unwrap();
        store.insert_product(&spare).await.unwrap();
        placed_order(&store, &ordered, 1).await;

        assert_eq!(store.delete_product(ordered.id).await.unwrap(), ProductRemoval::Deactivated);
        assert!(!store.get_product(ordered.id).await.unwrap().unwrap().is_active);
        assert_eq!(store.delete_product(spare.id).await.unwrap(), ProductRemoval::Deleted);
        assert!(store.get_product(spare.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_with_orders_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let p = product(5);
        store.insert_product(&p).await.unwrap();
        let order = placed_order(&store, &p, 1).await;
        assert!(matches!(store.delete_user(order.user_id).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn sku_is_unique_across_products() {
        let store = InMemoryStore::new();
        let a = product(1);
        let b = product(1);
        store.insert_product(&a).await.unwrap();
        store.insert_product(&b).await.unwrap();

        let v = |pid: ProductId| {
            NewVariant {
                name: "XL".into(),
                sku: "TEE-XL".into(),
                price: None,
                stock: 1,
            }
            .into_variant(pid)
            .unwrap()
        };
        store.insert_variant(&v(a.id)).await.unwrap();
        assert!(matches!(store.insert_variant(&v(b.id)).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn duplicate_cart_target_conflicts() {
        let store = InMemoryStore::new();
        let uid = UserId::new();
        let pid = ProductId::new();
        store.save_cart_item(&CartItem::new(uid, pid, None, 1, Utc::now())).await.unwrap();
        let again = CartItem::new(uid, pid, None, 1, Utc::now());
        assert!(matches!(store.save_cart_item(&again).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn success_after_cancel_leaves_order_and_stock_alone() {
        let store = InMemoryStore::new();
        let p = product(5);
        store.insert_product(&p).await.unwrap();
        let order = placed_order(&store, &p, 2).await;
        let payment = Payment::pending(order.id, order.total_money(), Utc::now());
        store.insert_payment(&payment).await.unwrap();

        let plan = settlement(PaymentStatus::Pending, PaymentStatus::Succeeded).unwrap();
        store
            .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled, Utc::now())
            .await
            .unwrap();
        let applied = store
            .settle_payment(payment.id, PaymentStatus::Pending, &plan, Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert!(applied.leaves_order());
        assert_eq!(store.get_order(order.id).await.unwrap().unwrap().status, OrderStatus::Cancelled);
        assert_eq!(store.get_product(p.id).await.unwrap().unwrap().stock, 5);
        assert_eq!(
            store.get_payment(payment.id).await.unwrap().unwrap().status,
            PaymentStatus::Succeeded
        );
    }

    #[tokio::test]
    async fn second_successful_payment_takes_no_stock() {
        let store = InMemoryStore::new();
        let p = product(5);
        store.insert_product(&p).await.unwrap();
        let order = placed_order(&store, &p, 2).await;
        let plan = settlement(PaymentStatus::Pending, PaymentStatus::Succeeded).unwrap();

        let first = Payment::pending(order.id, order.total_money(), Utc::now());
        store.insert_payment(&first).await.unwrap();
        store.settle_payment(first.id, PaymentStatus::Pending, &plan, Utc::now()).await.unwrap();

        let second = Payment::pending(order.id, order.total_money(), Utc::now());
        store.insert_payment(&second).await.unwrap();
        let applied = store
            .settle_payment(second.id, PaymentStatus::Pending, &plan, Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert!(!applied.decrement_stock);
        assert_eq!(store.get_product(p.id).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn order_has_at_most_one_open_payment() {
        let store = InMemoryStore::new();
        let p = product(5);
        store.insert_product(&p).await.unwrap();
        let order = placed_order(&store, &p, 1).await;

        store
            .insert_payment(&Payment::pending(order.id, order.total_money(), Utc::now()))
            .await
            .unwrap();
        let again = Payment::pending(order.id, order.total_money(), Utc::now());
        assert!(matches!(store.insert_payment(&again).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn order_status_update_checks_current_status() {
        let store = InMemoryStore::new();
        let p = product(5);
        store.insert_product(&p).await.unwrap();
        let order = placed_order(&store, &p, 1).await;

        store
            .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled, Utc::now())
            .await
            .unwrap();
        let stale = store
            .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed, Utc::now())
            .await;

        assert!(matches!(stale, Err(StoreError::Conflict(_))));
        assert_eq!(store.get_order(order.id).await.unwrap().unwrap().status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn parcel_status_is_not_recorded_for_a_moved_order() {
        let store = InMemoryStore::new();
        let p = product(5);
        store.insert_product(&p).await.unwrap();
        let order = placed_order(&store, &p, 1).await;
        store
            .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed, Utc::now())
            .await
            .unwrap();

        let mut parcel = Parcel::new(order.id, "CDEK", "TRK-1001", Utc::now()).unwrap();
        store.insert_parcel(&parcel).await.unwrap();
        let (event, order_next) = parcel
            .advance(ParcelStatus::InTransit, None, None, OrderStatus::Confirmed, Utc::now())
            .unwrap();

        store
            .update_order_status(order.id, OrderStatus::Confirmed, OrderStatus::Cancelled, Utc::now())
            .await
            .unwrap();
        let result = store
            .record_parcel_status(&parcel, &event, OrderStatus::Confirmed, order_next)
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.get_order(order.id).await.unwrap().unwrap().status, OrderStatus::Cancelled);
        let stored = store.get_parcel(parcel.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ParcelStatus::Created);
        assert_eq!(stored.events.len(), 1);
    }
}
