use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use storefront_catalog::{Product, Purchasable};
use storefront_core::{CartItemId, ProductId, UserId, VariantId};
use storefront_sales::{merged_quantity, summarize, CartItem, CartSummary};

use super::AppServices;
use crate::app::errors::{ApiError, ApiResult};

impl AppServices {
    pub async fn cart(&self, user_id: UserId) -> ApiResult<CartSummary> {
        let items = self.store.cart_items(user_id).await?;
        let products = self.products_for(&items).await?;
        Ok(summarize(items, |id| products.get(&id), self.settings.currency)?)
    }

    /// Add `quantity` of a product (or variant), merging into an existing line.
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
    ) -> ApiResult<CartSummary> {
        if quantity <= 0 {
            return Err(ApiError::Validation("quantity must be positive".to_string()));
        }
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| ApiError::not_found("product"))?;
        let target = Purchasable::resolve(&product, variant_id)?;

        let now = Utc::now();
        let existing = self
            .store
            .cart_items(user_id)
            .await?
            .into_iter()
            .find(|i| i.same_target(product_id, variant_id));
        let next = merged_quantity(existing.as_ref(), quantity, &target)?;

        let item = match existing {
            Some(mut item) => {
                item.quantity = next;
                item.updated_at = now;
                item
            }
            None => CartItem::new(user_id, product_id, variant_id, next, now),
        };
        self.store.save_cart_item(&item).await?;
        debug!(user_id = %user_id, product_id = %product_id, quantity = next, "cart line saved");

        self.cart(user_id).await
    }

    /// Set a line's quantity; zero removes the line.
    pub async fn set_cart_quantity(&self, user_id: UserId, id: CartItemId, quantity: i64) -> ApiResult<CartSummary> {
        let mut item = self.own_cart_item(user_id, id).await?;
        if quantity < 0 {
            return Err(ApiError::Validation("quantity must not be negative".to_string()));
        }
        if quantity == 0 {
            self.store.delete_cart_item(id).await?;
            return self.cart(user_id).await;
        }

        let product = self
            .store
            .get_product(item.product_id)
            .await?
            .ok_or_else(|| ApiError::not_found("product"))?;
        Purchasable::resolve(&product, item.variant_id)?.ensure_available(quantity)?;

        item.quantity = quantity;
        item.updated_at = Utc::now();
        self.store.save_cart_item(&item).await?;
        self.cart(user_id).await
    }

    pub async fn remove_cart_item(&self, user_id: UserId, id: CartItemId) -> ApiResult<CartSummary> {
        self.own_cart_item(user_id, id).await?;
        self.store.delete_cart_item(id).await?;
        self.cart(user_id).await
    }

    pub async fn clear_cart(&self, user_id: UserId) -> ApiResult<()> {
        self.store.clear_cart(user_id).await?;
        Ok(())
    }

    async fn own_cart_item(&self, user_id: UserId, id: CartItemId) -> ApiResult<CartItem> {
        self.store
            .get_cart_item(id)
            .await?
            .filter(|i| i.user_id == user_id)
            .ok_or_else(|| ApiError::not_found("cart item"))
    }

    pub(super) async fn products_for(&self, items: &[CartItem]) -> ApiResult<HashMap<ProductId, Product>> {
        let mut ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        ids.sort();
        ids.dedup();
        Ok(self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect())
    }
}
