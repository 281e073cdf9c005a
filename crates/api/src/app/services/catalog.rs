use chrono::Utc;
use tracing::{info, instrument};

use storefront_catalog::{
    Category, CategoryPatch, NewCategory, NewProduct, NewVariant, Product, ProductFilter, ProductPatch,
    ProductVariant, VariantPatch,
};
use storefront_core::{CategoryId, Page, PageRequest, ProductId, VariantId};
use storefront_infra::ProductRemoval;

use super::AppServices;
use crate::app::errors::{ApiError, ApiResult};

impl AppServices {
    pub async fn list_categories(&self) -> ApiResult<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    pub async fn get_category(&self, id: CategoryId) -> ApiResult<Category> {
        self.store.get_category(id).await?.ok_or_else(|| ApiError::not_found("category"))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(&self, input: NewCategory) -> ApiResult<Category> {
        if let Some(parent) = input.parent_id {
            self.ensure_parent_category(parent).await?;
        }
        let category = input.into_category(Utc::now())?;
        self.store.insert_category(&category).await?;
        info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    pub async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> ApiResult<Category> {
        let mut category = self.get_category(id).await?;
        if let Some(parent) = patch.parent_id {
            if parent == id {
                return Err(ApiError::Validation("a category cannot be its own parent".to_string()));
            }
            self.ensure_parent_category(parent).await?;
        }
        patch.apply(&mut category, Utc::now())?;
        self.store.update_category(&category).await?;
        Ok(category)
    }

    pub async fn delete_category(&self, id: CategoryId) -> ApiResult<()> {
        self.store.delete_category(id).await?;
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    async fn ensure_parent_category(&self, id: CategoryId) -> ApiResult<()> {
        match self.store.get_category(id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found("parent category")),
        }
    }

    /// Public listing. Only admins may see inactive products.
    pub async fn list_products(
        &self,
        mut filter: ProductFilter,
        page: PageRequest,
        is_admin: bool,
    ) -> ApiResult<Page<Product>> {
        filter.include_inactive &= is_admin;
        Ok(self.store.list_products(&filter, page).await?)
    }

    /// Inactive products are invisible to everyone but admins.
    pub async fn get_product(&self, id: ProductId, is_admin: bool) -> ApiResult<Product> {
        self.store
            .get_product(id)
            .await?
            .filter(|p| p.is_active || is_admin)
            .ok_or_else(|| ApiError::not_found("product"))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: NewProduct) -> ApiResult<Product> {
        if let Some(category) = input.category_id {
            self.get_category(category).await?;
        }
        let product = input.into_product(Utc::now())?;
        self.store.insert_product(&product).await?;
        info!(product_id = %product.id, slug = %product.slug, "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> ApiResult<Product> {
        if let Some(category) = patch.category_id {
            self.get_category(category).await?;
        }
        let mut product = self.get_product(id, true).await?;
        patch.apply(&mut product, Utc::now())?;
        self.store.update_product(&product).await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> ApiResult<ProductRemoval> {
        let removal = self.store.delete_product(id).await?;
        info!(product_id = %id, ?removal, "product removed");
        Ok(removal)
    }

    pub async fn add_variant(&self, product_id: ProductId, input: NewVariant) -> ApiResult<ProductVariant> {
        self.get_product(product_id, true).await?;
        let variant = input.into_variant(product_id)?;
        self.store.insert_variant(&variant).await?;
        Ok(variant)
    }

    pub async fn update_variant(
        &self,
        product_id: ProductId,
        id: VariantId,
        patch: VariantPatch,
    ) -> ApiResult<ProductVariant> {
        let product = self.get_product(product_id, true).await?;
        let mut variant = product.variant(id).cloned().ok_or_else(|| ApiError::not_found("variant"))?;
        patch.apply(&mut variant)?;
        self.store.update_variant(&variant).await?;
        Ok(variant)
    }

    pub async fn delete_variant(&self, product_id: ProductId, id: VariantId) -> ApiResult<()> {
        self.store.delete_variant(product_id, id).await?;
        Ok(())
    }
}
