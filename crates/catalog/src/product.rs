use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainError, DomainResult, Entity, ProductId, VariantId};

use crate::category::{non_empty_name, resolve_slug};

/// A sellable product. Prices are minor units of the store currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: i64,
    pub stock: i64,
    pub images: Vec<String>,
    pub is_active: bool,
    pub variants: Vec<ProductVariant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Product {
    pub fn variant(&self, id: VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn variant_mut(&mut self, id: VariantId) -> Option<&mut ProductVariant> {
        self.variants.iter_mut().find(|v| v.id == id)
    }

    /// Stock across the product and its variants, for listing filters.
    pub fn total_stock(&self) -> i64 {
        if self.variants.is_empty() {
            self.stock
        } else {
            self.variants.iter().map(|v| v.stock).sum()
        }
    }
}

/// Size/colour/etc. option with its own SKU and stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    /// Overrides the product price when set.
    pub price: Option<i64>,
    pub stock: i64,
}

impl Entity for ProductVariant {
    type Id = VariantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: Option<String>,
    pub description: String,
    pub price: i64,
    pub stock: i64,
    pub images: Vec<String>,
    pub is_active: bool,
}

impl NewProduct {
    pub fn into_product(self, now: DateTime<Utc>) -> DomainResult<Product> {
        let name = non_empty_name(&self.name)?;
        let slug = resolve_slug(self.slug.as_deref(), &name)?;
        ensure_price(self.price)?;
        ensure_stock(self.stock)?;

        Ok(Product {
            id: ProductId::new(),
            category_id: self.category_id,
            name,
            slug,
            description: self.description,
            price: self.price,
            stock: self.stock,
            images: self.images,
            is_active: self.is_active,
            variants: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub category_id: Option<CategoryId>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i64>,
    pub images: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl ProductPatch {
    pub fn apply(self, product: &mut Product, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = self.name {
            product.name = non_empty_name(&name)?;
        }
        if let Some(slug) = self.slug {
            product.slug = resolve_slug(Some(&slug), &product.name)?;
        }
        if let Some(price) = self.price {
            ensure_price(price)?;
            product.price = price;
        }
        if let Some(stock) = self.stock {
            ensure_stock(stock)?;
            product.stock = stock;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = Some(category_id);
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        product.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewVariant {
    pub name: String,
    pub sku: String,
    pub price: Option<i64>,
    pub stock: i64,
}

impl NewVariant {
    pub fn into_variant(self, product_id: ProductId) -> DomainResult<ProductVariant> {
        let name = non_empty_name(&self.name)?;
        let sku = normalize_sku(&self.sku)?;
        if let Some(price) = self.price {
            ensure_price(price)?;
        }
        ensure_stock(self.stock)?;
        Ok(ProductVariant {
            id: VariantId::new(),
            product_id,
            name,
            sku,
            price: self.price,
            stock: self.stock,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariantPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i64>,
}

impl VariantPatch {
    pub fn apply(self, variant: &mut ProductVariant) -> DomainResult<()> {
        if let Some(name) = self.name {
            variant.name = non_empty_name(&name)?;
        }
        if let Some(sku) = self.sku {
            variant.sku = normalize_sku(&sku)?;
        }
        if let Some(price) = self.price {
            ensure_price(price)?;
            variant.price = Some(price);
        }
        if let Some(stock) = self.stock {
            ensure_stock(stock)?;
            variant.stock = stock;
        }
        Ok(())
    }
}

fn ensure_price(price: i64) -> DomainResult<()> {
    if price <= 0 {
        return Err(DomainError::validation("price must be positive"));
    }
    Ok(())
}

fn ensure_stock(stock: i64) -> DomainResult<()> {
    if stock < 0 {
        return Err(DomainError::validation("stock must not be negative"));
    }
    Ok(())
}

fn normalize_sku(sku: &str) -> DomainResult<String> {
    let sku = sku.trim().to_ascii_uppercase();
    if sku.is_empty() || !sku.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(DomainError::validation("sku must be non-empty and contain only A-Z, 0-9, '-' or '_'"));
    }
    Ok(sku)
}
