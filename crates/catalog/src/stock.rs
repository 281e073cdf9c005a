//! What exactly is being bought: a product, or one of its variants.

use storefront_core::{DomainError, DomainResult, VariantId};

use crate::{Product, ProductVariant};

/// A resolved (product, optional variant) pair.
///
/// Variant stock and price win over the product's when a variant is chosen.
#[derive(Debug, Clone, Copy)]
pub struct Purchasable<'a> {
    pub product: &'a Product,
    pub variant: Option<&'a ProductVariant>,
}

impl<'a> Purchasable<'a> {
    /// Resolve a cart/order line target. Inactive products are treated as missing.
    pub fn resolve(product: &'a Product, variant_id: Option<VariantId>) -> DomainResult<Self> {
        if !product.is_active {
            return Err(DomainError::not_found("product"));
        }
        let variant = match variant_id {
            Some(id) => Some(product.variant(id).ok_or(DomainError::not_found("variant"))?),
            None => None,
        };
        Ok(Self { product, variant })
    }

    pub fn unit_price(&self) -> i64 {
        self.variant.and_then(|v| v.price).unwrap_or(self.product.price)
    }

    pub fn available(&self) -> i64 {
        match self.variant {
            Some(v) => v.stock,
            None => self.product.stock,
        }
    }

    /// Human-readable name snapshotted into orders.
    pub fn label(&self) -> String {
        match self.variant {
            Some(v) => format!("{} ({})", self.product.name, v.name),
            None => self.product.name.clone(),
        }
    }

    pub fn ensure_available(&self, requested: i64) -> DomainResult<()> {
        if requested <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let available = self.available();
        if requested > available {
            return Err(DomainError::insufficient_stock(self.label(), requested, available));
        }
        Ok(())
    }
}
