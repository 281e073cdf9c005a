//! Listing filters and sort orders for the public catalog.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use storefront_core::CategoryId;

use crate::Product;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "name" => Ok(Self::Name),
            other => Err(format!("unknown sort '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    /// Case-insensitive substring match on name and description.
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub in_stock: bool,
    pub include_inactive: bool,
    pub sort: ProductSort,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if !self.include_inactive && !product.is_active {
            return false;
        }
        if self.category_id.is_some() && product.category_id != self.category_id {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if self.in_stock && product.total_stock() <= 0 {
            return false;
        }
        if let Some(needle) = self.search_needle() {
            let hay = format!("{} {}", product.name, product.description).to_lowercase();
            if !hay.contains(&needle) {
                return false;
            }
        }
        true
    }

    pub fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Sort in place. Ties fall back to newest-first for a stable listing.
    pub fn sort(&self, products: &mut [Product]) {
        products.sort_by(|a, b| {
            let primary = match self.sort {
                ProductSort::Newest => core::cmp::Ordering::Equal,
                ProductSort::PriceAsc => a.price.cmp(&b.price),
                ProductSort::PriceDesc => b.price.cmp(&a.price),
                ProductSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            };
            primary.then_with(|| b.created_at.cmp(&a.created_at)).then_with(|| b.id.cmp(&a.id))
        });
    }
}
