//! Shopping cart lines and the derived cart summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_catalog::{Product, Purchasable};
use storefront_core::{CartItemId, Currency, DomainResult, Entity, Money, ProductId, UserId, VariantId};

/// One persisted cart line. Unique per (user, product, variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl CartItem {
    pub fn new(
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CartItemId::new(),
            user_id,
            product_id,
            variant_id,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn same_target(&self, product_id: ProductId, variant_id: Option<VariantId>) -> bool {
        self.product_id == product_id && self.variant_id == variant_id
    }
}

/// Quantity a line will hold after adding `add` more, stock-checked.
///
/// Adding to an existing line merges into it rather than creating a duplicate.
pub fn merged_quantity(existing: Option<&CartItem>, add: i64, target: &Purchasable<'_>) -> DomainResult<i64> {
    let current = existing.map(|i| i.quantity).unwrap_or(0);
    let next = current.saturating_add(add);
    target.ensure_available(next)?;
    Ok(next)
}

/// A cart line joined with current catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: i64,
    pub line_total: i64,
    pub available: i64,
    /// False when the product was deactivated or the variant removed since adding.
    pub purchasable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub item_count: i64,
    pub total: Money,
}

/// Join cart items with their products and compute totals.
///
/// Only purchasable lines count toward `item_count` and `total`.
pub fn summarize<'a, F>(items: Vec<CartItem>, mut product: F, currency: Currency) -> DomainResult<CartSummary>
where
    F: FnMut(ProductId) -> Option<&'a Product>,
{
    let mut lines = Vec::with_capacity(items.len());
    let mut total = Money::zero(currency);
    let mut item_count = 0i64;

    for item in items {
        let resolved = product(item.product_id).map(|p| (p, Purchasable::resolve(p, item.variant_id)));
        let line = match resolved {
            Some((_, Ok(target))) => {
                let unit_price = target.unit_price();
                let line_total = Money::new(unit_price, currency).checked_mul(item.quantity)?;
                total = total.checked_add(line_total)?;
                item_count += item.quantity;
                CartLine {
                    name: target.label(),
                    image: target.product.images.first().cloned(),
                    unit_price,
                    line_total: line_total.amount(),
                    available: target.available(),
                    purchasable: true,
                    item,
                }
            }
            Some((p, Err(_))) => CartLine {
                name: p.name.clone(),
                image: p.images.first().cloned(),
                unit_price: p.price,
                line_total: 0,
                available: 0,
                purchasable: false,
                item,
            },
            None => CartLine {
                name: String::new(),
                image: None,
                unit_price: 0,
                line_total: 0,
                available: 0,
                purchasable: false,
                item,
            },
        };
        lines.push(line);
    }

    Ok(CartSummary {
        lines,
        item_count,
        total,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use storefront_catalog::NewProduct;

    pub(crate) fn product(price: i64, stock: i64) -> Product {
        NewProduct {
            name: format!("Item {price}"),
            price,
            stock,
            is_active: true,
            ..Default::default()
        }
        .into_product(Utc::now())
        .unwrap()
    }

    #[test]
    fn merge_adds_to_existing_line() {
        let p = product(100, 5);
        let existing = CartItem::new(UserId::new(), p.id, None, 2, Utc::now());
        let target = Purchasable::resolve(&p, None).unwrap();

        assert_eq!(merged_quantity(Some(&existing), 3, &target).unwrap(), 5);
        assert!(merged_quantity(Some(&existing), 4, &target).is_err());
        assert_eq!(merged_quantity(None, 1, &target).unwrap(), 1);
    }

    #[test]
    fn summary_skips_inactive_lines() {
        let user = UserId::new();
        let active = product(250, 10);
        let mut gone = product(999, 10);
        gone.is_active = false;

        let catalog: HashMap<_, _> = [(active.id, active.clone()), (gone.id, gone.clone())].into();
        let items = vec![
            CartItem::new(user, active.id, None, 2, Utc::now()),
            CartItem::new(user, gone.id, None, 1, Utc::now()),
        ];

        let summary = summarize(items, |id| catalog.get(&id), Currency::rub()).unwrap();
        assert_eq!(summary.total.amount(), 500);
        assert_eq!(summary.item_count, 2);
        assert!(summary.lines[0].purchasable);
        assert!(!summary.lines[1].purchasable);
    }

    #[test]
    fn summary_of_missing_product() {
        let items = vec![CartItem::new(UserId::new(), ProductId::new(), None, 1, Utc::now())];
        let summary = summarize(items, |_| None, Currency::rub()).unwrap();
        assert_eq!(summary.total.amount(), 0);
        assert!(!summary.lines[0].purchasable);
    }

    proptest! {
        #[test]
        fn total_is_sum_of_line_totals(lines in proptest::collection::vec((1i64..100_000, 1i64..20), 0..10)) {
            let user = UserId::new();
            let products: Vec<Product> = lines.iter().map(|(price, _)| product(*price, 1_000)).collect();
            let catalog: HashMap<_, _> = products.iter().map(|p| (p.id, p.clone())).collect();
            let items: Vec<CartItem> = products
                .iter()
                .zip(&lines)
                .map(|(p, (_, qty))| CartItem::new(user, p.id, None, *qty, Utc::now()))
                .collect();

            let summary = summarize(items, |id| catalog.get(&id), Currency::rub()).unwrap();
            let expected: i64 = lines.iter().map(|(price, qty)| price * qty).sum();
            prop_assert_eq!(summary.total.amount(), expected);
            prop_assert_eq!(summary.lines.iter().map(|l| l.line_total).sum::<i64>(), expected);
        }
    }
}
