//! Cart → order conversion.

use chrono::{DateTime, Utc};

use storefront_catalog::{Product, Purchasable};
use storefront_core::{Currency, DomainError, DomainResult, Money, OrderId, OrderItemId, UserId};

use crate::{Address, CartItem, Order, OrderItem, OrderStatus};

/// Build a pending order from cart lines.
///
/// Every line is resolved against the current catalog and stock-checked;
/// prices and names are snapshotted. The first failing line aborts checkout.
pub fn build_order<'a>(
    user_id: UserId,
    lines: impl IntoIterator<Item = (&'a CartItem, Option<&'a Product>)>,
    address: &Address,
    comment: Option<String>,
    currency: Currency,
    now: DateTime<Utc>,
) -> DomainResult<Order> {
    if address.user_id != user_id {
        return Err(DomainError::not_found("address"));
    }

    let order_id = OrderId::new();
    let mut items = Vec::new();
    let mut total = Money::zero(currency);

    for (cart_item, product) in lines {
        let product = product.ok_or(DomainError::not_found("product"))?;
        let target = Purchasable::resolve(product, cart_item.variant_id)?;
        target.ensure_available(cart_item.quantity)?;

        let unit_price = target.unit_price();
        let line_total = Money::new(unit_price, currency).checked_mul(cart_item.quantity)?;
        total = total.checked_add(line_total)?;

        items.push(OrderItem {
            id: OrderItemId::new(),
            order_id,
            product_id: product.id,
            variant_id: cart_item.variant_id,
            name: target.label(),
            unit_price,
            quantity: cart_item.quantity,
            line_total: line_total.amount(),
        });
    }

    if items.is_empty() {
        return Err(DomainError::validation("cart is empty"));
    }

    Ok(Order {
        id: order_id,
        user_id,
        status: OrderStatus::Pending,
        total: total.amount(),
        currency,
        shipping_address: address.snapshot(),
        comment: comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
        items,
        created_at: now,
        updated_at: now,
    })
}
