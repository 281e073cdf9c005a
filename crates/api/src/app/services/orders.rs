use chrono::Utc;
use tracing::{info, instrument, warn};

use storefront_core::{AddressId, OrderId, Page, PageRequest, UserId};
use storefront_payments::{settlement, Payment, PaymentStatus};
use storefront_sales::{build_order, Order, OrderStatus};

use super::AppServices;
use crate::app::errors::{ApiError, ApiResult};
use crate::authz;
use crate::context::CurrentUser;

impl AppServices {
    /// Turn the caller's cart into a pending order and empty the cart.
    #[instrument(skip(self, comment))]
    pub async fn checkout(&self, user_id: UserId, address_id: AddressId, comment: Option<String>) -> ApiResult<Order> {
        let address = self
            .store
            .get_address(address_id)
            .await?
            .ok_or_else(|| ApiError::not_found("address"))?;

        let items = self.store.cart_items(user_id).await?;
        let products = self.products_for(&items).await?;
        let lines = items.iter().map(|item| (item, products.get(&item.product_id)));

        let order = build_order(user_id, lines, &address, comment, self.settings.currency, Utc::now())?;
        self.store.place_order(&order).await?;

        info!(order_id = %order.id, total = order.total, items = order.items.len(), "order placed");
        Ok(order)
    }

    pub async fn my_orders(&self, user_id: UserId, page: PageRequest) -> ApiResult<Page<Order>> {
        Ok(self.store.list_orders_for_user(user_id, page).await?)
    }

    /// Owner or admin; anyone else gets a 404.
    pub async fn order_for(&self, user: &CurrentUser, id: OrderId) -> ApiResult<Order> {
        let order = self.find_order(id).await?;
        authz::ensure_owner(user, order.user_id, "order")?;
        Ok(order)
    }

    pub(super) async fn find_order(&self, id: OrderId) -> ApiResult<Order> {
        self.store.get_order(id).await?.ok_or_else(|| ApiError::not_found("order"))
    }

    /// Cancel an order for its owner or an admin.
    ///
    /// An order whose payment already succeeded is refunded through the
    /// gateway instead. If the gateway has not finished the refund yet the
    /// order is cancelled now and moves to `refunded` when the refund
    /// notification arrives.
    #[instrument(skip(self, user), fields(user_id = %user.user_id()))]
    pub async fn cancel_order(&self, user: &CurrentUser, id: OrderId) -> ApiResult<Order> {
        let mut order = self.order_for(user, id).await?;
        if !user.is_admin() && !order.is_cancellable_by_customer() {
            return Err(ApiError::Unprocessable(format!(
                "order can no longer be cancelled (status {})",
                order.status
            )));
        }
        let from = order.status;
        order.transition(OrderStatus::Cancelled, Utc::now())?;

        if let Some(payment) = self.succeeded_payment(id).await? {
            if self.refund_payment(&payment).await? {
                info!(order_id = %id, payment_id = %payment.id, "paid order cancelled and refunded");
                return self.find_order(id).await;
            }
        }

        self.store.update_order_status(order.id, from, order.status, order.updated_at).await?;
        info!(order_id = %order.id, %from, "order cancelled");
        Ok(order)
    }

    pub async fn list_orders(&self, status: Option<OrderStatus>, page: PageRequest) -> ApiResult<Page<Order>> {
        Ok(self.store.list_orders(status, page).await?)
    }

    /// Manual status change. Refunds go through [`AppServices::refund_order`]
    /// so that money is returned with them.
    #[instrument(skip(self))]
    pub async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> ApiResult<Order> {
        if status == OrderStatus::Refunded {
            return Err(ApiError::Unprocessable("use the refund endpoint to refund an order".to_string()));
        }
        let mut order = self.find_order(id).await?;
        let from = order.status;
        order.transition(status, Utc::now())?;
        self.store.update_order_status(order.id, from, order.status, order.updated_at).await?;
        info!(order_id = %order.id, %from, to = %status, "order status changed");
        Ok(order)
    }

    /// Refund the order's succeeded payment through the gateway.
    ///
    /// A refund the gateway accepts but has not finished is settled later
    /// by its `refund.succeeded` notification.
    #[instrument(skip(self))]
    pub async fn refund_order(&self, id: OrderId) -> ApiResult<Order> {
        let order = self.find_order(id).await?;
        if !order.status.can_transition_to(OrderStatus::Refunded) {
            return Err(ApiError::Unprocessable(format!("cannot refund an order that is {}", order.status)));
        }
        let payment = self
            .succeeded_payment(id)
            .await?
            .ok_or_else(|| ApiError::Unprocessable("order has no succeeded payment".to_string()))?;

        if self.refund_payment(&payment).await? {
            info!(order_id = %id, payment_id = %payment.id, "order refunded");
        }
        self.find_order(id).await
    }

    async fn succeeded_payment(&self, order_id: OrderId) -> ApiResult<Option<Payment>> {
        Ok(self
            .store
            .payments_for_order(order_id)
            .await?
            .into_iter()
            .find(|p| p.status == PaymentStatus::Succeeded))
    }

    /// Ask the gateway to refund `payment` in full.
    ///
    /// Returns `true` when the refund succeeded right away and has been
    /// settled, `false` when it is still in progress at the gateway.
    async fn refund_payment(&self, payment: &Payment) -> ApiResult<bool> {
        let external_id = payment
            .external_id
            .as_deref()
            .ok_or_else(|| ApiError::Internal(format!("payment {} has no gateway id", payment.id)))?;

        let gateway = self.gateway()?;
        let refund = gateway
            .create_refund(external_id, payment.money(), &format!("refund-{}", payment.id))
            .await?;

        if !refund.succeeded {
            warn!(payment_id = %payment.id, refund_id = %refund.external_id, "refund accepted but not yet succeeded");
            return Ok(false);
        }
        if let Some(plan) = settlement(payment.status, PaymentStatus::Refunded) {
            self.store
                .settle_payment(payment.id, payment.status, &plan, Utc::now())
                .await?;
        }
        Ok(true)
    }
}
