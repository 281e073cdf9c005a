use chrono::Utc;
use tracing::{error, info, instrument, warn};

use storefront_core::{OrderId, PaymentId};
use storefront_payments::{settlement, CreatePayment, Payment, PaymentStatus, YooKassaNotification};
use storefront_sales::OrderStatus;

use super::AppServices;
use crate::app::errors::{ApiError, ApiResult};
use crate::authz;
use crate::context::CurrentUser;

/// What a webhook delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied(PaymentStatus),
    /// Repeated, stale or out-of-order notification.
    Ignored,
}

impl AppServices {
    /// Start paying for a pending order and return the gateway redirect.
    ///
    /// An open payment for the same order is reused; the store refuses a
    /// second one, so concurrent calls end in a 409. When the gateway call
    /// fails the new payment row is removed again.
    #[instrument(skip(self, user), fields(user_id = %user.user_id()))]
    pub async fn create_payment(&self, user: &CurrentUser, order_id: OrderId) -> ApiResult<Payment> {
        let gateway = self.gateway()?;
        let order = self.order_for(user, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(ApiError::Unprocessable(format!("order is {}, not pending", order.status)));
        }

        let open = self
            .store
            .payments_for_order(order_id)
            .await?
            .into_iter()
            .find(|p| !p.status.is_final());
        if let Some(payment) = open {
            return Ok(payment);
        }

        let now = Utc::now();
        let mut payment = Payment::pending(order.id, order.total_money(), now);
        self.store.insert_payment(&payment).await?;

        let request = CreatePayment {
            order_id: order.id,
            amount: payment.money(),
            description: format!("Order {}", order.id),
            idempotence_key: payment.id.to_string(),
        };
        let created = match gateway.create_payment(request).await {
            Ok(created) => created,
            Err(e) => {
                error!(payment_id = %payment.id, order_id = %order.id, error = %e, "gateway rejected payment");
                if let Err(cleanup) = self.store.delete_payment(payment.id).await {
                    error!(payment_id = %payment.id, error = %cleanup, "failed to remove orphaned payment");
                }
                return Err(e.into());
            }
        };

        payment.external_id = Some(created.external_id);
        payment.confirmation_url = created.confirmation_url;
        payment.updated_at = Utc::now();
        self.store.update_payment(&payment).await?;

        info!(payment_id = %payment.id, order_id = %order.id, amount = payment.amount, "payment created");
        Ok(payment)
    }

    pub async fn payment_for(&self, user: &CurrentUser, id: PaymentId) -> ApiResult<Payment> {
        let payment = self
            .store
            .get_payment(id)
            .await?
            .ok_or_else(|| ApiError::not_found("payment"))?;
        let order = self.find_order(payment.order_id).await?;
        authz::ensure_owner(user, order.user_id, "payment")?;
        Ok(payment)
    }

    pub async fn order_payments(&self, user: &CurrentUser, order_id: OrderId) -> ApiResult<Vec<Payment>> {
        self.order_for(user, order_id).await?;
        Ok(self.store.payments_for_order(order_id).await?)
    }

    /// Apply a YooKassa notification.
    ///
    /// When verification is on, the payment status is re-read from the
    /// gateway and the notified status is only trusted if it matches.
    #[instrument(skip(self, body), fields(size = body.len()))]
    pub async fn handle_yookassa_webhook(&self, body: &[u8]) -> ApiResult<WebhookOutcome> {
        let notification = YooKassaNotification::parse(body)?;
        let mut incoming = notification.incoming_status()?;
        let external_id = notification.payment_external_id();

        let payment = self
            .store
            .find_payment_by_external_id(external_id)
            .await?
            .ok_or_else(|| {
                warn!(%external_id, event = %notification.event, "notification for unknown payment");
                ApiError::not_found("payment")
            })?;

        if let Some(order_id) = notification.order_id() {
            if order_id != payment.order_id {
                warn!(%external_id, %order_id, expected = %payment.order_id, "notification order mismatch");
                return Err(ApiError::Validation("notification does not match the payment's order".to_string()));
            }
        }

        if self.settings.verify_webhooks && !notification.is_refund() {
            if let Some(gateway) = &self.gateway {
                let actual = gateway.get_payment(external_id).await?.status;
                if actual != incoming {
                    warn!(%external_id, notified = %incoming, %actual, "notification disagrees with gateway");
                    incoming = actual;
                }
            }
        }

        let Some(plan) = settlement(payment.status, incoming) else {
            info!(payment_id = %payment.id, current = %payment.status, %incoming, "notification ignored");
            return Ok(WebhookOutcome::Ignored);
        };

        let Some(applied) = self.store.settle_payment(payment.id, payment.status, &plan, Utc::now()).await? else {
            info!(payment_id = %payment.id, "payment settled concurrently; notification ignored");
            return Ok(WebhookOutcome::Ignored);
        };
        if applied.payment_status == PaymentStatus::Succeeded && applied.leaves_order() {
            warn!(
                payment_id = %payment.id,
                order_id = %payment.order_id,
                "payment succeeded for an order that no longer takes it; refund required"
            );
        }
        info!(
            payment_id = %payment.id,
            order_id = %payment.order_id,
            from = %payment.status,
            to = %applied.payment_status,
            order_status = ?applied.order_status,
            "payment settled"
        );
        Ok(WebhookOutcome::Applied(applied.payment_status))
    }
}
