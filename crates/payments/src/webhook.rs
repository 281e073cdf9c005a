//! YooKassa HTTP notifications and how they settle a payment.

use serde::Deserialize;

use storefront_core::{DomainError, DomainResult, OrderId};
use storefront_sales::OrderStatus;

use crate::PaymentStatus;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct YooKassaNotification {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    pub object: NotificationObject,
}

/// The payment (or refund) the notification is about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationObject {
    pub id: String,
    pub status: String,
    /// Present on refund objects.
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<NotificationMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationMetadata {
    #[serde(default)]
    pub order_id: Option<String>,
}

impl YooKassaNotification {
    pub fn parse(body: &[u8]) -> DomainResult<Self> {
        let notification: Self = serde_json::from_slice(body)
            .map_err(|e| DomainError::validation(format!("malformed notification: {e}")))?;
        if notification.kind != "notification" {
            return Err(DomainError::validation(format!(
                "unexpected notification type '{}'",
                notification.kind
            )));
        }
        Ok(notification)
    }

    /// Gateway id of the payment this notification settles.
    pub fn payment_external_id(&self) -> &str {
        self.object.payment_id.as_deref().unwrap_or(&self.object.id)
    }

    pub fn is_refund(&self) -> bool {
        self.event.starts_with("refund.")
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.object
            .metadata
            .as_ref()
            .and_then(|m| m.order_id.as_deref())
            .and_then(|id| id.parse().ok())
    }

    /// Payment status the event reports.
    pub fn incoming_status(&self) -> DomainResult<PaymentStatus> {
        match self.event.as_str() {
            "payment.waiting_for_capture" => Ok(PaymentStatus::WaitingForCapture),
            "payment.succeeded" => Ok(PaymentStatus::Succeeded),
            "payment.canceled" => Ok(PaymentStatus::Canceled),
            "refund.succeeded" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::validation(format!("unsupported event '{other}'"))),
        }
    }
}

/// What applying a status update means for the payment, its order and stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub payment_status: PaymentStatus,
    pub order_status: Option<OrderStatus>,
    pub decrement_stock: bool,
}

impl Settlement {
    /// Narrow the settlement to what an order currently in `order` can take.
    ///
    /// When the order cannot move to the implied status (it was cancelled,
    /// or an earlier payment already confirmed it) only the payment changes
    /// and no stock is taken.
    pub fn against_order(self, order: OrderStatus) -> Settlement {
        match self.order_status {
            Some(next) if !order.can_transition_to(next) => Settlement {
                order_status: None,
                decrement_stock: false,
                ..self
            },
            _ => self,
        }
    }

    /// Whether [`Settlement::against_order`] dropped the order side.
    pub fn leaves_order(&self) -> bool {
        self.order_status.is_none()
    }
}

/// Decide how `incoming` settles a payment currently in `current`.
///
/// `None` means nothing to do: a repeated or stale notification.
pub fn settlement(current: PaymentStatus, incoming: PaymentStatus) -> Option<Settlement> {
    use PaymentStatus::*;

    if current == incoming {
        return None;
    }
    let (order_status, decrement_stock) = match (current, incoming) {
        (Pending | WaitingForCapture, Succeeded) => (Some(OrderStatus::Confirmed), true),
        (Pending | WaitingForCapture, Canceled) => (Some(OrderStatus::Cancelled), false),
        (Pending, WaitingForCapture) => (None, false),
        (Succeeded, Refunded) => (Some(OrderStatus::Refunded), false),
        _ => return None,
    };
    Some(Settlement {
        payment_status: incoming,
        order_status,
        decrement_stock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCEEDED: &str = r#"{
        "type": "notification",
        "event": "payment.succeeded",
        "object": {
            "id": "2d5d8c1b-000f-5000-9000-1b68e7b15f3f",
            "status": "succeeded",
            "paid": true,
            "amount": { "value": "2750.00", "currency": "RUB" },
            "metadata": { "order_id": "01890a5d-ac96-774b-bcce-b302099a8057" }
        }
    }"#;

    #[test]
    fn parses_payment_notification() {
        let n = YooKassaNotification::parse(SUCCEEDED.as_bytes()).unwrap();
        assert_eq!(n.payment_external_id(), "2d5d8c1b-000f-5000-9000-1b68e7b15f3f");
        assert_eq!(n.incoming_status().unwrap(), PaymentStatus::Succeeded);
        assert_eq!(
            n.order_id().map(|id| id.to_string()).as_deref(),
            Some("01890a5d-ac96-774b-bcce-b302099a8057")
        );
        assert!(!n.is_refund());
    }

    #[test]
    fn refund_notification_points_at_its_payment() {
        let body = r#"{"type":"notification","event":"refund.succeeded",
            "object":{"id":"refund-1","status":"succeeded","payment_id":"pay-1"}}"#;
        let n = YooKassaNotification::parse(body.as_bytes()).unwrap();
        assert_eq!(n.payment_external_id(), "pay-1");
        assert_eq!(n.incoming_status().unwrap(), PaymentStatus::Refunded);
        assert!(n.is_refund());
    }

    #[test]
    fn rejects_malformed_bodies() {
        assert!(YooKassaNotification::parse(b"{}").is_err());
        assert!(YooKassaNotification::parse(b"not json").is_err());
        let wrong_type = r#"{"type":"ping","event":"payment.succeeded","object":{"id":"x","status":"succeeded"}}"#;
        assert!(YooKassaNotification::parse(wrong_type.as_bytes()).is_err());
    }

    #[test]
    fn unknown_event_is_rejected() {
        let body = r#"{"type":"notification","event":"payout.succeeded","object":{"id":"x","status":"succeeded"}}"#;
        let n = YooKassaNotification::parse(body.as_bytes()).unwrap();
        assert!(n.incoming_status().is_err());
    }

    #[test]
    fn success_confirms_order_and_takes_stock() {
        let s = settlement(PaymentStatus::Pending, PaymentStatus::Succeeded).unwrap();
        assert_eq!(s.order_status, Some(OrderStatus::Confirmed));
        assert!(s.decrement_stock);

        let s = settlement(PaymentStatus::WaitingForCapture, PaymentStatus::Succeeded).unwrap();
        assert!(s.decrement_stock);
    }

    #[test]
    fn cancel_cancels_order_without_stock_change() {
        let s = settlement(PaymentStatus::Pending, PaymentStatus::Canceled).unwrap();
        assert_eq!(s.order_status, Some(OrderStatus::Cancelled));
        assert!(!s.decrement_stock);
    }

    #[test]
    fn waiting_for_capture_only_touches_payment() {
        let s = settlement(PaymentStatus::Pending, PaymentStatus::WaitingForCapture).unwrap();
        assert_eq!(s.payment_status, PaymentStatus::WaitingForCapture);
        assert_eq!(s.order_status, None);
    }

    #[test]
    fn repeated_success_is_a_no_op() {
        assert_eq!(settlement(PaymentStatus::Succeeded, PaymentStatus::Succeeded), None);
    }

    #[test]
    fn final_payments_ignore_late_events() {
        assert_eq!(settlement(PaymentStatus::Canceled, PaymentStatus::Succeeded), None);
        assert_eq!(settlement(PaymentStatus::Succeeded, PaymentStatus::Canceled), None);
        assert_eq!(settlement(PaymentStatus::Refunded, PaymentStatus::Succeeded), None);
        assert_eq!(settlement(PaymentStatus::Pending, PaymentStatus::Refunded), None);
    }

    #[test]
    fn refund_after_success() {
        let s = settlement(PaymentStatus::Succeeded, PaymentStatus::Refunded).unwrap();
        assert_eq!(s.order_status, Some(OrderStatus::Refunded));
        assert!(!s.decrement_stock);
    }

    #[test]
    fn cancelled_order_keeps_its_status_and_stock() {
        let s = settlement(PaymentStatus::Pending, PaymentStatus::Succeeded)
            .unwrap()
            .against_order(OrderStatus::Cancelled);
        assert_eq!(s.payment_status, PaymentStatus::Succeeded);
        assert_eq!(s.order_status, None);
        assert!(!s.decrement_stock);
    }

    #[test]
    fn second_success_does_not_take_stock_again() {
        let s = settlement(PaymentStatus::Pending, PaymentStatus::Succeeded)
            .unwrap()
            .against_order(OrderStatus::Confirmed);
        assert!(s.leaves_order());
        assert!(!s.decrement_stock);
    }

    #[test]
    fn pending_order_follows_payment() {
        let plan = settlement(PaymentStatus::Pending, PaymentStatus::Succeeded).unwrap();
        assert_eq!(plan.against_order(OrderStatus::Pending), plan);
    }

    #[test]
    fn refund_reaches_cancelled_order() {
        let s = settlement(PaymentStatus::Succeeded, PaymentStatus::Refunded)
            .unwrap()
            .against_order(OrderStatus::Cancelled);
        assert_eq!(s.order_status, Some(OrderStatus::Refunded));
    }
}
