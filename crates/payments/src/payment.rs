use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Currency, DomainError, Entity, Money, OrderId, PaymentId};

pub const PROVIDER_YOOKASSA: &str = "yookassa";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    WaitingForCapture,
    Succeeded,
    Canceled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::WaitingForCapture => "waiting_for_capture",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// No further gateway notification can move a payment out of these.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Succeeded | PaymentStatus::Canceled | PaymentStatus::Refunded
        )
    }

    /// Map a YooKassa payment status string.
    pub fn from_vendor(status: &str) -> Result<Self, DomainError> {
        match status {
            "pending" => Ok(PaymentStatus::Pending),
            "waiting_for_capture" => Ok(PaymentStatus::WaitingForCapture),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "canceled" => Ok(PaymentStatus::Canceled),
            other => Err(DomainError::validation(format!(
                "unknown payment status '{other}'"
            ))),
        }
    }
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refunded" => Ok(PaymentStatus::Refunded),
            other => PaymentStatus::from_vendor(other),
        }
    }
}

/// A payment attempt for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub provider: String,
    /// Gateway-side id, set once the gateway accepted the payment.
    pub external_id: Option<String>,
    pub amount: i64,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub confirmation_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Payment {
    pub fn pending(order_id: OrderId, amount: Money, now: DateTime<Utc>) -> Self {
        Self {
            id: PaymentId::new(),
            order_id,
            provider: PROVIDER_YOOKASSA.to_string(),
            external_id: None,
            amount: amount.amount(),
            currency: amount.currency(),
            status: PaymentStatus::Pending,
            confirmation_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency)
    }
}
