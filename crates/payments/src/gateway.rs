//! Payment gateway seam.

use async_trait::async_trait;
use thiserror::Error;

use storefront_core::{Money, OrderId};

use crate::PaymentStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePayment {
    pub order_id: OrderId,
    pub amount: Money,
    pub description: String,
    /// Same key on retry means the gateway returns the same payment.
    pub idempotence_key: String,
}

/// Gateway view of a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayment {
    pub external_id: String,
    pub status: PaymentStatus,
    pub confirmation_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRefund {
    pub external_id: String,
    pub payment_external_id: String,
    pub succeeded: bool,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Network(String),

    #[error("gateway returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected gateway response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(&self, request: CreatePayment) -> Result<GatewayPayment, GatewayError>;

    async fn get_payment(&self, external_id: &str) -> Result<GatewayPayment, GatewayError>;

    async fn create_refund(
        &self,
        payment_external_id: &str,
        amount: Money,
        idempotence_key: &str,
    ) -> Result<GatewayRefund, GatewayError>;
}
