//! Payments domain module: payment records, the YooKassa gateway client and
//! webhook settlement rules.

pub mod gateway;
pub mod payment;
pub mod webhook;
pub mod yookassa;

pub use gateway::{CreatePayment, GatewayError, GatewayPayment, GatewayRefund, PaymentGateway};
pub use payment::{Payment, PaymentStatus, PROVIDER_YOOKASSA};
pub use webhook::{settlement, Settlement, YooKassaNotification};
pub use yookassa::{YooKassaClient, DEFAULT_API_URL};
