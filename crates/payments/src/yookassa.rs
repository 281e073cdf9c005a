//! YooKassa REST client (`/v3/payments`, `/v3/refunds`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use storefront_core::Money;

use crate::gateway::{CreatePayment, GatewayError, GatewayPayment, GatewayRefund, PaymentGateway};
use crate::PaymentStatus;

pub const DEFAULT_API_URL: &str = "https://api.yookassa.ru/v3";

#[derive(Debug, Serialize)]
struct Amount {
    value: String,
    currency: String,
}

impl From<Money> for Amount {
    fn from(money: Money) -> Self {
        Self {
            value: money.to_decimal_string(),
            currency: money.currency().as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Confirmation<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    return_url: &'a str,
}

#[derive(Debug, Serialize)]
struct Metadata {
    order_id: String,
}

#[derive(Debug, Serialize)]
struct CreatePaymentBody<'a> {
    amount: Amount,
    capture: bool,
    confirmation: Confirmation<'a>,
    description: &'a str,
    metadata: Metadata,
}

#[derive(Debug, Serialize)]
struct CreateRefundBody<'a> {
    payment_id: &'a str,
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: String,
    status: String,
    #[serde(default)]
    confirmation: Option<ConfirmationResponse>,
}

#[derive(Debug, Deserialize)]
struct ConfirmationResponse {
    #[serde(default)]
    confirmation_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
    status: String,
    payment_id: String,
}

impl TryFrom<PaymentResponse> for GatewayPayment {
    type Error = GatewayError;

    fn try_from(value: PaymentResponse) -> Result<Self, Self::Error> {
        let status = PaymentStatus::from_vendor(&value.status).map_err(|e| GatewayError::Parse(e.to_string()))?;
        Ok(Self {
            external_id: value.id,
            status,
            confirmation_url: value.confirmation.and_then(|c| c.confirmation_url),
        })
    }
}

#[derive(Debug, Clone)]
pub struct YooKassaClient {
    http: reqwest::Client,
    api_url: String,
    shop_id: String,
    secret_key: String,
    return_url: String,
}

impl YooKassaClient {
    pub fn new(
        api_url: impl Into<String>,
        shop_id: impl Into<String>,
        secret_key: impl Into<String>,
        return_url: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            shop_id: shop_id.into(),
            secret_key: secret_key.into(),
            return_url: return_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    async fn send<T: for<'de> Deserialize<'de>>(&self, request: reqwest::RequestBuilder) -> Result<T, GatewayError> {
        let resp = request
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "yookassa request failed");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>().await.map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for YooKassaClient {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_payment(&self, request: CreatePayment) -> Result<GatewayPayment, GatewayError> {
        let body = CreatePaymentBody {
            amount: request.amount.into(),
            capture: true,
            confirmation: Confirmation {
                kind: "redirect",
                return_url: &self.return_url,
            },
            description: &request.description,
            metadata: Metadata {
                order_id: request.order_id.to_string(),
            },
        };
        let req = self
            .http
            .post(self.url("payments"))
            .header("Idempotence-Key", &request.idempotence_key)
            .json(&body);
        self.send::<PaymentResponse>(req).await?.try_into()
    }

    #[instrument(skip(self))]
    async fn get_payment(&self, external_id: &str) -> Result<GatewayPayment, GatewayError> {
        let req = self.http.get(self.url(&format!("payments/{external_id}")));
        self.send::<PaymentResponse>(req).await?.try_into()
    }

    #[instrument(skip(self, amount))]
    async fn create_refund(
        &self,
        payment_external_id: &str,
        amount: Money,
        idempotence_key: &str,
    ) -> Result<GatewayRefund, GatewayError> {
        let body = CreateRefundBody {
            payment_id: payment_external_id,
            amount: amount.into(),
        };
        let req = self
            .http
            .post(self.url("refunds"))
            .header("Idempotence-Key", idempotence_key)
            .json(&body);
        let refund: RefundResponse = self.send(req).await?;
        Ok(GatewayRefund {
            external_id: refund.id,
            payment_external_id: refund.payment_id,
            succeeded: refund.status == "succeeded",
        })
    }
}
