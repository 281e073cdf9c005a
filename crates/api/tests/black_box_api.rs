use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use storefront_api::{build_app, AppServices, Settings};
use storefront_auth::{JwtClaims, Role, TokenKind};
use storefront_core::{Money, UserId};
use storefront_infra::Store;
use storefront_payments::{CreatePayment, GatewayError, GatewayPayment, GatewayRefund, PaymentGateway, PaymentStatus};

const JWT_SECRET: &str = "test-secret";

/// Gateway double: derives ids from the idempotence key and reports whatever status
/// the test last set for a payment.
#[derive(Default)]
struct FakeGateway {
    statuses: Mutex<HashMap<String, PaymentStatus>>,
    created: Mutex<u32>,
    fail_create: bool,
    /// Refunds are accepted but only finish when the test says so.
    defer_refunds: bool,
}

impl FakeGateway {
    fn set_status(&self, external_id: &str, status: PaymentStatus) {
        self.statuses.lock().unwrap().insert(external_id.to_string(), status);
    }

    fn created(&self) -> u32 {
        *self.created.lock().unwrap()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment(&self, request: CreatePayment) -> Result<GatewayPayment, GatewayError> {
        if self.fail_create {
            return Err(GatewayError::Api {
                status: 500,
                body: "boom".to_string(),
            });
        }
        *self.created.lock().unwrap() += 1;
        let external_id = format!("yk-{}", request.idempotence_key);
        self.set_status(&external_id, PaymentStatus::Pending);
        Ok(GatewayPayment {
            confirmation_url: Some(format!("https://pay.example/{external_id}")),
            external_id,
            status: PaymentStatus::Pending,
        })
    }

    async fn get_payment(&self, external_id: &str) -> Result<GatewayPayment, GatewayError> {
        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(external_id)
            .copied()
            .ok_or_else(|| GatewayError::Api {
                status: 404,
                body: "not found".to_string(),
            })?;
        Ok(GatewayPayment {
            external_id: external_id.to_string(),
            status,
            confirmation_url: None,
        })
    }

    async fn create_refund(
        &self,
        payment_external_id: &str,
        _amount: Money,
        _idempotence_key: &str,
    ) -> Result<GatewayRefund, GatewayError> {
        if !self.defer_refunds {
            self.set_status(payment_external_id, PaymentStatus::Refunded);
        }
        Ok(GatewayRefund {
            external_id: format!("rf-{payment_external_id}"),
            payment_external_id: payment_external_id.to_string(),
            succeeded: !self.defer_refunds,
        })
    }
}

struct TestServer {
    base_url: String,
    store: Arc<dyn Store>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(gateway: Option<Arc<FakeGateway>>) -> Self {
        let gateway = gateway.map(|g| g as Arc<dyn PaymentGateway>);
        let services = AppServices::in_memory(JWT_SECRET, gateway, Settings::default());
        let store = services.store.clone();

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn register(&self, email: &str) -> Value {
        let res = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({
                "email": email,
                "password": "correct-horse",
                "password_confirm": "correct-horse",
                "name": "Test User",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn login(&self, email: &str) -> String {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": "correct-horse" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn customer(&self, email: &str) -> String {
        self.register(email).await;
        self.login(email).await
    }

    /// Register, promote through the store, then log in so the token
    /// carries the admin role.
    async fn admin(&self, email: &str) -> String {
        self.register(email).await;
        let mut user = self.store.find_user_by_email(email).await.unwrap().unwrap();
        user.role = Role::Admin;
        self.store.update_user(&user).await.unwrap();
        self.login(email).await
    }

    async fn create_product(&self, admin: &str, price: i64, stock: i64) -> Value {
        let res = self
            .client
            .post(self.url("/products"))
            .bearer_auth(admin)
            .json(&json!({ "name": format!("Mug {}", uuid::Uuid::now_v7()), "price": price, "stock": stock }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn create_address(&self, token: &str) -> String {
        let res = self
            .client
            .post(self.url("/addresses"))
            .bearer_auth(token)
            .json(&json!({
                "recipient": "Ivan Petrov",
                "phone": "+79990000000",
                "country": "RU",
                "city": "Moscow",
                "street": "Tverskaya 1",
                "postal_code": "101000",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["is_default"], true);
        body["id"].as_str().unwrap().to_string()
    }

    /// Cart with `quantity` of the product, checked out into a pending order.
    async fn place_order(&self, token: &str, product_id: &str, quantity: i64) -> Value {
        let address_id = self.create_address(token).await;
        let res = self
            .client
            .post(self.url("/cart/items"))
            .bearer_auth(token)
            .json(&json!({ "product_id": product_id, "quantity": quantity }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = self
            .client
            .post(self.url("/orders"))
            .bearer_auth(token)
            .json(&json!({ "address_id": address_id, "comment": "leave at the door" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    /// Start a payment for the order and return its gateway id.
    async fn start_payment(&self, token: &str, order_id: &str) -> String {
        let res = self
            .client
            .post(self.url("/payments"))
            .bearer_auth(token)
            .json(&json!({ "order_id": order_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let payment: Value = res.json().await.unwrap();
        payment["external_id"].as_str().unwrap().to_string()
    }

    /// Have the gateway report success and deliver the notification.
    async fn settle(&self, gateway: &FakeGateway, external_id: &str, order_id: &str) {
        gateway.set_status(external_id, PaymentStatus::Succeeded);
        let res = self.webhook("payment.succeeded", external_id, order_id).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    async fn order(&self, token: &str, order_id: &str) -> Value {
        let res = self
            .client
            .get(self.url(&format!("/orders/{order_id}")))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }

    async fn stock(&self, product_id: &str) -> i64 {
        let res = self.client.get(self.url(&format!("/products/{product_id}"))).send().await.unwrap();
        let product: Value = res.json().await.unwrap();
        product["stock"].as_i64().unwrap()
    }

    async fn cancel(&self, token: &str, order_id: &str) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/orders/{order_id}/cancel")))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn webhook(&self, event: &str, external_id: &str, order_id: &str) -> reqwest::Response {
        self.client
            .post(self.url("/webhooks/payment/yookassa"))
            .json(&json!({
                "type": "notification",
                "event": event,
                "object": {
                    "id": external_id,
                    "status": event.trim_start_matches("payment."),
                    "metadata": { "order_id": order_id },
                },
            }))
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(role: Role, kind: TokenKind, issued: chrono::DateTime<Utc>, ttl: ChronoDuration) -> String {
    let claims = JwtClaims::new(UserId::new(), role, kind, issued, ttl);
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn error_code(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_openapi_are_public() {
    let srv = TestServer::spawn(None).await;

    let res = srv.client.get(format!("{}/health", srv.base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .get(format!("{}/api/docs/openapi.json", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let doc: Value = res.json().await.unwrap();
    assert!(doc["components"]["schemas"]["OrderResponse"].is_object());
}

#[tokio::test]
async fn protected_routes_need_a_valid_access_token() {
    let srv = TestServer::spawn(None).await;

    let res = srv.client.get(srv.url("/cart")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "unauthorized");

    let expired = mint_jwt(
        Role::Customer,
        TokenKind::Access,
        Utc::now() - ChronoDuration::hours(2),
        ChronoDuration::minutes(15),
    );
    let res = srv.client.get(srv.url("/cart")).bearer_auth(&expired).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let refresh_as_access = mint_jwt(Role::Customer, TokenKind::Refresh, Utc::now(), ChronoDuration::days(1));
    let res = srv
        .client
        .get(srv.url("/cart"))
        .bearer_auth(&refresh_as_access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Public routes ignore a bad token instead of rejecting it.
    let res = srv.client.get(srv.url("/products")).bearer_auth(&expired).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn registration_login_refresh_and_logout() {
    let srv = TestServer::spawn(None).await;

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({
            "email": "anna@example.com",
            "password": "correct-horse",
            "password_confirm": "different-horse",
            "name": "Anna",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let user = srv.register("anna@example.com").await;
    assert_eq!(user["role"], "customer");
    assert!(user.get("password_hash").is_none());

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({
            "email": "ANNA@example.com",
            "password": "correct-horse",
            "password_confirm": "correct-horse",
            "name": "Anna again",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "anna@example.com", "password": "wrong-horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "anna@example.com", "password": "correct-horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookies: Vec<String> = res
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("access_token=") && c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));
    let tokens: Value = res.json().await.unwrap();
    let access = tokens["access_token"].as_str().unwrap();
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let res = srv.client.get(srv.url("/auth/me")).bearer_auth(access).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["email"], "anna@example.com");

    // The access cookie works as well as the header.
    let res = srv
        .client
        .get(srv.url("/auth/me"))
        .header(reqwest::header::COOKIE, format!("access_token={access}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": access }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .post(srv.url("/auth/refresh"))
        .header(reqwest::header::COOKIE, format!("refresh_token={refresh}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let renewed: Value = res.json().await.unwrap();
    assert_eq!(renewed["user"]["email"], "anna@example.com");

    let res = srv.client.post(srv.url("/auth/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let cleared: Vec<String> = res
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn catalog_writes_are_admin_only_and_inactive_products_are_hidden() {
    let srv = TestServer::spawn(None).await;
    let customer = srv.customer("carl@example.com").await;
    let admin = srv.admin("root@example.com").await;

    let res = srv
        .client
        .post(srv.url("/products"))
        .bearer_auth(&customer)
        .json(&json!({ "name": "Mug", "price": 1000, "stock": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .post(srv.url("/categories"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Kitchen Ware" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let category: Value = res.json().await.unwrap();
    assert_eq!(category["slug"], "kitchen-ware");

    let res = srv
        .client
        .post(srv.url("/categories"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Kitchen ware" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .post(srv.url("/products"))
        .bearer_auth(&admin)
        .json(&json!({
            "category_id": category["id"],
            "name": "Hidden Mug",
            "price": 1500,
            "stock": 3,
            "is_active": false,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let hidden: Value = res.json().await.unwrap();
    let hidden_id = hidden["id"].as_str().unwrap();

    let res = srv.client.get(srv.url(&format!("/products/{hidden_id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .get(srv.url("/products?include_inactive=true"))
        .send()
        .await
        .unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 0);

    let res = srv
        .client
        .get(srv.url("/products?include_inactive=true"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);

    let res = srv
        .client
        .delete(srv.url(&format!("/categories/{}", category["id"].as_str().unwrap())))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .post(srv.url(&format!("/products/{hidden_id}/variants")))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Large", "sku": "MUG-L", "price": 1800, "stock": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv
        .client
        .get(srv.url(&format!("/products/{hidden_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let product: Value = res.json().await.unwrap();
    assert_eq!(product["variants"].as_array().unwrap().len(), 1);
    assert_eq!(product["total_stock"], 4);
}

#[tokio::test]
async fn cart_rejects_more_than_available_stock() {
    let srv = TestServer::spawn(None).await;
    let admin = srv.admin("root@example.com").await;
    let customer = srv.customer("carl@example.com").await;
    let product = srv.create_product(&admin, 1000, 2).await;

    let res = srv
        .client
        .post(srv.url("/cart/items"))
        .bearer_auth(&customer)
        .json(&json!({ "product_id": product["id"], "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(res).await, "insufficient_stock");

    let res = srv
        .client
        .post(srv.url("/cart/items"))
        .bearer_auth(&customer)
        .json(&json!({ "product_id": product["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Merges into the existing line: 1 + 2 exceeds the stock of 2.
    let res = srv
        .client
        .post(srv.url("/cart/items"))
        .bearer_auth(&customer)
        .json(&json!({ "product_id": product["id"], "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv.client.get(srv.url("/cart")).bearer_auth(&customer).send().await.unwrap();
    let cart: Value = res.json().await.unwrap();
    assert_eq!(cart["item_count"], 1);
    assert_eq!(cart["total"], 1000);
    let line_id = cart["lines"][0]["id"].as_str().unwrap().to_string();

    let res = srv
        .client
        .patch(srv.url(&format!("/cart/items/{line_id}")))
        .bearer_auth(&customer)
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cart: Value = res.json().await.unwrap();
    assert!(cart["lines"].as_array().unwrap().is_empty());

    let address_id = srv.create_address(&customer).await;
    let res = srv
        .client
        .post(srv.url("/orders"))
        .bearer_auth(&customer)
        .json(&json!({ "address_id": address_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_payment_and_webhook_settlement() {
    let gateway = Arc::new(FakeGateway::default());
    let srv = TestServer::spawn(Some(gateway.clone())).await;
    let admin = srv.admin("root@example.com").await;
    let customer = srv.customer("carl@example.com").await;
    let product = srv.create_product(&admin, 1250, 5).await;
    let product_id = product["id"].as_str().unwrap();

    let order = srv.place_order(&customer, product_id, 2).await;
    let order_id = order["id"].as_str().unwrap();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total"], 2500);
    assert_eq!(order["items"][0]["unit_price"], 1250);
    assert_eq!(order["shipping_address"]["city"], "Moscow");

    let res = srv.client.get(srv.url("/cart")).bearer_auth(&customer).send().await.unwrap();
    let cart: Value = res.json().await.unwrap();
    assert_eq!(cart["item_count"], 0);

    // Stock only moves when the payment succeeds.
    let res = srv.client.get(srv.url(&format!("/products/{product_id}"))).send().await.unwrap();
    let current: Value = res.json().await.unwrap();
    assert_eq!(current["stock"], 5);

    let res = srv
        .client
        .post(srv.url("/payments"))
        .bearer_auth(&customer)
        .json(&json!({ "order_id": order_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let payment: Value = res.json().await.unwrap();
    assert_eq!(payment["status"], "pending");
    assert_eq!(payment["amount"], 2500);
    assert!(payment["confirmation_url"].as_str().unwrap().starts_with("https://pay.example/"));
    let external_id = payment["external_id"].as_str().unwrap().to_string();

    let res = srv
        .client
        .post(srv.url("/payments"))
        .bearer_auth(&customer)
        .json(&json!({ "order_id": order_id }))
        .send()
        .await
        .unwrap();
    let again: Value = res.json().await.unwrap();
    assert_eq!(again["id"], payment["id"]);
    assert_eq!(gateway.created(), 1);

    // A notification the gateway does not confirm changes nothing.
    let res = srv.webhook("payment.succeeded", &external_id, order_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["result"], "ignored");

    gateway.set_status(&external_id, PaymentStatus::Succeeded);
    let res = srv.webhook("payment.succeeded", &external_id, order_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["result"], "applied");

    let res = srv
        .client
        .get(srv.url(&format!("/orders/{order_id}")))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let settled: Value = res.json().await.unwrap();
    assert_eq!(settled["status"], "confirmed");

    let res = srv.client.get(srv.url(&format!("/products/{product_id}"))).send().await.unwrap();
    let current: Value = res.json().await.unwrap();
    assert_eq!(current["stock"], 3);

    // Redelivery is a no-op: stock is not taken twice.
    let res = srv.webhook("payment.succeeded", &external_id, order_id).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["result"], "ignored");
    let res = srv.client.get(srv.url(&format!("/products/{product_id}"))).send().await.unwrap();
    let current: Value = res.json().await.unwrap();
    assert_eq!(current["stock"], 3);

    let res = srv.webhook("payment.succeeded", "yk-unknown", order_id).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .post(srv.url("/webhooks/payment/yookassa"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .get(srv.url(&format!("/orders/{order_id}/payments")))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let payments: Value = res.json().await.unwrap();
    assert_eq!(payments[0]["status"], "succeeded");

    let res = srv
        .client
        .post(srv.url(&format!("/admin/orders/{order_id}/refund")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let refunded: Value = res.json().await.unwrap();
    assert_eq!(refunded["status"], "refunded");
}

#[tokio::test]
async fn cancelling_a_paid_order_refunds_it() {
    let gateway = Arc::new(FakeGateway::default());
    let srv = TestServer::spawn(Some(gateway.clone())).await;
    let admin = srv.admin("root@example.com").await;
    let customer = srv.customer("carl@example.com").await;
    let product = srv.create_product(&admin, 900, 5).await;
    let product_id = product["id"].as_str().unwrap();
    let order = srv.place_order(&customer, product_id, 2).await;
    let order_id = order["id"].as_str().unwrap();

    let external_id = srv.start_payment(&customer, order_id).await;
    srv.settle(&gateway, &external_id, order_id).await;
    assert_eq!(srv.order(&customer, order_id).await["status"], "confirmed");

    let res = srv.cancel(&customer, order_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "refunded");

    let res = srv
        .client
        .get(srv.url(&format!("/orders/{order_id}/payments")))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let payments: Value = res.json().await.unwrap();
    assert_eq!(payments[0]["status"], "refunded");
}

#[tokio::test]
async fn pending_refund_of_a_cancelled_order_settles_by_notification() {
    let gateway = Arc::new(FakeGateway {
        defer_refunds: true,
        ..Default::default()
    });
    let srv = TestServer::spawn(Some(gateway.clone())).await;
    let admin = srv.admin("root@example.com").await;
    let customer = srv.customer("carl@example.com").await;
    let product = srv.create_product(&admin, 900, 5).await;
    let order = srv.place_order(&customer, product["id"].as_str().unwrap(), 1).await;
    let order_id = order["id"].as_str().unwrap();

    let external_id = srv.start_payment(&customer, order_id).await;
    srv.settle(&gateway, &external_id, order_id).await;

    let res = srv.cancel(&customer, order_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "cancelled");

    gateway.set_status(&external_id, PaymentStatus::Refunded);
    let res = srv.webhook("refund.succeeded", &external_id, order_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["result"], "applied");
    assert_eq!(srv.order(&customer, order_id).await["status"], "refunded");
}

#[tokio::test]
async fn payment_succeeding_after_cancel_keeps_the_order_cancelled() {
    let gateway = Arc::new(FakeGateway::default());
    let srv = TestServer::spawn(Some(gateway.clone())).await;
    let admin = srv.admin("root@example.com").await;
    let customer = srv.customer("carl@example.com").await;
    let product = srv.create_product(&admin, 900, 5).await;
    let product_id = product["id"].as_str().unwrap();
    let order = srv.place_order(&customer, product_id, 2).await;
    let order_id = order["id"].as_str().unwrap();

    let external_id = srv.start_payment(&customer, order_id).await;
    let res = srv.cancel(&customer, order_id).await;
    assert_eq!(res.status(), StatusCode::OK);

    srv.settle(&gateway, &external_id, order_id).await;
    assert_eq!(srv.order(&customer, order_id).await["status"], "cancelled");
    assert_eq!(srv.stock(product_id).await, 5);

    // Refunds only go through the refund endpoint.
    let res = srv
        .client
        .patch(srv.url(&format!("/admin/orders/{order_id}/status")))
        .bearer_auth(&admin)
        .json(&json!({ "status": "refunded" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = srv
        .client
        .post(srv.url(&format!("/admin/orders/{order_id}/refund")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "refunded");
    assert_eq!(srv.stock(product_id).await, 5);
}

#[tokio::test]
async fn failed_gateway_call_leaves_no_payment_behind() {
    let gateway = Arc::new(FakeGateway {
        fail_create: true,
        ..Default::default()
    });
    let srv = TestServer::spawn(Some(gateway)).await;
    let admin = srv.admin("root@example.com").await;
    let customer = srv.customer("carl@example.com").await;
    let product = srv.create_product(&admin, 500, 1).await;
    let order = srv.place_order(&customer, product["id"].as_str().unwrap(), 1).await;
    let order_id = order["id"].as_str().unwrap();

    let res = srv
        .client
        .post(srv.url("/payments"))
        .bearer_auth(&customer)
        .json(&json!({ "order_id": order_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    let res = srv
        .client
        .get(srv.url(&format!("/orders/{order_id}/payments")))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let payments: Value = res.json().await.unwrap();
    assert!(payments.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn payments_are_unavailable_without_a_gateway() {
    let srv = TestServer::spawn(None).await;
    let admin = srv.admin("root@example.com").await;
    let customer = srv.customer("carl@example.com").await;
    let product = srv.create_product(&admin, 500, 1).await;
    let order = srv.place_order(&customer, product["id"].as_str().unwrap(), 1).await;

    let res = srv
        .client
        .post(srv.url("/payments"))
        .bearer_auth(&customer)
        .json(&json!({ "order_id": order["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn orders_are_private_to_their_owner() {
    let srv = TestServer::spawn(None).await;
    let admin = srv.admin("root@example.com").await;
    let alice = srv.customer("alice@example.com").await;
    let bob = srv.customer("bob@example.com").await;
    let product = srv.create_product(&admin, 700, 4).await;
    let order = srv.place_order(&alice, product["id"].as_str().unwrap(), 1).await;
    let order_id = order["id"].as_str().unwrap();

    let res = srv
        .client
        .get(srv.url(&format!("/orders/{order_id}")))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .get(srv.url(&format!("/orders/{order_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/orders")).bearer_auth(&bob).send().await.unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 0);

    let res = srv
        .client
        .post(srv.url(&format!("/orders/{order_id}/cancel")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cancelled: Value = res.json().await.unwrap();
    assert_eq!(cancelled["status"], "cancelled");

    let res = srv
        .client
        .patch(srv.url(&format!("/admin/orders/{order_id}/status")))
        .bearer_auth(&admin)
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = srv
        .client
        .get(srv.url("/admin/orders?status=cancelled"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn parcel_tracking_moves_the_order_along() {
    let srv = TestServer::spawn(None).await;
    let admin = srv.admin("root@example.com").await;
    let customer = srv.customer("carl@example.com").await;
    let product = srv.create_product(&admin, 900, 2).await;
    let order = srv.place_order(&customer, product["id"].as_str().unwrap(), 1).await;
    let order_id = order["id"].as_str().unwrap();

    let parcel_body = json!({ "order_id": order_id, "carrier": "CDEK", "tracking_number": "cd-1234567" });
    let res = srv
        .client
        .post(srv.url("/admin/parcels"))
        .bearer_auth(&admin)
        .json(&parcel_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = srv
        .client
        .patch(srv.url(&format!("/admin/orders/{order_id}/status")))
        .bearer_auth(&admin)
        .json(&json!({ "status": "confirmed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .post(srv.url("/admin/parcels"))
        .bearer_auth(&admin)
        .json(&parcel_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let parcel: Value = res.json().await.unwrap();
    assert_eq!(parcel["tracking_number"], "CD-1234567");
    assert_eq!(parcel["status"], "created");
    let parcel_id = parcel["id"].as_str().unwrap();

    let res = srv
        .client
        .post(srv.url("/admin/parcels"))
        .bearer_auth(&admin)
        .json(&parcel_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .patch(srv.url(&format!("/admin/parcels/{parcel_id}/status")))
        .bearer_auth(&admin)
        .json(&json!({ "status": "in_transit", "location": "Moscow hub" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .get(srv.url(&format!("/orders/{order_id}")))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let shipped: Value = res.json().await.unwrap();
    assert_eq!(shipped["status"], "shipped");

    let res = srv.client.get(srv.url("/parcels/track/cd-1234567")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let tracking: Value = res.json().await.unwrap();
    assert_eq!(tracking["status"], "in_transit");
    assert_eq!(tracking["events"].as_array().unwrap().len(), 2);
    assert!(tracking.get("order_id").is_none());

    let res = srv.client.get(srv.url("/parcels/track/$$$")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .get(srv.url(&format!("/orders/{order_id}/parcel")))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_uploads_images() {
    let srv = TestServer::spawn(None).await;
    let admin = srv.admin("root@example.com").await;
    let customer = srv.customer("carl@example.com").await;

    let png = || {
        reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3])
                .file_name("tiny.png")
                .mime_str("image/png")
                .unwrap(),
        )
    };

    let res = srv
        .client
        .post(srv.url("/upload"))
        .bearer_auth(&customer)
        .multipart(png())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .post(srv.url("/upload"))
        .bearer_auth(&admin)
        .multipart(png().text("folder", "banners"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let stored: Value = res.json().await.unwrap();
    let key = stored["key"].as_str().unwrap().to_string();
    assert!(key.starts_with("banners/") && key.ends_with(".png"));
    assert_eq!(stored["url"], format!("memory://uploads/{key}"));

    let text = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"hello".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    let res = srv
        .client
        .post(srv.url("/upload"))
        .bearer_auth(&admin)
        .multipart(text)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .delete(srv.url(&format!("/upload/{key}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn admins_manage_users_but_not_themselves() {
    let srv = TestServer::spawn(None).await;
    let admin = srv.admin("root@example.com").await;
    let customer = srv.customer("carl@example.com").await;

    let res = srv.client.get(srv.url("/users")).bearer_auth(&customer).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.client.get(srv.url("/users")).bearer_auth(&admin).send().await.unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 2);

    let res = srv.client.get(srv.url("/auth/me")).bearer_auth(&admin).send().await.unwrap();
    let me: Value = res.json().await.unwrap();
    let admin_id = me["id"].as_str().unwrap();

    let res = srv
        .client
        .patch(srv.url(&format!("/users/{admin_id}/role")))
        .bearer_auth(&admin)
        .json(&json!({ "role": "customer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = srv
        .client
        .delete(srv.url(&format!("/users/{admin_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = srv
        .client
        .patch(srv.url("/users/me"))
        .bearer_auth(&customer)
        .json(&json!({ "name": "Carl Jr", "phone": "+79991112233" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "Carl Jr");
}
