//! Business workflows: sequential store calls around pure domain decisions.
//!
//! `AppServices` is shared by every handler through an `Extension`. Each
//! submodule adds the methods for one area of the storefront.

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use tracing::{info, warn};

use storefront_auth::Hs256Jwt;
use storefront_core::Currency;
use storefront_infra::{AppConfig, InMemoryStore, ObjectStorage, PostgresStore, Store};
use storefront_payments::{PaymentGateway, YooKassaClient};

use crate::app::errors::{ApiError, ApiResult};

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod parcels;
pub mod payments;
pub mod uploads;
pub mod users;

/// Runtime knobs the workflows need besides their collaborators.
#[derive(Debug, Clone)]
pub struct Settings {
    pub currency: Currency,
    pub cookie_secure: bool,
    pub upload_max_bytes: usize,
    pub verify_webhooks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency: Currency::rub(),
            cookie_secure: false,
            upload_max_bytes: 5 * 1024 * 1024,
            verify_webhooks: true,
        }
    }
}

#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub jwt: Arc<Hs256Jwt>,
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub storage: ObjectStorage,
    pub settings: Settings,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn Store>,
        jwt: Arc<Hs256Jwt>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        storage: ObjectStorage,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            jwt,
            gateway,
            storage,
            settings,
        }
    }

    /// Wire real backends from configuration.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = match &config.database {
            Some(db) => {
                let store = PostgresStore::connect(&db.url, db.max_connections)
                    .await
                    .context("connecting to postgres")?;
                store.migrate().await.context("running migrations")?;
                info!(max_connections = db.max_connections, "using postgres store");
                Arc::new(store)
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
                Arc::new(InMemoryStore::new())
            }
        };

        let jwt = Arc::new(Hs256Jwt::new(
            config.jwt.secret.as_bytes(),
            Duration::seconds(config.jwt.access_ttl_secs),
            Duration::seconds(config.jwt.refresh_ttl_secs),
        ));

        let gateway: Option<Arc<dyn PaymentGateway>> = match &config.yookassa {
            Some(yk) => {
                let client = YooKassaClient::new(&yk.api_url, &yk.shop_id, &yk.secret_key, &yk.return_url)
                    .context("building yookassa client")?;
                info!(api_url = %yk.api_url, "yookassa gateway enabled");
                Some(Arc::new(client))
            }
            None => {
                warn!("YooKassa is not configured; payment endpoints will answer 503");
                None
            }
        };

        let storage = ObjectStorage::from_config(&config.storage).context("configuring object storage")?;

        let settings = Settings {
            currency: config.currency,
            cookie_secure: config.cookie_secure,
            upload_max_bytes: config.storage.upload_max_bytes,
            verify_webhooks: config.yookassa.as_ref().map(|yk| yk.verify_webhooks).unwrap_or(true),
        };

        Ok(Self::new(store, jwt, gateway, storage, settings))
    }

    /// Fully in-process wiring for development and tests.
    pub fn in_memory(jwt_secret: &str, gateway: Option<Arc<dyn PaymentGateway>>, settings: Settings) -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(Hs256Jwt::new(jwt_secret.as_bytes(), Duration::minutes(15), Duration::days(30))),
            gateway,
            ObjectStorage::in_memory("memory://uploads"),
            settings,
        )
    }

    fn gateway(&self) -> ApiResult<&dyn PaymentGateway> {
        self.gateway
            .as_deref()
            .ok_or_else(|| ApiError::Unavailable("payment gateway is not configured".to_string()))
    }
}
