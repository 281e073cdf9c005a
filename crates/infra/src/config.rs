//! Process configuration from environment variables (optionally `.env`).

use std::net::SocketAddr;

use thiserror::Error;
use tracing::warn;

use storefront_core::Currency;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";
const DEFAULT_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "HOST",
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, PartialEq, Eq)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct YooKassaConfig {
    pub shop_id: String,
    pub secret_key: String,
    pub api_url: String,
    pub return_url: String,
    /// Re-fetch a payment from the gateway before trusting a webhook.
    pub verify_webhooks: bool,
}

impl std::fmt::Debug for YooKassaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YooKassaConfig")
            .field("shop_id", &self.shop_id)
            .field("secret_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("return_url", &self.return_url)
            .field("verify_webhooks", &self.verify_webhooks)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// `None` selects the in-memory object store.
    pub s3: Option<S3Config>,
    /// Prefix joined with an object key to form its public URL.
    pub public_url: String,
    pub upload_max_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    pub cookie_secure: bool,
    pub currency: Currency,
    /// `None` disables payment endpoints.
    pub yookassa: Option<YooKassaConfig>,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let server = ServerConfig {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse(&get, "PORT")?.unwrap_or(8080),
        };

        let database = match get("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse(&get, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(10),
            }),
            None => None,
        };

        let secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };
        let jwt = JwtConfig {
            secret,
            access_ttl_secs: positive(parse(&get, "JWT_ACCESS_TTL_SECS")?.unwrap_or(900), "JWT_ACCESS_TTL_SECS")?,
            refresh_ttl_secs: positive(
                parse(&get, "JWT_REFRESH_TTL_SECS")?.unwrap_or(30 * 24 * 3600),
                "JWT_REFRESH_TTL_SECS",
            )?,
        };

        let currency = match get("STORE_CURRENCY") {
            Some(code) => Currency::new(&code).map_err(|e| ConfigError::Invalid {
                var: "STORE_CURRENCY",
                reason: e.to_string(),
            })?,
            None => Currency::rub(),
        };

        let yookassa = match (get("YOOKASSA_SHOP_ID"), get("YOOKASSA_SECRET_KEY")) {
            (Some(shop_id), Some(secret_key)) => Some(YooKassaConfig {
                shop_id,
                secret_key,
                api_url: get("YOOKASSA_API_URL").unwrap_or_else(|| storefront_payments::DEFAULT_API_URL.to_string()),
                return_url: get("YOOKASSA_RETURN_URL").ok_or(ConfigError::Missing("YOOKASSA_RETURN_URL"))?,
                verify_webhooks: parse(&get, "YOOKASSA_VERIFY_WEBHOOKS")?.unwrap_or(true),
            }),
            (Some(_), None) => return Err(ConfigError::Missing("YOOKASSA_SECRET_KEY")),
            (None, Some(_)) => return Err(ConfigError::Missing("YOOKASSA_SHOP_ID")),
            (None, None) => None,
        };

        let s3 = get("S3_BUCKET").map(|bucket| S3Config {
            bucket,
            region: get("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            endpoint: get("S3_ENDPOINT"),
            access_key_id: get("S3_ACCESS_KEY_ID"),
            secret_access_key: get("S3_SECRET_ACCESS_KEY"),
        });
        let public_url = match (get("S3_PUBLIC_URL"), &s3) {
            (Some(url), _) => url,
            (None, Some(s3)) => match &s3.endpoint {
                Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), s3.bucket),
                None => format!("https://{}.s3.{}.amazonaws.com", s3.bucket, s3.region),
            },
            (None, None) => "memory://uploads".to_string(),
        };
        let storage = StorageConfig {
            s3,
            public_url: public_url.trim_end_matches('/').to_string(),
            upload_max_bytes: parse(&get, "UPLOAD_MAX_BYTES")?.unwrap_or(DEFAULT_UPLOAD_MAX_BYTES),
        };

        Ok(Self {
            server,
            database,
            jwt,
            cookie_secure: parse(&get, "COOKIE_SECURE")?.unwrap_or(false),
            currency,
            yookassa,
            storage,
        })
    }
}

fn parse<T, G>(get: &G, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(var)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn positive(value: i64, var: &'static str) -> Result<i64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be positive".to_string(),
        });
    }
    Ok(value)
}
