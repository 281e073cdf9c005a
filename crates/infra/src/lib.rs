//! Infrastructure layer: configuration, persistence and object storage.

pub mod config;
pub mod storage;
pub mod store;

pub use config::{AppConfig, ConfigError, StorageConfig};
pub use storage::{ObjectStorage, StorageError};
pub use store::{
    AddressStore, CartStore, CatalogStore, InMemoryStore, OrderStore, ParcelStore, PaymentStore,
    PostgresStore, ProductRemoval, Store, StoreError, StoreResult, UserStore,
};
