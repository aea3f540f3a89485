use crate::models::product::{NewProduct, Product, ProductPatch};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub type SharedStore = Arc<dyn ProductStore>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("failed to (de)serialize product document: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence for product documents.
///
/// Every method touches a single document, and each write is applied
/// all-or-nothing. Lookups by an id that has no document return `None`.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Stores a new document under a freshly generated id.
    async fn insert(&self, product: NewProduct) -> StoreResult<Product>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Product>>;

    /// All documents, oldest first.
    async fn get_all(&self) -> StoreResult<Vec<Product>>;

    async fn update(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>>;

    /// Removes the document and returns what was stored.
    async fn delete(&self, id: Uuid) -> StoreResult<Option<Product>>;
}
