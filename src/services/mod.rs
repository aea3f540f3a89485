pub mod memory_store;
pub mod redis_service;
pub mod store;

use crate::config::AppConfig;
use memory_store::MemoryStore;
use redis_service::RedisService;
use std::sync::Arc;
use store::{SharedStore, StoreError};

/// Opens the store named by `store_url`: `memory://` keeps products
/// in-process, anything else is handed to the redis client.
pub fn open_store(config: &AppConfig) -> Result<SharedStore, StoreError> {
    if config.store_url.starts_with("memory://") {
        log::warn!("Using the in-memory product store, data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let client = redis::Client::open(config.store_url.as_str())?;
    Ok(Arc::new(RedisService::new(client, config.store_key.clone())))
}
