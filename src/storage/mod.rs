use crate::config::{SessionBackend, SessionConfig};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod records;
pub mod valkey;

pub use memory::MemorySessionStore;
pub use valkey::ValkeySessionStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session backend error: {0}")]
    Backend(#[from] redis::RedisError),
    #[error("Session payload could not be encoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Session-scoped key-value storage for serialized toast records.
///
/// Implementations do not provide transactions; callers that read, modify and
/// write a session's queue must serialize those steps themselves.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Returns the records stored under `key`, or an empty list.
    async fn get(&self, session_id: &str, key: &str) -> Result<Vec<Value>, StoreError>;

    /// Replaces the records stored under `key`.
    async fn put(&self, session_id: &str, key: &str, records: Vec<Value>) -> Result<(), StoreError>;

    async fn forget(&self, session_id: &str, key: &str) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Discards idle sessions. Returns how many were reclaimed.
    fn sweep(&self) -> usize {
        0
    }
}

pub(crate) fn session_key(session_id: &str, key: &str) -> String {
    format!("session:{session_id}:{key}")
}

/// Builds the configured session store.
///
/// # Errors
/// Returns an error if the Valkey connection cannot be established.
pub async fn init_store(config: &SessionConfig) -> anyhow::Result<Arc<dyn SessionStore>> {
    match config.session_backend {
        SessionBackend::Memory => {
            tracing::info!(ttl_secs = config.session_ttl_secs, "Using in-memory session store");
            Ok(Arc::new(MemorySessionStore::new(std::time::Duration::from_secs(config.session_ttl_secs))))
        }
        SessionBackend::Valkey => {
            let store = ValkeySessionStore::connect(&config.valkey_url, config.session_ttl_secs).await?;
            tracing::info!("Using Valkey session store");
            Ok(Arc::new(store))
        }
    }
}
