use crate::storage::{SessionStore, StoreError, session_key};
use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;

/// Session store backed by Valkey. Each session queue is one JSON string key
/// that expires after `ttl_secs` without writes.
#[derive(Clone)]
pub struct ValkeySessionStore {
    conn: redis::aio::ConnectionManager,
    ttl_secs: u64,
}

impl std::fmt::Debug for ValkeySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValkeySessionStore").field("ttl_secs", &self.ttl_secs).finish_non_exhaustive()
    }
}

impl ValkeySessionStore {
    /// Connects to Valkey.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the connection fails.
    pub async fn connect(url: &str, ttl_secs: u64) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn, ttl_secs })
    }
}

#[async_trait]
impl SessionStore for ValkeySessionStore {
    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn get(&self, session_id: &str, key: &str) -> Result<Vec<Value>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(session_key(session_id, key)).await?;

        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::error!(error = %e, "Stored toast queue is not a JSON list; treating it as empty");
                Ok(Vec::new())
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, records), fields(count = records.len()), err)]
    async fn put(&self, session_id: &str, key: &str, records: Vec<Value>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = session_key(session_id, key);

        if records.is_empty() {
            conn.del::<_, ()>(key).await?;
            return Ok(());
        }

        let payload = serde_json::to_string(&records)?;
        if self.ttl_secs > 0 {
            conn.set_ex::<_, _, ()>(key, payload, self.ttl_secs).await?;
        } else {
            conn.set::<_, _, ()>(key, payload).await?;
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn forget(&self, session_id: &str, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(session_key(session_id, key)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
