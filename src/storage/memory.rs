use crate::storage::{SessionStore, StoreError, session_key};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry {
    records: Vec<Value>,
    touched: Instant,
}

/// Process-local session store. Sessions idle longer than `ttl` are dropped by [`SessionStore::sweep`].
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    entries: Arc<DashMap<String, Entry>>,
    ttl: Duration,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Arc::new(DashMap::new()), ttl }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(7200))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Vec<Value>, StoreError> {
        let records = self.entries.get_mut(&session_key(session_id, key)).map(|mut entry| {
            entry.touched = Instant::now();
            entry.records.clone()
        });
        Ok(records.unwrap_or_default())
    }

    async fn put(&self, session_id: &str, key: &str, records: Vec<Value>) -> Result<(), StoreError> {
        self.entries.insert(session_key(session_id, key), Entry { records, touched: Instant::now() });
        Ok(())
    }

    async fn forget(&self, session_id: &str, key: &str) -> Result<(), StoreError> {
        self.entries.remove(&session_key(session_id, key));
        Ok(())
    }

    fn sweep(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.touched.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }
}
