use crate::storage::SessionStore;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const STORE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct Metrics {
    pub status: Gauge<i64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("toastify-server");
        Self {
            status: meter
                .i64_gauge("toastify_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct HealthService {
    store: Arc<dyn SessionStore>,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store, metrics: Metrics::new() }
    }

    /// Checks that the session store answers.
    ///
    /// # Errors
    /// Returns a string describing the failure if the store is unreachable.
    pub async fn check_store(&self) -> Result<(), String> {
        let result = match timeout(STORE_TIMEOUT, self.store.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("Session store check failed: {e}")),
            Err(_) => Err("Session store check timed out".to_string()),
        };

        let status = i64::from(result.is_ok());
        self.metrics.status.record(status, &[KeyValue::new("component", "session_store")]);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySessionStore;

    #[tokio::test]
    async fn test_memory_store_is_healthy() {
        let service = HealthService::new(Arc::new(MemorySessionStore::default()));
        assert!(service.check_store().await.is_ok());
    }
}
