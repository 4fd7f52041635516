use crate::services::ToastService;
use std::time::Duration;
use tokio::sync::watch;
use tracing::Instrument;

/// Periodically reclaims idle sessions and their locks.
#[derive(Debug)]
pub struct SessionGcWorker {
    service: ToastService,
    gc_interval_secs: u64,
}

impl SessionGcWorker {
    #[must_use]
    pub const fn new(service: ToastService, gc_interval_secs: u64) -> Self {
        Self { service, gc_interval_secs }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.gc_interval_secs.max(1)));

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    async {
                        self.service.perform_gc();
                    }
                    .instrument(tracing::debug_span!("session_gc_iteration"))
                    .await;
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Session GC loop shutting down...");
    }
}
