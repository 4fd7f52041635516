use crate::domain::event::ToastCreated;
use tokio::sync::{broadcast, watch};

/// Drains toast-created events and records them in the log.
#[derive(Debug)]
pub struct ToastEventWorker {
    events: broadcast::Receiver<ToastCreated>,
}

impl ToastEventWorker {
    #[must_use]
    pub const fn new(events: broadcast::Receiver<ToastCreated>) -> Self {
        Self { events }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,

                result = self.events.recv() => {
                    match result {
                        Ok(event) => {
                            tracing::info!(
                                session_id = %event.session_id,
                                id = %event.toast.id(),
                                kind = %event.toast.kind(),
                                priority = %event.toast.priority(),
                                "Toast created"
                            );
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(missed = n, "Toast event log lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }

        tracing::info!("Toast event worker shutting down...");
    }
}
