use crate::domain::toast::Toast;
use tokio::sync::broadcast;

/// Emitted after a new toast has been stored. Duplicates do not emit.
#[derive(Debug, Clone)]
pub struct ToastCreated {
    pub session_id: String,
    pub toast: Toast,
}

/// Receives creation events. Delivery is fire-and-forget.
pub trait ToastListener: Send + Sync + std::fmt::Debug {
    fn on_created(&self, event: &ToastCreated);
}

/// Fans creation events out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastListener {
    tx: broadcast::Sender<ToastCreated>,
}

impl BroadcastListener {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ToastCreated> {
        self.tx.subscribe()
    }
}

impl ToastListener for BroadcastListener {
    fn on_created(&self, event: &ToastCreated) {
        // No receivers is not an error.
        let _ = self.tx.send(event.clone());
    }
}
