use crate::domain::clock::Clock;
use crate::domain::event::{ToastCreated, ToastListener};
use crate::domain::selection::{SelectionPolicy, purge, select};
use crate::domain::toast::Toast;
use crate::error::{AppError, Result};
use crate::services::toast_factory::{ToastFactory, ToastOptions};
use crate::settings::ToastSettings;
use crate::storage::SessionStore;
use crate::storage::records::{decode_records, encode_records};
use dashmap::DashMap;
use opentelemetry::{KeyValue, global, metrics::Counter};
use serde_json::{Map, Value};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;

#[derive(Clone, Debug)]
struct Metrics {
    created_total: Counter<u64>,
    duplicates_total: Counter<u64>,
    dismissed_total: Counter<u64>,
    cleared_total: Counter<u64>,
    malformed_total: Counter<u64>,
    gc_reclaimed_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("toastify-server");
        Self {
            created_total: meter
                .u64_counter("toastify_toasts_created_total")
                .with_description("Total toasts created")
                .build(),
            duplicates_total: meter
                .u64_counter("toastify_toasts_duplicate_total")
                .with_description("Toasts suppressed as duplicates of a recent toast")
                .build(),
            dismissed_total: meter
                .u64_counter("toastify_toasts_dismissed_total")
                .with_description("Total toasts dismissed")
                .build(),
            cleared_total: meter
                .u64_counter("toastify_sessions_cleared_total")
                .with_description("Total session queues cleared")
                .build(),
            malformed_total: meter
                .u64_counter("toastify_records_malformed_total")
                .with_description("Stored toast records dropped because they could not be decoded")
                .build(),
            gc_reclaimed_total: meter
                .u64_counter("toastify_sessions_reclaimed_total")
                .with_description("Idle sessions and session locks reclaimed by GC")
                .build(),
        }
    }
}

/// Manages the toast queue of each session.
///
/// Writes to one session (`add`, `dismiss`, `clear`) are serialized by a
/// per-session lock held in this process. Reads take no lock.
#[derive(Clone, Debug)]
pub struct ToastService {
    settings: Arc<ToastSettings>,
    factory: ToastFactory,
    policy: SelectionPolicy,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    listeners: Vec<Arc<dyn ToastListener>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    metrics: Metrics,
}

impl ToastService {
    #[must_use]
    pub fn new(settings: Arc<ToastSettings>, store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            factory: ToastFactory::new(Arc::clone(&settings)),
            policy: SelectionPolicy::from_settings(&settings),
            settings,
            store,
            clock,
            listeners: Vec::new(),
            locks: Arc::new(DashMap::new()),
            metrics: Metrics::new(),
        }
    }

    /// Registers a listener notified after each new toast is stored.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ToastListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &ToastSettings {
        &self.settings
    }

    /// Creates a toast and queues it for the session.
    ///
    /// With duplicate detection enabled, a live toast of the same type and text
    /// created within the threshold is returned instead; nothing is written and
    /// no listener is notified.
    ///
    /// # Errors
    /// Returns `AppError::Store` if the session cannot be read or written.
    #[tracing::instrument(err(level = "warn"), skip(self, text, options), fields(session_id = %session_id, kind = %kind))]
    pub async fn add(&self, session_id: &str, kind: &str, text: &str, options: ToastOptions) -> Result<Toast> {
        let kind = kind.to_lowercase();
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let mut toasts = self.load(session_id).await?;
        let now = self.clock.now();

        if let Some(existing) = self.find_duplicate(&toasts, &kind, text, now) {
            tracing::info!(id = %existing.id(), "Duplicate toast skipped");
            self.metrics.duplicates_total.add(1, &[KeyValue::new("type", kind)]);
            return Ok(existing.clone());
        }

        let toast = self.factory.build(&kind, text, options, now);
        toasts.insert(0, toast.clone());
        self.persist(session_id, toasts).await?;

        self.metrics.created_total.add(1, &[KeyValue::new("type", kind)]);
        tracing::debug!(id = %toast.id(), priority = %toast.priority(), "Toast queued");

        let event = ToastCreated { session_id: session_id.to_string(), toast: toast.clone() };
        for listener in &self.listeners {
            listener.on_created(&event);
        }

        Ok(toast)
    }

    /// # Errors
    /// Returns `AppError::Store` if the session cannot be read or written.
    pub async fn success(&self, session_id: &str, text: &str, title: Option<&str>, duration: Option<i64>) -> Result<Toast> {
        self.add(session_id, "success", text, ToastOptions::titled(title, duration)).await
    }

    /// # Errors
    /// Returns `AppError::Store` if the session cannot be read or written.
    pub async fn error(&self, session_id: &str, text: &str, title: Option<&str>, duration: Option<i64>) -> Result<Toast> {
        self.add(session_id, "error", text, ToastOptions::titled(title, duration)).await
    }

    /// # Errors
    /// Returns `AppError::Store` if the session cannot be read or written.
    pub async fn warning(&self, session_id: &str, text: &str, title: Option<&str>, duration: Option<i64>) -> Result<Toast> {
        self.add(session_id, "warning", text, ToastOptions::titled(title, duration)).await
    }

    /// # Errors
    /// Returns `AppError::Store` if the session cannot be read or written.
    pub async fn info(&self, session_id: &str, text: &str, title: Option<&str>, duration: Option<i64>) -> Result<Toast> {
        self.add(session_id, "info", text, ToastOptions::titled(title, duration)).await
    }

    /// Creates a toast from a free-form option map. See [`ToastOptions::from_custom`].
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if a recognized option has the wrong shape.
    /// Returns `AppError::Store` if the session cannot be read or written.
    pub async fn custom(
        &self,
        session_id: &str,
        text: &str,
        title: Option<&str>,
        options: Map<String, Value>,
    ) -> Result<Toast> {
        let (kind, options) =
            ToastOptions::from_custom(title, options).map_err(|e| AppError::BadRequest(format!("Invalid toast options: {e}")))?;
        self.add(session_id, &kind, text, options).await
    }

    /// Returns the toasts to display, in display order. Does not modify the store.
    ///
    /// # Errors
    /// Returns `AppError::Store` if the session cannot be read.
    #[tracing::instrument(level = "debug", err(level = "warn"), skip(self), fields(count = tracing::field::Empty))]
    pub async fn get(&self, session_id: &str) -> Result<Vec<Toast>> {
        let toasts = self.load(session_id).await?;
        let selected = select(toasts, self.clock.now(), &self.policy);
        tracing::Span::current().record("count", selected.len());
        Ok(selected)
    }

    /// Marks a toast dismissed and rewrites the session. Unknown ids are ignored.
    ///
    /// # Errors
    /// Returns `AppError::Store` if the session cannot be read or written.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn dismiss(&self, session_id: &str, id: &str) -> Result<()> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let mut toasts = self.load(session_id).await?;
        match toasts.iter_mut().find(|toast| toast.id() == id) {
            Some(toast) => {
                toast.mark_dismissed();
                self.metrics.dismissed_total.add(1, &[]);
            }
            None => tracing::debug!("Dismiss requested for unknown toast"),
        }

        self.persist(session_id, toasts).await
    }

    /// Removes every toast of the session.
    ///
    /// # Errors
    /// Returns `AppError::Store` if the session cannot be written.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn clear(&self, session_id: &str) -> Result<()> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        self.store.forget(session_id, &self.settings.session_key).await?;
        self.metrics.cleared_total.add(1, &[]);
        Ok(())
    }

    /// # Errors
    /// Returns `AppError::Store` if the session cannot be read.
    pub async fn has_toasts(&self, session_id: &str) -> Result<bool> {
        Ok(!self.get(session_id).await?.is_empty())
    }

    /// Reclaims idle sessions from the store and unused session locks.
    pub fn perform_gc(&self) -> usize {
        let start = std::time::Instant::now();
        tracing::debug!("Starting session GC cycle");

        let sessions = self.store.sweep();
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let locks = before.saturating_sub(self.locks.len());

        let reclaimed = sessions + locks;
        if reclaimed > 0 {
            self.metrics.gc_reclaimed_total.add(reclaimed as u64, &[]);
            tracing::info!(sessions, locks, "Session GC reclaimed idle entries");
        }
        tracing::debug!(duration_secs = %start.elapsed().as_secs_f64(), "Session GC cycle completed");
        reclaimed
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(&self.locks.entry(session_id.to_string()).or_default())
    }

    async fn load(&self, session_id: &str) -> Result<Vec<Toast>> {
        let records = self.store.get(session_id, &self.settings.session_key).await?;
        let decoded = decode_records(records);
        if decoded.malformed > 0 {
            self.metrics.malformed_total.add(decoded.malformed as u64, &[]);
        }
        Ok(decoded.toasts)
    }

    /// Drops dismissed, expired and over-lifetime toasts, then overwrites the session.
    async fn persist(&self, session_id: &str, toasts: Vec<Toast>) -> Result<()> {
        let kept = purge(toasts, self.clock.now(), self.policy.lifetime_ms);
        let records = encode_records(&kept)?;
        self.store.put(session_id, &self.settings.session_key, records).await?;
        Ok(())
    }

    /// A record stamped later than `now` (clock skew between writers) is never a duplicate.
    fn find_duplicate<'a>(&self, toasts: &'a [Toast], kind: &str, text: &str, now: OffsetDateTime) -> Option<&'a Toast> {
        let detection = &self.settings.behavior.duplicate_detection;
        if !detection.enabled {
            return None;
        }
        let threshold = i128::from(detection.duration_threshold);
        toasts.iter().find(|toast| {
            toast.is_live_at(now, self.policy.lifetime_ms)
                && toast.kind() == kind
                && toast.text() == text
                && (0..=threshold).contains(&toast.age_ms(now))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::event::BroadcastListener;
    use crate::domain::toast::fixtures::epoch_plus;
    use crate::storage::MemorySessionStore;
    use serde_json::json;

    struct Harness {
        service: ToastService,
        store: Arc<MemorySessionStore>,
        clock: Arc<ManualClock>,
    }

    fn harness(mutate: impl FnOnce(&mut Value)) -> Harness {
        let mut value: Value = serde_json::from_str(crate::settings::BUNDLED_SETTINGS).unwrap();
        mutate(&mut value);
        let settings = Arc::new(ToastSettings::from_value(value).unwrap());
        let store = Arc::new(MemorySessionStore::default());
        let clock = Arc::new(ManualClock::new(epoch_plus(0)));
        let service = ToastService::new(settings, Arc::clone(&store) as Arc<dyn SessionStore>, Arc::clone(&clock) as Arc<dyn Clock>);
        Harness { service, store, clock }
    }

    #[tokio::test]
    async fn test_add_prepends_and_persists() {
        let h = harness(|_| {});
        let first = h.service.info("s1", "one", None, None).await.unwrap();
        h.clock.advance_ms(10);
        let second = h.service.info("s1", "two", None, None).await.unwrap();

        let stored = h.store.get("s1", "toastify_messages").await.unwrap();
        assert_eq!(stored[0]["id"], second.id());
        assert_eq!(stored[1]["id"], first.id());
    }

    #[tokio::test]
    async fn test_duplicate_suppression_within_threshold() {
        let h = harness(|v| v["behavior"]["duplicate_detection"]["enabled"] = json!(true));
        let listener = Arc::new(BroadcastListener::new(8));
        let mut rx = listener.subscribe();
        let service = h.service.clone().with_listener(listener);

        let first = service.success("s1", "Saved", None, None).await.unwrap();
        h.clock.advance_ms(1000);
        let again = service.success("s1", "Saved", None, None).await.unwrap();

        assert_eq!(again.id(), first.id());
        assert_eq!(h.store.get("s1", "toastify_messages").await.unwrap().len(), 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        h.clock.advance_ms(1);
        let later = service.success("s1", "Saved", None, None).await.unwrap();
        assert_ne!(later.id(), first.id());
    }

    #[tokio::test]
    async fn test_future_dated_toast_is_not_a_duplicate() {
        let h = harness(|v| v["behavior"]["duplicate_detection"]["enabled"] = json!(true));
        let first = h.service.success("s1", "Saved", None, None).await.unwrap();

        h.clock.set(epoch_plus(-500));
        let again = h.service.success("s1", "Saved", None, None).await.unwrap();

        assert_ne!(again.id(), first.id());
        assert_eq!(h.store.get("s1", "toastify_messages").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicates_allowed_when_detection_disabled() {
        let h = harness(|_| {});
        let a = h.service.success("s1", "Saved", None, None).await.unwrap();
        let b = h.service.success("s1", "Saved", None, None).await.unwrap();

        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_dismissed_toast_is_not_a_duplicate() {
        let h = harness(|v| v["behavior"]["duplicate_detection"]["enabled"] = json!(true));
        let first = h.service.info("s1", "hi", None, None).await.unwrap();
        h.service.dismiss("s1", first.id()).await.unwrap();

        let second = h.service.info("s1", "hi", None, None).await.unwrap();
        assert_ne!(second.id(), first.id());
    }

    #[tokio::test]
    async fn test_dismiss_removes_on_write() {
        let h = harness(|_| {});
        let keep = h.service.info("s1", "keep", None, None).await.unwrap();
        let drop = h.service.info("s1", "drop", None, None).await.unwrap();

        h.service.dismiss("s1", drop.id()).await.unwrap();

        let visible = h.service.get("s1").await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id(), keep.id());
        assert_eq!(h.store.get("s1", "toastify_messages").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dismiss_unknown_id_is_silent() {
        let h = harness(|_| {});
        h.service.info("s1", "x", None, None).await.unwrap();

        h.service.dismiss("s1", "nope").await.unwrap();
        assert_eq!(h.service.get("s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_toasts_vanish_and_are_purged_on_write() {
        let h = harness(|_| {});
        h.service.success("s1", "short", None, Some(100)).await.unwrap();
        h.clock.advance_ms(100);

        assert!(!h.service.has_toasts("s1").await.unwrap());
        // get does not write.
        assert_eq!(h.store.get("s1", "toastify_messages").await.unwrap().len(), 1);

        h.service.info("s1", "next", None, None).await.unwrap();
        assert_eq!(h.store.get("s1", "toastify_messages").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lifetime_drops_non_expiring_toasts() {
        let h = harness(|_| {});
        h.service.add("s1", "critical", "down", ToastOptions::default()).await.unwrap();

        h.clock.advance_ms(10_000);
        assert!(h.service.has_toasts("s1").await.unwrap());
        h.clock.advance_ms(1);
        assert!(!h.service.has_toasts("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_forgets_session() {
        let h = harness(|_| {});
        h.service.info("s1", "x", None, None).await.unwrap();
        h.service.info("s2", "y", None, None).await.unwrap();

        h.service.clear("s1").await.unwrap();

        assert!(!h.service.has_toasts("s1").await.unwrap());
        assert!(h.service.has_toasts("s2").await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_record_is_dropped() {
        let h = harness(|_| {});
        let good = h.service.info("s1", "x", None, None).await.unwrap();
        let mut records = h.store.get("s1", "toastify_messages").await.unwrap();
        records.push(json!({"id": "bad"}));
        h.store.put("s1", "toastify_messages", records).await.unwrap();

        let visible = h.service.get("s1").await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id(), good.id());
    }

    #[tokio::test]
    async fn test_custom_uses_options() {
        let h = harness(|_| {});
        let options = json!({ "type": "custom_notification", "priority": "high", "orderId": 9 });

        let toast = h.service.custom("s1", "Order shipped", Some("Shipping"), options.as_object().unwrap().clone()).await.unwrap();

        assert_eq!(toast.kind(), "custom_notification");
        assert_eq!(toast.priority(), "high");
        assert_eq!(toast.title(), Some("Shipping"));
        assert_eq!(toast.custom_data().get("orderId"), Some(&json!(9)));
        assert!(!toast.auto_dismiss());
    }

    #[tokio::test]
    async fn test_custom_rejects_bad_options() {
        let h = harness(|_| {});
        let options = json!({ "autoDismiss": "maybe" });

        let result = h.service.custom("s1", "x", None, options.as_object().unwrap().clone()).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let h = harness(|v| v["queue"]["lifetime"] = json!(0));
        let mut tasks = Vec::new();
        for i in 0..20 {
            let service = h.service.clone();
            tasks.push(tokio::spawn(async move { service.info("s1", &format!("n{i}"), None, None).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(h.store.get("s1", "toastify_messages").await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_gc_reclaims_idle_locks() {
        let h = harness(|_| {});
        h.service.info("s1", "x", None, None).await.unwrap();

        assert_eq!(h.service.locks.len(), 1);
        assert!(h.service.perform_gc() >= 1);
        assert!(h.service.locks.is_empty());
    }
}
