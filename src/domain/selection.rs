use crate::domain::toast::Toast;
use crate::settings::ToastSettings;
use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;

/// Display limits and ordering derived from the toast settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub max_toasts: usize,
    /// Most important first. Priorities not listed rank after all of these.
    pub priority_order: Vec<String>,
    /// Per-priority display caps. Empty when priority queuing is disabled.
    pub priority_limits: BTreeMap<String, usize>,
    /// Zero disables the per-type cap.
    pub per_type_limit: usize,
    /// Zero disables the global lifetime.
    pub lifetime_ms: u64,
    /// Newest first instead of oldest first.
    pub reverse_order: bool,
}

impl SelectionPolicy {
    #[must_use]
    pub fn from_settings(settings: &ToastSettings) -> Self {
        Self {
            max_toasts: settings.queue.max_toasts,
            priority_order: settings.priority_order(),
            priority_limits: settings.priority_limits(),
            per_type_limit: settings.queue.per_type_limit,
            lifetime_ms: settings.queue.lifetime,
            reverse_order: settings.behavior.reverse_order_on_stack,
        }
    }

    fn rank(&self, priority: &str) -> usize {
        self.priority_order.iter().position(|p| p == priority).unwrap_or(self.priority_order.len())
    }
}

/// Drops dismissed, expired and over-lifetime records, keeping input order.
#[must_use]
pub fn purge(records: Vec<Toast>, now: OffsetDateTime, lifetime_ms: u64) -> Vec<Toast> {
    records.into_iter().filter(|toast| toast.is_live_at(now, lifetime_ms)).collect()
}

/// Chooses which live toasts are displayed and in what order.
///
/// Candidates are ranked by priority then age. The walk stops at the global
/// cap; a candidate whose priority or type bucket is already full is skipped
/// so later candidates can still fill other buckets. Membership is decided by
/// rank, presentation order by creation time alone.
#[must_use]
pub fn select(records: Vec<Toast>, now: OffsetDateTime, policy: &SelectionPolicy) -> Vec<Toast> {
    let mut candidates = purge(records, now, policy.lifetime_ms);
    candidates.sort_by_key(|toast| (policy.rank(toast.priority()), toast.created_at()));

    let mut selected: Vec<Toast> = Vec::with_capacity(policy.max_toasts.min(candidates.len()));
    let mut per_priority: HashMap<String, usize> = HashMap::new();
    let mut per_type: HashMap<String, usize> = HashMap::new();

    for toast in candidates {
        if selected.len() >= policy.max_toasts {
            break;
        }

        let priority_count = per_priority.get(toast.priority()).copied().unwrap_or(0);
        if let Some(&limit) = policy.priority_limits.get(toast.priority())
            && priority_count >= limit
        {
            continue;
        }

        let type_count = per_type.get(toast.kind()).copied().unwrap_or(0);
        if policy.per_type_limit > 0 && type_count >= policy.per_type_limit {
            continue;
        }

        per_priority.insert(toast.priority().to_string(), priority_count + 1);
        per_type.insert(toast.kind().to_string(), type_count + 1);
        selected.push(toast);
    }

    if policy.reverse_order {
        selected.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    } else {
        selected.sort_by_key(Toast::created_at);
    }

    selected
}
