use crate::state::{StateStore, Tracked, DEFAULT_STALE_THRESHOLD};

/// Alerting is suppressed when more than this share of open issues look new
pub const DEFAULT_MAX_NEW_RATIO: f64 = 0.8;

/// Thresholds that decide when tracked state no longer matches reality.
///
/// Three tiers are checked in order: an uninitialized repository, a tracked
/// set whose survival ratio fell below `stale_threshold`, and a batch of
/// "new" issues larger than `max_new_ratio` of everything observed. Each one
/// resyncs silently instead of alerting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StalenessPolicy {
    pub stale_threshold: f64,
    pub max_new_ratio: f64,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            stale_threshold: DEFAULT_STALE_THRESHOLD,
            max_new_ratio: DEFAULT_MAX_NEW_RATIO,
        }
    }
}

impl StalenessPolicy {
    /// Whether `new_count` out of `observed_count` is too many to alert on
    pub fn exceeds_new_ratio(&self, new_count: usize, observed_count: usize) -> bool {
        new_count as f64 > self.max_new_ratio * observed_count as f64
    }
}

/// What to do with one repository's observed issues this cycle
#[derive(Debug, PartialEq)]
pub enum Reconciliation<'a, T> {
    /// Nothing tracked yet: adopt everything silently
    Bootstrap,
    /// Most tracked issues vanished: adopt everything silently
    Resync,
    /// Suspiciously many new issues: adopt everything silently
    SafetyValve { new_count: usize },
    /// Alert on these, in order
    Alert(Vec<&'a T>),
    /// Nothing new
    UpToDate,
}

impl<T> Reconciliation<'_, T> {
    /// True for the variants that replace tracked state without alerting
    pub fn is_resync(&self) -> bool {
        matches!(
            self,
            Reconciliation::Bootstrap | Reconciliation::Resync | Reconciliation::SafetyValve { .. }
        )
    }
}

/// Decide what a poll of `repo` should do. Never mutates the store.
pub fn reconcile<'a, T: Tracked>(
    store: &StateStore,
    repo: &str,
    observed: &'a [T],
    policy: &StalenessPolicy,
) -> Reconciliation<'a, T> {
    if !store.is_initialized(repo) {
        return Reconciliation::Bootstrap;
    }

    if store.is_stale(repo, observed, policy.stale_threshold) {
        return Reconciliation::Resync;
    }

    let new_items = store.get_new_items(repo, observed);
    if new_items.is_empty() {
        return Reconciliation::UpToDate;
    }

    if policy.exceeds_new_ratio(new_items.len(), observed.len()) {
        return Reconciliation::SafetyValve {
            new_count: new_items.len(),
        };
    }

    Reconciliation::Alert(new_items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_tracking(repo: &str, ids: &[u64]) -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::open(dir.path().join("state.json"));
        if !ids.is_empty() {
            store.sync_with_current(repo, ids);
        }
        (dir, store)
    }

    #[test]
    fn test_uninitialized_repo_bootstraps() {
        let (_dir, store) = store_tracking("owner/repo", &[]);
        let observed: Vec<u64> = (1..=10).collect();

        let decision = reconcile(&store, "owner/repo", &observed, &StalenessPolicy::default());
        assert_eq!(decision, Reconciliation::Bootstrap);
        assert!(decision.is_resync());
    }

    #[test]
    fn test_vanished_tracked_issue_resyncs() {
        let (_dir, store) = store_tracking("owner/repo", &[1]);
        let observed: Vec<u64> = (2..=11).collect();

        let decision = reconcile(&store, "owner/repo", &observed, &StalenessPolicy::default());
        assert_eq!(decision, Reconciliation::Resync);
    }

    #[test]
    fn test_too_many_new_trips_safety_valve() {
        // 1 of 1 tracked survives, but 9 of 10 observed are new
        let (_dir, store) = store_tracking("owner/repo", &[1]);
        let observed: Vec<u64> = (1..=10).collect();

        let decision = reconcile(&store, "owner/repo", &observed, &StalenessPolicy::default());
        assert_eq!(decision, Reconciliation::SafetyValve { new_count: 9 });
    }

    #[test]
    fn test_safety_valve_boundary_is_strict() {
        // 4 of 5 new is exactly 80%: alert
        let (_dir, store) = store_tracking("owner/repo", &[1]);
        let observed = [1u64, 2, 3, 4, 5];

        let decision = reconcile(&store, "owner/repo", &observed, &StalenessPolicy::default());
        assert_eq!(decision, Reconciliation::Alert(vec![&2, &3, &4, &5]));
    }

    #[test]
    fn test_few_new_issues_alert_in_order() {
        let (_dir, store) = store_tracking("owner/repo", &[1, 2, 3, 4]);
        let observed = [6u64, 4, 3, 5, 2, 1];

        let decision = reconcile(&store, "owner/repo", &observed, &StalenessPolicy::default());
        assert_eq!(decision, Reconciliation::Alert(vec![&6, &5]));
        assert!(!decision.is_resync());
    }

    #[test]
    fn test_nothing_new_is_up_to_date() {
        let (_dir, store) = store_tracking("owner/repo", &[1, 2]);
        let observed = [2u64, 1];

        let decision = reconcile(&store, "owner/repo", &observed, &StalenessPolicy::default());
        assert_eq!(decision, Reconciliation::UpToDate);
    }

    #[test]
    fn test_custom_policy() {
        let (_dir, store) = store_tracking("owner/repo", &[1, 2, 3, 4]);
        let observed = [1u64, 5, 6];
        let policy = StalenessPolicy {
            stale_threshold: 0.25,
            max_new_ratio: 1.0,
        };

        let decision = reconcile(&store, "owner/repo", &observed, &policy);
        assert_eq!(decision, Reconciliation::Alert(vec![&5, &6]));
    }
}
