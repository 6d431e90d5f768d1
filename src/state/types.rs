use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Repository key that pre-per-repo state files are migrated into.
pub const LEGACY_REPO_KEY: &str = "_legacy";

/// Anything the state store can track by issue number.
///
/// Returns `None` for malformed items; those are never tracked or alerted.
pub trait Tracked {
    fn tracked_id(&self) -> Option<u64>;
}

impl Tracked for u64 {
    fn tracked_id(&self) -> Option<u64> {
        Some(*self)
    }
}

impl Tracked for Option<u64> {
    fn tracked_id(&self) -> Option<u64> {
        *self
    }
}

/// Issue numbers already alerted (or adopted at bootstrap), per repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    pub repos: HashMap<String, HashSet<u64>>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracked ids for `repo`, if the key exists
    pub fn tracked(&self, repo: &str) -> Option<&HashSet<u64>> {
        self.repos.get(repo)
    }

    /// True iff at least one id is tracked for `repo`
    pub fn is_initialized(&self, repo: &str) -> bool {
        self.repos.get(repo).is_some_and(|ids| !ids.is_empty())
    }

    pub fn is_notified(&self, repo: &str, id: u64) -> bool {
        self.repos.get(repo).is_some_and(|ids| ids.contains(&id))
    }

    /// Stale iff nothing is tracked, or the share of tracked ids still present
    /// in `observed` is strictly below `threshold`.
    pub fn is_stale<T: Tracked>(&self, repo: &str, observed: &[T], threshold: f64) -> bool {
        let tracked = match self.repos.get(repo) {
            Some(ids) if !ids.is_empty() => ids,
            _ => return true,
        };

        let live: HashSet<u64> = observed.iter().filter_map(|item| item.tracked_id()).collect();
        let surviving = tracked.iter().filter(|id| live.contains(id)).count();

        (surviving as f64 / tracked.len() as f64) < threshold
    }

    /// Items whose id is not tracked for `repo`, in input order
    pub fn new_items<'a, T: Tracked>(&self, repo: &str, observed: &'a [T]) -> Vec<&'a T> {
        let tracked = self.repos.get(repo);
        observed
            .iter()
            .filter(|item| match item.tracked_id() {
                Some(id) => !tracked.is_some_and(|ids| ids.contains(&id)),
                None => false,
            })
            .collect()
    }

    /// Replace the tracked set for `repo` with exactly the ids in `observed`
    pub fn sync<T: Tracked>(&mut self, repo: &str, observed: &[T]) {
        let ids = observed.iter().filter_map(|item| item.tracked_id()).collect();
        self.repos.insert(repo.to_string(), ids);
    }

    /// Track `id` for `repo`. Returns false if it was already tracked.
    pub fn mark(&mut self, repo: &str, id: u64) -> bool {
        self.repos.entry(repo.to_string()).or_default().insert(id)
    }

    /// Total number of tracked ids across all repositories
    pub fn total_tracked(&self) -> usize {
        self.repos.values().map(HashSet::len).sum()
    }
}

/// On-disk layout: `{"repos": {"owner/name": [1, 2, 3]}}`.
///
/// Written with repositories and ids sorted so the file diffs cleanly.
#[derive(Debug, Serialize)]
pub(crate) struct PersistedState<'a> {
    pub repos: BTreeMap<&'a str, Vec<u64>>,
}

impl<'a> From<&'a StateSnapshot> for PersistedState<'a> {
    fn from(snapshot: &'a StateSnapshot) -> Self {
        let repos = snapshot
            .repos
            .iter()
            .map(|(repo, ids)| {
                let mut ids: Vec<u64> = ids.iter().copied().collect();
                ids.sort_unstable();
                (repo.as_str(), ids)
            })
            .collect();
        Self { repos }
    }
}

/// Every layout accepted on read.
///
/// `repos` selects the current layout; otherwise the legacy flat list is used.
/// A key that is present but malformed fails the whole parse.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StoredState {
    #[serde(default)]
    repos: Option<HashMap<String, Vec<Option<u64>>>>,
    #[serde(default)]
    notified_issues: Option<Vec<Option<u64>>>,
}

impl From<StoredState> for StateSnapshot {
    fn from(stored: StoredState) -> Self {
        if let Some(repos) = stored.repos {
            return Self {
                repos: repos
                    .into_iter()
                    .map(|(repo, ids)| (repo, ids.into_iter().flatten().collect()))
                    .collect(),
            };
        }

        let ids: HashSet<u64> = stored
            .notified_issues
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .collect();
        let mut repos = HashMap::new();
        if !ids.is_empty() {
            repos.insert(LEGACY_REPO_KEY.to_string(), ids);
        }
        Self { repos }
    }
}
