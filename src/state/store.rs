use super::storage::{load_state, save_state};
use super::types::{StateSnapshot, Tracked};
use std::path::{Path, PathBuf};

/// Staleness threshold used when callers have no policy of their own
pub const DEFAULT_STALE_THRESHOLD: f64 = 0.5;

/// File-backed record of which issues have already been alerted.
///
/// Every mutation is written through to disk before returning. The in-memory
/// snapshot stays authoritative if a write fails.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    snapshot: StateSnapshot,
}

impl StateStore {
    /// Open the store at `path`, loading whatever is there.
    ///
    /// Never fails: a missing or unreadable file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot = load_state(&path);
        tracing::debug!(
            path = %path.display(),
            repos = snapshot.repos.len(),
            ids = snapshot.total_tracked(),
            "Loaded notification state"
        );
        Self { path, snapshot }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    /// Re-read the backing file, replacing the in-memory snapshot
    pub fn load(&mut self) {
        self.snapshot = load_state(&self.path);
    }

    /// Persist the in-memory snapshot. Returns whether the write succeeded.
    pub fn save(&self) -> bool {
        save_state(&self.path, &self.snapshot)
    }

    pub fn is_initialized(&self, repo: &str) -> bool {
        self.snapshot.is_initialized(repo)
    }

    pub fn is_notified(&self, repo: &str, id: u64) -> bool {
        self.snapshot.is_notified(repo, id)
    }

    pub fn is_stale<T: Tracked>(&self, repo: &str, observed: &[T], threshold: f64) -> bool {
        self.snapshot.is_stale(repo, observed, threshold)
    }

    pub fn get_new_items<'a, T: Tracked>(&self, repo: &str, observed: &'a [T]) -> Vec<&'a T> {
        self.snapshot.new_items(repo, observed)
    }

    /// Adopt exactly the ids in `observed` as already known, without alerting
    pub fn sync_with_current<T: Tracked>(&mut self, repo: &str, observed: &[T]) {
        self.snapshot.sync(repo, observed);
        self.save();
    }

    pub fn mark_notified(&mut self, repo: &str, id: u64) {
        if self.snapshot.mark(repo, id) {
            self.save();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::types::LEGACY_REPO_KEY;
    use std::fs;

    fn temp_store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path().join("state.json"));
        (dir, store)
    }

    #[test]
    fn test_first_sync_initializes_repo() {
        let (_dir, mut store) = temp_store();
        assert!(!store.is_initialized("owner/repo"));

        store.sync_with_current("owner/repo", &[1u64, 2, 3]);
        assert!(store.is_initialized("owner/repo"));
        assert!(!store.is_initialized("owner/other"));
    }

    #[test]
    fn test_mutations_are_persisted_immediately() {
        let (_dir, mut store) = temp_store();
        store.sync_with_current("owner/repo", &[1u64]);
        store.mark_notified("owner/repo", 2);

        let reopened = StateStore::open(store.path());
        assert!(reopened.is_notified("owner/repo", 1));
        assert!(reopened.is_notified("owner/repo", 2));
    }

    #[test]
    fn test_mark_notified_twice_keeps_one_entry() {
        let (_dir, mut store) = temp_store();
        store.mark_notified("owner/repo", 42);
        store.mark_notified("owner/repo", 42);

        assert_eq!(store.snapshot().tracked("owner/repo").unwrap().len(), 1);

        let observed = [41u64, 42, 43];
        let fresh: Vec<u64> = store
            .get_new_items("owner/repo", &observed)
            .into_iter()
            .copied()
            .collect();
        assert_eq!(fresh, vec![41, 43]);
    }

    #[test]
    fn test_get_new_items_does_not_mutate() {
        let (_dir, mut store) = temp_store();
        store.sync_with_current("owner/repo", &[1u64]);
        let before = store.snapshot().clone();

        let observed = [3u64, 1, 2];
        let fresh: Vec<u64> = store
            .get_new_items("owner/repo", &observed)
            .into_iter()
            .copied()
            .collect();

        assert_eq!(fresh, vec![3, 2]);
        assert_eq!(store.snapshot(), &before);
    }

    #[test]
    fn test_roundtrip_through_fresh_instance() {
        let (_dir, mut store) = temp_store();
        store.sync_with_current("a/one", &[5u64, 6, 7]);
        store.sync_with_current("b/two", &[100u64]);
        store.mark_notified("b/two", 101);
        assert!(store.save());

        let reopened = StateStore::open(store.path());
        assert_eq!(reopened.snapshot(), store.snapshot());
    }

    #[test]
    fn test_legacy_file_is_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"notified_issues":[7,8,9]}"#).unwrap();

        let store = StateStore::open(&path);
        assert!(store.is_notified(LEGACY_REPO_KEY, 8));
        assert!(store.is_initialized(LEGACY_REPO_KEY));
    }

    #[test]
    fn test_corrupt_file_behaves_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"\x00\x9f not json at all").unwrap();

        let store = StateStore::open(&path);
        assert!(!store.is_initialized("owner/repo"));
        assert!(!store.is_initialized(LEGACY_REPO_KEY));
        assert!(store.snapshot().repos.is_empty());
    }

    #[test]
    fn test_load_replaces_memory_with_disk() {
        let (_dir, mut store) = temp_store();
        store.mark_notified("owner/repo", 1);

        let mut other = StateStore::open(store.path());
        other.mark_notified("owner/repo", 2);

        store.load();
        assert!(store.is_notified("owner/repo", 2));
    }

    #[test]
    fn test_failed_save_keeps_memory_authoritative() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let mut store = StateStore::open(blocker.join("state.json"));
        store.mark_notified("owner/repo", 9);

        assert!(store.is_notified("owner/repo", 9));
        assert!(!store.save());
    }
}
