//! Notification state: which issues have already been alerted, per repository.

pub mod storage;
pub mod store;
pub mod types;

pub use storage::{get_state_path, load_state, read_state, save_state, write_state};
pub use store::{StateStore, DEFAULT_STALE_THRESHOLD};
pub use types::{StateSnapshot, Tracked, LEGACY_REPO_KEY};
