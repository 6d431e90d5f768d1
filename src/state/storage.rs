use super::types::{PersistedState, StateSnapshot, StoredState};
use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the default state file path (~/.config/issue-relay/state.json)
pub fn get_state_path() -> PathBuf {
    crate::config::get_config_dir().join("state.json")
}

/// Read a state file.
///
/// A missing file is an empty snapshot. Unreadable or unparseable content is
/// an error; see [`load_state`] for the tolerant variant.
pub fn read_state(path: &Path) -> Result<StateSnapshot> {
    if !path.exists() {
        return Ok(StateSnapshot::new());
    }

    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read state file at {}", path.display()))?;

    let stored: StoredState = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse state file at {}", path.display()))?;

    Ok(stored.into())
}

/// Load a state file, falling back to an empty snapshot on any failure.
pub fn load_state(path: &Path) -> StateSnapshot {
    match read_state(path) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!("Could not load state file, starting empty: {:#}", e);
            StateSnapshot::new()
        }
    }
}

/// Write a state file atomically.
///
/// Creates the parent directory if it doesn't exist.
pub fn write_state(path: &Path, snapshot: &StateSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory at {}", parent.display())
            })?;
        }
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, &PersistedState::from(snapshot))
        .context("Failed to serialize state")?;

    file.commit().context("Failed to save state")?;

    Ok(())
}

/// Write a state file, logging instead of failing.
///
/// Returns whether the write succeeded.
pub fn save_state(path: &Path, snapshot: &StateSnapshot) -> bool {
    match write_state(path, snapshot) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Could not save state file: {:#}", e);
            false
        }
    }
}
