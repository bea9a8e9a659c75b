//! Snapshot persistence seam.
//!
//! Country state is read and written as a whole document. There are no
//! partial updates: callers load, mutate in memory, and save the result.
//! The in-memory store here backs tests and ephemeral runs; the JSON file
//! store lives in `worldsim-db`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use worldsim_types::{CountryCode, CountryState};

/// Errors raised by a [`SnapshotStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No snapshot exists for the country.
    #[error("no snapshot for country {code}")]
    NotFound {
        /// Requested country.
        code: CountryCode,
    },

    /// Reading or writing the backing file failed.
    #[error("snapshot I/O failed for {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot could not be encoded or decoded.
    #[error("snapshot serialization failed: {source}")]
    Serialization {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

/// Whole-document country snapshot storage.
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot for `code`.
    fn load(&self, code: &CountryCode) -> Result<CountryState, StoreError>;

    /// Replace the snapshot for the state's country.
    fn save(&self, state: &CountryState) -> Result<(), StoreError>;

    /// Countries with a stored snapshot.
    fn countries(&self) -> Result<Vec<CountryCode>, StoreError>;

    /// Whether a snapshot exists for `code`.
    fn exists(&self, code: &CountryCode) -> Result<bool, StoreError> {
        Ok(self.countries()?.contains(code))
    }
}

/// A [`SnapshotStore`] held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<BTreeMap<CountryCode, CountryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `states`.
    pub fn with_states(states: impl IntoIterator<Item = CountryState>) -> Self {
        let snapshots = states
            .into_iter()
            .map(|s| (s.code().clone(), s))
            .collect();
        Self {
            snapshots: Mutex::new(snapshots),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, code: &CountryCode) -> Result<CountryState, StoreError> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { code: code.clone() })
    }

    fn save(&self, state: &CountryState) -> Result<(), StoreError> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(state.code().clone(), state.clone());
        Ok(())
    }

    fn countries(&self) -> Result<Vec<CountryCode>, StoreError> {
        Ok(self
            .snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.load(&CountryCode::from("ZZZ")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn save_replaces_document() {
        let store = MemoryStore::new();
        let mut state = CountryState::new(CountryCode::from("USA"), "United States");
        store.save(&state).unwrap();
        state.meta.total_game_days_elapsed = 12;
        store.save(&state).unwrap();

        let loaded = store.load(&CountryCode::from("USA")).unwrap();
        assert_eq!(loaded.meta.total_game_days_elapsed, 12);
        assert_eq!(store.countries().unwrap().len(), 1);
        assert!(store.exists(&CountryCode::from("USA")).unwrap());
    }
}
