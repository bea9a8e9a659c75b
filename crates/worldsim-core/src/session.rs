//! Per-country single-writer sessions.
//!
//! Every read-modify-write of a country snapshot, whether from a tick
//! handler or from a player action, runs inside [`CountrySessions::transact`].
//! A per-country mutex makes those passes mutually exclusive; different
//! countries never contend.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::error;
use worldsim_types::{CountryCode, CountryState};

use crate::store::{SnapshotStore, StoreError};

/// Serialised access to country snapshots.
pub struct CountrySessions {
    store: Arc<dyn SnapshotStore>,
    locks: Mutex<BTreeMap<CountryCode, Arc<Mutex<()>>>>,
}

impl core::fmt::Debug for CountrySessions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CountrySessions").finish_non_exhaustive()
    }
}

impl CountrySessions {
    /// Wrap a snapshot store.
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(BTreeMap::new()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    fn lock_for(&self, code: &CountryCode) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(code.clone()).or_default())
    }

    /// Load, mutate and save a snapshot as one exclusive pass.
    ///
    /// The snapshot is saved only when `f` returns `Ok`; on error the
    /// stored document is left as it was before the pass.
    pub fn transact<T, E>(
        &self,
        code: &CountryCode,
        f: impl FnOnce(&mut CountryState) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let lock = self.lock_for(code);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut state = self.store.load(code)?;
        let value = f(&mut state)?;
        if let Err(err) = self.store.save(&state) {
            error!(country = %code, error = %err, "Failed to persist country snapshot");
            return Err(err.into());
        }
        Ok(value)
    }

    /// Read a snapshot without writing it back.
    pub fn read<T>(
        &self,
        code: &CountryCode,
        f: impl FnOnce(&CountryState) -> T,
    ) -> Result<T, StoreError> {
        let lock = self.lock_for(code);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.store.load(code)?;
        Ok(f(&state))
    }
}
