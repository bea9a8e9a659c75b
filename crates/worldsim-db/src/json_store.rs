//! One JSON document per country on the local filesystem.
//!
//! Snapshots live at `<data_dir>/countries/<CODE>.json`. Saves write a
//! sibling temporary file and rename it over the target, so a crash mid-save
//! leaves the previous snapshot intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;
use worldsim_core::{SnapshotStore, StoreError};
use worldsim_types::{CountryCode, CountryState};

/// Sub-directory of the data directory holding country snapshots.
const COUNTRIES_DIR: &str = "countries";

/// Extension of snapshot files.
const EXTENSION: &str = "json";

/// A [`SnapshotStore`] backed by pretty-printed JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) the store under `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = data_dir.as_ref().join(COUNTRIES_DIR);
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        debug!(path = %root.display(), "Opened JSON snapshot store");
        Ok(Self { root })
    }

    /// Directory holding the snapshot files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path of the snapshot for `code`.
    pub fn path_for(&self, code: &CountryCode) -> PathBuf {
        self.root.join(format!("{code}.{EXTENSION}"))
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self, code: &CountryCode) -> Result<CountryState, StoreError> {
        let path = self.path_for(code);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound { code: code.clone() });
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, state: &CountryState) -> Result<(), StoreError> {
        let path = self.path_for(state.code());
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        let json = serde_json::to_vec_pretty(state)?;
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(country = %state.code(), path = %path.display(), "Saved country snapshot");
        Ok(())
    }

    fn countries(&self) -> Result<Vec<CountryCode>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;
        let mut codes: Vec<CountryCode> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(CountryCode::from)
            })
            .collect();
        codes.sort();
        Ok(codes)
    }

    fn exists(&self, code: &CountryCode) -> Result<bool, StoreError> {
        Ok(self.path_for(code).is_file())
    }
}
