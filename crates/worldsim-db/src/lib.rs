//! Persistence for the worldsim simulation.
//!
//! Country snapshots are stored whole, one JSON document per country.
//! The [`SnapshotStore`](worldsim_core::SnapshotStore) trait lives in
//! `worldsim-core`; this crate provides the filesystem implementation.
//!
//! # Modules
//!
//! - [`json_store`] -- [`JsonFileStore`]: `<data_dir>/countries/<CODE>.json`

pub mod json_store;

pub use json_store::JsonFileStore;
