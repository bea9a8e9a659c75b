//! Simulation core for worldsim: the clock, per-country tick coordination,
//! snapshot sessions and the periodic domain processors.
//!
//! # Modules
//!
//! - [`broadcast`] -- Outbound [`Notification`]s and the [`BroadcastSink`] seam
//! - [`clock`] -- [`SimClock`]: calendar, tick bucketing and handler dispatch
//! - [`config`] -- YAML configuration with environment overrides
//! - [`deliveries`] -- Yearly weapon-order fulfilment
//! - [`events`] -- Catalog-driven random events
//! - [`handle`] -- [`ClockHandle`]: the clock shared between run loop and API
//! - [`processors`] -- Domain processor traits and the standard set
//! - [`projects`] -- Quarterly sector and infrastructure projects
//! - [`runner`] -- [`run_clock`], the background day loop
//! - [`session`] -- [`CountrySessions`]: single-writer snapshot passes
//! - [`store`] -- [`SnapshotStore`] and the in-memory store
//! - [`tick`] -- [`TickCoordinator`]: one country's work per tick category

pub mod broadcast;
pub mod clock;
pub mod config;
pub mod deliveries;
pub mod events;
pub mod handle;
pub mod processors;
pub mod projects;
pub mod runner;
pub mod session;
pub mod store;
pub mod tick;

pub use broadcast::{BroadcastSink, Notification, NullSink, RecordingSink};
pub use clock::{
    ClockError, ClockState, FiredTicks, HandlerError, HandlerFailure, HandlerId, MAX_SPEED,
    MIN_SPEED, SimClock, TickContext, TickHandler, TickReport, classify,
};
pub use config::{ConfigError, SimulationConfig};
pub use events::{CatalogError, EventCatalog};
pub use handle::ClockHandle;
pub use processors::{DomainProcessor, EventProcessor, ProcessorError, ProcessorSet};
pub use runner::{DayCallback, NoOpCallback, RunEndReason, RunSummary, log_run_end, run_clock};
pub use session::CountrySessions;
pub use store::{MemoryStore, SnapshotStore, StoreError};
pub use tick::{TickCoordinator, TickError};
