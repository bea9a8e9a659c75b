//! HTTP and `WebSocket` surface for the worldsim simulation.
//!
//! This crate exposes:
//!
//! - **Clock control** (`/api/clock`): state, pause, resume, speed
//! - **Unit actions** (`/api/countries/{code}/units`): list, detail,
//!   deploy, return, transfer, resupply, repair
//! - **Operation actions** (`/api/countries/{code}/operations`): list,
//!   plan, create, start, cancel, process
//! - **Notification stream** (`/ws`): every tick, arrival, operation and
//!   clock change as JSON
//!
//! # Architecture
//!
//! Handlers share the clock handle and country sessions with the tick
//! coordinators through [`AppState`](state::AppState). Player actions and
//! tick passes on the same country are serialised by its session lock.
//!
//! # Modules
//!
//! - [`clock`] -- Clock endpoints
//! - [`error`] -- [`ObserverError`](error::ObserverError) and its HTTP mapping
//! - [`operations`] -- Operation endpoints
//! - [`router`] -- Route table
//! - [`server`] -- Bind and serve
//! - [`startup`] -- Background spawn for the engine binary
//! - [`state`] -- Shared state and the channel-backed broadcast sink
//! - [`units`] -- Unit endpoints
//! - [`ws`] -- Notification `WebSocket`

pub mod clock;
pub mod error;
pub mod operations;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod units;
pub mod ws;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError};
pub use startup::{StartupError, spawn_observer};
pub use state::{AppState, ChannelSink};
