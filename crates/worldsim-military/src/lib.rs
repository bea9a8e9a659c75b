//! Unit motion and operation lifecycle for the worldsim simulation.
//!
//! Both engines operate on a country's [`ForceRoster`](worldsim_types::ForceRoster)
//! in place and take the simulated instant as an argument; neither reads
//! the wall clock or a global RNG. Callers serialise access per country.
//!
//! # Modules
//!
//! - [`doctrine`] -- Category speeds, fuel rates and the operation doctrine table
//! - [`error`] -- [`MovementError`] and [`OperationError`]
//! - [`feasibility`] -- Movement and deployability gates
//! - [`motion`] -- [`UnitMotionEngine`]: deploy, return, transfer, arrivals
//! - [`operations`] -- [`OperationLifecycle`]: plan, create, start, resolve, cancel
//! - [`random`] -- [`RandomSource`] and its seeded and fixed implementations
//! - [`span`] -- Fractional hours to simulated instants

pub mod doctrine;
pub mod error;
pub mod feasibility;
pub mod motion;
pub mod operations;
pub mod random;
pub mod span;

pub use error::{MovementError, OperationError};
pub use feasibility::{Immobility, Undeployable, can_deploy, can_move};
pub use motion::{Arrival, ForceSummary, MovementReport, UnitAdjustment, UnitMotionEngine};
pub use operations::{
    DEFAULT_ARRIVAL_TOLERANCE_KM, OperationEvent, OperationLifecycle, OperationPlan,
    OperationRequest, OperationSummary, OperationUpdate, PlanReport, PlannedUnit,
};
pub use random::{FixedRandom, RandomSource, SeededRandom, SequenceRandom};
