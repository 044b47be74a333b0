//! 3D cargo stowage, retrieval planning, and lifecycle core for station
//! logistics. The crate is organized leaf-first: geometry, occupancy,
//! the store and its adapter, then the planners and scoring functions
//! that compose them.
//!
//! `lib.rs` re-exports the module surface and the handful of
//! entry-point functions a thin adapter (HTTP, CLI) calls into, one per
//! request the engine serves.

pub mod cancel;
pub mod config;
pub mod container;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod item;
pub mod lifecycle;
pub mod log;
pub mod occupancy;
pub mod placement;
pub mod retrieval;
pub mod scoring;
pub mod store;
pub mod store_memory;
pub mod waste;
pub mod wire;

pub use cancel::CancellationToken;
pub use config::StowageConfig;
pub use container::{Container, ContainerRecord};
pub use error::{StowageError, StowageResult};
pub use geometry::{Aabb, Orientation};
pub use ids::{ContainerId, ItemId};
pub use item::{Item, Placement};
pub use log::{ActionKind, LogRecord};
pub use store::{Store, TransactionCtx};

use chrono::{DateTime, Utc};

/// `placement`: assign a batch of unplaced items to a set of
/// already-registered containers.
pub fn place_items(
    store: &dyn Store,
    items: Vec<Item>,
    container_ids: &[ContainerId],
    now: DateTime<Utc>,
    cancel: &CancellationToken,
    config: &StowageConfig,
) -> StowageResult<placement::PlacementOutcome> {
    placement::place_items(store, items, container_ids, now, cancel, config)
}

/// `search`: resolve an item by id or name and preview its retrieval
/// plan without executing it.
pub fn search(store: &dyn Store, item_ref: &str, at: DateTime<Utc>) -> StowageResult<retrieval::RetrievalPlan> {
    retrieval::plan_retrieval(store, item_ref, at)
}

/// `retrieve`: resolve an item by id or name and execute its retrieval,
/// applying the usual side effects (usage decrement, placement clear,
/// log entry).
pub fn retrieve(
    store: &dyn Store,
    item_ref: &str,
    actor: &str,
    at: DateTime<Utc>,
    cancel: &CancellationToken,
) -> StowageResult<retrieval::RetrievalPlan> {
    retrieval::retrieve(store, item_ref, at, actor, cancel)
}

/// `place`: directly assign an item's placement, bypassing the planner.
pub fn place(
    store: &dyn Store,
    item_id: &ItemId,
    container_id: &ContainerId,
    origin: (u32, u32, u32),
    orientation: Orientation,
    actor: &str,
    at: DateTime<Utc>,
) -> StowageResult<Item> {
    retrieval::place_at(store, item_id, container_id, origin, orientation, at, actor)
}

/// `waste/identify`: list every item currently marked as waste.
pub fn identify_waste(store: &dyn Store) -> Vec<Item> {
    waste::identify_waste(store)
}

/// `waste/return-plan`: select waste items for return under a mass cap
/// and build a retrieval sequence for them.
pub fn create_return_plan(
    store: &dyn Store,
    undocking_container: &ContainerId,
    at: DateTime<Utc>,
    max_mass_g: u64,
    config: &StowageConfig,
) -> StowageResult<waste::ReturnPlan> {
    waste::create_return_plan(store, undocking_container, at, max_mass_g, config)
}

/// `waste/complete-undocking`: remove the waste items staged in the
/// undocking container from the store.
pub fn complete_undocking(
    store: &dyn Store,
    undocking_container: &ContainerId,
    at: DateTime<Utc>,
    actor: &str,
) -> StowageResult<waste::UndockingResult> {
    waste::complete_undocking(store, undocking_container, at, actor)
}

/// `simulate/day`: advance the lifecycle clock, applying usage and
/// expiry for each day crossed.
pub fn simulate_days(
    store: &dyn Store,
    target: lifecycle::SimulationTarget,
    usage_by_day: &[Vec<String>],
    wall_clock: DateTime<Utc>,
    actor: &str,
    cancel: &CancellationToken,
) -> StowageResult<lifecycle::SimulationOutcome> {
    lifecycle::simulate(store, target, usage_by_day, wall_clock, actor, cancel)
}

/// `logs`: query the append-only log between two instants.
pub fn query_logs(store: &dyn Store, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<LogRecord> {
    store.logs_between(start, end)
}
