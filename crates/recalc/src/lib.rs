// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Recalculation scheduling and engine-version migration.
//!
//! The scheduler is the storage layer's explicit entry point after a field
//! mutation: it rebuilds the changed field's dependencies, asks the graph
//! for dependency-respecting levels and drives the type checker and
//! compiler over each level, refreshing cached types and stored values.
//! A run completes fully before the triggering write is acknowledged.
//!
//! The migration coordinator is the batch-oriented driver used when the
//! formula engine's own version changes: it classifies out-of-date fields
//! by the strongest recalculation they require and works through them in
//! small, individually claimed batches so concurrent runs degrade to
//! serialization instead of contention.

mod error;
mod migration;
mod scheduler;
mod store;
#[cfg(test)]
pub(crate) mod testutil;

pub use error::{RecalcError, Result};
pub use migration::{
    required_action, MigrationAction, MigrationCoordinator, MigrationReport, MigrationStep,
    FORMULA_VERSION, MIGRATION_STEPS,
};
pub use scheduler::{RecalcReport, RecalculationScheduler};
pub use store::{FieldStore, ValueSink};
