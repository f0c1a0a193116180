//! Formula engine version migration.
//!
//! When the engine itself changes, stored formula fields written by older
//! versions need some combination of dependency rebuild, re-typing, value
//! recomputation and column rebuild. The coordinator works through the
//! backlog in small claimed batches so a large installation never holds
//! one transaction's worth of locks for the whole migration, and so
//! concurrent runs degrade to serialization: the second runner observes
//! empty claims and stops.

use indexmap::{IndexMap, IndexSet};
use tracing::{info, instrument, warn};

use tabula_field_graph::DependencyGraph;
use tabula_formula_ast::{FieldId, FormulaLimits, FormulaType, TypedExpr};
use tabula_formula_compile::compile;
use tabula_formula_resolve::type_check;
use tabula_function_registry::FunctionRegistry;

use crate::store::{FieldStore, ValueSink};

/// Current formula engine version. Fields stamped with an older version
/// are picked up by the next migration run.
pub const FORMULA_VERSION: u32 = 5;

/// What a version step requires of fields older than it. Ordered weakest
/// to strongest; a field spanning several steps takes the strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MigrationAction {
    RebuildDependencies,
    RecomputeType,
    RecomputeTypeAndValues,
    ForceColumnRebuild,
}

/// One entry in the engine's version history.
#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    /// Fields written before this version need `action`.
    pub version: u32,
    pub action: MigrationAction,
}

/// Version history, ascending.
pub const MIGRATION_STEPS: &[MigrationStep] = &[
    // 2: dependency rows gained via-link tracking.
    MigrationStep {
        version: 2,
        action: MigrationAction::RebuildDependencies,
    },
    // 3: number types gained decimal-place derivation.
    MigrationStep {
        version: 3,
        action: MigrationAction::RecomputeType,
    },
    // 4: division by zero started yielding null instead of erroring rows.
    MigrationStep {
        version: 4,
        action: MigrationAction::RecomputeTypeAndValues,
    },
    // 5: lookup columns store materialized arrays.
    MigrationStep {
        version: 5,
        action: MigrationAction::ForceColumnRebuild,
    },
];

/// The strongest action required to bring a field from `field_version` to
/// `target`, if any step falls in that range.
pub fn required_action(field_version: u32, target: u32) -> Option<MigrationAction> {
    MIGRATION_STEPS
        .iter()
        .filter(|step| step.version > field_version && step.version <= target)
        .map(|step| step.action)
        .max()
}

/// What one migration run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: Vec<FieldId>,
    pub invalid: Vec<FieldId>,
    pub batches: usize,
}

/// Batch-oriented migration driver.
pub struct MigrationCoordinator<'a> {
    registry: &'a FunctionRegistry,
    limits: FormulaLimits,
    batch_size: usize,
}

impl<'a> MigrationCoordinator<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        MigrationCoordinator {
            registry,
            limits: FormulaLimits::default(),
            batch_size: 200,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Migrate every out-of-date field to the current engine version.
    pub fn migrate_to_latest<S: FieldStore>(
        &self,
        graph: &mut DependencyGraph,
        store: &mut S,
        sink: &mut dyn ValueSink,
    ) -> MigrationReport {
        self.migrate(graph, store, sink, FORMULA_VERSION)
    }

    /// Migrate every out-of-date field to `target`.
    #[instrument(skip_all, fields(target = target))]
    pub fn migrate<S: FieldStore>(
        &self,
        graph: &mut DependencyGraph,
        store: &mut S,
        sink: &mut dyn ValueSink,
        target: u32,
    ) -> MigrationReport {
        let mut report = MigrationReport::default();
        loop {
            // Every claim is its own lock scope. An empty claim means the
            // backlog is done or a concurrent run took the rest; either
            // way, stop rather than retry.
            let batch = store.claim_out_of_date(target, self.batch_size);
            if batch.is_empty() {
                break;
            }
            report.batches += 1;
            self.process_batch(graph, store, sink, &batch, target, &mut report);
        }
        info!(
            batches = report.batches,
            migrated = report.migrated.len(),
            invalid = report.invalid.len(),
            "migration finished"
        );
        report
    }

    fn process_batch<S: FieldStore>(
        &self,
        graph: &mut DependencyGraph,
        store: &mut S,
        sink: &mut dyn ValueSink,
        batch: &[FieldId],
        target: u32,
        report: &mut MigrationReport,
    ) {
        // Classify each field by the strongest action its version gap
        // requires.
        let mut planned: Vec<(FieldId, MigrationAction)> = Vec::new();
        for &field in batch {
            let Some(meta) = store.field(field) else {
                continue;
            };
            if !meta.is_formula() {
                continue;
            }
            if let Some(action) = required_action(meta.version, target) {
                planned.push((field, action));
            }
        }

        // Dependency rebuild runs first, across the whole batch. A cycle
        // aborts only that field's rebuild.
        let mut failed: IndexSet<FieldId> = IndexSet::new();
        for &(field, _) in &planned {
            if let Err(err) =
                graph.rebuild_dependencies(&[field], &*store, self.registry, &self.limits)
            {
                warn!(%field, error = %err, "dependency rebuild failed, marking field invalid");
                store.update_field_type(field, FormulaType::invalid(err.to_string()));
                failed.insert(field);
            }
        }

        // Re-type, each field's own dependency chain first, so nothing is
        // typed against a stale dependency's old type.
        let pending: IndexSet<FieldId> = planned
            .iter()
            .filter(|(field, action)| {
                *action >= MigrationAction::RecomputeType && !failed.contains(field)
            })
            .map(|(field, _)| *field)
            .collect();
        let mut done: IndexSet<FieldId> = IndexSet::new();
        let mut typed: IndexMap<FieldId, TypedExpr> = IndexMap::new();
        for &field in &pending {
            self.recompute_chain(graph, store, field, &pending, &mut done, &mut typed);
        }

        // Value refresh and column rebuilds once every type is fresh.
        for &(field, action) in &planned {
            if failed.contains(&field) {
                report.invalid.push(field);
                continue;
            }
            match action {
                MigrationAction::RebuildDependencies => report.migrated.push(field),
                MigrationAction::RecomputeType => {
                    if typed.contains_key(&field) {
                        report.migrated.push(field);
                    } else {
                        report.invalid.push(field);
                    }
                }
                MigrationAction::RecomputeTypeAndValues
                | MigrationAction::ForceColumnRebuild => {
                    let Some(expr) = typed.get(&field) else {
                        report.invalid.push(field);
                        continue;
                    };
                    let compiled = compile(expr, self.registry);
                    if let Err(message) = sink.refresh_values(field, &compiled) {
                        warn!(%field, error = %message, "value refresh failed, marking field invalid");
                        store.update_field_type(field, FormulaType::invalid(message));
                        report.invalid.push(field);
                        continue;
                    }
                    if action == MigrationAction::ForceColumnRebuild {
                        store.rebuild_column(field);
                    }
                    report.migrated.push(field);
                }
            }
        }

        // Stamp the whole claimed batch, failures included, so no field is
        // reclaimed forever; invalid fields carry their reason instead.
        for &field in batch {
            store.set_field_version(field, target);
        }
    }

    /// Re-type `field`, recursing into pending dependencies first.
    fn recompute_chain<S: FieldStore>(
        &self,
        graph: &DependencyGraph,
        store: &mut S,
        field: FieldId,
        pending: &IndexSet<FieldId>,
        done: &mut IndexSet<FieldId>,
        typed: &mut IndexMap<FieldId, TypedExpr>,
    ) {
        if !done.insert(field) {
            return;
        }
        let deps: Vec<FieldId> = graph
            .edges_of(field)
            .iter()
            .filter_map(|edge| edge.dependency())
            .collect();
        for dep in deps {
            if pending.contains(&dep) {
                self.recompute_chain(graph, store, dep, pending, done, typed);
            }
        }

        let Some(meta) = store.field(field) else {
            return;
        };
        let Some(formula) = meta.formula else {
            return;
        };
        let outcome = type_check(&formula, &*store, self.registry, &self.limits);
        store.store_typed_expr(field, outcome.expr.clone());
        store.update_field_type(field, outcome.expr.ty.clone());
        if !outcome.expr.ty.is_invalid() {
            typed.insert(field, outcome.expr);
        }
    }
}
