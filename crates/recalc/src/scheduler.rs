//! The recalculation scheduler.
//!
//! Driven level by level: type checking inside one level is pure and
//! parallel (fields in a level are independent by construction), every
//! store mutation is sequential.

use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use tabula_field_graph::DependencyGraph;
use tabula_formula_ast::{FieldId, FormulaLimits, FormulaType, TableId};
use tabula_formula_compile::compile;
use tabula_formula_resolve::{type_check, TypedFormula};
use tabula_function_registry::FunctionRegistry;

use crate::error::Result;
use crate::store::{FieldStore, ValueSink};

/// What one scheduling run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecalcReport {
    /// Fields whose type (and values, when enabled) were refreshed.
    pub recalculated: Vec<FieldId>,
    /// Fields marked invalid during the run.
    pub invalid: Vec<FieldId>,
}

impl RecalcReport {
    pub fn is_empty(&self) -> bool {
        self.recalculated.is_empty() && self.invalid.is_empty()
    }

    fn merge(&mut self, other: RecalcReport) {
        self.recalculated.extend(other.recalculated);
        self.invalid.extend(other.invalid);
    }
}

/// Drives re-typing and value refresh over recalculation levels.
pub struct RecalculationScheduler<'a> {
    registry: &'a FunctionRegistry,
    limits: FormulaLimits,
    refresh_values: bool,
}

impl<'a> RecalculationScheduler<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        RecalculationScheduler {
            registry,
            limits: FormulaLimits::default(),
            refresh_values: true,
        }
    }

    pub fn with_limits(mut self, limits: FormulaLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Refresh cached types only, leaving stored values untouched.
    pub fn types_only(mut self) -> Self {
        self.refresh_values = false;
        self
    }

    /// Entry point for the storage layer's field-mutation handler.
    ///
    /// Rebuilds the changed field's own dependency rows, refreshes the
    /// field itself, then recalculates everything downstream of it. The
    /// run completes fully before returning; a cycle in the new edges
    /// propagates as an error before anything is refreshed.
    #[instrument(skip_all, fields(field = %field))]
    pub fn field_changed<S: FieldStore>(
        &self,
        graph: &mut DependencyGraph,
        store: &mut S,
        sink: &mut dyn ValueSink,
        field: FieldId,
    ) -> Result<RecalcReport> {
        graph.rebuild_dependencies(&[field], &*store, self.registry, &self.limits)?;

        let mut report = RecalcReport::default();
        let Some(meta) = store.field(field) else {
            return Ok(report);
        };
        self.refresh_field(store, sink, field, &mut report);
        report.merge(self.recalculate_dependants(graph, store, sink, meta.table, &[field]));
        Ok(report)
    }

    /// Recalculate every field transitively affected by `changed`.
    #[instrument(skip_all, fields(table = %table, changed = changed.len()))]
    pub fn recalculate_dependants<S: FieldStore>(
        &self,
        graph: &DependencyGraph,
        store: &mut S,
        sink: &mut dyn ValueSink,
        table: TableId,
        changed: &[FieldId],
    ) -> RecalcReport {
        let plan = graph.group_all_dependent_fields_by_level(table, changed, &*store);
        let mut report = RecalcReport::default();

        for level in &plan.levels {
            // Pure stage: each field types independently against the state
            // earlier levels left behind.
            let typed: Vec<(FieldId, Option<TypedFormula>)> = {
                let ctx: &S = store;
                level
                    .fields
                    .par_iter()
                    .map(|&field| {
                        let outcome = ctx.field(field).and_then(|meta| {
                            meta.formula
                                .as_ref()
                                .map(|formula| {
                                    type_check(formula, ctx, self.registry, &self.limits)
                                })
                        });
                        (field, outcome)
                    })
                    .collect()
            };

            for (field, outcome) in typed {
                let Some(typed) = outcome else { continue };
                self.apply(store, sink, field, typed, &mut report);
            }
        }

        // Fields the plan excluded cannot be refreshed safely; re-type
        // them so the stored invalid reason is current, and surface them.
        for &field in &plan.invalid {
            if let Some(meta) = store.field(field)
                && !meta.trashed
                && let Some(formula) = meta.formula
            {
                let typed = type_check(&formula, &*store, self.registry, &self.limits);
                store.store_typed_expr(field, typed.expr.clone());
                store.update_field_type(field, typed.expr.ty);
            }
            report.invalid.push(field);
        }

        report
    }

    /// Re-type one field from its stored formula and apply the result.
    fn refresh_field<S: FieldStore>(
        &self,
        store: &mut S,
        sink: &mut dyn ValueSink,
        field: FieldId,
        report: &mut RecalcReport,
    ) {
        let Some(meta) = store.field(field) else {
            return;
        };
        let Some(formula) = meta.formula else {
            return;
        };
        let typed = type_check(&formula, &*store, self.registry, &self.limits);
        self.apply(store, sink, field, typed, report);
    }

    fn apply<S: FieldStore>(
        &self,
        store: &mut S,
        sink: &mut dyn ValueSink,
        field: FieldId,
        typed: TypedFormula,
        report: &mut RecalcReport,
    ) {
        let ty = typed.expr.ty.clone();
        store.store_typed_expr(field, typed.expr.clone());
        store.update_field_type(field, ty.clone());

        if ty.is_invalid() {
            debug!(%field, "field resolved to an invalid type");
            report.invalid.push(field);
            return;
        }

        if self.refresh_values {
            let compiled = compile(&typed.expr, self.registry);
            if let Err(message) = sink.refresh_values(field, &compiled) {
                warn!(%field, error = %message, "value refresh failed, marking field invalid");
                store.update_field_type(field, FormulaType::invalid(message));
                report.invalid.push(field);
                return;
            }
        }

        report.recalculated.push(field);
    }
}
