//! Storage capabilities the scheduler is handed.
//!
//! The engine never talks to a database; the storage layer implements
//! these traits and injects them. Locking and transaction boundaries live
//! entirely behind the trait contracts.

use tabula_formula_ast::{FieldId, FieldLookup, FormulaType, TargetExpr, TypedExpr};

/// Field metadata mutation and migration claiming, on top of lookup.
pub trait FieldStore: FieldLookup + Send + Sync {
    /// Cache a field's freshly resolved type.
    fn update_field_type(&mut self, field: FieldId, ty: FormulaType);

    /// Cache the typed expression tree on the field.
    fn store_typed_expr(&mut self, field: FieldId, expr: TypedExpr);

    /// Stamp the engine version a field was last written with.
    fn set_field_version(&mut self, field: FieldId, version: u32);

    /// Claim the next batch of formula fields whose version is older than
    /// `target_version`, at most `batch_size` of them.
    ///
    /// Contract: rows are claimed in ascending id order under row-level
    /// locks inside the store's own transaction, so lock acquisition
    /// across concurrent callers is a total order. A batch already
    /// claimed by a concurrent run is not returned again; a second runner
    /// observing an empty claim simply stops.
    fn claim_out_of_date(&mut self, target_version: u32, batch_size: usize) -> Vec<FieldId>;

    /// Force a rebuild of the field's backing column.
    fn rebuild_column(&mut self, field: FieldId);
}

/// Where recomputed stored values go.
pub trait ValueSink {
    /// Re-evaluate `expr` for every row of the field's table and store the
    /// results. Errors are reported as text; the scheduler logs them and
    /// marks the field invalid rather than aborting the run.
    fn refresh_values(
        &mut self,
        field: FieldId,
        expr: &TargetExpr,
    ) -> std::result::Result<(), String>;
}
