//! End-to-end test harness.
//!
//! Wires an in-memory field store, row storage, the dependency graph and
//! the scheduler together the way the surrounding product would: field
//! mutations call [`TestHarness::field_changed`] explicitly, values are
//! recomputed through the compiled target expressions.

use indexmap::{IndexMap, IndexSet};

use tabula_field_graph::DependencyGraph;
use tabula_formula_ast::{
    Expr, FieldId, FieldLookup, FieldMeta, FormulaType, RowId, TableId, TargetExpr, TypedExpr,
    Value,
};
use tabula_formula_compile::{evaluate, RowSource};
use tabula_function_registry::FunctionRegistry;
use tabula_recalc::{
    FieldStore, MigrationCoordinator, MigrationReport, RecalcReport, RecalculationScheduler,
    Result, ValueSink, FORMULA_VERSION,
};

/// In-memory field metadata store.
#[derive(Default)]
pub struct MemoryFieldStore {
    fields: IndexMap<FieldId, FieldMeta>,
    typed: IndexMap<FieldId, TypedExpr>,
    rebuilt_columns: Vec<FieldId>,
    claimed: IndexSet<FieldId>,
}

impl FieldLookup for MemoryFieldStore {
    fn field(&self, id: FieldId) -> Option<FieldMeta> {
        self.fields.get(&id).cloned()
    }

    fn field_by_name(&self, table: TableId, name: &str) -> Option<FieldMeta> {
        self.fields
            .values()
            .find(|f| f.table == table && f.name == name && !f.trashed)
            .cloned()
    }
}

impl FieldStore for MemoryFieldStore {
    fn update_field_type(&mut self, field: FieldId, ty: FormulaType) {
        if let Some(meta) = self.fields.get_mut(&field) {
            meta.ty = ty;
        }
    }

    fn store_typed_expr(&mut self, field: FieldId, expr: TypedExpr) {
        self.typed.insert(field, expr);
    }

    fn set_field_version(&mut self, field: FieldId, version: u32) {
        if let Some(meta) = self.fields.get_mut(&field) {
            meta.version = version;
        }
    }

    fn claim_out_of_date(&mut self, target_version: u32, batch_size: usize) -> Vec<FieldId> {
        let mut due: Vec<FieldId> = self
            .fields
            .values()
            .filter(|f| {
                f.is_formula() && f.version < target_version && !self.claimed.contains(&f.id)
            })
            .map(|f| f.id)
            .collect();
        due.sort();
        due.truncate(batch_size);
        self.claimed.extend(due.iter().copied());
        due
    }

    fn rebuild_column(&mut self, field: FieldId) {
        self.rebuilt_columns.push(field);
    }
}

/// In-memory row storage; doubles as the value sink.
#[derive(Default)]
pub struct MemoryRows {
    cells: IndexMap<(RowId, FieldId), Value>,
    links: IndexMap<(RowId, FieldId), Vec<RowId>>,
    table_rows: IndexMap<TableId, Vec<RowId>>,
    field_tables: IndexMap<FieldId, TableId>,
}

impl RowSource for MemoryRows {
    fn cell(&self, row: RowId, field: FieldId) -> Value {
        self.cells
            .get(&(row, field))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn linked_rows(&self, row: RowId, link_field: FieldId) -> Vec<RowId> {
        self.links
            .get(&(row, link_field))
            .cloned()
            .unwrap_or_default()
    }
}

impl ValueSink for MemoryRows {
    fn refresh_values(
        &mut self,
        field: FieldId,
        expr: &TargetExpr,
    ) -> std::result::Result<(), String> {
        let table = self
            .field_tables
            .get(&field)
            .copied()
            .ok_or_else(|| format!("field {field} has no table registered"))?;
        let rows = self.table_rows.get(&table).cloned().unwrap_or_default();
        let computed: Vec<(RowId, Value)> = rows
            .into_iter()
            .map(|row| (row, evaluate(expr, row, self)))
            .collect();
        for (row, value) in computed {
            self.cells.insert((row, field), value);
        }
        Ok(())
    }
}

/// One in-memory product instance: fields, rows, graph, registry.
pub struct TestHarness {
    pub store: MemoryFieldStore,
    pub rows: MemoryRows,
    pub graph: DependencyGraph,
    pub registry: FunctionRegistry,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        TestHarness {
            store: MemoryFieldStore::default(),
            rows: MemoryRows::default(),
            graph: DependencyGraph::new(),
            registry: FunctionRegistry::with_builtins()
                .expect("built-in registration is consistent"),
        }
    }

    /// Add a plain (non-formula) field.
    pub fn add_field(&mut self, table: TableId, id: FieldId, name: &str, ty: FormulaType) {
        self.store.fields.insert(
            id,
            FieldMeta {
                id,
                table,
                name: name.to_string(),
                ty,
                formula: None,
                trashed: false,
                version: FORMULA_VERSION,
            },
        );
        self.rows.field_tables.insert(id, table);
    }

    /// Add a formula field and run the scheduler over it.
    pub fn add_formula_field(
        &mut self,
        table: TableId,
        id: FieldId,
        name: &str,
        formula: Expr,
    ) -> Result<RecalcReport> {
        self.store.fields.insert(
            id,
            FieldMeta {
                id,
                table,
                name: name.to_string(),
                ty: FormulaType::Untyped,
                formula: Some(formula),
                trashed: false,
                version: FORMULA_VERSION,
            },
        );
        self.rows.field_tables.insert(id, table);
        self.field_changed(id)
    }

    /// Replace a formula field's expression and run the scheduler.
    pub fn update_formula(&mut self, id: FieldId, formula: Expr) -> Result<RecalcReport> {
        if let Some(meta) = self.store.fields.get_mut(&id) {
            meta.formula = Some(formula);
        }
        self.field_changed(id)
    }

    /// Add a row with initial cell values.
    pub fn add_row(&mut self, table: TableId, row: RowId, values: Vec<(FieldId, Value)>) {
        self.rows.table_rows.entry(table).or_default().push(row);
        for (field, value) in values {
            self.rows.cells.insert((row, field), value);
        }
    }

    /// Link `row` to `targets` through `link_field`.
    pub fn link_rows(&mut self, row: RowId, link_field: FieldId, targets: Vec<RowId>) {
        self.rows.links.insert((row, link_field), targets);
    }

    /// The storage layer's mutation handler calls this after any change
    /// to a field definition.
    pub fn field_changed(&mut self, field: FieldId) -> Result<RecalcReport> {
        let scheduler = RecalculationScheduler::new(&self.registry);
        scheduler.field_changed(&mut self.graph, &mut self.store, &mut self.rows, field)
    }

    /// Trash a field: metadata is flagged and its dependants' edges break.
    pub fn trash_field(&mut self, field: FieldId) {
        let Some(meta) = self.store.fields.get_mut(&field) else {
            return;
        };
        meta.trashed = true;
        let name = meta.name.clone();
        self.graph.break_dependencies_delete_dependants(field, &name);
    }

    /// Restore a trashed field and re-link broken edges to it.
    pub fn restore_field(&mut self, field: FieldId) {
        let Some(meta) = self.store.fields.get_mut(&field) else {
            return;
        };
        meta.trashed = false;
        let name = meta.name.clone();
        self.graph.restore_dependencies(field, &name);
    }

    /// Rewind stored engine versions, as if fields were written by an
    /// older engine.
    pub fn rewind_versions(&mut self, version: u32) {
        for meta in self.store.fields.values_mut() {
            meta.version = version;
        }
    }

    /// Run the migration coordinator to the current engine version.
    pub fn migrate_to_latest(&mut self) -> MigrationReport {
        let coordinator = MigrationCoordinator::new(&self.registry);
        coordinator.migrate_to_latest(&mut self.graph, &mut self.store, &mut self.rows)
    }

    pub fn cell(&self, row: RowId, field: FieldId) -> Value {
        self.rows.cell(row, field)
    }

    pub fn field_type(&self, field: FieldId) -> FormulaType {
        self.store
            .field(field)
            .map(|meta| meta.ty)
            .unwrap_or(FormulaType::Untyped)
    }

    pub fn rebuilt_columns(&self) -> &[FieldId] {
        &self.store.rebuilt_columns
    }
}
