//! In-memory store used by the crate's own tests.

use indexmap::{IndexMap, IndexSet};

use tabula_formula_ast::{
    FieldId, FieldLookup, FieldMeta, FormulaType, TableId, TargetExpr, TypedExpr,
};

use crate::store::{FieldStore, ValueSink};

#[derive(Default)]
pub struct MemoryStore {
    pub fields: IndexMap<FieldId, FieldMeta>,
    pub typed: IndexMap<FieldId, TypedExpr>,
    pub rebuilt_columns: Vec<FieldId>,
    claimed: IndexSet<FieldId>,
}

impl MemoryStore {
    pub fn insert(&mut self, meta: FieldMeta) {
        self.fields.insert(meta.id, meta);
    }
}

impl FieldLookup for MemoryStore {
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

impl FieldStore for MemoryStore {
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

/// Sink that records refreshes and can be told to fail for one field.
#[derive(Default)]
pub struct RecordingSink {
    pub refreshed: Vec<FieldId>,
    pub fail_for: Option<FieldId>,
}

impl ValueSink for RecordingSink {
    fn refresh_values(
        &mut self,
        field: FieldId,
        _expr: &TargetExpr,
    ) -> std::result::Result<(), String> {
        if self.fail_for == Some(field) {
            return Err(format!("table column for field {field} is missing"));
        }
        self.refreshed.push(field);
        Ok(())
    }
}
