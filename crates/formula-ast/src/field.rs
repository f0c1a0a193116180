//! Field identifiers and the field metadata capability.
//!
//! The engine never owns field storage. It consumes a [`FieldLookup`]
//! capability from the surrounding system and works purely over the
//! metadata snapshots it hands back.

use std::fmt;

use crate::expr::Expr;
use crate::types::FormulaType;

/// Unique identifier for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u64);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u64);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a field's metadata at lookup time.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub id: FieldId,
    pub table: TableId,
    pub name: String,
    /// The field's current resolved type. For a formula field this is the
    /// cached result of the last type-check; `Invalid` if the formula is
    /// broken.
    pub ty: FormulaType,
    /// The untyped expression tree, present only for formula fields. The
    /// textual grammar that produces it lives outside this engine.
    pub formula: Option<Expr>,
    /// Whether the field sits in the trash. Trashed fields still exist and
    /// can be restored.
    pub trashed: bool,
    /// Formula engine version the field was last written with.
    pub version: u32,
}

impl FieldMeta {
    /// Whether this is a formula field.
    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }
}

/// Capability for resolving field references against the surrounding system.
pub trait FieldLookup {
    /// Metadata for `id`, trashed or not. `None` if the field never existed
    /// or was permanently deleted.
    fn field(&self, id: FieldId) -> Option<FieldMeta>;

    /// A live (non-trashed) field in `table` with exactly this name.
    ///
    /// Used to substitute a trashed reference with a same-name replacement
    /// and to repair broken dependency edges on restore.
    fn field_by_name(&self, table: TableId, name: &str) -> Option<FieldMeta>;
}
