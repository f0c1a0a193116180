//! Target expression IR.
//!
//! The compiled, storage-layer-executable form of a typed formula. The
//! engine hands a [`TargetExpr`] to the storage layer's query builder and
//! never issues a query itself; `tabula-formula-compile` additionally ships
//! an in-memory evaluator over this IR so recomputed values and tests don't
//! need a database round trip.

use crate::field::FieldId;
use crate::types::Value;

/// A compiled expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetExpr {
    /// A constant.
    Literal(Value),
    /// A column reference, with the join path produced by a via-chain.
    /// An empty join path is a same-table column.
    Column {
        field: FieldId,
        join_path: Vec<FieldId>,
    },
    /// An operation over compiled arguments.
    Func {
        op: TargetOp,
        args: Vec<TargetExpr>,
    },
}

/// Operations the target layer can execute.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetOp {
    Add,
    Subtract,
    Multiply,
    /// Division. A zero divisor yields the null sentinel, never a fault.
    Divide,
    Concat,
    Upper,
    Lower,
    TextLength,
    /// Cast to text. Numbers are rendered with this many decimal places.
    ToText { decimal_places: Option<u8> },
    Equal,
    GreaterThan,
    If,
    IsBlank,
    Count,
    /// The row's own id as a number.
    RowId,
}

impl TargetExpr {
    /// Constant node.
    pub fn literal(value: Value) -> Self {
        TargetExpr::Literal(value)
    }

    /// Same-table column reference.
    pub fn column(field: FieldId) -> Self {
        TargetExpr::Column {
            field,
            join_path: Vec::new(),
        }
    }

    /// Operation node.
    pub fn func(op: TargetOp, args: Vec<TargetExpr>) -> Self {
        TargetExpr::Func { op, args }
    }
}
