//! Untyped and typed expression trees.
//!
//! The parser (outside this engine) hands over an [`Expr`]. The type
//! checker consumes it and produces a [`TypedExpr`] where every node
//! carries a resolved [`FormulaType`]. Re-typing always builds a fresh
//! tree; a tree is never mutated in place.

use crate::field::FieldId;
use crate::types::{FormulaType, Value};

/// An untyped expression node, as produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: UntypedKind,
}

/// Node kinds of the untyped tree.
#[derive(Debug, Clone, PartialEq)]
pub enum UntypedKind {
    /// A literal value.
    Literal(Value),
    /// A reference to a field, optionally through a chain of link fields.
    FieldRef {
        field: FieldId,
        /// Link fields traversed to reach `field`, outermost first.
        /// Empty for a same-table reference.
        via: Vec<FieldId>,
    },
    /// A function call.
    Call { function: String, args: Vec<Expr> },
}

impl Expr {
    /// Literal node.
    pub fn literal(value: Value) -> Self {
        Expr {
            kind: UntypedKind::Literal(value),
        }
    }

    /// Same-table field reference.
    pub fn field_ref(field: FieldId) -> Self {
        Expr {
            kind: UntypedKind::FieldRef {
                field,
                via: Vec::new(),
            },
        }
    }

    /// Field reference through a chain of link fields.
    pub fn lookup(via: Vec<FieldId>, field: FieldId) -> Self {
        Expr {
            kind: UntypedKind::FieldRef { field, via },
        }
    }

    /// Function call node.
    pub fn call(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr {
            kind: UntypedKind::Call {
                function: function.into(),
                args,
            },
        }
    }
}

/// A typed expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr {
    pub kind: ExprKind,
    pub ty: FormulaType,
}

/// Node kinds of the typed tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Value),
    FieldRef {
        field: FieldId,
        via: Vec<FieldId>,
    },
    Call {
        function: String,
        args: Vec<TypedExpr>,
    },
}

impl TypedExpr {
    /// Node carrying an `Invalid` type with `reason`.
    ///
    /// The kind is a null literal: invalid trees are never compiled, only
    /// stored so the reason can be surfaced.
    pub fn invalid(reason: impl Into<String>) -> Self {
        TypedExpr {
            kind: ExprKind::Literal(Value::Null),
            ty: FormulaType::invalid(reason),
        }
    }

    /// Whether the node's type is `Invalid`.
    pub fn is_invalid(&self) -> bool {
        self.ty.is_invalid()
    }
}
