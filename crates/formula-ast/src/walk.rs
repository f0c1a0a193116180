//! Expression tree walking utilities.
//!
//! Shared pre-order traversal so analysis passes don't duplicate recursive
//! descent. The visitor is a plain `FnMut` closure owning its own state;
//! a visitor trait would be over-engineered for a three-variant tree.

use crate::expr::{ExprKind, TypedExpr};

/// Recursively walk a typed expression tree in pre-order.
///
/// The visitor is called for the current node before its children, children
/// left to right.
pub fn walk_expr<V>(expr: &TypedExpr, visitor: &mut V)
where
    V: FnMut(&TypedExpr),
{
    visitor(expr);

    match &expr.kind {
        ExprKind::Call { args, .. } => {
            for arg in args {
                walk_expr(arg, visitor);
            }
        }
        ExprKind::Literal(_) | ExprKind::FieldRef { .. } => {}
    }
}
