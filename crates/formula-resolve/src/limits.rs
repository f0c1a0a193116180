//! Size limit enforcement.
//!
//! The pre-pass runs before the typing walk and is iterative: a formula
//! deep enough to trip the depth limit must not be able to overflow the
//! checker's own stack first.

use tabula_formula_ast::{Expr, FormulaLimits, UntypedKind, Value};

/// Check `expr` against `limits`. Returns the violation detail on failure.
pub fn check_limits(expr: &Expr, limits: &FormulaLimits) -> Result<(), String> {
    let mut nodes = 0usize;
    let mut stack = vec![(expr, 1usize)];

    while let Some((node, depth)) = stack.pop() {
        nodes += 1;
        if nodes > limits.max_nodes {
            return Err(format!(
                "it has more than {} nodes",
                limits.max_nodes
            ));
        }
        if depth > limits.max_depth {
            return Err(format!(
                "it is nested more than {} levels deep",
                limits.max_depth
            ));
        }
        match &node.kind {
            UntypedKind::Literal(Value::Text(text)) => {
                if text.len() > limits.max_literal_len {
                    return Err(format!(
                        "it contains a text literal longer than {} characters",
                        limits.max_literal_len
                    ));
                }
            }
            UntypedKind::Literal(_) | UntypedKind::FieldRef { .. } => {}
            UntypedKind::Call { args, .. } => {
                for arg in args {
                    stack.push((arg, depth + 1));
                }
            }
        }
    }

    Ok(())
}
