//! Typed tree to target expression fold.

use tabula_formula_ast::{walk_expr, ExprKind, FormulaType, TargetExpr, TypedExpr};
use tabula_function_registry::FunctionRegistry;

/// Compile a well-typed tree to its target expression.
///
/// Pure bottom-up fold: literals become target literals, field references
/// become column references (the via chain becomes the join path), calls
/// compile their arguments and dispatch to the function's compilation
/// rule.
///
/// # Panics
///
/// Encountering an `Invalid` or `Untyped` node, or a function name absent
/// from the registry, is a violation of the type checker's contract and
/// panics; the compiler never re-validates.
pub fn compile(expr: &TypedExpr, registry: &FunctionRegistry) -> TargetExpr {
    // Defensive assertion over the whole tree before folding: only fully
    // typed trees may reach the compiler.
    walk_expr(expr, &mut |node| match &node.ty {
        FormulaType::Invalid { reason } => {
            panic!("compiler given an invalid tree ({reason}); only typed trees may be compiled")
        }
        FormulaType::Untyped => {
            panic!("compiler given an untyped tree; only typed trees may be compiled")
        }
        _ => {}
    });

    fold(expr, registry)
}

fn fold(expr: &TypedExpr, registry: &FunctionRegistry) -> TargetExpr {
    match &expr.kind {
        ExprKind::Literal(value) => TargetExpr::Literal(value.clone()),
        ExprKind::FieldRef { field, via } => TargetExpr::Column {
            field: *field,
            join_path: via.clone(),
        },
        ExprKind::Call { function, args } => {
            let compiled: Vec<TargetExpr> = args.iter().map(|arg| fold(arg, registry)).collect();
            let def = registry.lookup(function).unwrap_or_else(|| {
                panic!("typed tree calls unregistered function '{function}'")
            });
            def.compile(compiled, args)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_formula_ast::{FieldId, TargetOp, Value};
    use tabula_function_registry::call_node;

    fn registry() -> FunctionRegistry {
        FunctionRegistry::with_builtins().unwrap()
    }

    #[test]
    fn test_compiles_add_call() {
        let tree = call_node(
            "add",
            vec![
                TypedExpr {
                    kind: ExprKind::FieldRef {
                        field: FieldId(1),
                        via: Vec::new(),
                    },
                    ty: FormulaType::number(),
                },
                TypedExpr {
                    kind: ExprKind::Literal(Value::Number(1.0)),
                    ty: FormulaType::number(),
                },
            ],
            FormulaType::number(),
        );
        let compiled = compile(&tree, &registry());
        assert_eq!(
            compiled,
            TargetExpr::func(
                TargetOp::Add,
                vec![
                    TargetExpr::column(FieldId(1)),
                    TargetExpr::literal(Value::Number(1.0)),
                ],
            )
        );
    }

    #[test]
    fn test_via_chain_becomes_join_path() {
        let tree = TypedExpr {
            kind: ExprKind::FieldRef {
                field: FieldId(20),
                via: vec![FieldId(10)],
            },
            ty: FormulaType::Lookup {
                through_field: FieldId(10),
                target: Box::new(FormulaType::Text),
            },
        };
        assert_eq!(
            compile(&tree, &registry()),
            TargetExpr::Column {
                field: FieldId(20),
                join_path: vec![FieldId(10)],
            }
        );
    }

    #[test]
    #[should_panic(expected = "invalid tree")]
    fn test_invalid_tree_panics() {
        compile(&TypedExpr::invalid("broken"), &registry());
    }

    #[test]
    #[should_panic(expected = "invalid tree")]
    fn test_invalid_inner_node_panics() {
        let tree = call_node(
            "upper",
            vec![TypedExpr::invalid("broken argument")],
            FormulaType::Text,
        );
        compile(&tree, &registry());
    }
}
