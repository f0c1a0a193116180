//! Branching, comparison and aggregate functions.

use tabula_formula_ast::{FormulaType, TargetExpr, TargetOp, TypeClass, TypedExpr};

use crate::adapters::{OneArgFunction, ThreeArgFunction, TwoArgFunction, ZeroArgFunction};
use crate::builtins::{combined_number, same_family};
use crate::{call_node, messages};

/// `if(condition, when_true, when_false)`.
///
/// Both branches must resolve to the same type family; the result takes
/// the combined type (widest formatting for numbers).
pub struct If;

impl ThreeArgFunction for If {
    fn name(&self) -> &'static str {
        "if"
    }

    fn arg1_type(&self) -> &[TypeClass] {
        &[TypeClass::Boolean]
    }

    fn arg2_type(&self) -> &[TypeClass] {
        &[TypeClass::Any]
    }

    fn arg3_type(&self) -> &[TypeClass] {
        &[TypeClass::Any]
    }

    fn derive_type(&self, condition: TypedExpr, a: TypedExpr, b: TypedExpr) -> TypedExpr {
        let ty = if a.ty == b.ty {
            a.ty.clone()
        } else if same_family(&a.ty, &b.ty) {
            match (&a.ty, &b.ty) {
                (FormulaType::Number { .. }, FormulaType::Number { .. }) => {
                    combined_number(&a.ty, &b.ty)
                }
                (FormulaType::Text | FormulaType::SingleSelect, _) => FormulaType::Text,
                // Same family, differing details: the true branch decides.
                _ => a.ty.clone(),
            }
        } else {
            FormulaType::invalid(format!(
                "the second and third arguments given to function if must be of the \
                 same type but they were of type {} and {}",
                a.ty.display_name(),
                b.ty.display_name(),
            ))
        };
        call_node("if", vec![condition, a, b], ty)
    }

    fn compile(
        &self,
        args: (TargetExpr, TargetExpr, TargetExpr),
        _typed_args: &[TypedExpr],
    ) -> TargetExpr {
        TargetExpr::func(TargetOp::If, vec![args.0, args.1, args.2])
    }
}

/// `equal(a, b)` / the `=` operator.
pub struct Equal;

impl TwoArgFunction for Equal {
    fn name(&self) -> &'static str {
        "equal"
    }

    fn arg1_type(&self) -> &[TypeClass] {
        &[
            TypeClass::Number,
            TypeClass::Text,
            TypeClass::Boolean,
            TypeClass::Date,
            TypeClass::SingleSelect,
        ]
    }

    fn arg2_type(&self) -> &[TypeClass] {
        &[
            TypeClass::Number,
            TypeClass::Text,
            TypeClass::Boolean,
            TypeClass::Date,
            TypeClass::SingleSelect,
        ]
    }

    fn derive_type(&self, a: TypedExpr, b: TypedExpr) -> TypedExpr {
        let ty = if same_family(&a.ty, &b.ty) {
            FormulaType::Boolean
        } else {
            FormulaType::invalid(messages::operator_type_error("=", &a.ty, &b.ty))
        };
        call_node("equal", vec![a, b], ty)
    }

    fn compile(&self, args: (TargetExpr, TargetExpr), _typed_args: &[TypedExpr]) -> TargetExpr {
        TargetExpr::func(TargetOp::Equal, vec![args.0, args.1])
    }
}

/// `greater_than(a, b)` / the `>` operator.
pub struct GreaterThan;

impl TwoArgFunction for GreaterThan {
    fn name(&self) -> &'static str {
        "greater_than"
    }

    fn arg1_type(&self) -> &[TypeClass] {
        &[TypeClass::Number, TypeClass::Text, TypeClass::Date]
    }

    fn arg2_type(&self) -> &[TypeClass] {
        &[TypeClass::Number, TypeClass::Text, TypeClass::Date]
    }

    fn derive_type(&self, a: TypedExpr, b: TypedExpr) -> TypedExpr {
        let ty = if same_family(&a.ty, &b.ty) {
            FormulaType::Boolean
        } else {
            FormulaType::invalid(messages::operator_type_error(">", &a.ty, &b.ty))
        };
        call_node("greater_than", vec![a, b], ty)
    }

    fn compile(&self, args: (TargetExpr, TargetExpr), _typed_args: &[TypedExpr]) -> TargetExpr {
        TargetExpr::func(TargetOp::GreaterThan, vec![args.0, args.1])
    }
}

/// `isblank(value)`: true for null, empty text and empty arrays.
pub struct IsBlank;

impl OneArgFunction for IsBlank {
    fn name(&self) -> &'static str {
        "isblank"
    }

    fn arg_type(&self) -> &[TypeClass] {
        &[TypeClass::Any]
    }

    fn derive_type(&self, arg: TypedExpr) -> TypedExpr {
        call_node("isblank", vec![arg], FormulaType::Boolean)
    }

    fn compile(&self, arg: TargetExpr, _typed_arg: &TypedExpr) -> TargetExpr {
        TargetExpr::func(TargetOp::IsBlank, vec![arg])
    }
}

/// `count(array)`: number of values reached through a lookup.
pub struct Count;

impl OneArgFunction for Count {
    fn name(&self) -> &'static str {
        "count"
    }

    fn arg_type(&self) -> &[TypeClass] {
        &[TypeClass::Array]
    }

    fn derive_type(&self, arg: TypedExpr) -> TypedExpr {
        call_node(
            "count",
            vec![arg],
            FormulaType::Number {
                decimal_places: 0,
                allow_negative: false,
            },
        )
    }

    fn compile(&self, arg: TargetExpr, _typed_arg: &TypedExpr) -> TargetExpr {
        TargetExpr::func(TargetOp::Count, vec![arg])
    }
}

/// `row_id()`: the current row's id.
pub struct RowIdFn;

impl ZeroArgFunction for RowIdFn {
    fn name(&self) -> &'static str {
        "row_id"
    }

    fn derive_type(&self) -> TypedExpr {
        call_node(
            "row_id",
            Vec::new(),
            FormulaType::Number {
                decimal_places: 0,
                allow_negative: false,
            },
        )
    }

    fn compile(&self) -> TargetExpr {
        TargetExpr::func(TargetOp::RowId, Vec::new())
    }
}
