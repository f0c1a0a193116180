//! Arithmetic operators.
//!
//! Each operator's casting and pairing behavior is its own contract,
//! expressed in `derive_type`; there is no universal coercion table.

use tabula_formula_ast::{FormulaType, TargetExpr, TargetOp, TypeClass, TypedExpr};

use crate::adapters::TwoArgFunction;
use crate::builtins::combined_number;
use crate::{call_node, messages};

/// `add(a, b)` / the `+` operator.
///
/// Numbers add; text concatenates. Any other pairing is rejected in
/// derivation with an operator mismatch reason.
pub struct Add;

impl TwoArgFunction for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn arg1_type(&self) -> &[TypeClass] {
        &[TypeClass::Number, TypeClass::Text]
    }

    fn arg2_type(&self) -> &[TypeClass] {
        &[TypeClass::Number, TypeClass::Text]
    }

    fn derive_type(&self, a: TypedExpr, b: TypedExpr) -> TypedExpr {
        let ty = match (&a.ty, &b.ty) {
            (FormulaType::Number { .. }, FormulaType::Number { .. }) => {
                combined_number(&a.ty, &b.ty)
            }
            (
                FormulaType::Text | FormulaType::SingleSelect,
                FormulaType::Text | FormulaType::SingleSelect,
            ) => FormulaType::Text,
            (first, second) => {
                FormulaType::invalid(messages::operator_type_error("+", first, second))
            }
        };
        call_node("add", vec![a, b], ty)
    }

    fn compile(&self, args: (TargetExpr, TargetExpr), typed_args: &[TypedExpr]) -> TargetExpr {
        let op = match typed_args[0].ty {
            FormulaType::Text | FormulaType::SingleSelect => TargetOp::Concat,
            _ => TargetOp::Add,
        };
        TargetExpr::func(op, vec![args.0, args.1])
    }
}

/// `minus(a, b)` / the `-` operator. Numbers only.
pub struct Minus;

impl TwoArgFunction for Minus {
    fn name(&self) -> &'static str {
        "minus"
    }

    fn arg1_type(&self) -> &[TypeClass] {
        &[TypeClass::Number]
    }

    fn arg2_type(&self) -> &[TypeClass] {
        &[TypeClass::Number]
    }

    fn derive_type(&self, a: TypedExpr, b: TypedExpr) -> TypedExpr {
        let ty = match combined_number(&a.ty, &b.ty) {
            // Subtraction can go below zero regardless of the operands.
            FormulaType::Number { decimal_places, .. } => FormulaType::Number {
                decimal_places,
                allow_negative: true,
            },
            other => other,
        };
        call_node("minus", vec![a, b], ty)
    }

    fn compile(&self, args: (TargetExpr, TargetExpr), _typed_args: &[TypedExpr]) -> TargetExpr {
        TargetExpr::func(TargetOp::Subtract, vec![args.0, args.1])
    }
}

/// `multiply(a, b)` / the `*` operator. Numbers only.
pub struct Multiply;

impl TwoArgFunction for Multiply {
    fn name(&self) -> &'static str {
        "multiply"
    }

    fn arg1_type(&self) -> &[TypeClass] {
        &[TypeClass::Number]
    }

    fn arg2_type(&self) -> &[TypeClass] {
        &[TypeClass::Number]
    }

    fn derive_type(&self, a: TypedExpr, b: TypedExpr) -> TypedExpr {
        let ty = combined_number(&a.ty, &b.ty);
        call_node("multiply", vec![a, b], ty)
    }

    fn compile(&self, args: (TargetExpr, TargetExpr), _typed_args: &[TypedExpr]) -> TargetExpr {
        TargetExpr::func(TargetOp::Multiply, vec![args.0, args.1])
    }
}

/// `divide(a, b)` / the `/` operator. Numbers only.
///
/// A zero divisor yields the null sentinel at evaluation time; typing a
/// division by zero succeeds.
pub struct Divide;

impl TwoArgFunction for Divide {
    fn name(&self) -> &'static str {
        "divide"
    }

    fn arg1_type(&self) -> &[TypeClass] {
        &[TypeClass::Number]
    }

    fn arg2_type(&self) -> &[TypeClass] {
        &[TypeClass::Number]
    }

    fn derive_type(&self, a: TypedExpr, b: TypedExpr) -> TypedExpr {
        let ty = match combined_number(&a.ty, &b.ty) {
            FormulaType::Number { decimal_places, .. } => FormulaType::Number {
                decimal_places,
                allow_negative: true,
            },
            other => other,
        };
        call_node("divide", vec![a, b], ty)
    }

    fn compile(&self, args: (TargetExpr, TargetExpr), _typed_args: &[TypedExpr]) -> TargetExpr {
        TargetExpr::func(TargetOp::Divide, vec![args.0, args.1])
    }
}
