//! Text functions, including the implicit-cast channel.
//!
//! `concat` is the one built-in implementing the general N-ary contract
//! directly: it is variadic, and it rewrites its own call during type
//! derivation by wrapping every non-text argument in `totext`.

use tabula_formula_ast::{
    ExprKind, FormulaType, TargetExpr, TargetOp, TypeClass, TypedExpr,
};

use crate::adapters::OneArgFunction;
use crate::{call_node, ArgCountSpec, FormulaFunction};

/// `concat(a, b, ...)`: variadic concatenation of any values as text.
pub struct Concat;

impl FormulaFunction for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn arg_count(&self) -> ArgCountSpec {
        ArgCountSpec::GreaterThan(1)
    }

    fn arg_types(&self, _position: usize) -> &[TypeClass] {
        &[TypeClass::Any]
    }

    fn derive_type(&self, args: Vec<TypedExpr>) -> TypedExpr {
        // Implicit cast: every non-text argument is rewritten through
        // totext, so compilation only ever sees text operands.
        let cast = args
            .into_iter()
            .map(|arg| match arg.ty {
                FormulaType::Text => arg,
                _ => TypedExpr {
                    kind: ExprKind::Call {
                        function: "totext".to_string(),
                        args: vec![arg],
                    },
                    ty: FormulaType::Text,
                },
            })
            .collect();
        call_node("concat", cast, FormulaType::Text)
    }

    fn compile(&self, args: Vec<TargetExpr>, _typed_args: &[TypedExpr]) -> TargetExpr {
        TargetExpr::func(TargetOp::Concat, args)
    }
}

/// `totext(value)`: cast a value to text.
///
/// Number arguments are rendered with their type's decimal places; that
/// formatting decision is taken here, at compile time, from the typed
/// argument.
pub struct ToText;

impl OneArgFunction for ToText {
    fn name(&self) -> &'static str {
        "totext"
    }

    fn arg_type(&self) -> &[TypeClass] {
        &[
            TypeClass::Text,
            TypeClass::Number,
            TypeClass::Boolean,
            TypeClass::Date,
            TypeClass::SingleSelect,
        ]
    }

    fn derive_type(&self, arg: TypedExpr) -> TypedExpr {
        call_node("totext", vec![arg], FormulaType::Text)
    }

    fn compile(&self, arg: TargetExpr, typed_arg: &TypedExpr) -> TargetExpr {
        let decimal_places = match typed_arg.ty {
            FormulaType::Number { decimal_places, .. } => Some(decimal_places),
            _ => None,
        };
        TargetExpr::func(TargetOp::ToText { decimal_places }, vec![arg])
    }
}

/// `upper(text)`.
pub struct Upper;

impl OneArgFunction for Upper {
    fn name(&self) -> &'static str {
        "upper"
    }

    fn arg_type(&self) -> &[TypeClass] {
        &[TypeClass::Text]
    }

    fn derive_type(&self, arg: TypedExpr) -> TypedExpr {
        call_node("upper", vec![arg], FormulaType::Text)
    }

    fn compile(&self, arg: TargetExpr, _typed_arg: &TypedExpr) -> TargetExpr {
        TargetExpr::func(TargetOp::Upper, vec![arg])
    }
}

/// `lower(text)`.
pub struct Lower;

impl OneArgFunction for Lower {
    fn name(&self) -> &'static str {
        "lower"
    }

    fn arg_type(&self) -> &[TypeClass] {
        &[TypeClass::Text]
    }

    fn derive_type(&self, arg: TypedExpr) -> TypedExpr {
        call_node("lower", vec![arg], FormulaType::Text)
    }

    fn compile(&self, arg: TargetExpr, _typed_arg: &TypedExpr) -> TargetExpr {
        TargetExpr::func(TargetOp::Lower, vec![arg])
    }
}

/// `length(text)`: character count.
pub struct Length;

impl OneArgFunction for Length {
    fn name(&self) -> &'static str {
        "length"
    }

    fn arg_type(&self) -> &[TypeClass] {
        &[TypeClass::Text]
    }

    fn derive_type(&self, arg: TypedExpr) -> TypedExpr {
        call_node(
            "length",
            vec![arg],
            FormulaType::Number {
                decimal_places: 0,
                allow_negative: false,
            },
        )
    }

    fn compile(&self, arg: TargetExpr, _typed_arg: &TypedExpr) -> TargetExpr {
        TargetExpr::func(TargetOp::TextLength, vec![arg])
    }
}
