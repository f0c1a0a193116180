//! Built-in formula functions.
//!
//! This set covers the dispatch mechanism, not an exhaustive library:
//! arithmetic and comparison operators, the text functions the implicit
//! cast channel needs, branching, and one aggregate over lookups.

pub mod arithmetic;
pub mod logic;
pub mod text;

use tabula_formula_ast::FormulaType;

use crate::adapters::{OneArg, ThreeArg, TwoArg, ZeroArg};
use crate::{FunctionRegistry, RegistryError};

/// Register every built-in into `registry`.
pub fn register_all(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    registry.register(Box::new(TwoArg(arithmetic::Add)))?;
    registry.register(Box::new(TwoArg(arithmetic::Minus)))?;
    registry.register(Box::new(TwoArg(arithmetic::Multiply)))?;
    registry.register(Box::new(TwoArg(arithmetic::Divide)))?;
    registry.register(Box::new(text::Concat))?;
    registry.register(Box::new(OneArg(text::ToText)))?;
    registry.register(Box::new(OneArg(text::Upper)))?;
    registry.register(Box::new(OneArg(text::Lower)))?;
    registry.register(Box::new(OneArg(text::Length)))?;
    registry.register(Box::new(ThreeArg(logic::If)))?;
    registry.register(Box::new(TwoArg(logic::Equal)))?;
    registry.register(Box::new(TwoArg(logic::GreaterThan)))?;
    registry.register(Box::new(OneArg(logic::IsBlank)))?;
    registry.register(Box::new(OneArg(logic::Count)))?;
    registry.register(Box::new(ZeroArg(logic::RowIdFn)))?;
    Ok(())
}

/// The numeric result type of combining two number operands: formatting
/// keeps the wider precision, sign-allowance the more permissive operand.
pub(crate) fn combined_number(a: &FormulaType, b: &FormulaType) -> FormulaType {
    match (a, b) {
        (
            FormulaType::Number {
                decimal_places: pa,
                allow_negative: na,
            },
            FormulaType::Number {
                decimal_places: pb,
                allow_negative: nb,
            },
        ) => FormulaType::Number {
            decimal_places: (*pa).max(*pb),
            allow_negative: *na || *nb,
        },
        _ => FormulaType::number(),
    }
}

/// Whether two types belong to the same comparable family.
pub(crate) fn same_family(a: &FormulaType, b: &FormulaType) -> bool {
    matches!(
        (a, b),
        (FormulaType::Number { .. }, FormulaType::Number { .. })
            | (
                FormulaType::Text | FormulaType::SingleSelect,
                FormulaType::Text | FormulaType::SingleSelect,
            )
            | (FormulaType::Boolean, FormulaType::Boolean)
            | (FormulaType::Date { .. }, FormulaType::Date { .. })
            | (FormulaType::DateInterval, FormulaType::DateInterval)
    )
}
