//! Error message construction.
//!
//! These strings are the engine's only wire format: downstream API layers
//! surface them verbatim to end users, so the wording here is stable and
//! covered by exact-string tests.

use tabula_formula_ast::{FormulaType, TypeClass};

use crate::ArgCountSpec;

/// A function call with the wrong number of arguments.
pub fn arity_error(function: &str, given: usize, spec: ArgCountSpec) -> String {
    format!(
        "error parsing formula: the function {function} was given {given} arguments \
         but it must be given {}",
        spec.requirement_text()
    )
}

/// A call to a function that is not registered.
pub fn unknown_function_error(function: &str) -> String {
    format!("error parsing formula: the function {function} does not exist")
}

/// One argument whose type matches none of the position's allowed classes.
///
/// `position` is 0-based; the surfaced argument number is 1-based.
pub fn argument_type_error(
    position: usize,
    function: &str,
    actual: &FormulaType,
    allowed: &[TypeClass],
) -> String {
    let usable = allowed
        .iter()
        .map(|c| c.display_name())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "argument number {} given to function {function} was of type {} but the only \
         usable type(s) for this argument are {usable}",
        position + 1,
        actual.display_name(),
    )
}

/// Aggregate per-argument failures into one reason string.
pub fn aggregate(reasons: Vec<String>) -> String {
    reasons.join(", ")
}

/// An operator applied to an argument pair its derivation cannot combine.
pub fn operator_type_error(op: &str, first: &FormulaType, second: &FormulaType) -> String {
    format!(
        "argument number 2 given to operator {op} was of type {} but it must be of \
         type {}",
        second.display_name(),
        first.display_name(),
    )
}
