//! Reason-string constructors for invalid formulas.
//!
//! These strings are surfaced verbatim to end users; keep the wording
//! stable. Arity and argument-type wording lives with the function
//! contracts in `tabula-function-registry`.

use tabula_formula_ast::FieldId;

/// A reference to a field id the system has no record of.
pub fn unknown_field(id: FieldId) -> String {
    format!("references the unknown field with id {id}")
}

/// A reference to a trashed field with no live same-name substitute.
pub fn trashed_field(name: &str) -> String {
    format!("references the deleted or trashed field '{name}'")
}

/// A reference to a field whose own formula is broken.
pub fn invalid_field(name: &str) -> String {
    format!("references the field '{name}' which has an invalid formula")
}

/// A via hop through a field that is not a link field.
pub fn not_a_link(name: &str) -> String {
    format!("field '{name}' is not a link field and cannot be used as a lookup path")
}

/// A via hop whose link points at a different table than the next hop.
pub fn wrong_table(name: &str) -> String {
    format!("field '{name}' cannot be reached through the given link path")
}

/// A formula exceeding one of the configured size limits.
pub fn too_large(detail: &str) -> String {
    format!("the formula is too large to be evaluated: {detail}")
}
