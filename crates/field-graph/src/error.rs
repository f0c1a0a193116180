//! Graph errors.

use thiserror::Error;

use tabula_formula_ast::FieldId;

/// Graph result type.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Structural failures the caller must react to synchronously.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("field {field} would depend on itself through a chain of other fields")]
    CircularFieldDependency { field: FieldId },
}
