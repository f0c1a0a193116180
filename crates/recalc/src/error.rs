//! Scheduler errors.

use thiserror::Error;

use tabula_field_graph::GraphError;

/// Scheduler result type.
pub type Result<T> = std::result::Result<T, RecalcError>;

/// Failures a scheduling caller must react to synchronously.
#[derive(Debug, Error)]
pub enum RecalcError {
    #[error(transparent)]
    Graph(#[from] GraphError),
}
