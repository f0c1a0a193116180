// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Formula compilation and target-expression evaluation.
//!
//! [`compile`] folds a typed tree into the [`TargetExpr`] form the storage
//! layer executes. The compiler trusts the type checker completely: only
//! well-typed trees may reach it, and it asserts loudly otherwise instead
//! of recovering.
//!
//! [`evaluate`] gives the target form executable semantics over an
//! injected [`RowSource`], used for recomputing stored values and in
//! tests; production reads go through the storage layer's own translation
//! of the same IR.

mod compiler;
mod eval;

pub use compiler::compile;
pub use eval::{evaluate, RowSource};
