// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Formula function contracts and the function registry.
//!
//! Every callable formula function is a [`FormulaFunction`]: a contract
//! naming its arity, its per-argument type classes, a type-deriving rule
//! and a compilation rule. The [`FunctionRegistry`] is an explicit value
//! constructed once during process initialization and passed by reference
//! to the type checker and compiler; it is never ambient global state.
//!
//! Most built-ins don't implement the N-ary contract directly. The
//! [`adapters`] module wraps simpler zero/one/two/three-argument traits
//! so implementers never index into an argument list by hand.

pub mod adapters;
pub mod builtins;
pub mod messages;

use indexmap::IndexMap;
use thiserror::Error;

use tabula_formula_ast::{ExprKind, FormulaType, TargetExpr, TypeClass, TypedExpr};

/// Registry configuration errors. Fatal at startup, never a runtime path.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("function '{0}' is already registered")]
    DuplicateFunction(&'static str),
}

/// Declared argument count of a function. A pure predicate over the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgCountSpec {
    /// Exactly `n` arguments.
    Fixed(usize),
    /// Strictly more than `n` arguments.
    GreaterThan(usize),
}

impl ArgCountSpec {
    /// Whether `n` arguments satisfy this spec.
    pub fn test(&self, n: usize) -> bool {
        match self {
            ArgCountSpec::Fixed(expected) => n == *expected,
            ArgCountSpec::GreaterThan(min) => n > *min,
        }
    }

    /// The requirement as surfaced in error text, singular/plural correct
    /// for fixed arities.
    pub fn requirement_text(&self) -> String {
        match self {
            ArgCountSpec::Fixed(1) => "exactly 1 argument".to_string(),
            ArgCountSpec::Fixed(n) => format!("exactly {n} arguments"),
            ArgCountSpec::GreaterThan(n) => format!("more than {n} arguments"),
        }
    }
}

/// The general N-ary function contract.
///
/// `derive_type` receives the already type-checked arguments and returns
/// the typed call node. It may rewrite the call entirely (the implicit-cast
/// channel: a function is free to wrap its arguments in other calls), and
/// it may return a node whose type is `Invalid` to reject an argument
/// combination the per-position class check cannot express.
pub trait FormulaFunction: Send + Sync {
    /// Name the function is called by in formulas.
    fn name(&self) -> &'static str;

    /// Declared argument count.
    fn arg_count(&self) -> ArgCountSpec;

    /// Allowed type classes for the argument at `position` (0-based).
    ///
    /// For `GreaterThan` arities, positions past the declared checkers
    /// reuse the last checker.
    fn arg_types(&self, position: usize) -> &[TypeClass];

    /// Produce the typed call node from type-checked arguments.
    fn derive_type(&self, args: Vec<TypedExpr>) -> TypedExpr;

    /// Produce the target expression from compiled arguments.
    ///
    /// `typed_args` carries the corresponding typed nodes so compilation
    /// can consult argument types (e.g. number formatting).
    fn compile(&self, args: Vec<TargetExpr>, typed_args: &[TypedExpr]) -> TargetExpr;
}

/// Build the typed call node for `function` with `ty`.
///
/// Shared by `derive_type` implementations that keep the call as written.
pub fn call_node(function: &str, args: Vec<TypedExpr>, ty: FormulaType) -> TypedExpr {
    TypedExpr {
        kind: ExprKind::Call {
            function: function.to_string(),
            args,
        },
        ty,
    }
}

/// Lookup table from function name to definition.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: IndexMap<&'static str, Box<dyn FormulaFunction>>,
}

impl FunctionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with the built-in functions.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        builtins::register_all(&mut registry)?;
        Ok(registry)
    }

    /// Register a function. Duplicate names are a configuration error.
    pub fn register(&mut self, function: Box<dyn FormulaFunction>) -> Result<(), RegistryError> {
        let name = function.name();
        if self.functions.contains_key(name) {
            return Err(RegistryError::DuplicateFunction(name));
        }
        self.functions.insert(name, function);
        Ok(())
    }

    /// Look up a function by name.
    pub fn lookup(&self, name: &str) -> Option<&dyn FormulaFunction> {
        self.functions.get(name).map(|f| f.as_ref())
    }

    /// All registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_count_spec() {
        assert!(ArgCountSpec::Fixed(1).test(1));
        assert!(!ArgCountSpec::Fixed(1).test(0));
        assert!(!ArgCountSpec::Fixed(1).test(2));
        assert!(ArgCountSpec::GreaterThan(1).test(2));
        assert!(!ArgCountSpec::GreaterThan(1).test(1));
    }

    #[test]
    fn test_requirement_text_pluralization() {
        assert_eq!(
            ArgCountSpec::Fixed(1).requirement_text(),
            "exactly 1 argument"
        );
        assert_eq!(
            ArgCountSpec::Fixed(2).requirement_text(),
            "exactly 2 arguments"
        );
        assert_eq!(
            ArgCountSpec::GreaterThan(1).requirement_text(),
            "more than 1 arguments"
        );
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = FunctionRegistry::with_builtins().unwrap();
        let err = builtins::register_all(&mut registry).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateFunction(_)));
    }

    #[test]
    fn test_lookup() {
        let registry = FunctionRegistry::with_builtins().unwrap();
        assert!(registry.lookup("add").is_some());
        assert!(registry.lookup("no_such_function").is_none());
    }
}
