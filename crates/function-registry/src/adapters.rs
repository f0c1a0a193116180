//! Arity adapters over the N-ary function contract.
//!
//! The common arities get simpler implementer-facing traits with no manual
//! indexing into an argument list. Each adapter derives `arg_count` and the
//! per-position checkers from the small number of overridable properties.
//! This is a convenience layer, not a second type system: everything still
//! dispatches through [`FormulaFunction`].

use tabula_formula_ast::{TargetExpr, TypeClass, TypedExpr};

use crate::{ArgCountSpec, FormulaFunction};

/// A function taking no arguments.
pub trait ZeroArgFunction: Send + Sync {
    fn name(&self) -> &'static str;
    fn derive_type(&self) -> TypedExpr;
    fn compile(&self) -> TargetExpr;
}

/// A function taking exactly one argument.
pub trait OneArgFunction: Send + Sync {
    fn name(&self) -> &'static str;
    /// Allowed classes for the argument.
    fn arg_type(&self) -> &[TypeClass];
    fn derive_type(&self, arg: TypedExpr) -> TypedExpr;
    fn compile(&self, arg: TargetExpr, typed_arg: &TypedExpr) -> TargetExpr;
}

/// A function taking exactly two arguments.
pub trait TwoArgFunction: Send + Sync {
    fn name(&self) -> &'static str;
    fn arg1_type(&self) -> &[TypeClass];
    fn arg2_type(&self) -> &[TypeClass];
    fn derive_type(&self, arg1: TypedExpr, arg2: TypedExpr) -> TypedExpr;
    fn compile(&self, args: (TargetExpr, TargetExpr), typed_args: &[TypedExpr]) -> TargetExpr;
}

/// A function taking exactly three arguments.
pub trait ThreeArgFunction: Send + Sync {
    fn name(&self) -> &'static str;
    fn arg1_type(&self) -> &[TypeClass];
    fn arg2_type(&self) -> &[TypeClass];
    fn arg3_type(&self) -> &[TypeClass];
    fn derive_type(&self, arg1: TypedExpr, arg2: TypedExpr, arg3: TypedExpr) -> TypedExpr;
    fn compile(
        &self,
        args: (TargetExpr, TargetExpr, TargetExpr),
        typed_args: &[TypedExpr],
    ) -> TargetExpr;
}

/// Adapter wrapping a [`ZeroArgFunction`].
pub struct ZeroArg<F>(pub F);

/// Adapter wrapping a [`OneArgFunction`].
pub struct OneArg<F>(pub F);

/// Adapter wrapping a [`TwoArgFunction`].
pub struct TwoArg<F>(pub F);

/// Adapter wrapping a [`ThreeArgFunction`].
pub struct ThreeArg<F>(pub F);

/// Unpack an argument list whose arity the type checker already verified.
/// A mismatch is a caller contract violation, reported loudly.
fn take<T, const N: usize>(name: &str, args: Vec<T>) -> [T; N] {
    let got = args.len();
    <[T; N]>::try_from(args).unwrap_or_else(|_| {
        panic!("function {name} dispatched with {got} arguments, contract requires {N}")
    })
}

impl<F: ZeroArgFunction> FormulaFunction for ZeroArg<F> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn arg_count(&self) -> ArgCountSpec {
        ArgCountSpec::Fixed(0)
    }

    fn arg_types(&self, _position: usize) -> &[TypeClass] {
        &[]
    }

    fn derive_type(&self, args: Vec<TypedExpr>) -> TypedExpr {
        let [] = take(self.0.name(), args);
        self.0.derive_type()
    }

    fn compile(&self, args: Vec<TargetExpr>, _typed_args: &[TypedExpr]) -> TargetExpr {
        let [] = take(self.0.name(), args);
        self.0.compile()
    }
}

impl<F: OneArgFunction> FormulaFunction for OneArg<F> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn arg_count(&self) -> ArgCountSpec {
        ArgCountSpec::Fixed(1)
    }

    fn arg_types(&self, _position: usize) -> &[TypeClass] {
        self.0.arg_type()
    }

    fn derive_type(&self, args: Vec<TypedExpr>) -> TypedExpr {
        let [arg] = take(self.0.name(), args);
        self.0.derive_type(arg)
    }

    fn compile(&self, args: Vec<TargetExpr>, typed_args: &[TypedExpr]) -> TargetExpr {
        let [arg] = take(self.0.name(), args);
        self.0.compile(arg, &typed_args[0])
    }
}

impl<F: TwoArgFunction> FormulaFunction for TwoArg<F> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn arg_count(&self) -> ArgCountSpec {
        ArgCountSpec::Fixed(2)
    }

    fn arg_types(&self, position: usize) -> &[TypeClass] {
        match position {
            0 => self.0.arg1_type(),
            _ => self.0.arg2_type(),
        }
    }

    fn derive_type(&self, args: Vec<TypedExpr>) -> TypedExpr {
        let [a, b] = take(self.0.name(), args);
        self.0.derive_type(a, b)
    }

    fn compile(&self, args: Vec<TargetExpr>, typed_args: &[TypedExpr]) -> TargetExpr {
        let [a, b] = take(self.0.name(), args);
        self.0.compile((a, b), typed_args)
    }
}

impl<F: ThreeArgFunction> FormulaFunction for ThreeArg<F> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn arg_count(&self) -> ArgCountSpec {
        ArgCountSpec::Fixed(3)
    }

    fn arg_types(&self, position: usize) -> &[TypeClass] {
        match position {
            0 => self.0.arg1_type(),
            1 => self.0.arg2_type(),
            _ => self.0.arg3_type(),
        }
    }

    fn derive_type(&self, args: Vec<TypedExpr>) -> TypedExpr {
        let [a, b, c] = take(self.0.name(), args);
        self.0.derive_type(a, b, c)
    }

    fn compile(&self, args: Vec<TargetExpr>, typed_args: &[TypedExpr]) -> TargetExpr {
        let [a, b, c] = take(self.0.name(), args);
        self.0.compile((a, b, c), typed_args)
    }
}
