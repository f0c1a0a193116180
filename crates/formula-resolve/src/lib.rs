// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Formula type checking.
//!
//! This crate walks an untyped expression tree bottom-up, resolves field
//! references against the surrounding system's field metadata, validates
//! calls against the function registry and produces a fully typed tree.
//!
//! Type-checking never fails structurally: every problem is expressed as a
//! typed tree whose root carries an `Invalid` type with a stable,
//! user-facing reason string. The surrounding system is free to store such
//! a tree on the field; a broken formula never blocks anything else.
//!
//! Field references discovered during the walk are collected on the side.
//! That reference list is the sole channel between type checking and the
//! dependency graph.

mod helpers;
mod limits;
mod typecheck;

pub use typecheck::{type_check, FieldReference, TypedFormula};
