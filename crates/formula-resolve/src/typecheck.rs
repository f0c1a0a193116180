//! The bottom-up typing pass.

use indexmap::IndexSet;

use tabula_formula_ast::{
    Expr, ExprKind, FieldId, FieldLookup, FieldMeta, FormulaLimits, FormulaType, TableId,
    TypedExpr, UntypedKind,
};
use tabula_function_registry::{call_node, messages, FunctionRegistry};

use crate::helpers;
use crate::limits::check_limits;

/// A field reference discovered while typing a formula.
///
/// `Resolved` names a live field, optionally reached through a link field;
/// `Broken` records the name a reference used to resolve to, so the edge
/// can be repaired if a field with that name comes back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldReference {
    Resolved {
        field: FieldId,
        /// The link field this reference was reached through, if any.
        via: Option<FieldId>,
    },
    Broken { name: String },
}

/// The result of typing one formula: the typed tree plus the reference
/// list the dependency graph is rebuilt from.
#[derive(Debug, Clone)]
pub struct TypedFormula {
    pub expr: TypedExpr,
    /// Deduplicated, in first-seen order.
    pub references: Vec<FieldReference>,
}

impl TypedFormula {
    /// The root type of the formula.
    pub fn formula_type(&self) -> &FormulaType {
        &self.expr.ty
    }

    /// Whether the formula typed cleanly.
    pub fn is_valid(&self) -> bool {
        !self.expr.ty.is_invalid()
    }
}

/// Type-check an untyped formula tree.
///
/// Never fails structurally: every problem becomes a typed tree whose root
/// carries `Invalid { reason }`. Size limits are enforced by an iterative
/// pre-pass before any recursion happens.
pub fn type_check(
    expr: &Expr,
    ctx: &dyn FieldLookup,
    registry: &FunctionRegistry,
    limits: &FormulaLimits,
) -> TypedFormula {
    if let Err(detail) = check_limits(expr, limits) {
        return TypedFormula {
            expr: TypedExpr::invalid(helpers::too_large(&detail)),
            references: Vec::new(),
        };
    }

    let mut checker = Checker {
        ctx,
        registry,
        references: IndexSet::new(),
    };
    let typed = checker.check(expr);
    TypedFormula {
        expr: typed,
        references: checker.references.into_iter().collect(),
    }
}

struct Checker<'a> {
    ctx: &'a dyn FieldLookup,
    registry: &'a FunctionRegistry,
    references: IndexSet<FieldReference>,
}

impl Checker<'_> {
    fn check(&mut self, expr: &Expr) -> TypedExpr {
        match &expr.kind {
            UntypedKind::Literal(value) => TypedExpr {
                kind: ExprKind::Literal(value.clone()),
                ty: value.natural_type(),
            },
            UntypedKind::FieldRef { field, via } if via.is_empty() => {
                self.check_direct_ref(*field)
            }
            UntypedKind::FieldRef { field, via } => self.check_via_ref(*field, via),
            UntypedKind::Call { function, args } => self.check_call(function, args),
        }
    }

    /// Resolve a field id to live metadata.
    ///
    /// A trashed field is substituted by a live field with the same name
    /// in the same table when one exists (the automatic repair path).
    /// When it doesn't, a broken reference carrying the name is recorded
    /// and the invalid reason returned.
    fn resolve_meta(&mut self, id: FieldId) -> Result<FieldMeta, String> {
        let Some(meta) = self.ctx.field(id) else {
            return Err(helpers::unknown_field(id));
        };
        if !meta.trashed {
            return Ok(meta);
        }
        match self.ctx.field_by_name(meta.table, &meta.name) {
            Some(substitute) => Ok(substitute),
            None => {
                self.references.insert(FieldReference::Broken {
                    name: meta.name.clone(),
                });
                Err(helpers::trashed_field(&meta.name))
            }
        }
    }

    fn check_direct_ref(&mut self, field: FieldId) -> TypedExpr {
        let meta = match self.resolve_meta(field) {
            Ok(meta) => meta,
            Err(reason) => return TypedExpr::invalid(reason),
        };
        // The dependency is tracked even when the referenced formula is
        // broken, so fixing it later recalculates this field too.
        self.references.insert(FieldReference::Resolved {
            field: meta.id,
            via: None,
        });
        if meta.ty.is_invalid() {
            return TypedExpr::invalid(helpers::invalid_field(&meta.name));
        }
        TypedExpr {
            kind: ExprKind::FieldRef {
                field: meta.id,
                via: Vec::new(),
            },
            ty: meta.ty,
        }
    }

    fn check_via_ref(&mut self, field: FieldId, via: &[FieldId]) -> TypedExpr {
        let mut resolved_via: Vec<FieldId> = Vec::with_capacity(via.len());
        let mut prev: Option<FieldId> = None;
        let mut expected_table: Option<TableId> = None;

        for hop in via {
            let meta = match self.resolve_meta(*hop) {
                Ok(meta) => meta,
                Err(reason) => return TypedExpr::invalid(reason),
            };
            if let Some(table) = expected_table
                && meta.table != table
            {
                return TypedExpr::invalid(helpers::wrong_table(&meta.name));
            }
            let FormulaType::Link { target_table } = meta.ty else {
                return TypedExpr::invalid(helpers::not_a_link(&meta.name));
            };
            self.references.insert(FieldReference::Resolved {
                field: meta.id,
                via: prev,
            });
            prev = Some(meta.id);
            expected_table = Some(target_table);
            resolved_via.push(meta.id);
        }

        let meta = match self.resolve_meta(field) {
            Ok(meta) => meta,
            Err(reason) => return TypedExpr::invalid(reason),
        };
        if let Some(table) = expected_table
            && meta.table != table
        {
            return TypedExpr::invalid(helpers::wrong_table(&meta.name));
        }
        self.references.insert(FieldReference::Resolved {
            field: meta.id,
            via: prev,
        });
        if meta.ty.is_invalid() {
            return TypedExpr::invalid(helpers::invalid_field(&meta.name));
        }

        // Innermost type first, wrapped outwards along the chain.
        let mut ty = meta.ty.clone();
        for hop in resolved_via.iter().rev() {
            ty = FormulaType::Lookup {
                through_field: *hop,
                target: Box::new(ty),
            };
        }
        TypedExpr {
            kind: ExprKind::FieldRef {
                field: meta.id,
                via: resolved_via,
            },
            ty,
        }
    }

    fn check_call(&mut self, function: &str, args: &[Expr]) -> TypedExpr {
        let typed_args: Vec<TypedExpr> = args.iter().map(|arg| self.check(arg)).collect();

        // The first failed argument decides the call's type; siblings were
        // still typed above so their references are recorded.
        if let Some(first_invalid) = typed_args.iter().find(|arg| arg.is_invalid()) {
            let ty = first_invalid.ty.clone();
            return call_node(function, typed_args, ty);
        }

        let Some(def) = self.registry.lookup(function) else {
            return call_node(
                function,
                typed_args,
                FormulaType::invalid(messages::unknown_function_error(function)),
            );
        };

        let spec = def.arg_count();
        if !spec.test(typed_args.len()) {
            let reason = messages::arity_error(function, typed_args.len(), spec);
            return call_node(function, typed_args, FormulaType::invalid(reason));
        }

        let mut offending = Vec::new();
        for (position, arg) in typed_args.iter().enumerate() {
            let allowed = def.arg_types(position);
            if !allowed.iter().any(|class| class.matches(&arg.ty)) {
                offending.push(messages::argument_type_error(
                    position, function, &arg.ty, allowed,
                ));
            }
        }
        if !offending.is_empty() {
            return call_node(
                function,
                typed_args,
                FormulaType::invalid(messages::aggregate(offending)),
            );
        }

        def.derive_type(typed_args)
    }
}
