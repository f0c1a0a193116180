//! Dependency edge rows.

use tabula_formula_ast::FieldId;

/// One persisted dependency edge.
///
/// A live edge names the field it depends on; a broken edge instead
/// records the name that reference used to resolve to, so it can be
/// re-linked automatically if a field with that name comes back. Exactly
/// one of the two is ever set; the private fields and constructors
/// enforce that.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDependencyEdge {
    dependant: FieldId,
    dependency: Option<FieldId>,
    via: Option<FieldId>,
    broken_reference_field_name: Option<String>,
}

impl FieldDependencyEdge {
    /// Live edge: `dependant` depends on `dependency`, optionally through
    /// the link field `via`.
    pub fn live(dependant: FieldId, dependency: FieldId, via: Option<FieldId>) -> Self {
        FieldDependencyEdge {
            dependant,
            dependency: Some(dependency),
            via,
            broken_reference_field_name: None,
        }
    }

    /// Broken edge: the dependency no longer exists; `name` is kept for
    /// repair on restore.
    pub fn broken(dependant: FieldId, name: impl Into<String>, via: Option<FieldId>) -> Self {
        FieldDependencyEdge {
            dependant,
            dependency: None,
            via,
            broken_reference_field_name: Some(name.into()),
        }
    }

    pub fn dependant(&self) -> FieldId {
        self.dependant
    }

    pub fn dependency(&self) -> Option<FieldId> {
        self.dependency
    }

    pub fn via(&self) -> Option<FieldId> {
        self.via
    }

    pub fn broken_name(&self) -> Option<&str> {
        self.broken_reference_field_name.as_deref()
    }

    pub fn is_broken(&self) -> bool {
        self.broken_reference_field_name.is_some()
    }

    /// Convert a live edge into its broken form, recording `name`.
    pub(crate) fn into_broken(self, name: &str) -> Self {
        FieldDependencyEdge::broken(self.dependant, name, self.via)
    }

    /// Re-link a broken edge to `dependency`.
    pub(crate) fn into_live(self, dependency: FieldId) -> Self {
        FieldDependencyEdge::live(self.dependant, dependency, self.via)
    }
}
