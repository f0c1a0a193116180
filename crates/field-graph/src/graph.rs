//! The edge store and its lifecycle operations.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use tabula_formula_ast::{FieldId, FieldLookup, FormulaLimits, TableId};
use tabula_formula_resolve::{type_check, FieldReference};
use tabula_function_registry::FunctionRegistry;

use crate::edge::FieldDependencyEdge;
use crate::error::{GraphError, Result};
use crate::levels::{self, RecalculationPlan};

/// Persisted dependency edges, keyed by dependant field.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: IndexMap<FieldId, Vec<FieldDependencyEdge>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dependant's own edge rows.
    pub fn edges_of(&self, field: FieldId) -> &[FieldDependencyEdge] {
        self.edges.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every edge row in the store.
    pub fn iter_edges(&self) -> impl Iterator<Item = &FieldDependencyEdge> {
        self.edges.values().flatten()
    }

    /// Rebuild the edge rows of each field from its formula.
    ///
    /// Each field is re-type-checked to recover its reference list; the
    /// prospective edge set is diffed against the stored rows and only the
    /// difference is applied, so rebuilding twice with no intervening
    /// change leaves the rows byte-for-byte identical.
    ///
    /// Cycles are detected on the prospective closure before anything is
    /// committed for a field. On a cycle the error propagates immediately:
    /// fields committed earlier in the same call keep their new edges, the
    /// offending field keeps its old ones.
    pub fn rebuild_dependencies(
        &mut self,
        fields: &[FieldId],
        ctx: &dyn FieldLookup,
        registry: &FunctionRegistry,
        limits: &FormulaLimits,
    ) -> Result<()> {
        for &field in fields {
            let new_edges = self.prospective_edges(field, ctx, registry, limits);
            self.transitive_with(field, Some(new_edges.as_slice()))?;
            self.apply_diff(field, new_edges);
        }
        Ok(())
    }

    fn prospective_edges(
        &self,
        field: FieldId,
        ctx: &dyn FieldLookup,
        registry: &FunctionRegistry,
        limits: &FormulaLimits,
    ) -> Vec<FieldDependencyEdge> {
        let Some(meta) = ctx.field(field) else {
            return Vec::new();
        };
        let Some(formula) = &meta.formula else {
            return Vec::new();
        };
        let typed = type_check(formula, ctx, registry, limits);
        typed
            .references
            .into_iter()
            .map(|reference| match reference {
                FieldReference::Resolved { field: dep, via } => {
                    FieldDependencyEdge::live(field, dep, via)
                }
                FieldReference::Broken { name } => {
                    FieldDependencyEdge::broken(field, name, None)
                }
            })
            .collect()
    }

    fn apply_diff(&mut self, field: FieldId, new_edges: Vec<FieldDependencyEdge>) {
        let old = self.edges.get(&field).cloned().unwrap_or_default();
        let mut rows: Vec<FieldDependencyEdge> = old
            .iter()
            .filter(|edge| new_edges.contains(edge))
            .cloned()
            .collect();
        let removed = old.len() - rows.len();
        let mut inserted = 0;
        for edge in new_edges {
            if !old.contains(&edge) {
                rows.push(edge);
                inserted += 1;
            }
        }
        debug!(%field, inserted, removed, "rebuilt dependency edges");
        if rows.is_empty() {
            self.edges.shift_remove(&field);
        } else {
            self.edges.insert(field, rows);
        }
    }

    /// Handle `field` being trashed or permanently removed.
    ///
    /// Edges that traverse `field` as their via link are deleted outright:
    /// the indirect path no longer exists. Edges that depend on `field`
    /// directly are converted to broken edges recording `name`, preserving
    /// enough to re-link automatically if the field is restored.
    pub fn break_dependencies_delete_dependants(&mut self, field: FieldId, name: &str) {
        let mut converted = 0;
        let mut deleted = 0;
        for edges in self.edges.values_mut() {
            let before = edges.len();
            edges.retain(|edge| edge.via() != Some(field));
            deleted += before - edges.len();
            for edge in edges.iter_mut() {
                if edge.dependency() == Some(field) {
                    *edge = edge.clone().into_broken(name);
                    converted += 1;
                }
            }
        }
        debug!(%field, name, converted, deleted, "broke dependency edges");
    }

    /// Re-link broken edges recording `name` to the restored `field`.
    pub fn restore_dependencies(&mut self, field: FieldId, name: &str) {
        let mut restored = 0;
        for edges in self.edges.values_mut() {
            for edge in edges.iter_mut() {
                if edge.broken_name() == Some(name) {
                    *edge = edge.clone().into_live(field);
                    restored += 1;
                }
            }
        }
        debug!(%field, name, restored, "restored dependency edges");
    }

    /// Permanent deletion: the field's own rows are dropped and every
    /// remaining reference to it is broken.
    pub fn remove_field(&mut self, field: FieldId, name: &str) {
        self.edges.shift_remove(&field);
        self.break_dependencies_delete_dependants(field, name);
    }

    /// The set of fields `field` transitively depends on.
    ///
    /// Terminates even on edge data with an out-of-band cycle: the walk
    /// raises [`GraphError::CircularFieldDependency`] instead of looping.
    pub fn get_all_field_dependencies(&self, field: FieldId) -> Result<IndexSet<FieldId>> {
        self.transitive_with(field, None)
    }

    /// Depth-first walk over live dependency edges starting at `root`,
    /// with `root`'s own edges optionally overridden (used to test a
    /// prospective edge set before committing it). Raises on any cycle
    /// encountered during the walk.
    fn transitive_with(
        &self,
        root: FieldId,
        override_edges: Option<&[FieldDependencyEdge]>,
    ) -> Result<IndexSet<FieldId>> {
        #[derive(PartialEq)]
        enum Mark {
            InProgress,
            Done,
        }

        let mut marks: IndexMap<FieldId, Mark> = IndexMap::new();
        marks.insert(root, Mark::InProgress);
        let mut stack: Vec<(FieldId, usize)> = vec![(root, 0)];

        while let Some(&(node, cursor)) = stack.last() {
            let edges = match override_edges {
                Some(edges) if node == root => edges,
                _ => self.edges_of(node),
            };

            // Advance past broken edges to the next live dependency.
            let mut cursor = cursor;
            let mut next = None;
            while cursor < edges.len() {
                let edge = &edges[cursor];
                cursor += 1;
                if let Some(dep) = edge.dependency() {
                    next = Some(dep);
                    break;
                }
            }
            if let Some(frame) = stack.last_mut() {
                frame.1 = cursor;
            }

            match next {
                Some(dep) => match marks.get(&dep) {
                    None => {
                        marks.insert(dep, Mark::InProgress);
                        stack.push((dep, 0));
                    }
                    Some(Mark::InProgress) => {
                        return Err(GraphError::CircularFieldDependency { field: dep });
                    }
                    Some(Mark::Done) => {}
                },
                None => {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                }
            }
        }

        Ok(marks
            .into_keys()
            .filter(|&id| id != root)
            .collect())
    }

    #[cfg(test)]
    pub(crate) fn insert_rows_for_test(
        &mut self,
        field: FieldId,
        rows: Vec<FieldDependencyEdge>,
    ) {
        self.edges.insert(field, rows);
    }

    /// Group every field transitively affected by `changed` into
    /// dependency-respecting recalculation levels. See [`levels`].
    pub fn group_all_dependent_fields_by_level(
        &self,
        table: TableId,
        changed: &[FieldId],
        ctx: &dyn FieldLookup,
    ) -> RecalculationPlan {
        levels::group_all_dependent_fields_by_level(self, table, changed, ctx)
    }
}
