//! Recalculation level grouping.
//!
//! Kahn's algorithm restricted to the fields transitively affected by a
//! change, producing levels such that level *k* only depends on the
//! changed fields and levels `< k`. Fields with a broken or otherwise
//! unsatisfiable dependency never land in a level; they are surfaced
//! separately so the caller can mark them invalid.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use tabula_formula_ast::{FieldId, FieldLookup, TableId};

use crate::graph::DependencyGraph;

/// Fields safe to recompute together: no dependencies between them, and
/// every dependency satisfied by earlier levels or the changed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecalculationLevel {
    /// Sorted by id for deterministic processing.
    pub fields: Vec<FieldId>,
}

/// The full ordering for one scheduling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecalculationPlan {
    /// Levels in dependency-first order.
    pub levels: Vec<RecalculationLevel>,
    /// Affected fields that cannot be safely recalculated: trashed, gone,
    /// carrying a broken edge, or downstream of such a field.
    pub invalid: Vec<FieldId>,
}

impl RecalculationPlan {
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty() && self.invalid.is_empty()
    }
}

pub(crate) fn group_all_dependent_fields_by_level(
    graph: &DependencyGraph,
    table: TableId,
    changed: &[FieldId],
    ctx: &dyn FieldLookup,
) -> RecalculationPlan {
    let changed_set: IndexSet<FieldId> = changed.iter().copied().collect();

    // Reverse adjacency over live edges.
    let mut dependants_of: IndexMap<FieldId, IndexSet<FieldId>> = IndexMap::new();
    for edge in graph.iter_edges() {
        if let Some(dep) = edge.dependency() {
            dependants_of.entry(dep).or_default().insert(edge.dependant());
        }
    }

    // Transitive closure of dependants of the changed set.
    let mut affected: IndexSet<FieldId> = IndexSet::new();
    let mut queue: VecDeque<FieldId> = changed.iter().copied().collect();
    while let Some(field) = queue.pop_front() {
        if let Some(dependants) = dependants_of.get(&field) {
            for &dependant in dependants {
                if !changed_set.contains(&dependant) && affected.insert(dependant) {
                    queue.push_back(dependant);
                }
            }
        }
    }

    // Fields that cannot be recalculated at all.
    let mut invalid: IndexSet<FieldId> = IndexSet::new();
    for &field in &affected {
        let excluded = match ctx.field(field) {
            None => true,
            Some(meta) if meta.trashed => true,
            Some(_) => graph.edges_of(field).iter().any(|edge| {
                edge.is_broken()
                    || edge
                        .dependency()
                        .is_some_and(|dep| ctx.field(dep).is_none())
            }),
        };
        if excluded {
            invalid.insert(field);
        }
    }

    // Unsatisfied dependency counts within the tracked set. Dependencies
    // on the changed fields are satisfied from the start; dependencies
    // outside the affected set don't gate this run.
    let mut in_degree: IndexMap<FieldId, usize> = IndexMap::new();
    for &field in &affected {
        if invalid.contains(&field) {
            continue;
        }
        let deps: IndexSet<FieldId> = graph
            .edges_of(field)
            .iter()
            .filter_map(|edge| edge.dependency())
            .filter(|dep| affected.contains(dep) && !changed_set.contains(dep))
            .collect();
        in_degree.insert(field, deps.len());
    }

    let mut levels = Vec::new();
    let mut current: Vec<FieldId> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&field, _)| field)
        .collect();
    current.sort();

    while !current.is_empty() {
        let mut next: IndexSet<FieldId> = IndexSet::new();
        for &field in &current {
            if let Some(dependants) = dependants_of.get(&field) {
                for &dependant in dependants {
                    if let Some(degree) = in_degree.get_mut(&dependant)
                        && *degree > 0
                    {
                        *degree -= 1;
                        if *degree == 0 {
                            next.insert(dependant);
                        }
                    }
                }
            }
        }
        levels.push(RecalculationLevel { fields: current });
        let mut next: Vec<FieldId> = next.into_iter().collect();
        next.sort();
        current = next;
    }

    // Anything never emitted is stuck behind an invalid field (or an
    // out-of-band cycle) and cannot be recalculated either.
    let leveled: IndexSet<FieldId> = levels
        .iter()
        .flat_map(|level| level.fields.iter().copied())
        .collect();
    for &field in &affected {
        if !leveled.contains(&field) {
            invalid.insert(field);
        }
    }

    let mut invalid: Vec<FieldId> = invalid.into_iter().collect();
    invalid.sort();

    debug!(
        %table,
        changed = changed.len(),
        affected = affected.len(),
        levels = levels.len(),
        invalid = invalid.len(),
        "grouped dependent fields by level"
    );

    RecalculationPlan { levels, invalid }
}
