//! Integration tests for the full formula pipeline:
//! type check -> compile -> dependency graph -> recalculate -> evaluate.

use tabula_formula_ast::{Expr, FieldId, FormulaType, RowId, TableId, Value};
use tabula_tests::TestHarness;

const TABLE: TableId = TableId(1);

/// `field('number') + 1` over a numeric field with value 2 evaluates to 3;
/// over an empty cell it yields the defined null result instead of raising.
#[test]
fn test_number_plus_one_end_to_end() {
    let mut harness = TestHarness::new();
    harness.add_field(TABLE, FieldId(1), "number", FormulaType::number());
    harness.add_row(TABLE, RowId(1), vec![(FieldId(1), Value::Number(2.0))]);
    harness.add_row(TABLE, RowId(2), vec![]);

    let report = harness
        .add_formula_field(
            TABLE,
            FieldId(2),
            "plus_one",
            Expr::call(
                "add",
                vec![Expr::field_ref(FieldId(1)), Expr::literal(Value::Number(1.0))],
            ),
        )
        .unwrap();
    assert_eq!(report.recalculated, vec![FieldId(2)]);

    assert!(matches!(
        harness.field_type(FieldId(2)),
        FormulaType::Number { .. }
    ));
    assert_eq!(harness.cell(RowId(1), FieldId(2)), Value::Number(3.0));
    assert_eq!(harness.cell(RowId(2), FieldId(2)), Value::Null);
}

/// `1 / 0` type-checks, compiles and evaluates to the null sentinel.
#[test]
fn test_division_by_zero_sentinel() {
    let mut harness = TestHarness::new();
    harness.add_row(TABLE, RowId(1), vec![]);

    harness
        .add_formula_field(
            TABLE,
            FieldId(1),
            "ratio",
            Expr::call(
                "divide",
                vec![
                    Expr::literal(Value::Number(1.0)),
                    Expr::literal(Value::Number(0.0)),
                ],
            ),
        )
        .unwrap();

    assert!(matches!(
        harness.field_type(FieldId(1)),
        FormulaType::Number { .. }
    ));
    assert_eq!(harness.cell(RowId(1), FieldId(1)), Value::Null);
}

/// Editing a formula recalculates its whole dependant chain, dependencies
/// before dependents.
#[test]
fn test_chain_recalculates_through_levels() {
    let mut harness = TestHarness::new();
    harness.add_field(TABLE, FieldId(1), "base", FormulaType::number());
    harness.add_row(TABLE, RowId(1), vec![(FieldId(1), Value::Number(10.0))]);

    harness
        .add_formula_field(
            TABLE,
            FieldId(2),
            "doubled",
            Expr::call(
                "multiply",
                vec![Expr::field_ref(FieldId(1)), Expr::literal(Value::Number(2.0))],
            ),
        )
        .unwrap();
    harness
        .add_formula_field(
            TABLE,
            FieldId(3),
            "final",
            Expr::call(
                "add",
                vec![Expr::field_ref(FieldId(2)), Expr::literal(Value::Number(5.0))],
            ),
        )
        .unwrap();
    assert_eq!(harness.cell(RowId(1), FieldId(3)), Value::Number(25.0));

    // Change the middle of the chain; the top refreshes too.
    let report = harness
        .update_formula(
            FieldId(2),
            Expr::call(
                "multiply",
                vec![Expr::field_ref(FieldId(1)), Expr::literal(Value::Number(3.0))],
            ),
        )
        .unwrap();
    assert_eq!(report.recalculated, vec![FieldId(2), FieldId(3)]);
    assert_eq!(harness.cell(RowId(1), FieldId(2)), Value::Number(30.0));
    assert_eq!(harness.cell(RowId(1), FieldId(3)), Value::Number(35.0));
}

/// Trashing a dependency breaks the edge by name; restoring re-links it
/// without operator intervention.
#[test]
fn test_trash_and_restore_round_trip() {
    let mut harness = TestHarness::new();
    harness.add_field(TABLE, FieldId(1), "price", FormulaType::number());
    harness.add_row(TABLE, RowId(1), vec![(FieldId(1), Value::Number(7.0))]);
    harness
        .add_formula_field(
            TABLE,
            FieldId(2),
            "price_copy",
            Expr::field_ref(FieldId(1)),
        )
        .unwrap();

    harness.trash_field(FieldId(1));
    let edges = harness.graph.edges_of(FieldId(2));
    assert_eq!(edges.len(), 1);
    assert!(edges[0].is_broken());
    assert_eq!(edges[0].dependency(), None);
    assert_eq!(edges[0].broken_name(), Some("price"));

    harness.restore_field(FieldId(1));
    let edges = harness.graph.edges_of(FieldId(2));
    assert_eq!(edges[0].dependency(), Some(FieldId(1)));
    assert!(!edges[0].is_broken());

    // The restored chain still evaluates.
    harness.field_changed(FieldId(2)).unwrap();
    assert_eq!(harness.cell(RowId(1), FieldId(2)), Value::Number(7.0));
}

/// A formula over a trashed dependency types invalid with the exact
/// user-facing reason, and the field is excluded from recalculation.
#[test]
fn test_trashed_dependency_surfaces_invalid_reason() {
    let mut harness = TestHarness::new();
    harness.add_field(TABLE, FieldId(1), "price", FormulaType::number());
    harness
        .add_formula_field(TABLE, FieldId(2), "copy", Expr::field_ref(FieldId(1)))
        .unwrap();

    harness.trash_field(FieldId(1));
    harness.field_changed(FieldId(2)).unwrap();

    assert_eq!(
        harness.field_type(FieldId(2)).invalid_reason(),
        Some("references the deleted or trashed field 'price'")
    );
}

/// Lookups traverse link fields; `count` aggregates over the result.
#[test]
fn test_lookup_through_link_field() {
    let orders = TableId(1);
    let items = TableId(2);
    let mut harness = TestHarness::new();
    harness.add_field(
        orders,
        FieldId(1),
        "items",
        FormulaType::Link {
            target_table: items,
        },
    );
    harness.add_field(items, FieldId(10), "amount", FormulaType::number());

    harness.add_row(orders, RowId(1), vec![]);
    harness.add_row(items, RowId(100), vec![(FieldId(10), Value::Number(3.0))]);
    harness.add_row(items, RowId(101), vec![(FieldId(10), Value::Number(4.0))]);
    harness.link_rows(RowId(1), FieldId(1), vec![RowId(100), RowId(101)]);

    harness
        .add_formula_field(
            orders,
            FieldId(2),
            "amounts",
            Expr::lookup(vec![FieldId(1)], FieldId(10)),
        )
        .unwrap();
    harness
        .add_formula_field(
            orders,
            FieldId(3),
            "item_count",
            Expr::call(
                "count",
                vec![Expr::lookup(vec![FieldId(1)], FieldId(10))],
            ),
        )
        .unwrap();

    assert_eq!(
        harness.field_type(FieldId(2)),
        FormulaType::Lookup {
            through_field: FieldId(1),
            target: Box::new(FormulaType::number()),
        }
    );
    assert_eq!(
        harness.cell(RowId(1), FieldId(2)),
        Value::Array(vec![Value::Number(3.0), Value::Number(4.0)])
    );
    assert_eq!(harness.cell(RowId(1), FieldId(3)), Value::Number(2.0));
}

/// `concat` casts its non-text arguments through `totext`, honouring the
/// number's declared formatting.
#[test]
fn test_concat_implicit_cast() {
    let mut harness = TestHarness::new();
    harness.add_field(
        TABLE,
        FieldId(1),
        "amount",
        FormulaType::Number {
            decimal_places: 2,
            allow_negative: true,
        },
    );
    harness.add_row(TABLE, RowId(1), vec![(FieldId(1), Value::Number(1.5))]);

    harness
        .add_formula_field(
            TABLE,
            FieldId(2),
            "label",
            Expr::call(
                "concat",
                vec![
                    Expr::literal(Value::Text("total: ".into())),
                    Expr::field_ref(FieldId(1)),
                ],
            ),
        )
        .unwrap();

    assert_eq!(harness.field_type(FieldId(2)), FormulaType::Text);
    assert_eq!(
        harness.cell(RowId(1), FieldId(2)),
        Value::Text("total: 1.50".to_string())
    );
}

/// A stored invalid formula doesn't block anything else; fixing it brings
/// the field and its dependants back.
#[test]
fn test_invalid_formula_is_stored_then_repaired() {
    let mut harness = TestHarness::new();
    harness.add_row(TABLE, RowId(1), vec![]);
    let report = harness
        .add_formula_field(
            TABLE,
            FieldId(1),
            "broken",
            Expr::call("upper", vec![Expr::literal(Value::Number(1.0))]),
        )
        .unwrap();
    assert_eq!(report.invalid, vec![FieldId(1)]);
    assert_eq!(
        harness.field_type(FieldId(1)).invalid_reason(),
        Some(
            "argument number 1 given to function upper was of type number but the \
             only usable type(s) for this argument are text"
        )
    );

    let report = harness
        .update_formula(
            FieldId(1),
            Expr::call("upper", vec![Expr::literal(Value::Text("ok".into()))]),
        )
        .unwrap();
    assert_eq!(report.recalculated, vec![FieldId(1)]);
    assert_eq!(
        harness.cell(RowId(1), FieldId(1)),
        Value::Text("OK".to_string())
    );
}

/// Migration walks the whole backlog in batches, refreshes values and
/// force-rebuilds columns for the oldest fields, then goes quiet.
#[test]
fn test_migration_end_to_end() {
    let mut harness = TestHarness::new();
    harness.add_field(TABLE, FieldId(1), "number", FormulaType::number());
    harness.add_row(TABLE, RowId(1), vec![(FieldId(1), Value::Number(2.0))]);
    harness
        .add_formula_field(
            TABLE,
            FieldId(2),
            "plus_one",
            Expr::call(
                "add",
                vec![Expr::field_ref(FieldId(1)), Expr::literal(Value::Number(1.0))],
            ),
        )
        .unwrap();

    // Pretend everything was written by engine version 1.
    harness.rewind_versions(1);
    let report = harness.migrate_to_latest();
    assert_eq!(report.migrated, vec![FieldId(2)]);
    assert!(report.invalid.is_empty());
    assert_eq!(harness.rebuilt_columns(), &[FieldId(2)]);
    assert_eq!(harness.cell(RowId(1), FieldId(2)), Value::Number(3.0));

    // Nothing left to claim.
    let report = harness.migrate_to_latest();
    assert_eq!(report.batches, 0);
}
