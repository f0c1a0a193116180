//! In-memory evaluation of target expressions.
//!
//! Mirrors the semantics the storage layer's query translation must
//! provide, in particular the null sentinel: division by zero and
//! arithmetic over empty cells yield `Null`, never a runtime fault.

use tabula_formula_ast::{FieldId, RowId, TargetExpr, TargetOp, Value};

/// Row data access, injected by the storage layer (or a test harness).
pub trait RowSource {
    /// The stored value of `field` in `row`. `Null` for an empty cell.
    fn cell(&self, row: RowId, field: FieldId) -> Value;

    /// The rows linked from `row` through `link_field`.
    fn linked_rows(&self, row: RowId, link_field: FieldId) -> Vec<RowId>;
}

/// Evaluate `expr` against one row.
pub fn evaluate(expr: &TargetExpr, row: RowId, source: &dyn RowSource) -> Value {
    match expr {
        TargetExpr::Literal(value) => value.clone(),
        TargetExpr::Column { field, join_path } => {
            resolve_column(row, *field, join_path, source)
        }
        TargetExpr::Func { op, args } => {
            let values: Vec<Value> = args
                .iter()
                .map(|arg| evaluate(arg, row, source))
                .collect();
            apply(op, values, row)
        }
    }
}

fn resolve_column(
    row: RowId,
    field: FieldId,
    join_path: &[FieldId],
    source: &dyn RowSource,
) -> Value {
    if join_path.is_empty() {
        return source.cell(row, field);
    }
    let mut frontier = vec![row];
    for hop in join_path {
        frontier = frontier
            .iter()
            .flat_map(|r| source.linked_rows(*r, *hop))
            .collect();
    }
    Value::Array(
        frontier
            .into_iter()
            .map(|r| source.cell(r, field))
            .collect(),
    )
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        _ => None,
    }
}

/// Numeric binary op; any non-number operand (including `Null`) or a
/// `None` from the op yields `Null`.
fn binary_number(args: &[Value], f: impl Fn(f64, f64) -> Option<f64>) -> Value {
    match (as_number(&args[0]), as_number(&args[1])) {
        (Some(a), Some(b)) => f(a, b).map(Value::Number).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn format_number(n: f64, decimal_places: Option<u8>) -> String {
    match decimal_places {
        Some(places) => format!("{:.*}", places as usize, n),
        None => n.to_string(),
    }
}

/// Render a value as text. `Null` renders empty; only used where the
/// target op defines text output.
fn stringify(value: &Value, decimal_places: Option<u8>) -> String {
    match value {
        Value::Null => String::new(),
        Value::Text(t) => t.clone(),
        Value::Number(n) => format_number(*n, decimal_places),
        Value::Boolean(b) => b.to_string(),
        Value::Array(values) => values
            .iter()
            .map(|v| stringify(v, decimal_places))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn apply(op: &TargetOp, args: Vec<Value>, row: RowId) -> Value {
    match op {
        TargetOp::Add => binary_number(&args, |a, b| Some(a + b)),
        TargetOp::Subtract => binary_number(&args, |a, b| Some(a - b)),
        TargetOp::Multiply => binary_number(&args, |a, b| Some(a * b)),
        // The defined division-by-zero sentinel.
        TargetOp::Divide => binary_number(&args, |a, b| (b != 0.0).then(|| a / b)),
        TargetOp::Concat => Value::Text(
            args.iter()
                .map(|v| stringify(v, None))
                .collect::<Vec<_>>()
                .concat(),
        ),
        TargetOp::Upper => match &args[0] {
            Value::Text(t) => Value::Text(t.to_uppercase()),
            _ => Value::Null,
        },
        TargetOp::Lower => match &args[0] {
            Value::Text(t) => Value::Text(t.to_lowercase()),
            _ => Value::Null,
        },
        TargetOp::TextLength => match &args[0] {
            Value::Text(t) => Value::Number(t.chars().count() as f64),
            _ => Value::Null,
        },
        TargetOp::ToText { decimal_places } => match &args[0] {
            Value::Null => Value::Null,
            value => Value::Text(stringify(value, *decimal_places)),
        },
        TargetOp::Equal => Value::Boolean(args[0] == args[1]),
        TargetOp::GreaterThan => match (&args[0], &args[1]) {
            (Value::Number(a), Value::Number(b)) => Value::Boolean(a > b),
            (Value::Text(a), Value::Text(b)) => Value::Boolean(a > b),
            _ => Value::Null,
        },
        TargetOp::If => {
            let [condition, when_true, when_false] =
                <[Value; 3]>::try_from(args).unwrap_or_else(|args: Vec<Value>| {
                    panic!("if dispatched with {} arguments", args.len())
                });
            // A null condition takes the false branch.
            if condition == Value::Boolean(true) {
                when_true
            } else {
                when_false
            }
        }
        TargetOp::IsBlank => Value::Boolean(args[0].is_blank()),
        TargetOp::Count => match &args[0] {
            Value::Array(values) => Value::Number(values.len() as f64),
            Value::Null => Value::Number(0.0),
            _ => Value::Null,
        },
        TargetOp::RowId => Value::Number(row.0 as f64),
    }
}
