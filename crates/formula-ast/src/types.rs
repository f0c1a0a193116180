//! Formula value types and runtime values.
//!
//! [`FormulaType`] is the closed set of types a formula expression can
//! resolve to. Every typed expression node carries exactly one of these.
//! An `Invalid` type is an ordinary member of the set: a field is allowed
//! to store a broken formula, and the reason string is surfaced verbatim
//! to end users.
//!
//! [`TypeClass`] is the companion set of type *families* used by function
//! argument checkers. Keeping it a closed enum keeps the whole checker
//! exhaustive-matchable; adding a family is a compile-time-checked change.

use std::fmt;

use crate::field::{FieldId, TableId};

/// The resolved type of a formula expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaType {
    /// A node that has not been through the type checker yet.
    Untyped,
    /// A broken formula. The reason is the exact error text shown to users.
    Invalid {
        /// Human-readable explanation, stable wording.
        reason: String,
    },
    /// Text value.
    Text,
    /// Numeric value.
    Number {
        /// Number of decimal places used when the value is cast to text.
        decimal_places: u8,
        /// Whether negative values are representable in this field.
        allow_negative: bool,
    },
    /// Boolean value.
    Boolean,
    /// Date, optionally with a time component.
    Date {
        /// Whether a time-of-day component is present.
        include_time: bool,
        /// IANA timezone name, if the field is timezone aware.
        timezone: Option<String>,
    },
    /// Duration between two dates.
    DateInterval,
    /// One option out of a fixed set.
    SingleSelect,
    /// A list of values of one inner type.
    Array(Box<FormulaType>),
    /// A reference reaching a field on another table through a link field.
    Lookup {
        /// The link field the lookup traverses.
        through_field: FieldId,
        /// The type of the looked-up field.
        target: Box<FormulaType>,
    },
    /// A link-row field itself.
    Link {
        /// The table the link points at.
        target_table: TableId,
    },
}

impl FormulaType {
    /// Plain number type with default formatting.
    pub fn number() -> Self {
        FormulaType::Number {
            decimal_places: 0,
            allow_negative: true,
        }
    }

    /// Invalid type carrying `reason`.
    pub fn invalid(reason: impl Into<String>) -> Self {
        FormulaType::Invalid {
            reason: reason.into(),
        }
    }

    /// Whether this is the `Invalid` variant.
    pub fn is_invalid(&self) -> bool {
        matches!(self, FormulaType::Invalid { .. })
    }

    /// The invalid reason, if this is the `Invalid` variant.
    pub fn invalid_reason(&self) -> Option<&str> {
        match self {
            FormulaType::Invalid { reason } => Some(reason),
            _ => None,
        }
    }

    /// Stable lowercase name used verbatim in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            FormulaType::Untyped => "untyped",
            FormulaType::Invalid { .. } => "invalid",
            FormulaType::Text => "text",
            FormulaType::Number { .. } => "number",
            FormulaType::Boolean => "boolean",
            FormulaType::Date { .. } => "date",
            FormulaType::DateInterval => "date interval",
            FormulaType::SingleSelect => "single select",
            FormulaType::Array(_) => "array",
            FormulaType::Lookup { .. } => "lookup",
            FormulaType::Link { .. } => "link",
        }
    }
}

impl fmt::Display for FormulaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A family of formula types, used by per-argument checkers.
///
/// A function declares, per argument position, the set of classes it
/// accepts. `Any` accepts every concrete type (but never `Invalid` or
/// `Untyped`, which the checker filters out before dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Text,
    Number,
    Boolean,
    Date,
    DateInterval,
    SingleSelect,
    Array,
    Link,
    Any,
}

impl TypeClass {
    /// Whether `ty` belongs to this family.
    ///
    /// A `Lookup` satisfies `Array`: a lookup reference produces the list
    /// of values reached through its link field.
    pub fn matches(&self, ty: &FormulaType) -> bool {
        match self {
            TypeClass::Text => {
                matches!(ty, FormulaType::Text | FormulaType::SingleSelect)
            }
            TypeClass::Number => matches!(ty, FormulaType::Number { .. }),
            TypeClass::Boolean => matches!(ty, FormulaType::Boolean),
            TypeClass::Date => matches!(ty, FormulaType::Date { .. }),
            TypeClass::DateInterval => matches!(ty, FormulaType::DateInterval),
            TypeClass::SingleSelect => matches!(ty, FormulaType::SingleSelect),
            TypeClass::Array => {
                matches!(ty, FormulaType::Array(_) | FormulaType::Lookup { .. })
            }
            TypeClass::Link => matches!(ty, FormulaType::Link { .. }),
            TypeClass::Any => !matches!(
                ty,
                FormulaType::Invalid { .. } | FormulaType::Untyped
            ),
        }
    }

    /// Stable lowercase name used verbatim in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            TypeClass::Text => "text",
            TypeClass::Number => "number",
            TypeClass::Boolean => "boolean",
            TypeClass::Date => "date",
            TypeClass::DateInterval => "date interval",
            TypeClass::SingleSelect => "single select",
            TypeClass::Array => "array",
            TypeClass::Link => "link",
            TypeClass::Any => "any",
        }
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A runtime value: a literal in a formula, or a cell value in a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Empty cell / undefined result.
    Null,
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Values collected through a lookup traversal.
    Array(Vec<Value>),
}

impl Value {
    /// The natural formula type of this value.
    ///
    /// Numbers carry default formatting; the checker refines formatting
    /// from field metadata where one is available.
    pub fn natural_type(&self) -> FormulaType {
        match self {
            Value::Null => FormulaType::Text,
            Value::Text(_) => FormulaType::Text,
            Value::Number(_) => FormulaType::number(),
            Value::Boolean(_) => FormulaType::Boolean,
            Value::Array(values) => FormulaType::Array(Box::new(
                values
                    .first()
                    .map(Value::natural_type)
                    .unwrap_or(FormulaType::Text),
            )),
        }
    }

    /// Whether the value is blank: null, empty text or an empty array.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(t) => t.is_empty(),
            Value::Array(v) => v.is_empty(),
            _ => false,
        }
    }
}
