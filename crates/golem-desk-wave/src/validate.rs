//! Structural validation of edited JSON values against a [`TypeDescriptor`].
//!
//! Validation stops at the first problem. Nested positions are named by
//! path (`order.qty`, `items[2]`, `choice.Foo`) so the message always points
//! at the offending field. The `Display` text of [`ValidationError`] is shown
//! to users verbatim.

use golem_desk_types::{IntegerRange, TypeDescriptor};
use serde_json::{Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field '{field}' expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: &'static str,
    },
    #[error("field '{field}' expected {signedness} {bits}-bit integer, got non-integer number {value}")]
    NotAnInteger {
        field: String,
        signedness: &'static str,
        bits: u32,
        value: String,
    },
    #[error(
        "field '{field}' value {value} is out of range for {signedness} {bits}-bit integer ({min}..={max})"
    )]
    OutOfRange {
        field: String,
        value: String,
        signedness: &'static str,
        bits: u32,
        min: i128,
        max: i128,
    },
    #[error("field '{field}' expected tuple of {expected} elements, got {actual}")]
    TupleLength {
        field: String,
        expected: usize,
        actual: usize,
    },
    #[error("field '{field}' contains unknown flag {flag} (allowed: {allowed})")]
    UnknownFlag {
        field: String,
        flag: String,
        allowed: String,
    },
    #[error("field '{field}' has invalid enum value {value} (allowed: {allowed})")]
    UnknownEnumCase {
        field: String,
        value: String,
        allowed: String,
    },
    #[error("field '{field}' has unknown variant case '{case}' (allowed: {allowed})")]
    UnknownVariantCase {
        field: String,
        case: String,
        allowed: String,
    },
    #[error("field '{field}' expected exactly one variant case, got {keys}")]
    VariantShape { field: String, keys: usize },
    #[error("field '{field}' has unsupported type kind '{kind}'")]
    UnsupportedKind { field: String, kind: String },
}

impl ValidationError {
    /// Path of the field the error is about.
    pub fn field(&self) -> &str {
        match self {
            Self::TypeMismatch { field, .. }
            | Self::NotAnInteger { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::TupleLength { field, .. }
            | Self::UnknownFlag { field, .. }
            | Self::UnknownEnumCase { field, .. }
            | Self::UnknownVariantCase { field, .. }
            | Self::VariantShape { field, .. }
            | Self::UnsupportedKind { field, .. } => field,
        }
    }
}

/// Check `value` against `typ`. `field` names the value in error messages.
pub fn validate(value: &Value, typ: &TypeDescriptor, field: &str) -> Result<(), ValidationError> {
    validate_opt(Some(value), typ, field)
}

/// Like [`validate`], with `None` standing for an absent value (a record
/// field that is not present at all). Absence is only accepted for options.
pub fn validate_opt(
    value: Option<&Value>,
    typ: &TypeDescriptor,
    field: &str,
) -> Result<(), ValidationError> {
    match typ {
        TypeDescriptor::Str | TypeDescriptor::Chr => match value {
            Some(Value::String(_)) => Ok(()),
            other => Err(mismatch(field, "string", other)),
        },
        TypeDescriptor::Bool => match value {
            Some(Value::Bool(_)) => Ok(()),
            other => Err(mismatch(field, "boolean", other)),
        },
        TypeDescriptor::F32 | TypeDescriptor::F64 => match value {
            Some(Value::Number(_)) => Ok(()),
            other => Err(mismatch(field, "number", other)),
        },
        TypeDescriptor::S8
        | TypeDescriptor::S16
        | TypeDescriptor::S32
        | TypeDescriptor::S64
        | TypeDescriptor::U8
        | TypeDescriptor::U16
        | TypeDescriptor::U32
        | TypeDescriptor::U64 => {
            let Some(range) = typ.integer_range() else {
                return Err(unsupported(field, typ));
            };
            check_integer(value, range, field)
        }
        TypeDescriptor::Option(inner) => match value {
            None | Some(Value::Null) => Ok(()),
            Some(v) => validate(v, inner, field),
        },
        TypeDescriptor::List(element) => match value {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| validate(item, element, &format!("{field}[{i}]"))),
            other => Err(mismatch(field, "list", other)),
        },
        TypeDescriptor::Tuple(elements) => match value {
            Some(Value::Array(items)) => {
                if items.len() != elements.len() {
                    return Err(ValidationError::TupleLength {
                        field: field.to_string(),
                        expected: elements.len(),
                        actual: items.len(),
                    });
                }
                items
                    .iter()
                    .zip(elements)
                    .enumerate()
                    .try_for_each(|(i, (item, t))| validate(item, t, &format!("{field}[{i}]")))
            }
            other => Err(mismatch(field, "list", other)),
        },
        TypeDescriptor::Record(fields) => match value {
            Some(Value::Object(map)) => fields.iter().try_for_each(|f| {
                validate_opt(map.get(&f.name), &f.typ, &format!("{field}.{}", f.name))
            }),
            other => Err(mismatch(field, "object", other)),
        },
        TypeDescriptor::Flags(names) => match value {
            Some(Value::Array(items)) => {
                if names.is_empty() {
                    return Ok(());
                }
                for item in items {
                    let known = item.as_str().is_some_and(|s| names.iter().any(|n| n == s));
                    if !known {
                        return Err(ValidationError::UnknownFlag {
                            field: field.to_string(),
                            flag: item.to_string(),
                            allowed: names.join(", "),
                        });
                    }
                }
                Ok(())
            }
            other => Err(mismatch(field, "list", other)),
        },
        TypeDescriptor::Enum(cases) => {
            let known = value
                .and_then(Value::as_str)
                .is_some_and(|s| cases.iter().any(|c| c == s));
            if known {
                Ok(())
            } else {
                Err(ValidationError::UnknownEnumCase {
                    field: field.to_string(),
                    value: value.map_or_else(|| "undefined".to_string(), Value::to_string),
                    allowed: cases.join(", "),
                })
            }
        }
        TypeDescriptor::Variant(cases) => {
            let map = match value {
                Some(Value::Object(map)) => map,
                other => return Err(mismatch(field, "object", other)),
            };
            let mut entries = map.iter();
            let (case_name, payload) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => {
                    return Err(ValidationError::VariantShape {
                        field: field.to_string(),
                        keys: map.len(),
                    });
                }
            };
            let Some(case) = cases.iter().find(|c| &c.name == case_name) else {
                return Err(ValidationError::UnknownVariantCase {
                    field: field.to_string(),
                    case: case_name.clone(),
                    allowed: cases
                        .iter()
                        .map(|c| c.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            };
            let path = format!("{field}.{case_name}");
            match &case.typ {
                Some(t) => validate(payload, t, &path),
                None if payload.is_null() => Ok(()),
                None => Err(mismatch(&path, "null (case has no payload)", Some(payload))),
            }
        }
        TypeDescriptor::Result { ok, .. } => {
            let map = match value {
                Some(Value::Object(map)) => map,
                other => return Err(mismatch(field, "object", other)),
            };
            match (map.get("ok"), ok) {
                (None | Some(Value::Null), _) => {}
                (Some(ok_value), Some(ok_type)) => {
                    validate(ok_value, ok_type, &format!("{field}.ok"))?
                }
                (Some(ok_value), None) => {
                    return Err(mismatch(
                        &format!("{field}.ok"),
                        "null (ok has no payload)",
                        Some(ok_value),
                    ));
                }
            }
            match map.get("err") {
                None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
                other => Err(mismatch(&format!("{field}.err"), "string", other)),
            }
        }
        TypeDescriptor::Unknown(_) => Err(unsupported(field, typ)),
    }
}

fn check_integer(
    value: Option<&Value>,
    range: IntegerRange,
    field: &str,
) -> Result<(), ValidationError> {
    let Some(Value::Number(n)) = value else {
        return Err(mismatch(
            field,
            &format!("{} {}-bit integer", range.signedness(), range.bits),
            value,
        ));
    };
    let Some(int) = integer_value(n) else {
        return Err(ValidationError::NotAnInteger {
            field: field.to_string(),
            signedness: range.signedness(),
            bits: range.bits,
            value: n.to_string(),
        });
    };
    if range.contains(int) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: n.to_string(),
            signedness: range.signedness(),
            bits: range.bits,
            min: range.min,
            max: range.max,
        })
    }
}

/// Integral value of a JSON number. Floats count when they have no
/// fractional part (`3.0`); huge floats saturate and fail the range check.
fn integer_value(n: &Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(i128::from(u));
    }
    n.as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| f as i128)
}

fn mismatch(field: &str, expected: &str, actual: Option<&Value>) -> ValidationError {
    ValidationError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        actual: describe(actual),
    }
}

fn unsupported(field: &str, typ: &TypeDescriptor) -> ValidationError {
    ValidationError::UnsupportedKind {
        field: field.to_string(),
        kind: typ.kind().to_string(),
    }
}

/// Observed kind of a JSON value, as it appears in error messages.
fn describe(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "list",
        Some(Value::Object(_)) => "object",
    }
}
