//! Default values used to seed argument editors.

use golem_desk_types::{ComponentExportFunction, TypeDescriptor};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Cases of the conventional priority enum. When an enum declares exactly
/// these three (in any order) the skeleton is `"low"` rather than the first
/// declared case.
const PRIORITY_CASES: [&str; 3] = ["low", "medium", "high"];

/// Produce a minimal value of the shape described by `typ`.
///
/// - strings and chars are `""`, booleans `false`, numbers `0`
/// - lists are empty and options are `null`
/// - records get one entry per field, tuples one element per position
/// - enums, flags and variants pick their first declared case
/// - results are `{"ok": .., "err": ..}` with a placeholder error
///
/// Total over every descriptor; unknown kinds yield `null`.
pub fn skeleton(typ: &TypeDescriptor) -> Value {
    match typ {
        TypeDescriptor::Str | TypeDescriptor::Chr => Value::String(String::new()),
        TypeDescriptor::Bool => Value::Bool(false),
        TypeDescriptor::S8
        | TypeDescriptor::S16
        | TypeDescriptor::S32
        | TypeDescriptor::S64
        | TypeDescriptor::U8
        | TypeDescriptor::U16
        | TypeDescriptor::U32
        | TypeDescriptor::U64
        | TypeDescriptor::F32
        | TypeDescriptor::F64 => Value::from(0),
        TypeDescriptor::List(_) => Value::Array(Vec::new()),
        TypeDescriptor::Option(_) => Value::Null,
        TypeDescriptor::Tuple(elements) => Value::Array(elements.iter().map(skeleton).collect()),
        TypeDescriptor::Record(fields) => Value::Object(
            fields
                .iter()
                .map(|f| (f.name.clone(), skeleton(&f.typ)))
                .collect(),
        ),
        TypeDescriptor::Flags(names) => Value::Array(
            names
                .first()
                .map(|n| Value::String(n.clone()))
                .into_iter()
                .collect(),
        ),
        TypeDescriptor::Enum(cases) => default_enum_case(cases)
            .map(Value::from)
            .unwrap_or(Value::Null),
        TypeDescriptor::Variant(cases) => match cases.first() {
            Some(case) => {
                let payload = case.typ.as_ref().map(skeleton).unwrap_or(Value::Null);
                let mut entry = Map::new();
                entry.insert(case.name.clone(), payload);
                Value::Object(entry)
            }
            None => Value::Null,
        },
        TypeDescriptor::Result { ok, err } => {
            let mut entry = Map::new();
            entry.insert(
                "ok".to_string(),
                ok.as_deref().map(skeleton).unwrap_or(Value::Null),
            );
            entry.insert("err".to_string(), error_placeholder(err.as_deref()));
            Value::Object(entry)
        }
        TypeDescriptor::Unknown(_) => Value::Null,
    }
}

fn default_enum_case(cases: &[String]) -> Option<&str> {
    let is_priority = cases.len() == PRIORITY_CASES.len()
        && PRIORITY_CASES
            .iter()
            .all(|p| cases.iter().any(|c| c == p));
    if is_priority {
        return Some(PRIORITY_CASES[0]);
    }
    cases.first().map(String::as_str)
}

/// Error payloads are edited as plain strings; for enum errors the
/// placeholder lists the declared cases.
fn error_placeholder(err: Option<&TypeDescriptor>) -> Value {
    match err {
        Some(TypeDescriptor::Enum(cases)) if !cases.is_empty() => Value::String(cases.join(" | ")),
        _ => Value::String(String::new()),
    }
}

/// Skeletons for every parameter of `function`, keyed by parameter name in
/// declaration order.
pub fn skeleton_args(function: &ComponentExportFunction) -> IndexMap<String, Value> {
    function
        .parameters
        .iter()
        .map(|p| (p.name.clone(), skeleton(&p.typ)))
        .collect()
}
