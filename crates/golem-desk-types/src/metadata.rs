//! Parsing of JSON export metadata into [`TypeDescriptor`]s.
//!
//! Golem reports analysed types with capitalized discriminators (`Str`,
//! `U32`, `Record`), while hand-written descriptors tend to use lower case.
//! Discriminators are matched case-insensitively here so the rest of the
//! workspace only ever sees the canonical enum.

use crate::{ComponentExportFunction, ExportParameter, NamedType, TypeDescriptor, VariantCase};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("type descriptor has no 'type' or 'kind' discriminator")]
    MissingKind,
    #[error("{kind} type is missing required field '{field}'")]
    MissingField { kind: String, field: String },
    #[error("{kind} type has invalid '{field}': {message}")]
    InvalidField {
        kind: String,
        field: String,
        message: String,
    },
    #[error("{kind} type declares '{name}' more than once")]
    DuplicateName { kind: String, name: String },
    #[error("invalid export function: {0}")]
    InvalidFunction(String),
    #[error("invalid export signature: {0}")]
    Signature(#[from] crate::SignatureError),
}

/// Parse a JSON type descriptor.
///
/// A bare string is accepted for payload-free kinds (`"u32"`, `"Str"`).
pub fn parse_type(value: &Value) -> Result<TypeDescriptor, MetadataError> {
    let kind = match value {
        Value::String(kind) => kind.as_str(),
        Value::Object(_) => value
            .get("type")
            .or_else(|| value.get("kind"))
            .and_then(Value::as_str)
            .ok_or(MetadataError::MissingKind)?,
        _ => return Err(MetadataError::MissingKind),
    };
    let kind = kind.to_ascii_lowercase();

    if let Some(primitive) = primitive_kind(&kind) {
        return Ok(primitive);
    }

    let typ = match kind.as_str() {
        "list" => TypeDescriptor::List(Box::new(parse_type(required(
            value,
            &kind,
            &["inner", "element"],
        )?)?)),
        "option" => TypeDescriptor::Option(Box::new(parse_type(required(
            value,
            &kind,
            &["inner", "element"],
        )?)?)),
        "tuple" => {
            let items = required_array(value, &kind, &["items", "elements"])?;
            TypeDescriptor::Tuple(items.iter().map(parse_type).collect::<Result<_, _>>()?)
        }
        "record" => {
            let fields = required_array(value, &kind, &["fields"])?;
            let fields = fields
                .iter()
                .map(|field| {
                    let name = entry_name(field, &kind, "fields")?;
                    let typ = entry_type(field)
                        .ok_or_else(|| MetadataError::MissingField {
                            kind: kind.clone(),
                            field: format!("fields.{name}.typ"),
                        })
                        .and_then(parse_type)?;
                    Ok(NamedType { name, typ })
                })
                .collect::<Result<Vec<_>, MetadataError>>()?;
            ensure_unique(&kind, fields.iter().map(|f| f.name.as_str()))?;
            TypeDescriptor::Record(fields)
        }
        "variant" => {
            let cases = required_array(value, &kind, &["cases"])?;
            let cases = cases
                .iter()
                .map(|case| {
                    let name = entry_name(case, &kind, "cases")?;
                    let typ = entry_type(case)
                        .filter(|t| !t.is_null())
                        .map(parse_type)
                        .transpose()?;
                    Ok(VariantCase { name, typ })
                })
                .collect::<Result<Vec<_>, MetadataError>>()?;
            ensure_unique(&kind, cases.iter().map(|c| c.name.as_str()))?;
            ensure_cases(&kind, &cases)?;
            TypeDescriptor::Variant(cases)
        }
        "enum" => {
            let cases = name_list(value, &kind, "cases")?;
            ensure_cases(&kind, &cases)?;
            TypeDescriptor::Enum(cases)
        }
        "flags" => TypeDescriptor::Flags(name_list(value, &kind, "names")?),
        "result" => TypeDescriptor::Result {
            ok: optional_type(value, "ok")?,
            err: optional_type(value, "err")?,
        },
        _ => TypeDescriptor::Unknown(kind),
    };

    Ok(typ)
}

fn primitive_kind(kind: &str) -> Option<TypeDescriptor> {
    let t = match kind {
        "bool" | "boolean" => TypeDescriptor::Bool,
        "chr" | "char" | "character" => TypeDescriptor::Chr,
        "str" | "string" => TypeDescriptor::Str,
        "s8" | "i8" => TypeDescriptor::S8,
        "s16" | "i16" => TypeDescriptor::S16,
        "s32" | "i32" => TypeDescriptor::S32,
        "s64" | "i64" => TypeDescriptor::S64,
        "u8" => TypeDescriptor::U8,
        "u16" => TypeDescriptor::U16,
        "u32" => TypeDescriptor::U32,
        "u64" => TypeDescriptor::U64,
        "f32" | "float32" => TypeDescriptor::F32,
        "f64" | "float64" => TypeDescriptor::F64,
        _ => return None,
    };
    Some(t)
}

fn required<'a>(value: &'a Value, kind: &str, keys: &[&str]) -> Result<&'a Value, MetadataError> {
    keys.iter()
        .find_map(|k| value.get(*k))
        .ok_or_else(|| MetadataError::MissingField {
            kind: kind.to_string(),
            field: keys[0].to_string(),
        })
}

fn required_array<'a>(
    value: &'a Value,
    kind: &str,
    keys: &[&str],
) -> Result<&'a Vec<Value>, MetadataError> {
    required(value, kind, keys)?
        .as_array()
        .ok_or_else(|| MetadataError::InvalidField {
            kind: kind.to_string(),
            field: keys[0].to_string(),
            message: "expected an array".to_string(),
        })
}

fn entry_name(entry: &Value, kind: &str, field: &str) -> Result<String, MetadataError> {
    match entry.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(MetadataError::InvalidField {
            kind: kind.to_string(),
            field: field.to_string(),
            message: "every entry needs a non-empty 'name'".to_string(),
        }),
    }
}

/// Golem metadata nests the payload type under `typ`; hand-written
/// descriptors use `type`.
fn entry_type(entry: &Value) -> Option<&Value> {
    entry.get("typ").or_else(|| entry.get("type"))
}

fn name_list(value: &Value, kind: &str, field: &str) -> Result<Vec<String>, MetadataError> {
    let names = required_array(value, kind, &[field])?
        .iter()
        .map(|n| match n.as_str() {
            Some(s) if !s.is_empty() => Ok(s.to_string()),
            _ => Err(MetadataError::InvalidField {
                kind: kind.to_string(),
                field: field.to_string(),
                message: format!("expected non-empty strings, got {n}"),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    ensure_unique(kind, names.iter().map(String::as_str))?;
    Ok(names)
}

fn optional_type(
    value: &Value,
    field: &str,
) -> Result<Option<Box<TypeDescriptor>>, MetadataError> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(t) => Ok(Some(Box::new(parse_type(t)?))),
    }
}

fn ensure_unique<'a>(
    kind: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), MetadataError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(MetadataError::DuplicateName {
                kind: kind.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn ensure_cases<T>(kind: &str, cases: &[T]) -> Result<(), MetadataError> {
    if cases.is_empty() {
        return Err(MetadataError::InvalidField {
            kind: kind.to_string(),
            field: "cases".to_string(),
            message: "at least one case is required".to_string(),
        });
    }
    Ok(())
}

/// Parse one exported function.
///
/// Accepts either a signature string or an object of the form
/// `{name, parameters: [{name, typ}], results: [{name?, typ} | type]}`.
pub fn parse_export_function(value: &Value) -> Result<ComponentExportFunction, MetadataError> {
    if let Some(signature) = value.as_str() {
        return Ok(crate::parse_signature(signature)?);
    }

    let name = value
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| MetadataError::InvalidFunction("missing 'name'".to_string()))?
        .to_string();

    let params = value
        .get("parameters")
        .or_else(|| value.get("params"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let parameters = params
        .iter()
        .map(|p| {
            let pname = p
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    MetadataError::InvalidFunction(format!("{name}: parameter without a name"))
                })?;
            let typ = entry_type(p).ok_or_else(|| {
                MetadataError::InvalidFunction(format!("{name}: parameter '{pname}' has no type"))
            })?;
            Ok(ExportParameter {
                name: pname.to_string(),
                typ: parse_type(typ)?,
            })
        })
        .collect::<Result<Vec<_>, MetadataError>>()?;
    let mut seen = HashSet::new();
    if let Some(p) = parameters.iter().find(|p| !seen.insert(p.name.as_str())) {
        return Err(MetadataError::InvalidFunction(format!(
            "{name}: parameter '{}' is declared more than once",
            p.name
        )));
    }

    let results = value
        .get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|r| match entry_type(r) {
            Some(t) if r.get("name").is_some() || r.get("typ").is_some() => parse_type(t),
            _ => parse_type(r),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ComponentExportFunction {
        name,
        parameters,
        results,
    })
}

/// Parse every exported function of a component metadata document.
///
/// The document is either an array of exports or an object with an
/// `exports` array. Instance exports (`{name, functions: [...]}`) are
/// flattened and their functions qualified as `instance.{function}`.
pub fn parse_component_exports(
    value: &Value,
) -> Result<Vec<ComponentExportFunction>, MetadataError> {
    let exports = match value {
        Value::Array(items) => items.as_slice(),
        _ => value
            .get("exports")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| MetadataError::InvalidFunction("missing 'exports' array".to_string()))?,
    };

    let mut functions = Vec::new();
    for export in exports {
        match export.get("functions").and_then(Value::as_array) {
            Some(inner) => {
                let instance = export
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                for f in inner {
                    let mut function = parse_export_function(f)?;
                    if !instance.is_empty() {
                        function.name = format!("{instance}.{{{}}}", function.name);
                    }
                    functions.push(function);
                }
            }
            None => functions.push(parse_export_function(export)?),
        }
    }
    Ok(functions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn discriminators_are_case_insensitive() {
        for spelling in ["Str", "str", "STR", "string"] {
            assert_eq!(parse_type(&json!({ "type": spelling })).unwrap(), TypeDescriptor::Str);
        }
        assert_eq!(parse_type(&json!({ "kind": "u32" })).unwrap(), TypeDescriptor::U32);
        assert_eq!(parse_type(&json!("S64")).unwrap(), TypeDescriptor::S64);
    }

    #[test]
    fn parses_golem_analysed_record() {
        let t = parse_type(&json!({
            "type": "Record",
            "fields": [
                { "name": "qty", "typ": { "type": "U32" } },
                { "name": "priority", "typ": { "type": "Enum", "cases": ["low", "medium", "high"] } },
                { "name": "note", "typ": { "type": "Option", "inner": { "type": "Str" } } }
            ]
        }))
        .unwrap();
        assert_eq!(
            t,
            TypeDescriptor::record([
                ("qty", TypeDescriptor::U32),
                ("priority", TypeDescriptor::enumeration(["low", "medium", "high"])),
                ("note", TypeDescriptor::option(TypeDescriptor::Str)),
            ])
        );
    }

    #[test]
    fn accepts_alternate_payload_names() {
        let t = parse_type(&json!({
            "kind": "tuple",
            "elements": [{ "kind": "list", "element": { "kind": "bool" } }, { "kind": "f64" }]
        }))
        .unwrap();
        assert_eq!(
            t,
            TypeDescriptor::Tuple(vec![
                TypeDescriptor::list(TypeDescriptor::Bool),
                TypeDescriptor::F64
            ])
        );
    }

    #[test]
    fn variant_cases_without_payload_are_unit() {
        let t = parse_type(&json!({
            "type": "Variant",
            "cases": [{ "name": "Foo", "typ": { "type": "Str" } }, { "name": "Bar", "typ": null }, { "name": "Baz" }]
        }))
        .unwrap();
        assert_eq!(
            t,
            TypeDescriptor::variant([
                ("Foo", Some(TypeDescriptor::Str)),
                ("Bar", None),
                ("Baz", None)
            ])
        );
    }

    #[test]
    fn result_sides_are_optional() {
        let t = parse_type(&json!({ "type": "Result", "ok": null, "err": { "type": "Str" } })).unwrap();
        assert_eq!(t, TypeDescriptor::result(None, Some(TypeDescriptor::Str)));
    }

    #[test]
    fn unknown_kinds_are_kept_not_rejected() {
        let t = parse_type(&json!({ "type": "Handle" })).unwrap();
        assert_eq!(t, TypeDescriptor::Unknown("handle".to_string()));
    }

    #[test]
    fn missing_payload_is_an_error() {
        let err = parse_type(&json!({ "type": "Record" })).unwrap_err();
        assert_eq!(
            err,
            MetadataError::MissingField {
                kind: "record".to_string(),
                field: "fields".to_string()
            }
        );
        assert_eq!(parse_type(&json!({})).unwrap_err(), MetadataError::MissingKind);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = parse_type(&json!({ "type": "Enum", "cases": ["a", "b", "a"] })).unwrap_err();
        assert_eq!(err.to_string(), "enum type declares 'a' more than once");

        let err = parse_type(&json!({
            "type": "Record",
            "fields": [
                { "name": "a", "typ": { "type": "U8" } },
                { "name": "a", "typ": { "type": "Str" } }
            ]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "record type declares 'a' more than once");

        let err = parse_type(&json!({ "type": "Variant", "cases": [{ "name": "x" }, { "name": "x" }] }))
            .unwrap_err();
        assert_eq!(err.to_string(), "variant type declares 'x' more than once");

        let err = parse_type(&json!({ "type": "Flags", "names": ["r", "r"] })).unwrap_err();
        assert_eq!(err.to_string(), "flags type declares 'r' more than once");

        let err = parse_export_function(&json!({
            "name": "run",
            "parameters": [
                { "name": "a", "typ": { "type": "U8" } },
                { "name": "a", "typ": { "type": "Str" } }
            ]
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid export function: run: parameter 'a' is declared more than once"
        );
    }

    #[test]
    fn enums_and_variants_need_a_case() {
        for kind in ["Enum", "Variant"] {
            let err = parse_type(&json!({ "type": kind, "cases": [] })).unwrap_err();
            assert_eq!(
                err,
                MetadataError::InvalidField {
                    kind: kind.to_ascii_lowercase(),
                    field: "cases".to_string(),
                    message: "at least one case is required".to_string(),
                }
            );
        }
        assert_eq!(
            parse_type(&json!({ "type": "Flags", "names": [] })).unwrap(),
            TypeDescriptor::Flags(vec![])
        );
    }

    #[test]
    fn parses_export_function_object() {
        let f = parse_export_function(&json!({
            "name": "add-item",
            "parameters": [{ "name": "item", "typ": { "type": "Str" } }],
            "results": [{ "name": null, "typ": { "type": "U64" } }]
        }))
        .unwrap();
        assert_eq!(f.name, "add-item");
        assert_eq!(f.parameters[0].typ, TypeDescriptor::Str);
        assert_eq!(f.results, vec![TypeDescriptor::U64]);
    }

    #[test]
    fn flattens_instance_exports() {
        let functions = parse_component_exports(&json!({
            "exports": [
                {
                    "name": "golem:it/api",
                    "functions": [
                        { "name": "add", "parameters": [{ "name": "value", "typ": { "type": "U64" } }], "results": [] }
                    ]
                },
                "golem:it/api.{get}() -> u64"
            ]
        }))
        .unwrap();
        let names: Vec<_> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["golem:it/api.{add}", "golem:it/api.{get}"]);
        assert_eq!(functions[1].results, vec![TypeDescriptor::U64]);
    }
}
