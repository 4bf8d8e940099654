//! Rendering of JSON values into the wire value format the `golem` CLI
//! parses for invocation arguments.
//!
//! Untyped grammar:
//! - `null`, `true`/`false`, numbers as printed by `serde_json`
//! - strings in double quotes with `\`, `"` and control characters escaped
//! - lists as `[a, b]`, objects as `{key: value}` in insertion order
//!
//! A [`TypeDescriptor`] only changes two things: declared enum cases are
//! written as bare identifiers, and absent options as `none`. Every other
//! kind keeps the untyped grammar, with the type threaded down so nested
//! enums and options are still recognized. Encoding never fails; a value
//! whose shape contradicts its type is rendered untyped.

use golem_desk_types::{ComponentExportFunction, TypeDescriptor};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// How the enclosing type constrains an untyped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeContext {
    #[default]
    Plain,
    /// Strings are enum cases and are written without quotes.
    Enum,
    /// `null` means the option is unset and is written as `none`.
    Option,
}

/// Encode without type information.
pub fn encode(value: &Value) -> String {
    encode_with(value, EncodeContext::Plain)
}

/// Encode without type information, but with the context of the enclosing
/// type. The context applies to `value` itself, not to its children.
pub fn encode_with(value: &Value, cx: EncodeContext) -> String {
    let mut out = String::new();
    write_untyped(&mut out, Some(value), cx);
    out
}

/// Encode `value` guided by `typ`.
pub fn encode_typed(value: &Value, typ: &TypeDescriptor) -> String {
    let mut out = String::new();
    write_typed(&mut out, Some(value), typ);
    out
}

/// Encode one argument per parameter of `function`, in parameter order.
///
/// Parameters missing from `args` are encoded as absent (`none` for
/// options, `null` otherwise).
pub fn encode_args(function: &ComponentExportFunction, args: &IndexMap<String, Value>) -> Vec<String> {
    function
        .parameters
        .iter()
        .map(|p| {
            let mut out = String::new();
            write_typed(&mut out, args.get(&p.name), &p.typ);
            out
        })
        .collect()
}

fn write_untyped(out: &mut String, value: Option<&Value>, cx: EncodeContext) {
    match value {
        None | Some(Value::Null) => out.push_str(match cx {
            EncodeContext::Option => "none",
            _ => "null",
        }),
        Some(Value::Bool(b)) => out.push_str(if *b { "true" } else { "false" }),
        Some(Value::Number(n)) => out.push_str(&n.to_string()),
        Some(Value::String(s)) => match cx {
            EncodeContext::Enum => out.push_str(s),
            _ => write_quoted(out, s),
        },
        Some(Value::Array(items)) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_untyped(out, Some(item), EncodeContext::Plain);
            }
            out.push(']');
        }
        Some(Value::Object(map)) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(key);
                out.push_str(": ");
                write_untyped(out, Some(item), EncodeContext::Plain);
            }
            out.push('}');
        }
    }
}

fn write_typed(out: &mut String, value: Option<&Value>, typ: &TypeDescriptor) {
    match (typ, value) {
        (TypeDescriptor::Option(_), None | Some(Value::Null)) => out.push_str("none"),
        (TypeDescriptor::Option(inner), Some(v)) => write_typed(out, Some(v), inner),
        (TypeDescriptor::Enum(cases), Some(Value::String(case))) if cases.contains(case) => {
            out.push_str(case)
        }
        (TypeDescriptor::List(element), Some(Value::Array(items))) => {
            write_list(out, items, move |_| Some(&**element))
        }
        (TypeDescriptor::Tuple(elements), Some(Value::Array(items))) => {
            write_list(out, items, move |i| elements.get(i))
        }
        (TypeDescriptor::Record(fields), Some(Value::Object(map))) => write_object(out, map, move |key| {
            fields.iter().find(|f| f.name == key).map(|f| &f.typ)
        }),
        (TypeDescriptor::Variant(cases), Some(Value::Object(map))) => write_object(out, map, move |key| {
            cases
                .iter()
                .find(|c| c.name == key)
                .and_then(|c| c.typ.as_ref())
        }),
        (TypeDescriptor::Result { ok, err }, Some(Value::Object(map))) => {
            write_object(out, map, move |key| match key {
                "ok" => ok.as_deref(),
                "err" => err.as_deref(),
                _ => None,
            })
        }
        (TypeDescriptor::Flags(_), Some(Value::Array(_))) => {
            write_untyped(out, value, EncodeContext::Plain)
        }
        (TypeDescriptor::Unknown(kind), _) => {
            tracing::warn!(kind = %kind, "no encoding for unknown type kind, writing untyped value");
            write_untyped(out, value, EncodeContext::Plain);
        }
        (
            TypeDescriptor::Str
            | TypeDescriptor::Chr
            | TypeDescriptor::Bool
            | TypeDescriptor::S8
            | TypeDescriptor::S16
            | TypeDescriptor::S32
            | TypeDescriptor::S64
            | TypeDescriptor::U8
            | TypeDescriptor::U16
            | TypeDescriptor::U32
            | TypeDescriptor::U64
            | TypeDescriptor::F32
            | TypeDescriptor::F64,
            Some(Value::String(_) | Value::Bool(_) | Value::Number(_)),
        ) => write_untyped(out, value, EncodeContext::Plain),
        _ => mismatched(out, value, typ),
    }
}

/// `[a, b]`, typing the element at each index with `element_type(index)`.
fn write_list<'t>(
    out: &mut String,
    items: &[Value],
    element_type: impl Fn(usize) -> Option<&'t TypeDescriptor>,
) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_entry(out, item, element_type(i));
    }
    out.push(']');
}

/// `{key: value}` in insertion order, typing each entry with
/// `entry_type(key)`. Entries without a type are written untyped.
fn write_object<'t>(
    out: &mut String,
    map: &Map<String, Value>,
    entry_type: impl Fn(&str) -> Option<&'t TypeDescriptor>,
) {
    out.push('{');
    for (i, (key, item)) in map.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(key);
        out.push_str(": ");
        write_entry(out, item, entry_type(key));
    }
    out.push('}');
}

fn write_entry(out: &mut String, item: &Value, typ: Option<&TypeDescriptor>) {
    match typ {
        Some(t) => write_typed(out, Some(item), t),
        None => write_untyped(out, Some(item), EncodeContext::Plain),
    }
}

fn mismatched(out: &mut String, value: Option<&Value>, typ: &TypeDescriptor) {
    tracing::warn!(
        expected = %typ,
        "value does not match its declared type, writing untyped value"
    );
    write_untyped(out, value, EncodeContext::Plain);
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}
