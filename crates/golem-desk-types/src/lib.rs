//! Structural type model for golem-desk.
//!
//! The types here mirror the analysed-type metadata Golem reports for the
//! exports of a component, and are used for:
//! - seeding argument editors with skeleton values
//! - validating user-edited JSON before it is encoded
//! - choosing the wire-value encoding of each invocation argument
//!
//! Descriptors arrive either as JSON metadata (see [`parse_type`]) or as
//! WIT-like signature strings (see [`parse_signature`]).

mod metadata;
mod signature;

pub use metadata::{MetadataError, parse_component_exports, parse_export_function, parse_type};
pub use signature::{SignatureError, parse_signature, parse_type_str};

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Recursive description of the shape of a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Bool,
    Chr,
    Str,
    S8,
    S16,
    S32,
    S64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    List(Box<TypeDescriptor>),
    Option(Box<TypeDescriptor>),
    Tuple(Vec<TypeDescriptor>),
    Record(Vec<NamedType>),
    Variant(Vec<VariantCase>),
    Enum(Vec<String>),
    Flags(Vec<String>),
    /// `None` on either side means the unit type.
    Result {
        ok: Option<Box<TypeDescriptor>>,
        err: Option<Box<TypeDescriptor>>,
    },
    /// A discriminator outside the known vocabulary.
    ///
    /// Only produced when parsing external metadata; the payload is the
    /// normalized (lower-case) kind name.
    Unknown(String),
}

/// A record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedType {
    pub name: String,
    pub typ: TypeDescriptor,
}

/// A variant case. `typ` is `None` for cases without a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCase {
    pub name: String,
    pub typ: Option<TypeDescriptor>,
}

/// Inclusive bounds of an integer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerRange {
    pub signed: bool,
    pub bits: u32,
    pub min: i128,
    pub max: i128,
}

impl IntegerRange {
    fn unsigned(bits: u32) -> Self {
        Self {
            signed: false,
            bits,
            min: 0,
            max: (1i128 << bits) - 1,
        }
    }

    fn signed(bits: u32) -> Self {
        Self {
            signed: true,
            bits,
            min: -(1i128 << (bits - 1)),
            max: (1i128 << (bits - 1)) - 1,
        }
    }

    pub fn contains(&self, n: i128) -> bool {
        n >= self.min && n <= self.max
    }

    /// `"signed"` or `"unsigned"`.
    pub fn signedness(&self) -> &'static str {
        if self.signed { "signed" } else { "unsigned" }
    }
}

impl TypeDescriptor {
    pub fn list(element: TypeDescriptor) -> Self {
        Self::List(Box::new(element))
    }

    pub fn option(inner: TypeDescriptor) -> Self {
        Self::Option(Box::new(inner))
    }

    pub fn record<N: Into<String>>(fields: impl IntoIterator<Item = (N, TypeDescriptor)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(name, typ)| NamedType {
                    name: name.into(),
                    typ,
                })
                .collect(),
        )
    }

    pub fn variant<N: Into<String>>(
        cases: impl IntoIterator<Item = (N, Option<TypeDescriptor>)>,
    ) -> Self {
        Self::Variant(
            cases
                .into_iter()
                .map(|(name, typ)| VariantCase {
                    name: name.into(),
                    typ,
                })
                .collect(),
        )
    }

    pub fn enumeration<N: Into<String>>(cases: impl IntoIterator<Item = N>) -> Self {
        Self::Enum(cases.into_iter().map(Into::into).collect())
    }

    pub fn flags<N: Into<String>>(names: impl IntoIterator<Item = N>) -> Self {
        Self::Flags(names.into_iter().map(Into::into).collect())
    }

    pub fn result(ok: Option<TypeDescriptor>, err: Option<TypeDescriptor>) -> Self {
        Self::Result {
            ok: ok.map(Box::new),
            err: err.map(Box::new),
        }
    }

    /// Canonical lower-case kind name.
    pub fn kind(&self) -> &str {
        match self {
            Self::Bool => "bool",
            Self::Chr => "chr",
            Self::Str => "str",
            Self::S8 => "s8",
            Self::S16 => "s16",
            Self::S32 => "s32",
            Self::S64 => "s64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::List(_) => "list",
            Self::Option(_) => "option",
            Self::Tuple(_) => "tuple",
            Self::Record(_) => "record",
            Self::Variant(_) => "variant",
            Self::Enum(_) => "enum",
            Self::Flags(_) => "flags",
            Self::Result { .. } => "result",
            Self::Unknown(kind) => kind,
        }
    }

    /// Bounds for integer kinds, `None` for everything else.
    pub fn integer_range(&self) -> Option<IntegerRange> {
        match self {
            Self::S8 => Some(IntegerRange::signed(8)),
            Self::S16 => Some(IntegerRange::signed(16)),
            Self::S32 => Some(IntegerRange::signed(32)),
            Self::S64 => Some(IntegerRange::signed(64)),
            Self::U8 => Some(IntegerRange::unsigned(8)),
            Self::U16 => Some(IntegerRange::unsigned(16)),
            Self::U32 => Some(IntegerRange::unsigned(32)),
            Self::U64 => Some(IntegerRange::unsigned(64)),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    /// Renders WIT syntax, e.g. `record { qty: u32, tags: list<string> }`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Chr => f.write_str("char"),
            Self::Str => f.write_str("string"),
            Self::List(element) => write!(f, "list<{element}>"),
            Self::Option(inner) => write!(f, "option<{inner}>"),
            Self::Tuple(elements) => {
                f.write_str("tuple<")?;
                write_joined(f, elements, |f, t| write!(f, "{t}"))?;
                f.write_str(">")
            }
            Self::Record(fields) => {
                f.write_str("record { ")?;
                write_joined(f, fields, |f, field| write!(f, "{}: {}", field.name, field.typ))?;
                f.write_str(" }")
            }
            Self::Variant(cases) => {
                f.write_str("variant { ")?;
                write_joined(f, cases, |f, case| match &case.typ {
                    Some(t) => write!(f, "{}({t})", case.name),
                    None => f.write_str(&case.name),
                })?;
                f.write_str(" }")
            }
            Self::Enum(cases) => {
                f.write_str("enum { ")?;
                write_joined(f, cases, |f, c| f.write_str(c))?;
                f.write_str(" }")
            }
            Self::Flags(names) => {
                f.write_str("flags { ")?;
                write_joined(f, names, |f, n| f.write_str(n))?;
                f.write_str(" }")
            }
            Self::Result { ok, err } => match (ok, err) {
                (None, None) => f.write_str("result"),
                (Some(ok), None) => write!(f, "result<{ok}>"),
                (None, Some(err)) => write!(f, "result<_, {err}>"),
                (Some(ok), Some(err)) => write!(f, "result<{ok}, {err}>"),
            },
            other => f.write_str(other.kind()),
        }
    }
}

fn write_joined<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    mut each: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        each(f, item)?;
    }
    Ok(())
}

impl<'de> Deserialize<'de> for TypeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        parse_type(&raw).map_err(serde::de::Error::custom)
    }
}

/// A named parameter of an exported function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportParameter {
    pub name: String,
    pub typ: TypeDescriptor,
}

/// An exported function: its (possibly instance-qualified) name, parameters
/// in declaration order, and unnamed results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentExportFunction {
    pub name: String,
    pub parameters: Vec<ExportParameter>,
    pub results: Vec<TypeDescriptor>,
}

impl ComponentExportFunction {
    pub fn parameter(&self, name: &str) -> Option<&ExportParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

impl fmt::Display for ComponentExportFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        write_joined(f, &self.parameters, |f, p| write!(f, "{}: {}", p.name, p.typ))?;
        f.write_str(")")?;
        match self.results.as_slice() {
            [] => Ok(()),
            [single] => write!(f, " -> {single}"),
            many => {
                f.write_str(" -> (")?;
                write_joined(f, many, |f, t| write!(f, "{t}"))?;
                f.write_str(")")
            }
        }
    }
}

impl<'de> Deserialize<'de> for ComponentExportFunction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        parse_export_function(&raw).map_err(serde::de::Error::custom)
    }
}
