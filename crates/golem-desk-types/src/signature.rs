//! Recursive-descent parser for WIT-like export signatures, e.g.
//! `golem:it/api.{add-item}(item: record { qty: u32 }) -> result<_, string>`.

use crate::{ComponentExportFunction, ExportParameter, NamedType, TypeDescriptor, VariantCase};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected} at offset {offset}, found {found}")]
pub struct SignatureError {
    pub offset: usize,
    pub expected: String,
    pub found: String,
}

/// Parse a full function signature.
pub fn parse_signature(src: &str) -> Result<ComponentExportFunction, SignatureError> {
    let mut p = Parser::new(src);
    let function = p.function()?;
    p.end()?;
    Ok(function)
}

/// Parse a single type, e.g. `list<option<u8>>`.
pub fn parse_type_str(src: &str) -> Result<TypeDescriptor, SignatureError> {
    let mut p = Parser::new(src);
    let typ = p.typ()?;
    p.end()?;
    Ok(typ)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), SignatureError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("'{token}'")))
        }
    }

    fn end(&mut self) -> Result<(), SignatureError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error("end of input")),
        }
    }

    fn error(&self, expected: impl Into<String>) -> SignatureError {
        let found = match self.rest().chars().next() {
            None => "end of input".to_string(),
            Some(_) => {
                let snippet: String = self.rest().chars().take(12).collect();
                format!("'{snippet}'")
            }
        };
        SignatureError {
            offset: self.pos,
            expected: expected.into(),
            found,
        }
    }

    fn ident(&mut self) -> Result<&'a str, SignatureError> {
        self.skip_ws();
        let rest = self.rest();
        let rest = rest.strip_prefix('%').unwrap_or(rest);
        let start = self.src.len() - rest.len();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("an identifier"));
        }
        self.pos = start + len;
        Ok(&self.src[start..start + len])
    }

    /// An identifier that is not already in `seen`.
    fn unique_ident(&mut self, seen: &mut HashSet<&'a str>) -> Result<&'a str, SignatureError> {
        self.skip_ws();
        let start = self.pos;
        let name = self.ident()?;
        if !seen.insert(name) {
            self.pos = start;
            return Err(self.error("a name not declared before"));
        }
        Ok(name)
    }

    fn function(&mut self) -> Result<ComponentExportFunction, SignatureError> {
        self.skip_ws();
        let name_len = self.rest().find('(').ok_or_else(|| self.error("'('"))?;
        let name = self.rest()[..name_len].trim_end().to_string();
        if name.is_empty() {
            return Err(self.error("a function name"));
        }
        self.pos += name_len;

        self.expect("(")?;
        let mut parameters = Vec::new();
        let mut seen = HashSet::new();
        if !self.eat(")") {
            loop {
                let pname = self.unique_ident(&mut seen)?.to_string();
                self.expect(":")?;
                let typ = self.typ()?;
                parameters.push(ExportParameter { name: pname, typ });
                if self.eat(")") {
                    break;
                }
                self.expect(",")?;
            }
        }

        let mut results = Vec::new();
        if self.eat("->") {
            if self.eat("(") {
                if !self.eat(")") {
                    loop {
                        results.push(self.result_entry()?);
                        if self.eat(")") {
                            break;
                        }
                        self.expect(",")?;
                    }
                }
            } else {
                results.push(self.typ()?);
            }
        }

        Ok(ComponentExportFunction {
            name,
            parameters,
            results,
        })
    }

    /// A result entry may be named (`sum: u64`); the name is dropped.
    fn result_entry(&mut self) -> Result<TypeDescriptor, SignatureError> {
        let checkpoint = self.pos;
        if self.ident().is_ok() && self.eat(":") {
            return self.typ();
        }
        self.pos = checkpoint;
        self.typ()
    }

    fn typ(&mut self) -> Result<TypeDescriptor, SignatureError> {
        let word = self.ident().map_err(|_| self.error("a type"))?;
        let typ = match word {
            "bool" => TypeDescriptor::Bool,
            "char" => TypeDescriptor::Chr,
            "string" => TypeDescriptor::Str,
            "s8" => TypeDescriptor::S8,
            "s16" => TypeDescriptor::S16,
            "s32" => TypeDescriptor::S32,
            "s64" => TypeDescriptor::S64,
            "u8" => TypeDescriptor::U8,
            "u16" => TypeDescriptor::U16,
            "u32" => TypeDescriptor::U32,
            "u64" => TypeDescriptor::U64,
            "f32" | "float32" => TypeDescriptor::F32,
            "f64" | "float64" => TypeDescriptor::F64,
            "list" => {
                self.expect("<")?;
                let element = self.typ()?;
                self.expect(">")?;
                TypeDescriptor::list(element)
            }
            "option" => {
                self.expect("<")?;
                let inner = self.typ()?;
                self.expect(">")?;
                TypeDescriptor::option(inner)
            }
            "tuple" => {
                self.expect("<")?;
                let mut elements = Vec::new();
                if !self.eat(">") {
                    loop {
                        elements.push(self.typ()?);
                        if self.eat(">") {
                            break;
                        }
                        self.expect(",")?;
                    }
                }
                TypeDescriptor::Tuple(elements)
            }
            "result" => self.result_type()?,
            "record" => {
                let mut seen = HashSet::new();
                let fields = self.braced(|p| {
                    let name = p.unique_ident(&mut seen)?.to_string();
                    p.expect(":")?;
                    let typ = p.typ()?;
                    Ok(NamedType { name, typ })
                })?;
                TypeDescriptor::Record(fields)
            }
            "variant" => {
                let mut seen = HashSet::new();
                let cases = self.non_empty(|p| {
                    let name = p.unique_ident(&mut seen)?.to_string();
                    let typ = if p.eat("(") {
                        let t = p.typ()?;
                        p.expect(")")?;
                        Some(t)
                    } else {
                        None
                    };
                    Ok(VariantCase { name, typ })
                })?;
                TypeDescriptor::Variant(cases)
            }
            "enum" => {
                let mut seen = HashSet::new();
                TypeDescriptor::Enum(self.non_empty(|p| Ok(p.unique_ident(&mut seen)?.to_string()))?)
            }
            "flags" => {
                let mut seen = HashSet::new();
                TypeDescriptor::Flags(self.braced(|p| Ok(p.unique_ident(&mut seen)?.to_string()))?)
            }
            other => TypeDescriptor::Unknown(other.to_ascii_lowercase()),
        };
        Ok(typ)
    }

    fn result_type(&mut self) -> Result<TypeDescriptor, SignatureError> {
        if !self.eat("<") {
            return Ok(TypeDescriptor::result(None, None));
        }
        let ok = if self.eat("_") {
            None
        } else {
            Some(self.typ()?)
        };
        let err = if self.eat(",") {
            Some(self.typ()?)
        } else {
            None
        };
        self.expect(">")?;
        Ok(TypeDescriptor::result(ok, err))
    }

    /// `{ item, item, ... }` with an optional trailing comma.
    fn braced<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, SignatureError>,
    ) -> Result<Vec<T>, SignatureError> {
        self.expect("{")?;
        let mut items = Vec::new();
        loop {
            if self.eat("}") {
                break;
            }
            items.push(item(self)?);
            if self.eat("}") {
                break;
            }
            self.expect(",")?;
        }
        Ok(items)
    }

    /// Like [`braced`](Self::braced), for enums and variants, which need at
    /// least one case.
    fn non_empty<T>(
        &mut self,
        item: impl FnMut(&mut Self) -> Result<T, SignatureError>,
    ) -> Result<Vec<T>, SignatureError> {
        self.skip_ws();
        let start = self.pos;
        let items = self.braced(item)?;
        if items.is_empty() {
            self.pos = start;
            return Err(self.error("at least one case"));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_primitives_and_containers() {
        assert_eq!(parse_type_str("u32").unwrap(), TypeDescriptor::U32);
        assert_eq!(
            parse_type_str("list<option<string>>").unwrap(),
            TypeDescriptor::list(TypeDescriptor::option(TypeDescriptor::Str))
        );
        assert_eq!(
            parse_type_str("tuple<u8, char>").unwrap(),
            TypeDescriptor::Tuple(vec![TypeDescriptor::U8, TypeDescriptor::Chr])
        );
    }

    #[test]
    fn parses_result_shorthands() {
        assert_eq!(
            parse_type_str("result").unwrap(),
            TypeDescriptor::result(None, None)
        );
        assert_eq!(
            parse_type_str("result<u32>").unwrap(),
            TypeDescriptor::result(Some(TypeDescriptor::U32), None)
        );
        assert_eq!(
            parse_type_str("result<_, string>").unwrap(),
            TypeDescriptor::result(None, Some(TypeDescriptor::Str))
        );
    }

    #[test]
    fn parses_named_structures() {
        let t = parse_type_str(
            "record { qty: u32, priority: enum { low, medium, high }, status: variant { done(u64), pending }, perms: flags { read, write, } }",
        )
        .unwrap();
        assert_eq!(
            t,
            TypeDescriptor::record([
                ("qty", TypeDescriptor::U32),
                ("priority", TypeDescriptor::enumeration(["low", "medium", "high"])),
                (
                    "status",
                    TypeDescriptor::variant([("done", Some(TypeDescriptor::U64)), ("pending", None)])
                ),
                ("perms", TypeDescriptor::flags(["read", "write"])),
            ])
        );
    }

    #[test]
    fn parses_full_signature() {
        let f = parse_signature("golem:it/api.{add-item}(item: record { qty: u32 }, tags: list<string>) -> result<_, string>")
            .unwrap();
        assert_eq!(f.name, "golem:it/api.{add-item}");
        assert_eq!(f.parameters.len(), 2);
        assert_eq!(f.parameters[1].name, "tags");
        assert_eq!(
            f.results,
            vec![TypeDescriptor::result(None, Some(TypeDescriptor::Str))]
        );
    }

    #[test]
    fn parses_named_result_lists() {
        let f = parse_signature("stats() -> (count: u64, mean: f64)").unwrap();
        assert!(f.parameters.is_empty());
        assert_eq!(f.results, vec![TypeDescriptor::U64, TypeDescriptor::F64]);
    }

    #[test]
    fn unknown_names_become_unknown_kind() {
        assert_eq!(
            parse_type_str("my-resource").unwrap(),
            TypeDescriptor::Unknown("my-resource".to_string())
        );
    }

    #[test]
    fn reports_offset_of_errors() {
        let err = parse_type_str("list<u32").unwrap_err();
        assert_eq!(err.offset, 8);
        assert_eq!(err.expected, "'>'");
        assert_eq!(err.to_string(), "expected '>' at offset 8, found end of input");

        let err = parse_signature("run(x u32)").unwrap_err();
        assert_eq!(err.expected, "':'");
    }

    #[test]
    fn rejects_repeated_names() {
        for (src, offset) in [
            ("record { a: u8, a: string }", 16),
            ("variant { a, b(u8), a }", 20),
            ("enum { low, low }", 12),
            ("flags { read, read }", 14),
        ] {
            let err = parse_type_str(src).unwrap_err();
            assert_eq!(err.expected, "a name not declared before", "{src}");
            assert_eq!(err.offset, offset, "{src}");
        }

        let err = parse_signature("run(a: u8, a: string)").unwrap_err();
        assert_eq!(err.offset, 11);
        assert_eq!(err.found, "'a: string)'");
    }

    #[test]
    fn enums_and_variants_need_a_case() {
        let err = parse_type_str("enum { }").unwrap_err();
        assert_eq!(err.expected, "at least one case");
        assert_eq!(err.offset, 5);
        assert!(parse_type_str("variant {}").is_err());
        assert_eq!(parse_type_str("flags { }").unwrap(), TypeDescriptor::Flags(vec![]));
        assert_eq!(parse_type_str("record { }").unwrap(), TypeDescriptor::Record(vec![]));
    }
}
