//! Conversion of raw provider input into typed configuration values.
//!
//! Command line values arrive as text and go through the `*_from_text` helpers.
//! TOML values arrive as [`TomlNode`]s and are walked against the declared type by
//! [`TomlCoercer`], which knows where every node came from.

use crate::ast::{TomlDocument, TomlNode, TomlNodeKind};
use crate::diagnostics::{Diagnostic, Location};
use crate::error::ConfigError;
use crate::module::VariableKey;
use crate::types::{Type, TypeArena, TypeId};
use crate::value::{ConfigValue, Record, Table, Xml};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::ops::Range;
use std::str::FromStr;

// === Text coercion ===

pub(crate) fn parse_int(text: &str) -> Option<i64> {
    text.parse::<i64>().ok()
}

pub(crate) fn parse_float(text: &str) -> Option<f64> {
    text.parse::<f64>().ok()
}

pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

pub(crate) fn parse_boolean(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Accepts plain text and markup whose tags are balanced and well named.
pub(crate) fn parse_xml(text: &str) -> Option<Xml> {
    let mut open: Vec<&str> = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        if let Some(comment) = after.strip_prefix("!--") {
            let end = comment.find("-->")?;
            rest = &comment[end + 3..];
            continue;
        }
        if let Some(instruction) = after.strip_prefix('?') {
            let end = instruction.find("?>")?;
            rest = &instruction[end + 2..];
            continue;
        }
        let end = after.find('>')?;
        let tag = &after[..end];
        rest = &after[end + 1..];
        if let Some(closing) = tag.strip_prefix('/') {
            if open.pop() != Some(closing.trim()) {
                return None;
            }
        } else if let Some(empty) = tag.strip_suffix('/') {
            tag_name(empty)?;
        } else {
            open.push(tag_name(tag)?);
        }
    }
    open.is_empty().then(|| Xml::new(text.to_string()))
}

fn tag_name(tag: &str) -> Option<&str> {
    let name = tag.split_whitespace().next()?;
    let first = name.chars().next()?;
    (first.is_alphabetic() || first == '_').then_some(name)
}

/// Parses command line text as the primitive `ty`, for union members.
pub(crate) fn primitive_from_text(types: &TypeArena, ty: TypeId, text: &str) -> Option<ConfigValue> {
    match types.effective_type(ty) {
        Type::Int => parse_int(text).map(ConfigValue::Int),
        Type::Byte => parse_int(text)
            .and_then(|i| u8::try_from(i).ok())
            .map(ConfigValue::Byte),
        Type::Boolean => parse_boolean(text).map(ConfigValue::Boolean),
        Type::Float => parse_float(text).map(ConfigValue::Float),
        Type::Decimal => parse_decimal(text).map(ConfigValue::Decimal),
        Type::String => Some(ConfigValue::String(text.to_string())),
        Type::Xml => parse_xml(text).map(ConfigValue::Xml),
        _ => None,
    }
}

pub(crate) fn incompatible_text(types: &TypeArena, key: &VariableKey, text: &str) -> Diagnostic {
    Diagnostic::error(
        ConfigError::IncompatibleType {
            name: key.variable.clone(),
            expected: types.display(key.ty).to_string(),
            found: text.to_string(),
        },
        None,
    )
}

/// Parses `text` with `parse`, reporting an incompatible type against `key` on failure.
pub(crate) fn from_text<T>(
    types: &TypeArena,
    key: &VariableKey,
    text: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, Diagnostic> {
    parse(text).ok_or_else(|| incompatible_text(types, key, text))
}

pub(crate) fn byte_from_text(types: &TypeArena, key: &VariableKey, text: &str) -> Result<u8, Diagnostic> {
    let value = from_text(types, key, text, parse_int)?;
    u8::try_from(value).map_err(|_| {
        Diagnostic::error(
            ConfigError::InvalidByteRange {
                name: key.variable.clone(),
                value: text.to_string(),
            },
            None,
        )
    })
}

pub(crate) fn union_from_text(types: &TypeArena, key: &VariableKey, text: &str) -> Result<ConfigValue, Diagnostic> {
    let members: &[TypeId] = match types.effective_type(key.ty) {
        Type::Union { members } => members.as_slice(),
        _ => &[],
    };
    members
        .iter()
        .find_map(|member| primitive_from_text(types, *member, text))
        .ok_or_else(|| incompatible_text(types, key, text))
}

// === TOML coercion ===

/// What a diagnostic is about: the variable (possibly an element of it, `arr[2]`)
/// or one of its record fields.
#[derive(Debug, Clone)]
pub(crate) enum Subject {
    Variable(String),
    Field(String),
}

impl Subject {
    fn indexed(&self, index: usize) -> Subject {
        match self {
            Subject::Variable(name) => Subject::Variable(format!("{name}[{index}]")),
            Subject::Field(name) => Subject::Field(format!("{name}[{index}]")),
        }
    }

    fn field(&self, field: &str) -> Subject {
        match self {
            Subject::Variable(_) => Subject::Field(field.to_string()),
            Subject::Field(parent) => Subject::Field(format!("{parent}.{field}")),
        }
    }
}

/// A node together with the span of the `key = value` entry (or `[table]`) it was found in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Site<'n> {
    pub node: &'n TomlNode,
    pub entry_span: Option<&'n Range<usize>>,
}

impl<'n> Site<'n> {
    pub fn new(node: &'n TomlNode, entry_span: Option<&'n Range<usize>>) -> Self {
        Site { node, entry_span }
    }

    fn element(node: &'n TomlNode) -> Self {
        Site {
            node,
            entry_span: None,
        }
    }

    fn widest_span(&self) -> Option<&'n Range<usize>> {
        self.entry_span.or(self.node.span.as_ref())
    }
}

/// Walks a TOML value against a declared type for one configurable variable.
pub(crate) struct TomlCoercer<'a> {
    types: &'a TypeArena,
    document: &'a TomlDocument,
    variable: &'a str,
}

impl<'a> TomlCoercer<'a> {
    pub fn new(types: &'a TypeArena, document: &'a TomlDocument, variable: &'a str) -> Self {
        TomlCoercer {
            types,
            document,
            variable,
        }
    }

    pub fn subject(&self) -> Subject {
        Subject::Variable(self.variable.to_string())
    }

    pub fn coerce(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<ConfigValue, Diagnostic> {
        match self.types.effective_type(ty) {
            Type::Int => self.int(site, ty, subject).map(ConfigValue::Int),
            Type::Byte => self.byte(site, ty, subject).map(ConfigValue::Byte),
            Type::Boolean => self.boolean(site, ty, subject).map(ConfigValue::Boolean),
            Type::Float => self.float(site, ty, subject).map(ConfigValue::Float),
            Type::Decimal => self.decimal(site, ty, subject).map(ConfigValue::Decimal),
            Type::String => self.string(site, ty, subject).map(ConfigValue::String),
            Type::Xml => self.xml(site, ty, subject).map(ConfigValue::Xml),
            Type::Array { .. } => self.array(site, ty, subject).map(ConfigValue::Array),
            Type::Record(_) => self.record(site, ty, subject).map(ConfigValue::Record),
            Type::Table { .. } => self.table(site, ty, subject).map(ConfigValue::Table),
            Type::Union { .. } => self.union(site, ty, subject),
            Type::Map { .. } => self.map(site, ty, subject).map(ConfigValue::Map),
            Type::Readonly | Type::Intersection { .. } | Type::Tuple(_) => Err(Diagnostic::error(
                ConfigError::UnsupportedFieldType {
                    ty: self.types.display(ty).to_string(),
                    name: self.variable.to_string(),
                },
                self.location(site.widest_span()),
            )),
        }
    }

    pub fn int(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<i64, Diagnostic> {
        match &site.node.kind {
            TomlNodeKind::Integer(i) => Ok(*i),
            _ => Err(self.mismatch(site, ty, subject)),
        }
    }

    pub fn byte(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<u8, Diagnostic> {
        match &site.node.kind {
            TomlNodeKind::Integer(i) => u8::try_from(*i).map_err(|_| {
                Diagnostic::error(
                    ConfigError::InvalidByteRange {
                        name: self.label(subject),
                        value: i.to_string(),
                    },
                    self.location(site.node.span.as_ref()),
                )
            }),
            _ => Err(self.mismatch(site, ty, subject)),
        }
    }

    pub fn boolean(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<bool, Diagnostic> {
        match &site.node.kind {
            TomlNodeKind::Boolean(b) => Ok(*b),
            _ => Err(self.mismatch(site, ty, subject)),
        }
    }

    pub fn float(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<f64, Diagnostic> {
        match &site.node.kind {
            TomlNodeKind::Float(f) => Ok(*f),
            TomlNodeKind::Integer(i) => Ok(*i as f64),
            _ => Err(self.mismatch(site, ty, subject)),
        }
    }

    /// Decimals are read from the source text so no precision is lost through `f64`.
    pub fn decimal(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<Decimal, Diagnostic> {
        let exact = || {
            self.document
                .raw_text(site.node)
                .and_then(|raw| parse_decimal(&raw.replace('_', "")))
        };
        let value = match &site.node.kind {
            TomlNodeKind::Integer(i) => exact().or(Some(Decimal::from(*i))),
            TomlNodeKind::Float(f) => exact().or_else(|| Decimal::from_f64_retain(*f)),
            _ => None,
        };
        value.ok_or_else(|| self.mismatch(site, ty, subject))
    }

    pub fn string(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<String, Diagnostic> {
        match &site.node.kind {
            TomlNodeKind::String(s) => Ok(s.clone()),
            _ => Err(self.mismatch(site, ty, subject)),
        }
    }

    pub fn xml(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<Xml, Diagnostic> {
        match &site.node.kind {
            TomlNodeKind::String(s) => parse_xml(s).ok_or_else(|| {
                let error = match subject {
                    Subject::Variable(name) => ConfigError::IncompatibleType {
                        name: name.clone(),
                        expected: self.types.display(ty).to_string(),
                        found: s.clone(),
                    },
                    Subject::Field(field) => ConfigError::FieldTypeMismatch {
                        field: field.clone(),
                        name: self.variable.to_string(),
                        expected: self.types.display(ty).to_string(),
                        found: s.clone(),
                    },
                };
                Diagnostic::error(error, self.location(site.node.span.as_ref()))
            }),
            _ => Err(self.mismatch(site, ty, subject)),
        }
    }

    pub fn array(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<Vec<ConfigValue>, Diagnostic> {
        let Type::Array { element } = self.types.effective_type(ty) else {
            return Err(self.mismatch(site, ty, subject));
        };
        let TomlNodeKind::Array(items) = &site.node.kind else {
            return Err(self.mismatch(site, ty, subject));
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.coerce(Site::element(item), *element, &subject.indexed(i)))
            .collect()
    }

    pub fn record(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<Record, Diagnostic> {
        let record_id = self.types.effective(ty);
        let Type::Record(record_type) = self.types.get(record_id) else {
            return Err(self.mismatch(site, ty, subject));
        };
        let TomlNodeKind::Table(entries) = &site.node.kind else {
            return Err(self.mismatch(site, ty, subject));
        };
        let record_name = self.types.display(record_id).to_string();

        let mut fields = IndexMap::new();
        for entry in entries {
            let field_ty = match (record_type.field(&entry.key), record_type.rest) {
                (Some(field), _) => field.ty,
                (None, Some(rest)) => rest,
                (None, None) => {
                    return Err(Diagnostic::error(
                        ConfigError::AdditionalField {
                            field: entry.key.clone(),
                            name: self.variable.to_string(),
                            record: record_name,
                        },
                        self.location(entry.span.as_ref().or(entry.value.span.as_ref())),
                    ));
                }
            };
            if !self.types.is_configurable_field(field_ty) {
                return Err(Diagnostic::error(
                    ConfigError::UnsupportedFieldType {
                        ty: self.types.display(field_ty).to_string(),
                        name: self.variable.to_string(),
                    },
                    self.location(site.widest_span()),
                ));
            }
            let value = self.coerce(
                Site::new(&entry.value, entry.span.as_ref()),
                field_ty,
                &subject.field(&entry.key),
            )?;
            fields.insert(entry.key.clone(), value);
        }

        if let Some(missing) = record_type
            .fields
            .iter()
            .find(|f| f.required && !fields.contains_key(&f.name))
        {
            return Err(Diagnostic::error(
                ConfigError::MissingRecordField {
                    field: missing.name.clone(),
                    record: record_name,
                    name: self.variable.to_string(),
                },
                self.location(site.widest_span()),
            ));
        }

        Ok(Record {
            type_name: record_name,
            fields,
        })
    }

    pub fn table(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<Table, Diagnostic> {
        let Type::Table {
            constraint,
            key_fields,
        } = self.types.effective_type(ty)
        else {
            return Err(self.mismatch(site, ty, subject));
        };
        let TomlNodeKind::Array(rows) = &site.node.kind else {
            return Err(self.mismatch(site, ty, subject));
        };
        if !matches!(self.types.effective_type(*constraint), Type::Record(_)) {
            return Err(Diagnostic::error(
                ConfigError::UnsupportedTableConstraint {
                    ty: self.types.display(*constraint).to_string(),
                    name: self.variable.to_string(),
                },
                self.location(site.widest_span()),
            ));
        }

        let mut records: Vec<Record> = Vec::with_capacity(rows.len());
        let mut seen_keys: Vec<Vec<ConfigValue>> = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let row_site = Site::element(row);
            if !matches!(row.kind, TomlNodeKind::Table(_)) {
                return Err(self.mismatch(row_site, *constraint, &subject.indexed(i)));
            }
            if let Some(missing) = key_fields.iter().find(|k| row.entry(k).is_none()) {
                return Err(Diagnostic::error(
                    ConfigError::MissingTableKey {
                        key: missing.clone(),
                        table: self.types.display(ty).to_string(),
                        name: self.variable.to_string(),
                    },
                    self.location(row.span.as_ref()),
                ));
            }
            let record = self.record(row_site, *constraint, subject)?;
            if !key_fields.is_empty() {
                let key: Vec<ConfigValue> = key_fields
                    .iter()
                    .filter_map(|k| record.get(k).cloned())
                    .collect();
                if seen_keys.contains(&key) {
                    let value = key
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    return Err(Diagnostic::error(
                        ConfigError::DuplicateTableKey {
                            value,
                            key: key_fields.join(", "),
                            name: self.variable.to_string(),
                        },
                        self.location(row.span.as_ref()),
                    ));
                }
                seen_keys.push(key);
            }
            records.push(record);
        }

        Ok(Table {
            key_fields: key_fields.clone(),
            rows: records,
        })
    }

    /// Members are tried in declaration order; the first that accepts the value wins.
    pub fn union(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Result<ConfigValue, Diagnostic> {
        let Type::Union { members } = self.types.effective_type(ty) else {
            return Err(self.mismatch(site, ty, subject));
        };
        members
            .iter()
            .find_map(|member| self.coerce(site, *member, subject).ok())
            .ok_or_else(|| self.mismatch(site, ty, subject))
    }

    fn map(
        &self,
        site: Site<'_>,
        ty: TypeId,
        subject: &Subject,
    ) -> Result<IndexMap<String, ConfigValue>, Diagnostic> {
        let Type::Map { constraint, .. } = self.types.effective_type(ty) else {
            return Err(self.mismatch(site, ty, subject));
        };
        let TomlNodeKind::Table(entries) = &site.node.kind else {
            return Err(self.mismatch(site, ty, subject));
        };
        entries
            .iter()
            .map(|entry| {
                let value = self.coerce(
                    Site::new(&entry.value, entry.span.as_ref()),
                    *constraint,
                    &subject.field(&entry.key),
                )?;
                Ok((entry.key.clone(), value))
            })
            .collect()
    }

    /// "expected type X, but found <shape>". Container mismatches point at the whole
    /// entry, scalar mismatches at the value alone.
    fn mismatch(&self, site: Site<'_>, ty: TypeId, subject: &Subject) -> Diagnostic {
        let expected = self.types.display(ty).to_string();
        let found = site.node.kind.shape().to_string();
        let error = match subject {
            Subject::Variable(name) => ConfigError::IncompatibleType {
                name: name.clone(),
                expected,
                found,
            },
            Subject::Field(field) => ConfigError::FieldTypeMismatch {
                field: field.clone(),
                name: self.variable.to_string(),
                expected,
                found,
            },
        };
        let span = if site.node.kind.is_structured() || !self.types.is_primitive(ty) {
            site.widest_span()
        } else {
            site.node.span.as_ref()
        };
        Diagnostic::error(error, self.location(span))
    }

    fn label(&self, subject: &Subject) -> String {
        match subject {
            Subject::Variable(name) => name.clone(),
            Subject::Field(field) => format!("{}.{}", self.variable, field),
        }
    }

    pub fn location(&self, span: Option<&Range<usize>>) -> Option<Location> {
        span.map(|s| self.document.source.location(s.start, s.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        assert_eq!(parse_int("+42"), Some(42));
        assert_eq!(parse_int("4.2"), None);
        assert_eq!(parse_float("1e3"), Some(1000.0));
        assert_eq!(parse_boolean("TRUE"), Some(true));
        assert_eq!(parse_boolean("yes"), None);
        assert_eq!(parse_decimal("12.50"), Decimal::from_str("12.50").ok());
        assert_eq!(parse_decimal("1.5e2"), Decimal::from_str("150").ok());
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn test_parse_xml() {
        assert!(parse_xml("plain text").is_some());
        assert!(parse_xml("<book><title>Rust</title></book>").is_some());
        assert!(parse_xml("<br/><!-- note --><?pi data?>").is_some());
        assert!(parse_xml("<book><title>Rust</book>").is_none());
        assert!(parse_xml("<book>").is_none());
        assert!(parse_xml("<1tag></1tag>").is_none());
    }
}
