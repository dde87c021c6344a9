use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// A validated configuration value. Values are only produced by coercing provider
/// input against a declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Byte(u8),
    Boolean(bool),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Xml(Xml),
    Array(Vec<ConfigValue>),
    Record(Record),
    Table(Table),
    Map(IndexMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::Byte(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            ConfigValue::Xml(x) => Some(x.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            ConfigValue::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            ConfigValue::Table(table) => Some(table),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Int(i) => write!(f, "{i}"),
            ConfigValue::Byte(b) => write!(f, "{b}"),
            ConfigValue::Boolean(b) => write!(f, "{b}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::Decimal(d) => write!(f, "{d}"),
            ConfigValue::String(s) => write!(f, "{s}"),
            ConfigValue::Xml(x) => write!(f, "{x}"),
            ConfigValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            ConfigValue::Record(record) => write_fields(f, &record.fields),
            ConfigValue::Map(map) => write_fields(f, map),
            ConfigValue::Table(table) => {
                write!(f, "[")?;
                for (i, row) in table.rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_fields(f, &row.fields)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &IndexMap<String, ConfigValue>) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (name, value)) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{name}: {value}")?;
    }
    write!(f, "}}")
}

/// An XML value. Only well-formed markup is accepted when coercing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Xml(String);

impl Xml {
    pub(crate) fn new(text: String) -> Self {
        Xml(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Xml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    #[serde(skip)]
    pub type_name: String,
    pub fields: IndexMap<String, ConfigValue>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&ConfigValue> {
        self.fields.get(field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Table {
    #[serde(skip)]
    pub key_fields: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finds the row whose first key column holds `key`.
    pub fn get(&self, key: &ConfigValue) -> Option<&Record> {
        let column = self.key_fields.first()?;
        self.rows.iter().find(|row| row.get(column) == Some(key))
    }
}
