//! Sources of raw configuration values.
//!
//! A provider is initialized once, asked for values one variable at a time, and
//! finally completed, at which point every value nobody asked for is reported.
//! The resolver only ever sees the [`ConfigProvider`] trait.

pub mod cli;
pub mod toml;

pub use cli::CliProvider;
pub use toml::TomlProvider;

use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::module::VariableKey;
use crate::types::{Type, TypeArena};
use crate::value::{ConfigValue, Record, Table, Xml};
use rust_decimal::Decimal;

/// Result of a single lookup: `Ok(None)` when the provider has nothing for the key.
pub type Lookup<T> = Result<Option<T>, Diagnostic>;

/// A source of configuration values.
///
/// Every `get_*_and_mark` call that finds an entry for `key` marks that entry
/// consumed, whether or not the value then coerces. Entries never consumed are
/// reported by [`ConfigProvider::complete`].
pub trait ConfigProvider: Send {
    /// Reads the underlying source. Problems are logged; the provider stays usable.
    fn initialize(&mut self, diagnostics: &mut DiagnosticLog);

    /// Whether any entry is still waiting to be consumed.
    fn has_configs(&self) -> bool;

    fn get_int_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<i64>;
    fn get_byte_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<u8>;
    fn get_boolean_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<bool>;
    fn get_float_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<f64>;
    fn get_decimal_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Decimal>;
    fn get_string_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<String>;
    fn get_xml_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Xml>;
    fn get_array_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Vec<ConfigValue>>;
    fn get_record_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Record>;
    fn get_table_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Table>;
    fn get_union_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<ConfigValue>;

    /// Consumes whatever entry matches `key` without looking at its value.
    fn mark_as_used(&mut self, types: &TypeArena, key: &VariableKey);

    /// Reports every unconsumed entry as a warning. Calling it again reports nothing new.
    fn complete(&mut self, diagnostics: &mut DiagnosticLog);

    /// Looks `key` up with the getter matching its effective type.
    fn get_value_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<ConfigValue> {
        let value = match types.effective_type(key.ty) {
            Type::Int => self.get_int_and_mark(types, key)?.map(ConfigValue::Int),
            Type::Byte => self.get_byte_and_mark(types, key)?.map(ConfigValue::Byte),
            Type::Boolean => self.get_boolean_and_mark(types, key)?.map(ConfigValue::Boolean),
            Type::Float => self.get_float_and_mark(types, key)?.map(ConfigValue::Float),
            Type::Decimal => self.get_decimal_and_mark(types, key)?.map(ConfigValue::Decimal),
            Type::String => self.get_string_and_mark(types, key)?.map(ConfigValue::String),
            Type::Xml => self.get_xml_and_mark(types, key)?.map(ConfigValue::Xml),
            Type::Array { .. } => self.get_array_and_mark(types, key)?.map(ConfigValue::Array),
            Type::Record(_) => self.get_record_and_mark(types, key)?.map(ConfigValue::Record),
            Type::Table { .. } => self.get_table_and_mark(types, key)?.map(ConfigValue::Table),
            Type::Union { .. } => self.get_union_and_mark(types, key)?,
            Type::Map { .. } | Type::Readonly | Type::Intersection { .. } | Type::Tuple(_) => {
                self.mark_as_used(types, key);
                None
            }
        };
        Ok(value)
    }
}
