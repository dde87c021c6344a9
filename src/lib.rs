pub mod api;
pub mod ast;
mod coerce;
pub mod diagnostics;
pub mod error;
pub mod module;
pub mod provider;
pub mod resolver;
pub mod schema;
mod serialization;
pub mod types;
pub mod utils;
pub mod value;

pub use api::{resolve, resolve_with_providers, ProviderOrder, ProviderSettings, ResolutionResult};
pub use diagnostics::{Diagnostic, DiagnosticLog, Severity};
pub use error::{ConfigError, ResolverError};
pub use module::{Module, VariableKey};
pub use provider::{CliProvider, ConfigProvider, TomlProvider};
pub use resolver::{ConfigResolver, ResolvedConfigs};
pub use serialization::Value;
pub use types::{Field, Type, TypeArena, TypeId};
pub use value::{ConfigValue, Record, Table, Xml};
