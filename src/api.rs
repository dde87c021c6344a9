use crate::diagnostics::DiagnosticLog;
use crate::error::ResolverError;
use crate::module::{Module, VariableKey};
use crate::provider::{CliProvider, ConfigProvider, TomlProvider};
use crate::resolver::{ConfigResolver, ResolvedConfigs};
use crate::serialization::{to_value, Value};
use crate::types::TypeArena;
use indexmap::IndexMap;
use miette::{GraphicalReportHandler, GraphicalTheme};
use serde::{Serialize, Serializer};
use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable listing configuration files, separated like `PATH`.
pub const CONFIG_FILES_ENV: &str = "CONFIG_FILES";
/// Environment variable holding inline TOML configuration.
pub const CONFIG_DATA_ENV: &str = "CONFIG_DATA";
/// File read when neither environment variable is set.
pub const DEFAULT_CONFIG_FILE: &str = "Config.toml";

const REPORT_WIDTH: usize = 160;

/// Whether command line values take precedence over configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderOrder {
    #[default]
    CliFirst,
    FilesFirst,
}

/// Where configuration values come from for one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub cli_args: Vec<String>,
    pub config_files: Vec<PathBuf>,
    pub config_data: Option<String>,
    pub order: ProviderOrder,
}

impl ProviderSettings {
    /// Settings from the process environment, see [`CONFIG_FILES_ENV`] and [`CONFIG_DATA_ENV`].
    pub fn from_env<I, S>(cli_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_vars(
            cli_args,
            std::env::var_os(CONFIG_FILES_ENV),
            std::env::var(CONFIG_DATA_ENV).ok(),
        )
    }

    /// Like [`ProviderSettings::from_env`], with the variable values passed in.
    /// Falls back to [`DEFAULT_CONFIG_FILE`] when neither is given.
    pub fn from_vars<I, S>(cli_args: I, config_files: Option<OsString>, config_data: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut files: Vec<PathBuf> = config_files
            .as_deref()
            .map(|paths| std::env::split_paths(paths).filter(|p| !p.as_os_str().is_empty()).collect())
            .unwrap_or_default();
        if files.is_empty() && config_data.is_none() {
            files.push(PathBuf::from(DEFAULT_CONFIG_FILE));
        }
        ProviderSettings {
            cli_args: cli_args.into_iter().map(Into::into).collect(),
            config_files: files,
            config_data,
            order: ProviderOrder::default(),
        }
    }

    #[must_use]
    pub fn with_order(mut self, order: ProviderOrder) -> Self {
        self.order = order;
        self
    }

    /// Builds the providers in query order. Inline data comes before files.
    pub fn build_providers(&self, root: &Module) -> Vec<Box<dyn ConfigProvider>> {
        let cli: Box<dyn ConfigProvider> = Box::new(CliProvider::new(root.clone(), self.cli_args.clone()));
        let mut toml: Vec<Box<dyn ConfigProvider>> = Vec::new();
        if let Some(data) = &self.config_data {
            toml.push(Box::new(TomlProvider::from_content(data.clone(), root.clone())));
        }
        for path in &self.config_files {
            toml.push(Box::new(TomlProvider::from_file(path.clone(), root.clone())));
        }

        match self.order {
            ProviderOrder::CliFirst => std::iter::once(cli).chain(toml).collect(),
            ProviderOrder::FilesFirst => toml.into_iter().chain(std::iter::once(cli)).collect(),
        }
    }
}

/// The outcome of resolving a program's configurable variables.
///
/// Resolution always produces a result; check [`ResolutionResult::has_errors`]
/// before using the values.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    pub values: ResolvedConfigs,
    pub diagnostics: DiagnosticLog,
}

impl Serialize for ResolutionResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = self.to_value();
        value.serialize(serializer)
    }
}

impl ResolutionResult {
    /// The resolved values grouped into `org.module` sections.
    #[must_use]
    pub fn to_value(&self) -> Value {
        to_value(&self.values)
    }

    /// Serializes the resolved values into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the resolved values into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Renders every diagnostic through miette's graphical handler, without colors.
    #[must_use]
    pub fn render_report(&self) -> String {
        let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
            .with_width(REPORT_WIDTH);
        let mut buffer = String::new();
        for diagnostic in self.diagnostics.diagnostics() {
            if handler.render_report(&mut buffer, diagnostic).is_err() {
                buffer.push_str(&diagnostic.to_string());
                buffer.push('\n');
            }
        }
        buffer
    }
}

/// Resolves `variables` against the providers described by `settings`.
///
/// This is the primary entry point. `variables` maps each module to its
/// configurable variables in declaration order; `root` is the entry module,
/// whose organization and name allow shorter keys.
pub fn resolve(
    root: &Module,
    variables: &IndexMap<Module, Vec<VariableKey>>,
    types: &TypeArena,
    settings: &ProviderSettings,
) -> ResolutionResult {
    let providers = settings.build_providers(root);
    // A fresh resolver cannot already have run.
    resolve_with_providers(variables, types, providers).unwrap_or_else(|_| ResolutionResult {
        values: ResolvedConfigs::default(),
        diagnostics: DiagnosticLog::new(),
    })
}

/// Resolves `variables` against an explicit, ordered provider list.
///
/// # Errors
/// Never fails for a fresh resolver; the error type is shared with
/// [`ConfigResolver::resolve_configs`].
pub fn resolve_with_providers<'a>(
    variables: &'a IndexMap<Module, Vec<VariableKey>>,
    types: &'a TypeArena,
    providers: Vec<Box<dyn ConfigProvider + 'a>>,
) -> Result<ResolutionResult, ResolverError> {
    let mut diagnostics = DiagnosticLog::new();
    let values = ConfigResolver::new(variables, types, &mut diagnostics, providers).resolve_configs()?;
    Ok(ResolutionResult {
        values,
        diagnostics,
    })
}
