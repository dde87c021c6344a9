use miette::Diagnostic;
use thiserror::Error;

/// Every problem the resolution pass can report about user supplied configuration.
///
/// Variants are never propagated past the resolver. They are turned into
/// [`crate::diagnostics::Diagnostic`]s and collected in a log so that one run
/// reports every problem at once.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ConfigError {
    // == Source documents ==
    #[error("invalid toml file : \n{issues}")]
    #[diagnostic(
        code(config::parse),
        help("Fix the listed syntax issues; the file is ignored until it parses.")
    )]
    InvalidToml { issues: String },

    #[error("configuration file is not found in path '{path}'")]
    #[diagnostic(code(config::file_not_found))]
    FileNotFound { path: String },

    #[error("an empty configuration file is found in path '{path}'. Please provide values for configurable variables")]
    #[diagnostic(code(config::empty_file))]
    EmptyFile { path: String },

    #[error("failed to read configuration file '{path}': {reason}")]
    #[diagnostic(code(config::file_read))]
    FileRead { path: String, reason: String },

    // == Structure ==
    #[error("invalid module structure found for module '{module}'. Please provide the module name as '[{module}]'")]
    #[diagnostic(
        code(config::structure),
        help("Module sections must be TOML tables.")
    )]
    InvalidModuleStructure { module: String },

    #[error("configurable variable '{name}' is expected to be of type '{expected}', but found '{found}'")]
    #[diagnostic(code(config::type_mismatch))]
    IncompatibleType {
        name: String,
        expected: String,
        found: String,
    },

    #[error("field '{field}' from configurable variable '{name}' is expected to be of type '{expected}', but found '{found}'")]
    #[diagnostic(code(config::type_mismatch))]
    FieldTypeMismatch {
        field: String,
        name: String,
        expected: String,
        found: String,
    },

    #[error("value provided for byte variable '{name}' is out of range. Expected range is (0-255), found '{value}'")]
    #[diagnostic(code(config::byte_range))]
    InvalidByteRange { name: String, value: String },

    #[error("additional field '{field}' provided for configurable variable '{name}' of record '{record}' is not supported")]
    #[diagnostic(code(config::additional_field))]
    AdditionalField {
        field: String,
        name: String,
        record: String,
    },

    #[error("value not provided for non-defaultable required field '{field}' of record '{record}' in configurable variable '{name}'")]
    #[diagnostic(code(config::missing_field))]
    MissingRecordField {
        field: String,
        record: String,
        name: String,
    },

    #[error("value required for key '{key}' of type '{table}' in configurable variable '{name}'")]
    #[diagnostic(code(config::missing_table_key))]
    MissingTableKey {
        key: String,
        table: String,
        name: String,
    },

    #[error("duplicate key value '{value}' for key '{key}' in configurable variable '{name}'")]
    #[diagnostic(code(config::duplicate_table_key))]
    DuplicateTableKey {
        value: String,
        key: String,
        name: String,
    },

    // == Unsupported declarations ==
    #[error("configurable variable '{name}' with type '{ty}' is not supported")]
    #[diagnostic(code(config::unsupported_type))]
    UnsupportedType { name: String, ty: String },

    #[error("field type '{ty}' in configurable variable '{name}' is not supported")]
    #[diagnostic(code(config::unsupported_type))]
    UnsupportedFieldType { ty: String, name: String },

    #[error("table constraint type '{ty}' in configurable variable '{name}' is not supported")]
    #[diagnostic(code(config::unsupported_type))]
    UnsupportedTableConstraint { ty: String, name: String },

    #[error("value for configurable variable '{name}' with type '{ty}' is not supported as a command line argument")]
    #[diagnostic(
        code(config::cli_type_not_supported),
        help("Provide structured values through a TOML configuration file.")
    )]
    CliTypeNotSupported { name: String, ty: String },

    // == Ambiguity ==
    #[error("configurable value for variable '{name}' clashes with multiple command line arguments {args}")]
    #[diagnostic(code(config::ambiguity))]
    CliArgsAmbiguity { name: String, args: String },

    #[error("configurable variable '{variable}' is ambiguous with '{existing}'. Please provide the value as '{suggestion}'")]
    #[diagnostic(code(config::ambiguity))]
    CliVariableAmbiguity {
        variable: String,
        existing: String,
        suggestion: String,
    },

    #[error("configurable variable '{name}' is provided in multiple sections {sections}")]
    #[diagnostic(code(config::ambiguity))]
    TomlSectionAmbiguity { name: String, sections: String },

    // == Resolution ==
    #[error("value not provided for required configurable variable '{name}'")]
    #[diagnostic(code(config::missing_value))]
    MissingValue { name: String },

    #[error("configurable variable '{name}' is declared more than once in module '{module}'")]
    #[diagnostic(code(config::duplicate_variable))]
    DuplicateVariable { name: String, module: String },

    // == Unused values ==
    #[error("unused command line argument '{arg}'")]
    #[diagnostic(code(config::unused_value))]
    UnusedCliArg { arg: String },

    #[error("unused configuration value '{entry}'")]
    #[diagnostic(code(config::unused_value))]
    UnusedTomlValue { entry: String },
}

/// Failures of the resolver itself rather than of the configuration it reads.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("configurable variables have already been resolved by this resolver")]
    #[diagnostic(
        code(resolver::already_resolved),
        help("Create a new resolver for every resolution pass.")
    )]
    AlreadyResolved,
}
