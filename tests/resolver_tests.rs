use config_resolver::provider::Lookup;
use config_resolver::resolver::ResolverState;
use config_resolver::{
    CliProvider, ConfigProvider, ConfigResolver, ConfigValue, DiagnosticLog, Module, Record,
    ResolverError, Table, TomlProvider, TypeArena, VariableKey, Xml,
};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

fn module() -> Module {
    Module::new("myOrg", "test_module", "1.0.0")
}

fn variables(keys: Vec<VariableKey>) -> IndexMap<Module, Vec<VariableKey>> {
    let mut variables = IndexMap::new();
    variables.insert(module(), keys);
    variables
}

fn messages(log: &DiagnosticLog) -> Vec<String> {
    log.diagnostics().iter().map(|d| d.message()).collect()
}

/// Records which variables it was asked about and answers every int lookup with `value`.
struct RecordingProvider {
    value: Option<i64>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingProvider {
    fn record(&self, what: &str, key: &VariableKey) {
        self.calls.lock().unwrap().push(format!("{what} {}", key.variable));
    }
}

impl ConfigProvider for RecordingProvider {
    fn initialize(&mut self, _diagnostics: &mut DiagnosticLog) {
        self.calls.lock().unwrap().push("initialize".to_string());
    }

    fn has_configs(&self) -> bool {
        self.value.is_some()
    }

    fn get_int_and_mark(&mut self, _types: &TypeArena, key: &VariableKey) -> Lookup<i64> {
        self.record("get", key);
        Ok(self.value)
    }

    fn get_byte_and_mark(&mut self, _types: &TypeArena, _key: &VariableKey) -> Lookup<u8> {
        Ok(None)
    }

    fn get_boolean_and_mark(&mut self, _types: &TypeArena, _key: &VariableKey) -> Lookup<bool> {
        Ok(None)
    }

    fn get_float_and_mark(&mut self, _types: &TypeArena, _key: &VariableKey) -> Lookup<f64> {
        Ok(None)
    }

    fn get_decimal_and_mark(&mut self, _types: &TypeArena, _key: &VariableKey) -> Lookup<Decimal> {
        Ok(None)
    }

    fn get_string_and_mark(&mut self, _types: &TypeArena, _key: &VariableKey) -> Lookup<String> {
        Ok(None)
    }

    fn get_xml_and_mark(&mut self, _types: &TypeArena, _key: &VariableKey) -> Lookup<Xml> {
        Ok(None)
    }

    fn get_array_and_mark(&mut self, _types: &TypeArena, _key: &VariableKey) -> Lookup<Vec<ConfigValue>> {
        Ok(None)
    }

    fn get_record_and_mark(&mut self, _types: &TypeArena, _key: &VariableKey) -> Lookup<Record> {
        Ok(None)
    }

    fn get_table_and_mark(&mut self, _types: &TypeArena, _key: &VariableKey) -> Lookup<Table> {
        Ok(None)
    }

    fn get_union_and_mark(&mut self, _types: &TypeArena, _key: &VariableKey) -> Lookup<ConfigValue> {
        Ok(None)
    }

    fn mark_as_used(&mut self, _types: &TypeArena, key: &VariableKey) {
        self.record("mark", key);
    }

    fn complete(&mut self, _diagnostics: &mut DiagnosticLog) {
        self.calls.lock().unwrap().push("complete".to_string());
    }
}

#[test]
fn test_first_provider_with_a_value_wins() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let types = TypeArena::new();
    let vars = variables(vec![VariableKey::new(module(), "a", TypeArena::INT, true)]);
    let mut log = DiagnosticLog::new();
    let providers: Vec<Box<dyn ConfigProvider>> = vec![
        Box::new(RecordingProvider {
            value: None,
            calls: Arc::clone(&calls),
        }),
        Box::new(RecordingProvider {
            value: Some(1),
            calls: Arc::clone(&calls),
        }),
        Box::new(RecordingProvider {
            value: Some(2),
            calls: Arc::clone(&calls),
        }),
    ];
    let mut resolver = ConfigResolver::new(&vars, &types, &mut log, providers);
    let resolved = resolver.resolve_configs().unwrap();
    assert_eq!(resolver.state(), ResolverState::Done);
    assert_eq!(resolved.find(&module(), "a"), Some(&ConfigValue::Int(1)));
    drop(resolver);
    assert!(log.is_empty());
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "initialize",
            "initialize",
            "initialize",
            "get a",
            "get a",
            "mark a",
            "complete",
            "complete",
            "complete",
        ]
    );
}

#[test]
fn test_second_resolution_is_rejected() {
    let types = TypeArena::new();
    let vars = variables(vec![]);
    let mut log = DiagnosticLog::new();
    let mut resolver = ConfigResolver::new(&vars, &types, &mut log, Vec::new());
    assert!(resolver.resolve_configs().is_ok());
    assert_eq!(resolver.resolve_configs(), Err(ResolverError::AlreadyResolved));
}

#[test]
fn test_cli_overrides_toml_without_unused_warning() {
    let types = TypeArena::new();
    let vars = variables(vec![VariableKey::new(module(), "port", TypeArena::INT, true)]);
    let mut log = DiagnosticLog::new();
    let providers: Vec<Box<dyn ConfigProvider>> = vec![
        Box::new(CliProvider::new(module(), ["-Cport=9090"])),
        Box::new(TomlProvider::from_content("[test_module]\nport = 8080\n", module())),
    ];
    let resolved = ConfigResolver::new(&vars, &types, &mut log, providers)
        .resolve_configs()
        .unwrap();
    assert_eq!(resolved.find(&module(), "port"), Some(&ConfigValue::Int(9090)));
    assert!(log.is_empty(), "{:?}", messages(&log));
}

#[test]
fn test_first_error_stops_the_search() {
    let types = TypeArena::new();
    let vars = variables(vec![VariableKey::new(module(), "port", TypeArena::INT, true)]);
    let mut log = DiagnosticLog::new();
    let providers: Vec<Box<dyn ConfigProvider>> = vec![
        Box::new(CliProvider::new(module(), ["-Cport=http"])),
        Box::new(TomlProvider::from_content("[test_module]\nport = 8080\n", module())),
    ];
    let resolved = ConfigResolver::new(&vars, &types, &mut log, providers)
        .resolve_configs()
        .unwrap();
    assert!(resolved.is_empty());
    assert_eq!(
        messages(&log),
        vec!["configurable variable 'port' is expected to be of type 'int', but found 'http'"]
    );
}

#[test]
fn test_unsupported_types_are_reported_and_marked() {
    let mut types = TypeArena::new();
    let inner = types.array(TypeArena::INT);
    let matrix = types.array(inner);
    let matrix = types.readonly(matrix);
    let map = types.map(TypeArena::STRING, false);
    let tuple = types.declare_tuple(None);
    types.add_tuple_member(tuple, TypeArena::INT);
    let vars = variables(vec![
        VariableKey::new(module(), "matrix", matrix, true),
        VariableKey::new(module(), "labels", map, true),
        VariableKey::new(module(), "pair", tuple, true),
    ]);
    let mut log = DiagnosticLog::new();
    let providers: Vec<Box<dyn ConfigProvider>> = vec![Box::new(TomlProvider::from_content(
        "[test_module]\nmatrix = [[1, 2], [3]]\n",
        module(),
    ))];
    ConfigResolver::new(&vars, &types, &mut log, providers)
        .resolve_configs()
        .unwrap();
    assert_eq!(
        messages(&log),
        vec![
            "configurable variable 'matrix' with type 'int[][] & readonly' is not supported",
            "configurable variable 'labels' with type 'map<string>' is not supported",
            "configurable variable 'pair' with type '[int]' is not supported",
        ]
    );
}

#[test]
fn test_duplicate_declarations_are_reported_once() {
    let types = TypeArena::new();
    let vars = variables(vec![
        VariableKey::new(module(), "port", TypeArena::INT, false),
        VariableKey::new(module(), "port", TypeArena::STRING, false),
        VariableKey::new(module(), "port", TypeArena::INT, false),
    ]);
    let mut log = DiagnosticLog::new();
    let providers: Vec<Box<dyn ConfigProvider>> =
        vec![Box::new(CliProvider::new(module(), ["-Cport=1"]))];
    let resolved = ConfigResolver::new(&vars, &types, &mut log, providers)
        .resolve_configs()
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(
        messages(&log),
        vec![
            "configurable variable 'port' is declared more than once in module 'myOrg/test_module:1.0.0'",
            "configurable variable 'port' is declared more than once in module 'myOrg/test_module:1.0.0'",
        ]
    );
}

#[test]
fn test_optional_variables_may_be_absent() {
    let types = TypeArena::new();
    let vars = variables(vec![
        VariableKey::new(module(), "optional", TypeArena::INT, false),
        VariableKey::new(module(), "required", TypeArena::INT, true),
    ]);
    let mut log = DiagnosticLog::new();
    let resolved = ConfigResolver::new(&vars, &types, &mut log, Vec::new())
        .resolve_configs()
        .unwrap();
    assert!(resolved.is_empty());
    assert_eq!(
        messages(&log),
        vec!["value not provided for required configurable variable 'required'"]
    );
}

#[test]
fn test_values_keep_declaration_order() {
    let types = TypeArena::new();
    let other = Module::new("myOrg", "other", "1.0.0");
    let mut vars = IndexMap::new();
    vars.insert(
        module(),
        vec![
            VariableKey::new(module(), "b", TypeArena::INT, true),
            VariableKey::new(module(), "a", TypeArena::INT, true),
        ],
    );
    vars.insert(
        other.clone(),
        vec![VariableKey::new(other, "c", TypeArena::INT, true)],
    );
    let mut log = DiagnosticLog::new();
    let providers: Vec<Box<dyn ConfigProvider>> = vec![Box::new(CliProvider::new(
        module(),
        ["-Ca=1", "-Cb=2", "-Cother.c=3"],
    ))];
    let resolved = ConfigResolver::new(&vars, &types, &mut log, providers)
        .resolve_configs()
        .unwrap();
    let names: Vec<&str> = resolved.iter().map(|(k, _)| k.variable.as_str()).collect();
    assert_eq!(names, vec!["b", "a", "c"]);
}
