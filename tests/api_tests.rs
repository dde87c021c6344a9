use config_resolver::schema::config_schema;
use config_resolver::{
    resolve, Field, Module, ProviderOrder, ProviderSettings, TypeArena, VariableKey,
};
use indexmap::IndexMap;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn module() -> Module {
    Module::new("myOrg", "test_module", "1.0.0")
}

fn declare(types: &mut TypeArena) -> IndexMap<Module, Vec<VariableKey>> {
    let server = types.record(
        &module(),
        "Server",
        vec![
            Field::required("host", TypeArena::STRING),
            Field::optional("port", TypeArena::INT),
        ],
    );
    let mut variables = IndexMap::new();
    variables.insert(
        module(),
        vec![
            VariableKey::new(module(), "name", TypeArena::STRING, true),
            VariableKey::new(module(), "server", server, true),
        ],
    );
    variables
}

fn settings(data: &str, args: &[&str]) -> ProviderSettings {
    ProviderSettings::from_vars(args.iter().copied(), None, Some(data.to_string()))
}

#[test]
fn test_resolve_to_json() {
    let mut types = TypeArena::new();
    let variables = declare(&mut types);
    let result = resolve(
        &module(),
        &variables,
        &types,
        &settings(
            "[test_module]\nname = \"toml\"\n[test_module.server]\nhost = \"localhost\"\nport = 8080\n",
            &["-Cname=cli"],
        ),
    );
    assert!(!result.has_errors(), "{}", result.render_report());

    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "myOrg.test_module": {
                "name": "cli",
                "server": { "host": "localhost", "port": 8080 }
            }
        })
    );
}

#[test]
fn test_files_first_order() {
    let mut types = TypeArena::new();
    let variables = declare(&mut types);
    let settings = settings(
        "[test_module]\nname = \"toml\"\n[test_module.server]\nhost = \"h\"\n",
        &["-Cname=cli"],
    )
    .with_order(ProviderOrder::FilesFirst);
    let result = resolve(&module(), &variables, &types, &settings);
    assert_eq!(
        result.to_value().section("myOrg.test_module").unwrap()["name"].as_str(),
        Some("toml")
    );
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_resolve_to_yaml() {
    let mut types = TypeArena::new();
    let variables = declare(&mut types);
    let result = resolve(
        &module(),
        &variables,
        &types,
        &settings("[test_module]\nname = \"x\"\n[test_module.server]\nhost = \"h\"\n", &[]),
    );
    assert_eq!(
        result.to_yaml().unwrap(),
        "myOrg.test_module:\n  name: x\n  server:\n    host: h\n"
    );
}

#[test]
fn test_settings_default_to_config_toml() {
    let settings = ProviderSettings::from_vars(Vec::<String>::new(), None, None);
    assert_eq!(settings.config_files, vec![PathBuf::from("Config.toml")]);
    assert_eq!(settings.order, ProviderOrder::CliFirst);

    let data_only = ProviderSettings::from_vars(Vec::<String>::new(), None, Some("a = 1".into()));
    assert!(data_only.config_files.is_empty());
}

#[test]
fn test_settings_split_config_file_list() {
    let joined = std::env::join_paths(["first.toml", "second.toml"]).unwrap();
    let settings = ProviderSettings::from_vars(["-Ca=1"], Some(joined), None);
    assert_eq!(
        settings.config_files,
        vec![PathBuf::from("first.toml"), PathBuf::from("second.toml")]
    );
    assert_eq!(settings.cli_args, vec!["-Ca=1".to_string()]);
    assert_eq!(settings.build_providers(&module()).len(), 3);

    let empty = ProviderSettings::from_vars(Vec::<String>::new(), Some(OsString::new()), None);
    assert_eq!(empty.config_files, vec![PathBuf::from("Config.toml")]);
}

#[test]
fn test_resolve_from_files() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.toml");
    let second = dir.path().join("second.toml");
    fs::write(&first, "[test_module]\nname = \"from-first\"\n").unwrap();
    fs::write(&second, "[test_module.server]\nhost = \"h\"\n").unwrap();

    let mut types = TypeArena::new();
    let variables = declare(&mut types);
    let settings = ProviderSettings::from_vars(
        Vec::<String>::new(),
        Some(std::env::join_paths([&first, &second]).unwrap()),
        None,
    );
    let result = resolve(&module(), &variables, &types, &settings);
    assert!(result.diagnostics.is_empty(), "{}", result.render_report());
    let section = result.to_value();
    let section = section.section("myOrg.test_module").unwrap();
    assert_eq!(section["name"].as_str(), Some("from-first"));
}

#[test]
fn test_render_report_lists_every_diagnostic() {
    let mut types = TypeArena::new();
    let variables = declare(&mut types);
    let result = resolve(
        &module(),
        &variables,
        &types,
        &settings("[test_module]\nname = 1\nextra = true\n", &[]),
    );
    assert!(result.has_errors());
    let report = result.render_report();
    assert!(report.contains("configurable variable 'name' is expected to be of type 'string'"));
    assert!(report.contains("value not provided for required configurable variable 'server'"));
    assert!(report.contains("unused configuration value 'test_module.extra=true'"));
}

#[test]
fn test_schema_matches_declared_layout() {
    let mut types = TypeArena::new();
    let variables = declare(&mut types);
    let schema = config_schema(&variables, &types);
    let section = &schema["properties"]["myOrg"]["properties"]["test_module"];
    assert_eq!(section["required"], serde_json::json!(["name", "server"]));
    assert_eq!(
        section["properties"]["server"]["properties"]["port"],
        serde_json::json!({ "type": "integer" })
    );
    assert_eq!(
        schema["$schema"],
        serde_json::json!("http://json-schema.org/draft-07/schema#")
    );
}
