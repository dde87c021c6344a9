use config_resolver::{resolve, Field, Module, ProviderSettings, TypeArena, VariableKey};
use indexmap::IndexMap;

fn main() {
    let app = Module::new("myOrg", "app", "1.0.0");

    let mut types = TypeArena::new();
    let owner = types.record(
        &app,
        "Owner",
        vec![
            Field::required("name", TypeArena::STRING),
            Field::optional("email", TypeArena::STRING),
        ],
    );

    let mut variables = IndexMap::new();
    variables.insert(
        app.clone(),
        vec![
            VariableKey::new(app.clone(), "host", TypeArena::STRING, true),
            VariableKey::new(app.clone(), "port", TypeArena::INT, true),
            VariableKey::new(app.clone(), "owner", owner, false),
        ],
    );

    let config = r#"
        [app]
        host = "localhost"
        port = 8080

        [app.owner]
        name = "ops"
    "#;
    let settings = ProviderSettings::from_vars(["-Cport=9090"], None, Some(config.to_string()));

    let result = resolve(&app, &variables, &types, &settings);
    if result.has_errors() {
        eprintln!("{}", result.render_report());
        return;
    }
    match result.to_json() {
        Ok(json) => println!("Resolved configuration:\n{json}"),
        Err(e) => eprintln!("Failed to serialize configuration: {e}"),
    }
}
