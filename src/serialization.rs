use crate::resolver::ResolvedConfigs;
use crate::value::ConfigValue;
use serde::Serialize;
use std::collections::BTreeMap;

/// Resolved values laid out the way a TOML file would supply them:
/// `org.module` sections holding `variable = value` pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Value {
    sections: BTreeMap<String, BTreeMap<String, ConfigValue>>,
}

impl Value {
    pub fn section(&self, module: &str) -> Option<&BTreeMap<String, ConfigValue>> {
        self.sections.get(module)
    }
}

pub(crate) fn to_value(configs: &ResolvedConfigs) -> Value {
    let mut sections: BTreeMap<String, BTreeMap<String, ConfigValue>> = BTreeMap::new();
    for (key, value) in configs.iter() {
        sections
            .entry(key.module.qualified_name())
            .or_default()
            .insert(key.variable.clone(), value.clone());
    }
    Value { sections }
}
