use crate::coerce::{
    byte_from_text, from_text, parse_boolean, parse_decimal, parse_float, parse_int, parse_xml,
    union_from_text,
};
use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::error::ConfigError;
use crate::module::{Module, VariableKey};
use crate::provider::{ConfigProvider, Lookup};
use crate::types::TypeArena;
use crate::value::{ConfigValue, Record, Table, Xml};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

const CLI_PREFIX: &str = "-C";

/// Values given on the command line as `-Ckey=value`.
///
/// Keys are looked up as `org.module.variable`; inside the root organization the
/// shorter `module.variable` and, for the root module, a bare `variable` are
/// accepted as well.
pub struct CliProvider {
    root: Module,
    raw_args: Vec<String>,
    args: IndexMap<String, String>,
    claims: ClaimTable,
    consumed: HashSet<String>,
}

/// Which variable each raw command line key has been bound to.
#[derive(Debug, Default)]
struct ClaimTable {
    claims: HashMap<String, VariableKey>,
}

impl ClaimTable {
    fn claimant(&self, raw_key: &str) -> Option<&VariableKey> {
        self.claims.get(raw_key)
    }

    fn claim(&mut self, raw_key: &str, key: &VariableKey) {
        self.claims
            .entry(raw_key.to_string())
            .or_insert_with(|| key.clone());
    }
}

/// Outcome of matching one variable against the argument map.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Claim {
    Unclaimed,
    /// `raw_key` provides the value; `forms` are every present form, claimed together.
    Bound { raw_key: String, forms: Vec<String> },
    /// Several forms with different values; sorted.
    Ambiguous { forms: Vec<String> },
}

/// Candidate argument keys for `key`, most qualified first.
fn candidate_keys(root: &Module, key: &VariableKey) -> Vec<String> {
    let mut forms = vec![key.fully_qualified_name()];
    if key.module.org == root.org {
        forms.push(format!("{}.{}", key.module.name, key.variable));
        if key.module == *root {
            forms.push(key.variable.clone());
        }
    }
    forms.dedup();
    forms
}

fn claim_for(args: &IndexMap<String, String>, root: &Module, key: &VariableKey) -> Claim {
    let forms: Vec<String> = candidate_keys(root, key)
        .into_iter()
        .filter(|form| args.contains_key(form))
        .collect();
    match forms.first() {
        None => Claim::Unclaimed,
        Some(first) => {
            let value = &args[first];
            if forms.iter().all(|form| &args[form] == value) {
                Claim::Bound {
                    raw_key: first.clone(),
                    forms,
                }
            } else {
                let mut forms = forms;
                forms.sort();
                Claim::Ambiguous { forms }
            }
        }
    }
}

impl CliProvider {
    pub fn new<I, S>(root: Module, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CliProvider {
            root,
            raw_args: args.into_iter().map(Into::into).collect(),
            args: IndexMap::new(),
            claims: ClaimTable::default(),
            consumed: HashSet::new(),
        }
    }

    /// The parsed `key -> value` map, in first-seen order.
    pub fn args(&self) -> &IndexMap<String, String> {
        &self.args
    }

    /// Finds the argument for `key`, applying the ambiguity rules and recording claims.
    fn find(&mut self, key: &VariableKey) -> Lookup<String> {
        match claim_for(&self.args, &self.root, key) {
            Claim::Unclaimed => Ok(None),
            Claim::Ambiguous { forms } => {
                let listed = forms
                    .iter()
                    .map(|form| format!("{}={}", form, self.args[form]))
                    .collect::<Vec<_>>()
                    .join(", ");
                for form in &forms {
                    self.claims.claim(form, key);
                    self.consumed.insert(form.clone());
                }
                log::debug!("command line arguments {listed} clash for {key}");
                Err(Diagnostic::error(
                    ConfigError::CliArgsAmbiguity {
                        name: key.variable.clone(),
                        args: format!("[{listed}]"),
                    },
                    None,
                ))
            }
            Claim::Bound { raw_key, forms } => {
                if let Some(existing) = self.claims.claimant(&raw_key).filter(|k| *k != key) {
                    return Err(Diagnostic::error(
                        ConfigError::CliVariableAmbiguity {
                            variable: key.to_string(),
                            existing: existing.to_string(),
                            suggestion: format!("-C{}=<value>", key.fully_qualified_name()),
                        },
                        None,
                    ));
                }
                self.claims.claim(&key.fully_qualified_name(), key);
                for form in &forms {
                    self.claims.claim(form, key);
                    self.consumed.insert(form.clone());
                }
                log::trace!("bound command line argument '{raw_key}' to {key}");
                Ok(Some(self.args[&raw_key].clone()))
            }
        }
    }

    fn structured<T>(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<T> {
        match self.find(key)? {
            None => Ok(None),
            Some(_) => Err(Diagnostic::error(
                ConfigError::CliTypeNotSupported {
                    name: key.variable.clone(),
                    ty: types.display(types.effective(key.ty)).to_string(),
                },
                None,
            )),
        }
    }
}

impl ConfigProvider for CliProvider {
    fn initialize(&mut self, _diagnostics: &mut DiagnosticLog) {
        self.args.clear();
        for arg in &self.raw_args {
            let Some(pair) = arg.strip_prefix(CLI_PREFIX) else {
                continue;
            };
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let mut key = key.trim().to_string();
            if key.ends_with('\\') {
                key.push(' ');
            }
            self.args.insert(key, value.to_string());
        }
        log::debug!("read {} command line configuration argument(s)", self.args.len());
    }

    fn has_configs(&self) -> bool {
        self.args.keys().any(|k| !self.consumed.contains(k))
    }

    fn get_int_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<i64> {
        self.find(key)?
            .map(|text| from_text(types, key, &text, parse_int))
            .transpose()
    }

    fn get_byte_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<u8> {
        self.find(key)?
            .map(|text| byte_from_text(types, key, &text))
            .transpose()
    }

    fn get_boolean_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<bool> {
        self.find(key)?
            .map(|text| from_text(types, key, &text, parse_boolean))
            .transpose()
    }

    fn get_float_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<f64> {
        self.find(key)?
            .map(|text| from_text(types, key, &text, parse_float))
            .transpose()
    }

    fn get_decimal_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Decimal> {
        self.find(key)?
            .map(|text| from_text(types, key, &text, parse_decimal))
            .transpose()
    }

    fn get_string_and_mark(&mut self, _types: &TypeArena, key: &VariableKey) -> Lookup<String> {
        self.find(key)
    }

    fn get_xml_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Xml> {
        self.find(key)?
            .map(|text| from_text(types, key, &text, parse_xml))
            .transpose()
    }

    fn get_array_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Vec<ConfigValue>> {
        self.structured(types, key)
    }

    fn get_record_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Record> {
        self.structured(types, key)
    }

    fn get_table_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Table> {
        self.structured(types, key)
    }

    fn get_union_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<ConfigValue> {
        self.find(key)?
            .map(|text| union_from_text(types, key, &text))
            .transpose()
    }

    fn mark_as_used(&mut self, _types: &TypeArena, key: &VariableKey) {
        match claim_for(&self.args, &self.root, key) {
            Claim::Unclaimed => {}
            Claim::Bound { forms, .. } | Claim::Ambiguous { forms } => {
                self.consumed.extend(forms);
            }
        }
    }

    fn complete(&mut self, diagnostics: &mut DiagnosticLog) {
        for (key, value) in &self.args {
            if self.consumed.insert(key.clone()) {
                diagnostics.warn(
                    ConfigError::UnusedCliArg {
                        arg: format!("{key}={value}"),
                    },
                    None,
                );
            }
        }
    }
}
