use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::error::{ConfigError, ResolverError};
use crate::module::{Module, VariableKey};
use crate::provider::ConfigProvider;
use crate::types::TypeArena;
use crate::value::ConfigValue;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Values bound to configurable variables, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfigs {
    values: IndexMap<VariableKey, ConfigValue>,
}

impl ResolvedConfigs {
    pub fn get(&self, key: &VariableKey) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    /// Looks a value up by module and variable name.
    pub fn find(&self, module: &Module, variable: &str) -> Option<&ConfigValue> {
        self.values
            .iter()
            .find(|(key, _)| key.module == *module && key.variable == variable)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VariableKey, &ConfigValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_inner(self) -> IndexMap<VariableKey, ConfigValue> {
        self.values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Idle,
    Initializing,
    Resolving,
    Completing,
    Done,
}

/// Drives one resolution pass: initialize every provider, bind each declared
/// variable to the first provider that has a value for it, then let every
/// provider report what was left unused.
///
/// Problems with the configuration itself go to the diagnostic log; the only
/// error returned is misuse of the resolver.
pub struct ConfigResolver<'a> {
    variables: &'a IndexMap<Module, Vec<VariableKey>>,
    types: &'a TypeArena,
    diagnostics: &'a mut DiagnosticLog,
    providers: Vec<Box<dyn ConfigProvider + 'a>>,
    state: ResolverState,
}

impl<'a> ConfigResolver<'a> {
    /// `providers` are queried in order; the first one holding a value wins.
    pub fn new(
        variables: &'a IndexMap<Module, Vec<VariableKey>>,
        types: &'a TypeArena,
        diagnostics: &'a mut DiagnosticLog,
        providers: Vec<Box<dyn ConfigProvider + 'a>>,
    ) -> Self {
        ConfigResolver {
            variables,
            types,
            diagnostics,
            providers,
            state: ResolverState::Idle,
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    pub fn resolve_configs(&mut self) -> Result<ResolvedConfigs, ResolverError> {
        if self.state != ResolverState::Idle {
            return Err(ResolverError::AlreadyResolved);
        }

        self.enter(ResolverState::Initializing);
        for provider in &mut self.providers {
            provider.initialize(self.diagnostics);
        }

        self.enter(ResolverState::Resolving);
        let mut resolved = ResolvedConfigs::default();
        let variables = self.variables;
        for (module, keys) in variables {
            let mut declared: HashSet<&str> = HashSet::new();
            for key in keys {
                if !declared.insert(key.variable.as_str()) {
                    self.diagnostics.error(
                        ConfigError::DuplicateVariable {
                            name: key.variable.clone(),
                            module: module.to_string(),
                        },
                        None,
                    );
                    continue;
                }
                if let Some(value) = self.resolve_key(key) {
                    resolved.values.insert(key.clone(), value);
                }
            }
        }

        self.enter(ResolverState::Completing);
        for provider in &mut self.providers {
            provider.complete(self.diagnostics);
        }

        self.enter(ResolverState::Done);
        Ok(resolved)
    }

    fn enter(&mut self, state: ResolverState) {
        log::debug!("config resolver: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn resolve_key(&mut self, key: &VariableKey) -> Option<ConfigValue> {
        let types = self.types;
        if !types.is_configurable(key.ty) {
            self.diagnostics.error(
                ConfigError::UnsupportedType {
                    name: key.variable.clone(),
                    ty: types.display(key.ty).to_string(),
                },
                None,
            );
            for provider in &mut self.providers {
                provider.mark_as_used(types, key);
            }
            return None;
        }

        match self.lookup(key) {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                if key.required {
                    self.diagnostics.error(
                        ConfigError::MissingValue {
                            name: key.variable.clone(),
                        },
                        None,
                    );
                }
                None
            }
            Err(diagnostic) => {
                self.diagnostics.push(diagnostic);
                None
            }
        }
    }

    /// Asks providers in order. Once one answers, the rest only mark their
    /// entry for the key as used, since it has been overridden.
    fn lookup(&mut self, key: &VariableKey) -> Result<Option<ConfigValue>, Diagnostic> {
        let types = self.types;
        let mut outcome = Ok(None);
        for provider in &mut self.providers {
            if !matches!(outcome, Ok(None)) {
                provider.mark_as_used(types, key);
                continue;
            }
            outcome = provider.get_value_and_mark(types, key);
        }
        if let Ok(Some(_)) = &outcome {
            log::trace!("resolved {key}");
        }
        outcome
    }
}
