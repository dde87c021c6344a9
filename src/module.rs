use crate::types::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A compilation unit, identified by organization, name and version.
///
/// Sub-modules carry a dotted name such as `test_module.util.foo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Module {
    pub org: String,
    pub name: String,
    pub version: String,
}

impl Module {
    pub fn new(org: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Module {
            org: org.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// `org.name`, the section name that addresses this module from anywhere.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.org, self.name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.org, self.name, self.version)
    }
}

/// The declared identity of a configurable variable.
///
/// Two keys are the same variable when module and name match; the declared
/// type and the required flag do not take part in equality.
#[derive(Debug, Clone)]
pub struct VariableKey {
    pub module: Module,
    pub variable: String,
    pub ty: TypeId,
    pub required: bool,
}

impl VariableKey {
    pub fn new(module: Module, variable: impl Into<String>, ty: TypeId, required: bool) -> Self {
        VariableKey {
            module,
            variable: variable.into(),
            ty,
            required,
        }
    }

    /// `org.module.variable`, the only command line form accepted outside the root organization.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}.{}", self.module.qualified_name(), self.variable)
    }
}

impl PartialEq for VariableKey {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module && self.variable == other.variable
    }
}

impl Eq for VariableKey {}

impl Hash for VariableKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.module.hash(state);
        self.variable.hash(state);
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.module.org, self.module.name, self.variable)
    }
}
