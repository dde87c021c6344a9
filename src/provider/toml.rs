use crate::ast::{NodeId, TomlDocument, TomlEntry, TomlNode, TomlNodeKind};
use crate::coerce::{Site, Subject, TomlCoercer};
use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::error::ConfigError;
use crate::module::{Module, VariableKey};
use crate::provider::{ConfigProvider, Lookup};
use crate::types::{TypeArena, TypeId};
use crate::value::{ConfigValue, Record, Table, Xml};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::ops::Range;
use std::path::PathBuf;

/// Where the TOML text comes from.
#[derive(Debug, Clone)]
enum Origin {
    File(PathBuf),
    Content(String),
}

/// Values read from a TOML document, either a file or inline content.
///
/// Modules are addressed as `[org.module]`, or as `[module]` when the module
/// belongs to the root organization. Sub-modules use nested tables
/// (`[myOrg.test_module.util.foo]`).
pub struct TomlProvider {
    root: Module,
    origin: Origin,
    document: Option<TomlDocument>,
    state: LookupState,
}

#[derive(Debug, Default)]
struct LookupState {
    consumed: HashSet<NodeId>,
    reported_sections: HashSet<String>,
}

/// A place a module's variables may live in.
struct Section {
    label: String,
    path: Vec<String>,
}

fn sections_for(root: &Module, module: &Module) -> Vec<Section> {
    let mut sections = vec![Section {
        label: module.qualified_name(),
        path: std::iter::once(module.org.clone())
            .chain(module.name.split('.').map(str::to_string))
            .collect(),
    }];
    if module.org == root.org {
        sections.push(Section {
            label: module.name.clone(),
            path: module.name.split('.').map(str::to_string).collect(),
        });
    }
    sections
}

enum SectionNode<'d> {
    Absent,
    Table(&'d TomlNode),
    /// The path exists but ends in (or passes through) something that is not a table.
    Invalid(Option<&'d Range<usize>>),
}

fn section_node<'d>(document: &'d TomlDocument, path: &[String]) -> SectionNode<'d> {
    let mut current = &document.root;
    for segment in path {
        let Some(entry) = current.entry(segment) else {
            return SectionNode::Absent;
        };
        if !matches!(entry.value.kind, TomlNodeKind::Table(_)) {
            return SectionNode::Invalid(entry.span.as_ref().or(entry.value.span.as_ref()));
        }
        current = &entry.value;
    }
    SectionNode::Table(current)
}

/// Finds the entry for `key`, marking it consumed.
fn locate<'d>(
    document: &'d TomlDocument,
    root: &Module,
    state: &mut LookupState,
    key: &VariableKey,
) -> Lookup<&'d TomlEntry> {
    let mut found: Vec<(String, &'d TomlEntry)> = Vec::new();
    let mut invalid = None;
    for section in sections_for(root, &key.module) {
        match section_node(document, &section.path) {
            SectionNode::Absent => {}
            SectionNode::Invalid(span) => {
                invalid.get_or_insert((section.label, span));
            }
            SectionNode::Table(table) => {
                if let Some(entry) = table.entry(&key.variable) {
                    found.push((section.label, entry));
                }
            }
        }
    }

    for (_, entry) in &found {
        state.consumed.insert(entry.value.id);
    }
    match found.len() {
        0 => match invalid {
            Some((label, span)) if state.reported_sections.insert(label.clone()) => {
                Err(Diagnostic::error(
                    ConfigError::InvalidModuleStructure { module: label },
                    span.map(|s| document.source.location(s.start, s.end)),
                ))
            }
            _ => Ok(None),
        },
        1 => Ok(found.pop().map(|(_, entry)| entry)),
        _ => {
            let mut labels: Vec<String> = found.iter().map(|(label, _)| label.clone()).collect();
            labels.sort();
            let span = found.last().and_then(|(_, e)| e.span.as_ref());
            Err(Diagnostic::error(
                ConfigError::TomlSectionAmbiguity {
                    name: key.variable.clone(),
                    sections: format!("[{}]", labels.join(", ")),
                },
                span.map(|s| document.source.location(s.start, s.end)),
            ))
        }
    }
}

/// Collects entries nobody consumed: empty or untouched tables by path, values as `path=raw`.
fn unused_entries<'d>(
    document: &'d TomlDocument,
    node: &'d TomlNode,
    prefix: &str,
    consumed: &HashSet<NodeId>,
    out: &mut Vec<(String, &'d TomlEntry)>,
) {
    let Some(entries) = node.entries() else {
        return;
    };
    for entry in entries {
        if consumed.contains(&entry.value.id) {
            continue;
        }
        let path = if prefix.is_empty() {
            entry.key.clone()
        } else {
            format!("{prefix}.{}", entry.key)
        };
        match &entry.value.kind {
            TomlNodeKind::Table(children) if !children.is_empty() => {
                unused_entries(document, &entry.value, &path, consumed, out);
            }
            TomlNodeKind::Table(_) => out.push((path, entry)),
            _ => {
                let label = match document.raw_text(&entry.value) {
                    Some(raw) if !raw.starts_with("[[") => format!("{path}={raw}"),
                    _ => path,
                };
                out.push((label, entry));
            }
        }
    }
}

impl TomlProvider {
    pub fn from_file(path: impl Into<PathBuf>, root: Module) -> Self {
        TomlProvider::with_origin(Origin::File(path.into()), root)
    }

    pub fn from_content(content: impl Into<String>, root: Module) -> Self {
        TomlProvider::with_origin(Origin::Content(content.into()), root)
    }

    fn with_origin(origin: Origin, root: Module) -> Self {
        TomlProvider {
            root,
            origin,
            document: None,
            state: LookupState::default(),
        }
    }

    /// The parsed document, once `initialize` succeeded.
    pub fn document(&self) -> Option<&TomlDocument> {
        self.document.as_ref()
    }

    fn read_source(&self, diagnostics: &mut DiagnosticLog) -> Option<(String, Option<String>)> {
        match &self.origin {
            Origin::Content(content) => Some((content.clone(), None)),
            Origin::File(path) => {
                let shown = path.display().to_string();
                if !path.exists() {
                    diagnostics.warn(ConfigError::FileNotFound { path: shown }, None);
                    return None;
                }
                match fs::read_to_string(path) {
                    Ok(text) if text.trim().is_empty() => {
                        diagnostics.warn(ConfigError::EmptyFile { path: shown }, None);
                        None
                    }
                    Ok(text) => {
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or(shown);
                        Some((text, Some(name)))
                    }
                    Err(err) => {
                        diagnostics.error(
                            ConfigError::FileRead {
                                path: shown,
                                reason: err.to_string(),
                            },
                            None,
                        );
                        None
                    }
                }
            }
        }
    }

    fn lookup<T>(
        &mut self,
        types: &TypeArena,
        key: &VariableKey,
        coerce: impl FnOnce(&TomlCoercer<'_>, Site<'_>, TypeId, &Subject) -> Result<T, Diagnostic>,
    ) -> Lookup<T> {
        let Some(document) = &self.document else {
            return Ok(None);
        };
        let Some(entry) = locate(document, &self.root, &mut self.state, key)? else {
            return Ok(None);
        };
        let coercer = TomlCoercer::new(types, document, &key.variable);
        let site = Site::new(&entry.value, entry.span.as_ref());
        coerce(&coercer, site, key.ty, &coercer.subject()).map(Some)
    }

    fn unused(&self) -> Vec<(String, &TomlEntry)> {
        let mut out = Vec::new();
        if let Some(document) = &self.document {
            unused_entries(document, &document.root, "", &self.state.consumed, &mut out);
        }
        out
    }
}

impl ConfigProvider for TomlProvider {
    fn initialize(&mut self, diagnostics: &mut DiagnosticLog) {
        self.document = None;
        let Some((text, name)) = self.read_source(diagnostics) else {
            return;
        };
        match TomlDocument::parse(&text, name) {
            Ok(document) => {
                log::debug!(
                    "parsed configuration document with {} node(s)",
                    document.node_count()
                );
                self.document = Some(document);
            }
            Err((source, issues)) => {
                let mut listed = String::new();
                for issue in issues {
                    match issue.span {
                        Some(span) => {
                            let location = source.location(span.start, span.end);
                            let _ = writeln!(listed, "{location} {}", issue.message);
                        }
                        None => {
                            let _ = writeln!(listed, "{}", issue.message);
                        }
                    }
                }
                diagnostics.error(ConfigError::InvalidToml { issues: listed }, None);
            }
        }
    }

    fn has_configs(&self) -> bool {
        !self.unused().is_empty()
    }

    fn get_int_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<i64> {
        self.lookup(types, key, |c, site, ty, subject| c.int(site, ty, subject))
    }

    fn get_byte_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<u8> {
        self.lookup(types, key, |c, site, ty, subject| c.byte(site, ty, subject))
    }

    fn get_boolean_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<bool> {
        self.lookup(types, key, |c, site, ty, subject| c.boolean(site, ty, subject))
    }

    fn get_float_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<f64> {
        self.lookup(types, key, |c, site, ty, subject| c.float(site, ty, subject))
    }

    fn get_decimal_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Decimal> {
        self.lookup(types, key, |c, site, ty, subject| c.decimal(site, ty, subject))
    }

    fn get_string_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<String> {
        self.lookup(types, key, |c, site, ty, subject| c.string(site, ty, subject))
    }

    fn get_xml_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Xml> {
        self.lookup(types, key, |c, site, ty, subject| c.xml(site, ty, subject))
    }

    fn get_array_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Vec<ConfigValue>> {
        self.lookup(types, key, |c, site, ty, subject| c.array(site, ty, subject))
    }

    fn get_record_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Record> {
        self.lookup(types, key, |c, site, ty, subject| c.record(site, ty, subject))
    }

    fn get_table_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<Table> {
        self.lookup(types, key, |c, site, ty, subject| c.table(site, ty, subject))
    }

    fn get_union_and_mark(&mut self, types: &TypeArena, key: &VariableKey) -> Lookup<ConfigValue> {
        self.lookup(types, key, |c, site, ty, subject| c.union(site, ty, subject))
    }

    fn mark_as_used(&mut self, _types: &TypeArena, key: &VariableKey) {
        if let Some(document) = &self.document {
            // Structure problems surface through the variables that can be resolved.
            let _ = locate(document, &self.root, &mut self.state, key);
        }
    }

    fn complete(&mut self, diagnostics: &mut DiagnosticLog) {
        let Some(document) = &self.document else {
            return;
        };
        let mut unused = Vec::new();
        unused_entries(document, &document.root, "", &self.state.consumed, &mut unused);
        for (label, entry) in unused {
            let location = entry
                .span
                .as_ref()
                .or(entry.value.span.as_ref())
                .map(|s| document.source.location(s.start, s.end));
            diagnostics.warn(ConfigError::UnusedTomlValue { entry: label }, location);
            self.state.consumed.insert(entry.value.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Module {
        Module::new("myOrg", "test_module", "1.0.0")
    }

    #[test]
    fn test_sections_inside_root_org() {
        let sub = Module::new("myOrg", "test_module.util.foo", "1.0.0");
        let labels: Vec<String> = sections_for(&root(), &sub)
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["myOrg.test_module.util.foo", "test_module.util.foo"]);
    }

    #[test]
    fn test_sections_outside_root_org() {
        let other = Module::new("otherOrg", "lib", "1.0.0");
        let sections = sections_for(&root(), &other);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].path, vec!["otherOrg", "lib"]);
    }

    #[test]
    fn test_complete_is_idempotent() {
        let mut provider = TomlProvider::from_content("[test_module]\nx = 1\n", root());
        let mut log = DiagnosticLog::new();
        provider.initialize(&mut log);
        assert!(provider.has_configs());
        provider.complete(&mut log);
        provider.complete(&mut log);
        assert_eq!(log.warning_count(), 1);
        assert_eq!(
            log.diagnostics()[0].message(),
            "unused configuration value 'test_module.x=1'"
        );
        assert!(log.diagnostics()[0].location.is_some());
        assert!(!provider.has_configs());
    }
}
