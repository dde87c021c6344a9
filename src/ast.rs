//! A span-aware tree of a parsed TOML configuration document.
//!
//! The tree is built from `toml_edit`'s immutable document so that every node keeps the
//! byte range it came from. Providers use the ranges for diagnostics and the node ids
//! to track which entries were consumed.

use crate::diagnostics::SourceFile;
use std::ops::Range;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct TomlNode {
    pub id: NodeId,
    pub kind: TomlNodeKind,
    pub span: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TomlNodeKind {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Datetime(String),
    Array(Vec<TomlNode>),
    Table(Vec<TomlEntry>),
}

/// A `key = value` pair, or a `[header]` table together with its body.
#[derive(Debug, Clone, PartialEq)]
pub struct TomlEntry {
    pub key: String,
    pub value: TomlNode,
    pub span: Option<Range<usize>>,
}

impl TomlNodeKind {
    /// The shape name used in "expected ..., but found '<shape>'" messages.
    pub fn shape(&self) -> &'static str {
        match self {
            TomlNodeKind::Integer(_) => "int",
            TomlNodeKind::Float(_) => "float",
            TomlNodeKind::Boolean(_) => "boolean",
            TomlNodeKind::String(_) => "string",
            TomlNodeKind::Datetime(_) => "datetime",
            TomlNodeKind::Array(_) => "array",
            TomlNodeKind::Table(_) => "record",
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, TomlNodeKind::Array(_) | TomlNodeKind::Table(_))
    }
}

impl TomlNode {
    pub fn entries(&self) -> Option<&[TomlEntry]> {
        match &self.kind {
            TomlNodeKind::Table(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn entry(&self, key: &str) -> Option<&TomlEntry> {
        self.entries()?.iter().find(|e| e.key == key)
    }

    /// Visits this node and every node below it.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TomlNode)) {
        visit(self);
        match &self.kind {
            TomlNodeKind::Array(items) => items.iter().for_each(|item| item.walk(visit)),
            TomlNodeKind::Table(entries) => entries.iter().for_each(|e| e.value.walk(visit)),
            _ => {}
        }
    }
}

/// A syntax problem reported while parsing a TOML document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseIssue {
    pub message: String,
    pub span: Option<Range<usize>>,
}

#[derive(Debug, Clone)]
pub struct TomlDocument {
    pub root: TomlNode,
    pub source: Arc<SourceFile>,
    node_count: usize,
}

impl TomlDocument {
    /// Parses `text`. `name` is the file name shown in diagnostics.
    pub fn parse(text: &str, name: Option<String>) -> Result<Self, (Arc<SourceFile>, Vec<ParseIssue>)> {
        let source = Arc::new(SourceFile::new(name, text.to_string()));
        let document = match toml_edit::ImDocument::parse(text) {
            Ok(document) => document,
            Err(err) => {
                let issue = ParseIssue {
                    message: err.message().trim().to_string(),
                    span: err.span(),
                };
                return Err((source, vec![issue]));
            }
        };

        let mut builder = TreeBuilder { next_id: 0 };
        let mut root = builder.table(document.as_table());
        root.span = Some(0..text.len());
        Ok(TomlDocument {
            root,
            source,
            node_count: builder.next_id,
        })
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// The exact source text of a node, when its span is known.
    pub fn raw_text(&self, node: &TomlNode) -> Option<&str> {
        let span = node.span.clone()?;
        self.source.text().get(span)
    }
}

struct TreeBuilder {
    next_id: usize,
}

impl TreeBuilder {
    fn node(&mut self, kind: TomlNodeKind, span: Option<Range<usize>>) -> TomlNode {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        TomlNode { id, kind, span }
    }

    /// A standard table. Its span runs from the header to the end of its last
    /// inline value; sub-tables declared under later headers are not included.
    fn table(&mut self, table: &toml_edit::Table) -> TomlNode {
        let mut entries = Vec::new();
        let mut end = table.span().map(|s| s.end);
        for (key, item) in table.iter() {
            let key_span = table.get_key_value(key).and_then(|(k, _)| k.span());
            let Some(value) = self.item(item) else {
                continue;
            };
            let span = match item {
                toml_edit::Item::Value(_) => join(key_span, value.span.clone()),
                _ => value.span.clone(),
            };
            if matches!(item, toml_edit::Item::Value(_)) {
                if let Some(entry_end) = span.as_ref().map(|s| s.end) {
                    end = Some(end.map_or(entry_end, |e| e.max(entry_end)));
                }
            }
            entries.push(TomlEntry {
                key: key.to_string(),
                value,
                span,
            });
        }
        let span = match (table.span(), end) {
            (Some(header), Some(end)) => Some(header.start..end),
            _ => None,
        };
        self.node(TomlNodeKind::Table(entries), span)
    }

    fn item(&mut self, item: &toml_edit::Item) -> Option<TomlNode> {
        match item {
            toml_edit::Item::None => None,
            toml_edit::Item::Value(value) => Some(self.value(value)),
            toml_edit::Item::Table(table) => Some(self.table(table)),
            toml_edit::Item::ArrayOfTables(tables) => {
                let rows: Vec<TomlNode> = tables.iter().map(|t| self.table(t)).collect();
                let span = match (rows.first(), rows.last()) {
                    (Some(first), Some(last)) => join(first.span.clone(), last.span.clone()),
                    _ => tables.span(),
                };
                Some(self.node(TomlNodeKind::Array(rows), span))
            }
        }
    }

    fn value(&mut self, value: &toml_edit::Value) -> TomlNode {
        let span = value.span();
        let kind = match value {
            toml_edit::Value::String(s) => TomlNodeKind::String(s.value().clone()),
            toml_edit::Value::Integer(i) => TomlNodeKind::Integer(*i.value()),
            toml_edit::Value::Float(f) => TomlNodeKind::Float(*f.value()),
            toml_edit::Value::Boolean(b) => TomlNodeKind::Boolean(*b.value()),
            toml_edit::Value::Datetime(d) => TomlNodeKind::Datetime(d.value().to_string()),
            toml_edit::Value::Array(array) => {
                TomlNodeKind::Array(array.iter().map(|v| self.value(v)).collect())
            }
            toml_edit::Value::InlineTable(table) => {
                let mut entries = Vec::new();
                for (key, value) in table.iter() {
                    let key_span = table.get_key_value(key).and_then(|(k, _)| k.span());
                    let node = self.value(value);
                    entries.push(TomlEntry {
                        key: key.to_string(),
                        span: join(key_span, node.span.clone()),
                        value: node,
                    });
                }
                TomlNodeKind::Table(entries)
            }
        };
        self.node(kind, span)
    }
}

fn join(start: Option<Range<usize>>, end: Option<Range<usize>>) -> Option<Range<usize>> {
    match (start, end) {
        (Some(start), Some(end)) => Some(start.start..end.end),
        (start, end) => start.or(end),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> TomlDocument {
        TomlDocument::parse(text, Some("Config.toml".to_string())).unwrap()
    }

    #[test]
    fn test_module_sections_become_nested_tables() {
        let doc = parse("[myOrg.test_module]\nintVar = 42\n");
        let org = doc.root.entry("myOrg").unwrap();
        let module = org.value.entry("test_module").unwrap();
        let var = module.value.entry("intVar").unwrap();
        assert_eq!(var.value.kind, TomlNodeKind::Integer(42));
        assert_eq!(doc.raw_text(&var.value), Some("42"));
    }

    #[test]
    fn test_entry_span_covers_key_and_value() {
        let text = "[test_module]\nintVar = 1.25\n";
        let doc = parse(text);
        let entry = doc
            .root
            .entry("test_module")
            .and_then(|m| m.value.entry("intVar"))
            .unwrap();
        let span = entry.span.clone().unwrap();
        assert_eq!(&text[span], "intVar = 1.25");
    }

    #[test]
    fn test_array_of_tables_is_an_array_of_records() {
        let doc = parse("[[test_module.people]]\nname = \"a\"\n[[test_module.people]]\nname = \"b\"\n");
        let people = doc
            .root
            .entry("test_module")
            .and_then(|m| m.value.entry("people"))
            .unwrap();
        match &people.value.kind {
            TomlNodeKind::Array(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1].kind.shape(), "record");
            }
            other => panic!("expected an array, found {other:?}"),
        }
    }

    #[test]
    fn test_node_ids_are_unique() {
        let doc = parse("a = [1, 2, { b = 3 }]\n[c]\nd = true\n");
        let mut ids = Vec::new();
        doc.root.walk(&mut |node| ids.push(node.id));
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
        assert_eq!(count, doc.node_count());
    }

    #[test]
    fn test_syntax_error_reports_issue() {
        let (_, issues) = TomlDocument::parse("[test_module\nx = 1", None).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].span.is_some());
    }
}
