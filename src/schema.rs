//! JSON schema describing the TOML layout expected for a set of configurable variables.
//!
//! Editors can use the schema to validate and complete `Config.toml` files.

use crate::module::{Module, VariableKey};
use crate::types::{Type, TypeArena, TypeId};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";

#[derive(Default)]
struct SectionNode {
    children: BTreeMap<String, SectionNode>,
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl SectionNode {
    fn into_json(self) -> Value {
        let mut properties = self.properties;
        for (name, child) in self.children {
            properties.insert(name, child.into_json());
        }
        let mut schema = json!({
            "type": "object",
            "additionalProperties": false,
            "properties": properties,
        });
        if !self.required.is_empty() {
            schema["required"] = json!(self.required);
        }
        schema
    }
}

/// Builds the schema for `variables`. Variables whose type cannot be configured are left out.
///
/// Modules appear under their `org` and then each segment of their (possibly dotted) name,
/// matching `[org.module]` sections.
pub fn config_schema(variables: &IndexMap<Module, Vec<VariableKey>>, types: &TypeArena) -> Value {
    let mut root = SectionNode::default();
    for (module, keys) in variables {
        let section = std::iter::once(module.org.as_str())
            .chain(module.name.split('.'))
            .fold(&mut root, |node, segment| {
                node.children.entry(segment.to_string()).or_default()
            });
        for key in keys.iter().filter(|k| types.is_configurable(k.ty)) {
            section
                .properties
                .insert(key.variable.clone(), type_schema(types, key.ty));
            if key.required && !section.required.contains(&key.variable) {
                section.required.push(key.variable.clone());
            }
        }
    }

    let mut schema = root.into_json();
    schema["$schema"] = json!(SCHEMA_DRAFT);
    schema
}

fn type_schema(types: &TypeArena, id: TypeId) -> Value {
    match types.effective_type(id) {
        Type::Int => json!({ "type": "integer" }),
        Type::Byte => json!({ "type": "integer", "minimum": 0, "maximum": 255 }),
        Type::Boolean => json!({ "type": "boolean" }),
        Type::Float | Type::Decimal => json!({ "type": "number" }),
        Type::String | Type::Xml => json!({ "type": "string" }),
        Type::Array { element } => json!({
            "type": "array",
            "items": type_schema(types, *element),
        }),
        Type::Record(record) => {
            let mut properties = Map::new();
            for field in &record.fields {
                properties.insert(field.name.clone(), type_schema(types, field.ty));
            }
            let required: Vec<&str> = record
                .fields
                .iter()
                .filter(|f| f.required)
                .map(|f| f.name.as_str())
                .collect();
            let additional = match record.rest {
                Some(rest) => type_schema(types, rest),
                None => json!(false),
            };
            let mut schema = json!({
                "type": "object",
                "additionalProperties": additional,
                "properties": properties,
            });
            if !required.is_empty() {
                schema["required"] = json!(required);
            }
            schema
        }
        Type::Table { constraint, .. } => json!({
            "type": "array",
            "items": type_schema(types, *constraint),
        }),
        Type::Map { constraint, .. } => json!({
            "type": "object",
            "additionalProperties": type_schema(types, *constraint),
        }),
        Type::Union { members } => json!({
            "anyOf": members.iter().map(|m| type_schema(types, *m)).collect::<Vec<_>>(),
        }),
        // Never configurable, so nothing can be said about their values.
        Type::Readonly | Type::Intersection { .. } | Type::Tuple(_) => json!({}),
    }
}
