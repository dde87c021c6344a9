//! The subset of the host language's static types needed to validate configuration values.
//!
//! Types live in a [`TypeArena`] and refer to each other by [`TypeId`], which lets
//! self-referential tuples and records be expressed without shared mutable nodes.

use crate::module::Module;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Byte,
    Boolean,
    Float,
    Decimal,
    String,
    Xml,
    Readonly,
    Array {
        element: TypeId,
    },
    Record(RecordType),
    Table {
        constraint: TypeId,
        key_fields: Vec<String>,
    },
    Map {
        constraint: TypeId,
        readonly: bool,
    },
    Union {
        members: Vec<TypeId>,
    },
    /// `A & B & ...`. `effective` is the shape values must have.
    Intersection {
        constituents: Vec<TypeId>,
        effective: TypeId,
    },
    Tuple(TupleType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    pub name: String,
    pub module: Module,
    pub fields: Vec<Field>,
    /// Type of fields not listed in `fields`; `None` for closed records.
    pub rest: Option<TypeId>,
}

impl RecordType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    /// Required and without a default value.
    pub required: bool,
}

impl Field {
    pub fn required(name: impl Into<String>, ty: TypeId) -> Self {
        Field {
            name: name.into(),
            ty,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, ty: TypeId) -> Self {
        Field {
            name: name.into(),
            ty,
            required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleType {
    pub name: Option<String>,
    pub members: Vec<TypeId>,
    pub rest: Option<TypeId>,
    pub readonly: bool,
}

#[derive(Debug, Clone)]
pub struct TypeArena {
    types: Vec<Type>,
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeArena {
    pub const INT: TypeId = TypeId(0);
    pub const BYTE: TypeId = TypeId(1);
    pub const BOOLEAN: TypeId = TypeId(2);
    pub const FLOAT: TypeId = TypeId(3);
    pub const DECIMAL: TypeId = TypeId(4);
    pub const STRING: TypeId = TypeId(5);
    pub const XML: TypeId = TypeId(6);
    pub const READONLY: TypeId = TypeId(7);

    pub fn new() -> Self {
        TypeArena {
            types: vec![
                Type::Int,
                Type::Byte,
                Type::Boolean,
                Type::Float,
                Type::Decimal,
                Type::String,
                Type::Xml,
                Type::Readonly,
            ],
        }
    }

    pub fn add(&mut self, ty: Type) -> TypeId {
        self.types.push(ty);
        TypeId(self.types.len() - 1)
    }

    /// Ids are only handed out by this arena, so lookups always succeed for ids it created.
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0]
    }

    pub fn array(&mut self, element: TypeId) -> TypeId {
        self.add(Type::Array { element })
    }

    /// `T & readonly`, with `T` as the effective type.
    pub fn readonly(&mut self, ty: TypeId) -> TypeId {
        self.add(Type::Intersection {
            constituents: vec![ty, Self::READONLY],
            effective: ty,
        })
    }

    pub fn record(&mut self, module: &Module, name: impl Into<String>, fields: Vec<Field>) -> TypeId {
        self.add(Type::Record(RecordType {
            name: name.into(),
            module: module.clone(),
            fields,
            rest: None,
        }))
    }

    pub fn table(&mut self, constraint: TypeId, key_fields: &[&str]) -> TypeId {
        self.add(Type::Table {
            constraint,
            key_fields: key_fields.iter().map(|k| k.to_string()).collect(),
        })
    }

    pub fn map(&mut self, constraint: TypeId, readonly: bool) -> TypeId {
        self.add(Type::Map {
            constraint,
            readonly,
        })
    }

    pub fn union(&mut self, members: Vec<TypeId>) -> TypeId {
        self.add(Type::Union { members })
    }

    /// Reserves an empty, named tuple that members can be added to afterwards.
    /// This is how cyclic tuples such as `type Foo [int, Foo[]]` are built.
    pub fn declare_tuple(&mut self, name: Option<&str>) -> TypeId {
        self.add(Type::Tuple(TupleType {
            name: name.map(str::to_string),
            members: Vec::new(),
            rest: None,
            readonly: false,
        }))
    }

    /// Appends a member to a tuple. A tuple can never be its own direct member,
    /// so `tuple == member` is refused and `false` is returned.
    pub fn add_tuple_member(&mut self, tuple: TypeId, member: TypeId) -> bool {
        if tuple == member {
            return false;
        }
        match &mut self.types[tuple.0] {
            Type::Tuple(t) => {
                t.members.push(member);
                true
            }
            _ => false,
        }
    }

    /// Strips intersection wrappers down to the shape values must have.
    pub fn effective(&self, id: TypeId) -> TypeId {
        let mut current = id;
        // Each step moves to a strictly different node; the bound guards malformed arenas.
        for _ in 0..self.types.len() {
            match self.get(current) {
                Type::Intersection { effective, .. } if *effective != current => {
                    current = *effective
                }
                _ => break,
            }
        }
        current
    }

    pub fn effective_type(&self, id: TypeId) -> &Type {
        self.get(self.effective(id))
    }

    pub fn is_primitive(&self, id: TypeId) -> bool {
        matches!(
            self.effective_type(id),
            Type::Int
                | Type::Byte
                | Type::Boolean
                | Type::Float
                | Type::Decimal
                | Type::String
                | Type::Xml
        )
    }

    fn is_primitive_union(&self, id: TypeId) -> bool {
        match self.effective_type(id) {
            Type::Union { members } => {
                !members.is_empty() && members.iter().all(|m| self.is_primitive(*m))
            }
            _ => false,
        }
    }

    /// Whether a configurable variable may be declared with this type.
    pub fn is_configurable(&self, id: TypeId) -> bool {
        self.configurable(id, false)
    }

    /// Whether a record field (or table column) of this type can be given a value.
    pub fn is_configurable_field(&self, id: TypeId) -> bool {
        self.configurable(id, true)
    }

    fn configurable(&self, id: TypeId, allow_map: bool) -> bool {
        match self.effective_type(id) {
            Type::Int
            | Type::Byte
            | Type::Boolean
            | Type::Float
            | Type::Decimal
            | Type::String
            | Type::Xml => true,
            Type::Array { element } => {
                self.is_primitive(*element)
                    || self.is_primitive_union(*element)
                    || matches!(self.effective_type(*element), Type::Record(_))
            }
            Type::Record(_) | Type::Table { .. } => true,
            Type::Union { .. } => self.is_primitive_union(id),
            Type::Map { constraint, .. } => allow_map && self.is_primitive(*constraint),
            Type::Readonly | Type::Intersection { .. } | Type::Tuple(_) => false,
        }
    }

    pub fn display(&self, id: TypeId) -> TypeDisplay<'_> {
        TypeDisplay { arena: self, id }
    }

    fn write_type(
        &self,
        id: TypeId,
        f: &mut fmt::Formatter<'_>,
        expanding: &mut Vec<TypeId>,
    ) -> fmt::Result {
        if expanding.contains(&id) {
            return match self.get(id) {
                Type::Tuple(TupleType { name: Some(name), .. }) => write!(f, "{name}"),
                Type::Record(record) if !record.name.is_empty() => {
                    write!(f, "{}:{}", record.module.name, record.name)
                }
                _ => write!(f, "..."),
            };
        }
        expanding.push(id);
        let result = self.write_type_body(id, f, expanding);
        expanding.pop();
        result
    }

    fn write_type_body(
        &self,
        id: TypeId,
        f: &mut fmt::Formatter<'_>,
        expanding: &mut Vec<TypeId>,
    ) -> fmt::Result {
        match self.get(id) {
            Type::Int => write!(f, "int"),
            Type::Byte => write!(f, "byte"),
            Type::Boolean => write!(f, "boolean"),
            Type::Float => write!(f, "float"),
            Type::Decimal => write!(f, "decimal"),
            Type::String => write!(f, "string"),
            Type::Xml => write!(f, "xml"),
            Type::Readonly => write!(f, "readonly"),
            Type::Array { element } => {
                let wrap = matches!(
                    self.get(*element),
                    Type::Union { .. } | Type::Intersection { .. }
                );
                if wrap {
                    write!(f, "(")?;
                }
                self.write_type(*element, f, expanding)?;
                if wrap {
                    write!(f, ")")?;
                }
                write!(f, "[]")
            }
            Type::Record(record) if !record.name.is_empty() => {
                write!(f, "{}:{}", record.module.name, record.name)
            }
            Type::Record(record) => {
                write!(f, "record {{|")?;
                for field in &record.fields {
                    write!(f, " ")?;
                    self.write_type(field.ty, f, expanding)?;
                    let marker = if field.required { "" } else { "?" };
                    write!(f, " {}{};", field.name, marker)?;
                }
                write!(f, " |}}")
            }
            Type::Table {
                constraint,
                key_fields,
            } => {
                write!(f, "table<")?;
                self.write_type(*constraint, f, expanding)?;
                write!(f, ">")?;
                if !key_fields.is_empty() {
                    write!(f, " key({})", key_fields.join(", "))?;
                }
                Ok(())
            }
            Type::Map {
                constraint,
                readonly,
            } => {
                write!(f, "map<")?;
                self.write_type(*constraint, f, expanding)?;
                write!(f, ">")?;
                if *readonly {
                    write!(f, " & readonly")?;
                }
                Ok(())
            }
            Type::Union { members } => self.write_joined(members, "|", f, expanding),
            Type::Intersection { constituents, .. } => {
                self.write_joined(constituents, " & ", f, expanding)
            }
            Type::Tuple(tuple) => {
                write!(f, "[")?;
                self.write_joined(&tuple.members, ",", f, expanding)?;
                if let Some(rest) = tuple.rest {
                    if !tuple.members.is_empty() {
                        write!(f, ",")?;
                    }
                    self.write_type(rest, f, expanding)?;
                    write!(f, "...")?;
                }
                write!(f, "]")?;
                if tuple.readonly {
                    write!(f, " & readonly")?;
                }
                Ok(())
            }
        }
    }

    fn write_joined(
        &self,
        ids: &[TypeId],
        separator: &str,
        f: &mut fmt::Formatter<'_>,
        expanding: &mut Vec<TypeId>,
    ) -> fmt::Result {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                write!(f, "{separator}")?;
            }
            self.write_type(*id, f, expanding)?;
        }
        Ok(())
    }
}

/// Renders a type the way it appears in diagnostics, e.g. `int[] & readonly`.
pub struct TypeDisplay<'a> {
    arena: &'a TypeArena,
    id: TypeId,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.arena.write_type(self.id, f, &mut Vec::new())
    }
}
