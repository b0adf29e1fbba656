//! Types of the QIR subset.

use rustc_hash::FxHashMap;
use std::fmt;

/// A first-class type in the IR subset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// The void type (function returns only).
    Void,
    /// An integer type of the given bit width (`i1`, `i64`, ...).
    Int(u32),
    /// A pointer to another type.
    Pointer(Box<Type>),
    /// A reference to a named struct type (`%Qubit`, `%TupleHeader`, ...).
    Named(String),
}

impl Type {
    /// Shorthand for a named type.
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(name.into())
    }

    /// Wrap this type in a pointer.
    #[must_use]
    pub fn pointer_to(self) -> Self {
        Type::Pointer(Box::new(self))
    }

    /// Check whether this is an integer type of the given width.
    pub fn is_int(&self, bits: u32) -> bool {
        matches!(self, Type::Int(b) if *b == bits)
    }

    /// The pointee type, if this is a pointer.
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// The struct name behind one level of pointer, if any.
    pub fn pointee_struct(&self) -> Option<&str> {
        match self.pointee()? {
            Type::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{bits}"),
            Type::Pointer(inner) => write!(f, "{inner}*"),
            Type::Named(name) => write!(f, "%{name}"),
        }
    }
}

/// A named struct type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    /// The type name, without the leading `%`.
    pub name: String,
    /// Field types, empty for opaque types.
    pub fields: Vec<Type>,
    /// Whether the type was declared `opaque`.
    pub opaque: bool,
}

/// The module-level table of named struct types.
///
/// Definition order is preserved so a reprinted module keeps its header
/// stable.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    order: Vec<String>,
    defs: FxHashMap<String, StructDef>,
}

impl TypeTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a named struct type. Returns false if the name already exists.
    pub fn define(&mut self, def: StructDef) -> bool {
        if self.defs.contains_key(&def.name) {
            return false;
        }
        self.order.push(def.name.clone());
        self.defs.insert(def.name.clone(), def);
        true
    }

    /// Look up a struct definition by name.
    pub fn get(&self, name: &str) -> Option<&StructDef> {
        self.defs.get(name)
    }

    /// Whether the table contains a definition for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Iterate over definitions in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &StructDef> {
        self.order.iter().filter_map(|name| self.defs.get(name))
    }
}
