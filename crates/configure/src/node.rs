//! Node model for the configuration tree.
//!
//! A [`Node`] is either a [`Table`] of named children or a typed scalar leaf.
//! Arrays are not represented.

use std::fmt;

use indexmap::IndexMap;

/// Ordered mapping of child names to nodes. Insertion order is preserved and
/// names are unique within a table.
pub type Table = IndexMap<String, Node>;

/// A value in the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Nested table.
    Table(Table),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// Boolean.
    Boolean(bool),
    /// UTF-8 string.
    String(String),
}

/// The type tag of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// [`Node::Table`]
    Table,
    /// [`Node::Integer`]
    Integer,
    /// [`Node::Real`]
    Real,
    /// [`Node::Boolean`]
    Boolean,
    /// [`Node::String`]
    String,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Boolean => "boolean",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

impl Node {
    /// The type tag of this node.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Table(_) => NodeKind::Table,
            Self::Integer(_) => NodeKind::Integer,
            Self::Real(_) => NodeKind::Real,
            Self::Boolean(_) => NodeKind::Boolean,
            Self::String(_) => NodeKind::String,
        }
    }

    /// Borrow the table if this is a table node.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Mutably borrow the table if this is a table node.
    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Whether this is a table node.
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table(_))
    }
}

impl From<Table> for Node {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

/// A scalar type that can be stored as a leaf node.
///
/// Implemented for `i64`, `f64`, `bool` and `String`. The [`Default`] value is
/// what an auto-created leaf starts out as.
pub trait Leaf: Default + Sized {
    /// Node type that stores this value.
    const KIND: NodeKind;

    /// Borrow the value if `node` holds this type.
    fn from_node(node: &Node) -> Option<&Self>;

    /// Mutably borrow the value if `node` holds this type.
    fn from_node_mut(node: &mut Node) -> Option<&mut Self>;

    /// Wrap the value in a node.
    fn into_node(self) -> Node;
}

macro_rules! impl_leaf {
    ($ty:ty, $variant:ident) => {
        impl Leaf for $ty {
            const KIND: NodeKind = NodeKind::$variant;

            fn from_node(node: &Node) -> Option<&Self> {
                match node {
                    Node::$variant(value) => Some(value),
                    _ => None,
                }
            }

            fn from_node_mut(node: &mut Node) -> Option<&mut Self> {
                match node {
                    Node::$variant(value) => Some(value),
                    _ => None,
                }
            }

            fn into_node(self) -> Node {
                Node::$variant(self)
            }
        }

        impl From<$ty> for Node {
            fn from(value: $ty) -> Self {
                Node::$variant(value)
            }
        }
    };
}

impl_leaf!(i64, Integer);
impl_leaf!(f64, Real);
impl_leaf!(bool, Boolean);
impl_leaf!(String, String);

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}
