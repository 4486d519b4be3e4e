//! Path-addressed configuration tree.
//!
//! Keys are hierarchical and name a complete path to their target using
//! dotted components, *e.g.* `"table.nested.value"`. The empty key names the
//! root table. Segments cannot contain a literal `.`.

use tracing::{debug, trace};

use crate::error::{ConfigError, Result};
use crate::node::{Leaf, Node, NodeKind, Table};

const KEY_DELIMITER: char = '.';

/// A tree of tables and typed scalar leaves.
///
/// References handed out by the accessors borrow the tree, so they stay valid
/// until the next mutating call.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    // Always a `Node::Table`.
    root: Node,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            root: Node::Table(Table::new()),
        }
    }

    /// Find the node at `key`.
    ///
    /// Returns `Ok(None)` if any segment is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotATable`] if an intermediate segment exists
    /// but is not a table.
    pub fn resolve(&self, key: &str) -> Result<Option<&Node>> {
        let mut node = &self.root;
        if key.is_empty() {
            return Ok(Some(node));
        }
        for (prefix, segment) in segments(key) {
            let table = match node {
                Node::Table(table) => table,
                other => return Err(ConfigError::not_a_table(prefix, other.kind())),
            };
            match table.get(segment) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        Ok(Some(node))
    }

    /// Whether any node exists at exactly `key`.
    ///
    /// A path that runs through a leaf does not exist.
    pub fn has_key(&self, key: &str) -> bool {
        matches!(self.resolve(key), Ok(Some(_)))
    }

    /// Borrow the leaf at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] if there is no node at `key` and
    /// [`ConfigError::TypeMismatch`] if the node is not a `T`.
    pub fn get_leaf<T: Leaf>(&self, key: &str) -> Result<&T> {
        let node = self
            .resolve(key)?
            .ok_or_else(|| ConfigError::missing_key(key))?;
        T::from_node(node).ok_or_else(|| ConfigError::type_mismatch(key, T::KIND, node.kind()))
    }

    /// Copy the leaf at `key`, or return `fallback` if there is no node.
    ///
    /// # Errors
    ///
    /// The fallback does not cover a type mismatch: an existing node of
    /// another type is still [`ConfigError::TypeMismatch`].
    pub fn get_leaf_or<T: Leaf + Clone>(&self, key: &str, fallback: T) -> Result<T> {
        match self.resolve(key)? {
            None => Ok(fallback),
            Some(node) => T::from_node(node)
                .cloned()
                .ok_or_else(|| ConfigError::type_mismatch(key, T::KIND, node.kind())),
        }
    }

    /// Borrow the leaf at `key` mutably, creating it if it does not exist.
    ///
    /// Missing parent tables are created along the way and a new leaf starts
    /// out as `T::default()`. An existing node is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TypeMismatch`] if a node of another type already
    /// exists at `key`, or [`ConfigError::NotATable`] if a parent segment is a
    /// leaf. The tree is unchanged on error.
    pub fn get_or_create_leaf<T: Leaf>(&mut self, key: &str) -> Result<&mut T> {
        if key.is_empty() {
            return Err(ConfigError::type_mismatch(key, T::KIND, NodeKind::Table));
        }
        let (parent, name) = key.rsplit_once(KEY_DELIMITER).unwrap_or(("", key));
        let table = self.create_table_path(parent)?;
        let node = table.entry(name.to_string()).or_insert_with(|| {
            trace!(key, kind = %T::KIND, "creating leaf");
            T::default().into_node()
        });
        let found = node.kind();
        T::from_node_mut(node).ok_or_else(|| ConfigError::type_mismatch(key, T::KIND, found))
    }

    /// Walk to the table at `key`, creating every missing table on the way.
    ///
    /// Tables are only created below the last existing node, so a failed walk
    /// leaves the tree as it was.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotATable`] if an existing node along the path,
    /// including the last one, is not a table.
    pub fn create_table_path(&mut self, key: &str) -> Result<&mut Table> {
        let kind = self.root.kind();
        let mut table = self
            .root
            .as_table_mut()
            .ok_or_else(|| ConfigError::not_a_table("", kind))?;
        if key.is_empty() {
            return Ok(table);
        }
        for (prefix, segment) in segments(key) {
            let node = table.entry(segment.to_string()).or_insert_with(|| {
                trace!(key = %join(prefix, segment), "creating table");
                Node::Table(Table::new())
            });
            let kind = node.kind();
            table = node
                .as_table_mut()
                .ok_or_else(|| ConfigError::not_a_table(join(prefix, segment), kind))?;
        }
        Ok(table)
    }

    /// Place `table` at `root_key`.
    ///
    /// An empty `root_key` replaces the whole tree. Otherwise the path is
    /// created as needed and its contents are replaced by `table`; nothing
    /// is merged below that point.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotATable`] if a node along `root_key` is a leaf.
    pub fn merge_subtree(&mut self, root_key: &str, table: Table) -> Result<()> {
        debug!(root = root_key, entries = table.len(), "merging subtree");
        if root_key.is_empty() {
            *self = Self::from(table);
            return Ok(());
        }
        let (parent, name) = root_key
            .rsplit_once(KEY_DELIMITER)
            .unwrap_or(("", root_key));
        // The terminal node is replaced whatever it held before.
        self.create_table_path(parent)?
            .insert(name.to_string(), Node::Table(table));
        Ok(())
    }
}

impl From<Table> for Tree {
    fn from(table: Table) -> Self {
        Self {
            root: Node::Table(table),
        }
    }
}

// Yields `(prefix, segment)` pairs where `prefix` is the path before
// `segment`, *e.g.* `("", "a")`, `("a", "b")`, `("a.b", "c")`.
fn segments(key: &str) -> impl Iterator<Item = (&str, &str)> {
    let mut start = 0;
    key.split(KEY_DELIMITER).map(move |segment| {
        let prefix = if start == 0 { "" } else { &key[..start - 1] };
        start += segment.len() + 1;
        (prefix, segment)
    })
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}{KEY_DELIMITER}{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        let mut tree = Tree::new();
        *tree.get_or_create_leaf::<String>("string").unwrap() = "string".to_string();
        *tree.get_or_create_leaf::<i64>("section.int").unwrap() = 123;
        *tree.get_or_create_leaf::<f64>("section.table.float").unwrap() = 1.23;
        tree
    }

    #[test]
    fn test_segments() {
        let pairs: Vec<_> = segments("a.b.c").collect();
        assert_eq!(pairs, [("", "a"), ("a", "b"), ("a.b", "c")]);
        let single: Vec<_> = segments("key").collect();
        assert_eq!(single, [("", "key")]);
    }

    #[test]
    fn test_resolve() {
        let tree = sample();
        assert_eq!(tree.resolve("section.int").unwrap(), Some(&Node::Integer(123)));
        assert!(tree.resolve("section.table").unwrap().unwrap().is_table());
        assert!(tree.resolve("section.none").unwrap().is_none());
        assert!(tree.resolve("none.deeper").unwrap().is_none());
        assert!(tree.resolve("").unwrap().unwrap().is_table());
    }

    #[test]
    fn test_resolve_through_leaf_fails() {
        let tree = sample();
        let err = tree.resolve("section.int.deeper").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotATable { ref key, found: NodeKind::Integer } if key == "section.int"
        ));
    }

    #[test]
    fn test_has_key() {
        let tree = sample();
        assert!(tree.has_key("section.int"));
        assert!(tree.has_key("section"));
        assert!(tree.has_key(""));
        assert!(!tree.has_key("section.none"));
        assert!(!tree.has_key("section.int.deeper"));
    }

    #[test]
    fn test_auto_vivification() {
        let mut tree = Tree::new();
        assert_eq!(tree.get_or_create_leaf::<String>("a.b.c").unwrap(), "");

        assert!(tree.has_key("a"));
        assert!(tree.has_key("a.b"));
        assert!(tree.resolve("a.b").unwrap().unwrap().is_table());
        assert!(matches!(
            tree.get_leaf::<String>("a.b"),
            Err(ConfigError::TypeMismatch { found: NodeKind::Table, .. })
        ));
    }

    #[test]
    fn test_get_or_create_returns_existing() {
        let mut tree = sample();
        assert_eq!(*tree.get_or_create_leaf::<i64>("section.int").unwrap(), 123);
    }

    #[test]
    fn test_get_or_create_type_mismatch_leaves_tree_unchanged() {
        let mut tree = sample();
        let before = tree.clone();

        for key in ["section", "section.table", "section.int"] {
            let err = tree.get_or_create_leaf::<String>(key).unwrap_err();
            assert!(matches!(err, ConfigError::TypeMismatch { .. }), "{key}");
        }
        let err = tree.get_or_create_leaf::<String>("section.int.child").unwrap_err();
        assert!(matches!(err, ConfigError::NotATable { .. }));
        assert!(tree.get_or_create_leaf::<String>("").is_err());

        assert_eq!(tree, before);
    }

    #[test]
    fn test_get_leaf() {
        let tree = sample();
        assert_eq!(tree.get_leaf::<String>("string").unwrap(), "string");
        assert!(matches!(tree.get_leaf::<String>("none"), Err(ConfigError::MissingKey { .. })));
        assert!(matches!(
            tree.get_leaf::<f64>("section.int"),
            Err(ConfigError::TypeMismatch { expected: NodeKind::Real, found: NodeKind::Integer, .. })
        ));
    }

    #[test]
    fn test_get_leaf_or() {
        let tree = sample();
        assert_eq!(tree.get_leaf_or("section.int", 0_i64).unwrap(), 123);
        assert_eq!(tree.get_leaf_or("section.intx", 9_i64).unwrap(), 9);
        // The fallback does not mask a wrong type.
        assert!(tree.get_leaf_or("section.int", 1.0_f64).is_err());
        assert!(tree.get_leaf_or("section", String::new()).is_err());
    }

    #[test]
    fn test_create_table_path() {
        let mut tree = Tree::new();
        tree.create_table_path("x.y")
            .unwrap()
            .insert("z".to_string(), Node::from(true));
        assert_eq!(tree.get_leaf::<bool>("x.y.z").unwrap(), &true);

        // Existing tables are reused.
        assert!(tree.create_table_path("x.y").unwrap().contains_key("z"));
    }

    #[test]
    fn test_create_table_path_through_leaf_fails() {
        let mut tree = sample();
        let err = tree.create_table_path("section.int.more").unwrap_err();
        assert!(matches!(err, ConfigError::NotATable { ref key, .. } if key == "section.int"));
        assert!(tree.create_table_path("string").is_err());
    }

    #[test]
    fn test_merge_subtree_at_root_replaces_tree() {
        let mut tree = sample();
        let mut table = Table::new();
        table.insert("key1".to_string(), Node::from("value1"));

        tree.merge_subtree("", table).unwrap();
        assert!(!tree.has_key("section"));
        assert_eq!(tree.get_leaf::<String>("key1").unwrap(), "value1");
    }

    #[test]
    fn test_from_table() {
        let mut table = Table::new();
        table.insert("key1".to_string(), Node::from("value1"));

        let tree = Tree::from(table.clone());
        assert_eq!(tree.get_leaf::<String>("key1").unwrap(), "value1");

        let mut merged = sample();
        merged.merge_subtree("", table).unwrap();
        assert_eq!(merged, tree);
    }

    #[test]
    fn test_merge_subtree_replaces_exact_root_only() {
        let mut tree = sample();
        let mut table = Table::new();
        table.insert("key1".to_string(), Node::from("value1"));

        tree.merge_subtree("section.table", table.clone()).unwrap();
        assert_eq!(tree.get_leaf::<String>("section.table.key1").unwrap(), "value1");
        assert!(!tree.has_key("section.table.float"));
        assert_eq!(*tree.get_leaf::<i64>("section.int").unwrap(), 123);

        // A leaf at the root key is replaced by the table.
        tree.merge_subtree("string", table).unwrap();
        assert_eq!(tree.get_leaf::<String>("string.key1").unwrap(), "value1");
    }

    #[test]
    fn test_merge_subtree_through_leaf_fails() {
        let mut tree = sample();
        let before = tree.clone();
        assert!(tree.merge_subtree("section.int.sub", Table::new()).is_err());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_write_then_read() {
        let mut tree = Tree::new();
        *tree.get_or_create_leaf::<i64>("n.int").unwrap() = -5;
        *tree.get_or_create_leaf::<f64>("n.real").unwrap() = 2.5;
        *tree.get_or_create_leaf::<bool>("n.bool").unwrap() = true;
        *tree.get_or_create_leaf::<String>("n.str").unwrap() = "s".to_string();

        assert_eq!(*tree.get_leaf::<i64>("n.int").unwrap(), -5);
        assert_eq!(tree.get_leaf_or("n.real", 0.0).unwrap(), 2.5);
        assert!(*tree.get_leaf::<bool>("n.bool").unwrap());
        assert_eq!(tree.get_leaf_or("n.str", String::new()).unwrap(), "s");
    }
}
