//! Typed configuration facade.
//!
//! [`Config`] owns a [`Tree`] and loads data into it through a syntax
//! [`Adapter`], optionally filtering the source through a
//! [`SubstitutingReader`] first.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::adapter::{Adapter, Json, Toml, Yaml};
use crate::error::{ConfigError, Result};
use crate::node::Leaf;
use crate::reader::{BracePolicy, Params, SubstitutingReader};
use crate::tree::Tree;

/// Where and how a load places its data.
///
/// # Example
///
/// ```
/// use configure::LoadOptions;
///
/// let options = LoadOptions::new()
///     .with_root("services.db")
///     .with_param("host", "localhost");
///
/// assert_eq!(options.root(), "services.db");
/// assert_eq!(options.params()["host"], "localhost");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    root: String,
    params: Params,
}

impl LoadOptions {
    /// Load at the tree root with no substitution.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place loaded data under `root` instead of replacing the whole tree.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Replace the substitution parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Add one substitution parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// The key path loaded data is placed at.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The substitution parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// A configuration store for one syntax.
///
/// Keys are hierarchical and specify a complete path to their target value
/// using dotted components, *e.g.* `"table.nested.value"`.
///
/// Every accessor comes in three forms:
///
/// - `as_<type>(key)` reads an existing value and fails if it is absent or
///   of another type.
/// - `as_<type>_or(key, fallback)` returns `fallback` if the key is absent but
///   still fails on a type mismatch.
/// - `as_<type>_mut(key)` creates the value (and any parent tables) if it is
///   absent and returns a mutable reference. The reference is valid until the
///   next mutating call.
///
/// # Example
///
/// ```
/// use configure::{LoadOptions, TomlConfig};
///
/// # fn main() -> Result<(), configure::ConfigError> {
/// let mut config = TomlConfig::new();
/// config.load_str_with(
///     "key1 = \"${value}\"",
///     &LoadOptions::new().with_root("sub").with_param("value", "value1"),
/// )?;
///
/// assert_eq!(config.as_string("sub.key1")?, "value1");
/// assert!(config.as_string("key1").is_err());
///
/// *config.as_integer_mut("sub.count")? += 2;
/// assert_eq!(config.as_integer("sub.count")?, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config<A> {
    tree: Tree,
    adapter: A,
}

/// TOML configuration store.
pub type TomlConfig = Config<Toml>;

/// YAML configuration store.
pub type YamlConfig = Config<Yaml>;

/// JSON configuration store.
pub type JsonConfig = Config<Json>;

impl<A: Adapter + Default> Config<A> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_adapter(A::default())
    }

    /// Create a store and load `source` into it.
    pub fn from_reader<R: Read>(source: R, options: &LoadOptions) -> Result<Self> {
        let mut config = Self::new();
        config.load_with(source, options)?;
        Ok(config)
    }

    /// Create a store and load the file at `path` into it.
    pub fn from_path<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Self> {
        let mut config = Self::new();
        config.load_path_with(path, options)?;
        Ok(config)
    }
}

impl<A: Adapter> Config<A> {
    /// Create an empty store that parses with `adapter`.
    pub fn with_adapter(adapter: A) -> Self {
        Self {
            tree: Tree::new(),
            adapter,
        }
    }

    /// Load `source`, replacing the whole tree.
    pub fn load<R: Read>(&mut self, source: R) -> Result<()> {
        self.load_with(source, &LoadOptions::default())
    }

    /// Load `source` according to `options`.
    ///
    /// The source is parsed completely before the tree is touched, so a
    /// failed load leaves the tree as it was.
    ///
    /// # Errors
    ///
    /// Returns a substitution, I/O or parse error from reading `source`, or
    /// [`ConfigError::NotATable`] if the root path runs through a leaf.
    pub fn load_with<R: Read>(&mut self, source: R, options: &LoadOptions) -> Result<()> {
        debug!(
            format = A::NAME,
            root = options.root(),
            params = options.params().len(),
            "loading configuration"
        );
        // Braces are structural in every supported syntax.
        let reader = SubstitutingReader::new(source, options.params())
            .with_brace_policy(BracePolicy::Literal);
        let table = self.adapter.parse(reader)?;
        self.tree.merge_subtree(options.root(), table)
    }

    /// Load the file at `path`, replacing the whole tree.
    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.load_path_with(path, &LoadOptions::default())
    }

    /// Load the file at `path` according to `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if the file does not exist and
    /// [`ConfigError::ReadError`] if it cannot be opened, otherwise as
    /// [`load_with`](Self::load_with).
    pub fn load_path_with<P: AsRef<Path>>(&mut self, path: P, options: &LoadOptions) -> Result<()> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let file = File::open(path).map_err(|e| ConfigError::read_error(path, e))?;
        debug!(path = %path.display(), "opened configuration file");
        self.load_with(file, options)
    }

    /// Load in-memory text, replacing the whole tree.
    pub fn load_str(&mut self, text: &str) -> Result<()> {
        self.load_with(text.as_bytes(), &LoadOptions::default())
    }

    /// Load in-memory text according to `options`.
    pub fn load_str_with(&mut self, text: &str, options: &LoadOptions) -> Result<()> {
        self.load_with(text.as_bytes(), options)
    }

    /// The underlying tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Whether any node exists at `key`.
    pub fn has_key(&self, key: &str) -> bool {
        self.tree.has_key(key)
    }

    /// Borrow an existing value of type `T`.
    pub fn get<T: Leaf>(&self, key: &str) -> Result<&T> {
        self.tree.get_leaf(key)
    }

    /// Copy a value of type `T`, or `fallback` if the key is absent.
    pub fn get_or<T: Leaf + Clone>(&self, key: &str, fallback: T) -> Result<T> {
        self.tree.get_leaf_or(key, fallback)
    }

    /// Borrow a value of type `T` mutably, creating it if absent.
    pub fn get_mut<T: Leaf>(&mut self, key: &str) -> Result<&mut T> {
        self.tree.get_or_create_leaf(key)
    }

    /// Get an integer value.
    pub fn as_integer(&self, key: &str) -> Result<i64> {
        self.get::<i64>(key).copied()
    }

    /// Get an integer value or `fallback` if the key is absent.
    pub fn as_integer_or(&self, key: &str, fallback: i64) -> Result<i64> {
        self.get_or(key, fallback)
    }

    /// Access an integer value, creating it as `0` if absent.
    pub fn as_integer_mut(&mut self, key: &str) -> Result<&mut i64> {
        self.get_mut(key)
    }

    /// Get a real value.
    pub fn as_real(&self, key: &str) -> Result<f64> {
        self.get::<f64>(key).copied()
    }

    /// Get a real value or `fallback` if the key is absent.
    pub fn as_real_or(&self, key: &str, fallback: f64) -> Result<f64> {
        self.get_or(key, fallback)
    }

    /// Access a real value, creating it as `0.0` if absent.
    pub fn as_real_mut(&mut self, key: &str) -> Result<&mut f64> {
        self.get_mut(key)
    }

    /// Get a string value.
    pub fn as_string(&self, key: &str) -> Result<&str> {
        self.get::<String>(key).map(String::as_str)
    }

    /// Get a string value or `fallback` if the key is absent.
    pub fn as_string_or(&self, key: &str, fallback: impl Into<String>) -> Result<String> {
        self.get_or(key, fallback.into())
    }

    /// Access a string value, creating it empty if absent.
    pub fn as_string_mut(&mut self, key: &str) -> Result<&mut String> {
        self.get_mut(key)
    }
}

// YAML and JSON values load booleans as strings, so only TOML stores get
// boolean accessors.
impl Config<Toml> {
    /// Get a boolean value.
    pub fn as_boolean(&self, key: &str) -> Result<bool> {
        self.get::<bool>(key).copied()
    }

    /// Get a boolean value or `fallback` if the key is absent.
    pub fn as_boolean_or(&self, key: &str, fallback: bool) -> Result<bool> {
        self.get_or(key, fallback)
    }

    /// Access a boolean value, creating it as `false` if absent.
    pub fn as_boolean_mut(&mut self, key: &str) -> Result<&mut bool> {
        self.get_mut(key)
    }
}
