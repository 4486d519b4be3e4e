//! Hierarchical configuration store.
//!
//! This crate loads TOML, YAML and JSON text into a single tree of tables and
//! typed scalars, and offers typed access to values by dotted key path:
//! - Loading under an optional sub-root of the tree
//! - `${name}` parameter substitution applied to the raw byte stream
//! - Create-on-write access with strict per-node type checks
//!
//! # Overview
//!
//! - [`SubstitutingReader`] - Filters a byte source, replacing placeholders
//! - [`Tree`] - Resolves dotted keys against nested [`Table`]s
//! - [`Adapter`] - Parses one syntax ([`Toml`], [`Yaml`], [`Json`]) into a table
//! - [`Config`] - The load/access facade tying them together
//!
//! # Example
//!
//! ```
//! use configure::{LoadOptions, TomlConfig};
//!
//! # fn main() -> Result<(), configure::ConfigError> {
//! let toml = r#"
//!     [server]
//!     host = "${host}"
//!     port = 8080
//! "#;
//!
//! let mut config = TomlConfig::new();
//! config.load_str_with(toml, &LoadOptions::new().with_param("host", "localhost"))?;
//!
//! assert_eq!(config.as_string("server.host")?, "localhost");
//! assert_eq!(config.as_integer("server.port")?, 8080);
//! assert_eq!(config.as_integer_or("server.workers", 4)?, 4);
//! # Ok(())
//! # }
//! ```
//!
//! # Substitution Syntax
//!
//! - `${name}` - replaced by the value of parameter `name`
//! - `$name` - shorthand, terminated by `}` or a newline (which is consumed)
//! - `$$` - a literal `$`
//!
//! A placeholder naming a parameter that was not supplied fails the load.

#![warn(missing_docs)]

mod adapter;
mod config;
mod error;
mod node;
mod reader;
mod tree;

pub use adapter::{infer_scalar, Adapter, Json, Toml, Yaml};
pub use config::{Config, JsonConfig, LoadOptions, TomlConfig, YamlConfig};
pub use error::{ConfigError, Result, SubstitutionError};
pub use node::{Leaf, Node, NodeKind, Table};
pub use reader::{substitute, BracePolicy, Params, SubstitutingReader};
pub use tree::Tree;
