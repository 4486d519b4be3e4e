//! Configuration error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::node::NodeKind;

/// Result type for configuration operations.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Errors that can occur while loading or accessing configuration data.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Malformed parameter substitution in the source stream.
    #[error("parameter substitution failed: {0}")]
    Substitution(#[from] SubstitutionError),

    /// The node at a key exists but has a different type.
    #[error("incorrect type for node '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        /// The requested key.
        key: String,
        /// The type the caller asked for.
        expected: NodeKind,
        /// The type stored in the tree.
        found: NodeKind,
    },

    /// A path segment that must be a table resolved to a leaf.
    #[error("node '{key}' is not a table (found {found})")]
    NotATable {
        /// The offending path prefix.
        key: String,
        /// The type stored at that prefix.
        found: NodeKind,
    },

    /// No node exists at the key and no fallback was given.
    #[error("no node at '{key}'")]
    MissingKey {
        /// The requested key.
        key: String,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML (or JSON) parsing error.
    #[error("failed to parse YAML configuration: {0}")]
    Yaml(#[from] yaml_rust2::ScanError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Create a new type mismatch error.
    pub fn type_mismatch(key: impl Into<String>, expected: NodeKind, found: NodeKind) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected,
            found,
        }
    }

    /// Create a new not-a-table error.
    pub fn not_a_table(key: impl Into<String>, found: NodeKind) -> Self {
        Self::NotATable {
            key: key.into(),
            found,
        }
    }

    /// Create a new missing key error.
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey { key: key.into() }
    }
}

impl From<io::Error> for ConfigError {
    /// Substitution failures raised inside a reader surface as `InvalidData`
    /// I/O errors; unwrap them so callers can match on the cause.
    fn from(err: io::Error) -> Self {
        let is_substitution = err
            .get_ref()
            .is_some_and(|inner| inner.is::<SubstitutionError>());
        if !is_substitution {
            return Self::Io(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<SubstitutionError>()) {
            Some(Ok(cause)) => Self::Substitution(*cause),
            Some(Err(other)) => Self::Io(io::Error::new(io::ErrorKind::InvalidData, other)),
            None => Self::Io(io::Error::from(io::ErrorKind::InvalidData)),
        }
    }
}

/// Malformed `${name}` / `$name` sequences found while filtering a stream.
///
/// Every variant carries the byte offset in the raw source at which the
/// problem was detected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionError {
    /// The parameter name is not in the supplied mapping.
    #[error("unknown parameter '{name}' at byte {offset}")]
    UnknownParameter {
        /// Parameter name.
        name: String,
        /// Byte offset of the closing delimiter.
        offset: u64,
    },

    /// Input ended while a parameter was still open.
    #[error("unterminated parameter '{name}' at end of input (byte {offset})")]
    UnterminatedParameter {
        /// Name accumulated so far.
        name: String,
        /// Total bytes read from the source.
        offset: u64,
    },

    /// A bare newline inside a `${` parameter.
    #[error("newline inside parameter '{name}' at byte {offset}")]
    NewlineInParameter {
        /// Name accumulated so far.
        name: String,
        /// Byte offset of the newline.
        offset: u64,
    },

    /// A `$` while another parameter is open.
    #[error("unexpected $ in input at byte {offset}")]
    UnexpectedDollar {
        /// Byte offset of the `$`.
        offset: u64,
    },

    /// A `{` that does not follow a `$`.
    #[error("unexpected {{ in input at byte {offset}")]
    UnexpectedOpenBrace {
        /// Byte offset of the brace.
        offset: u64,
    },

    /// A `}` with no open parameter.
    #[error("unmatched }} in input at byte {offset}")]
    UnmatchedCloseBrace {
        /// Byte offset of the brace.
        offset: u64,
    },

    /// The parameter name is not valid UTF-8.
    #[error("parameter name is not valid UTF-8 at byte {offset}")]
    InvalidParameterName {
        /// Byte offset of the closing delimiter.
        offset: u64,
    },
}

impl From<SubstitutionError> for io::Error {
    fn from(err: SubstitutionError) -> Self {
        Self::new(io::ErrorKind::InvalidData, err)
    }
}
