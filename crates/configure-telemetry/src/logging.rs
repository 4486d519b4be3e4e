//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with a JSON or pretty formatting
//! layer, filtered by an [`EnvFilter`] directive string. The settings can be
//! built in code or read from a section of a configuration store.
//!
//! # Example
//!
//! ```rust,no_run
//! use configure::TomlConfig;
//! use configure_telemetry::{init_logging, LogConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = TomlConfig::new();
//! config.load_str("[logging]\nlevel = \"debug\"\nformat = \"pretty\"\n")?;
//!
//! let log_config = LogConfig::from_config(&config, "logging")?;
//! init_logging(&log_config)?;
//!
//! tracing::info!(key = "logging.level", "Configuration loaded");
//! # Ok(())
//! # }
//! ```

use configure::{Adapter, Config, ConfigError, Node, NodeKind};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directives (e.g., "info", "configure=debug,warn").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include span events (new, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread IDs.
    pub thread_ids: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            thread_ids: false,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
        }
    }

    /// Reads logging settings from the table at `root` in `config`.
    ///
    /// Recognised keys below `root` are `enabled`, `level`, `format`
    /// (`json` or `pretty`), `span_events`, `file_line_info`, `thread_ids`
    /// and `include_target`. Absent keys keep their [`LogConfig::default`]
    /// value. Boolean keys also accept strings such as `"yes"` or `"off"`,
    /// which is how YAML and JSON stores hold them.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfig`] for an unrecognised format
    /// or boolean word, and [`TelemetryError::Config`] if a key holds a value
    /// of the wrong type or the path runs through a non-table.
    pub fn from_config<A: Adapter>(config: &Config<A>, root: &str) -> TelemetryResult<Self> {
        let defaults = Self::default();
        let key = |name: &str| {
            if root.is_empty() {
                name.to_string()
            } else {
                format!("{root}.{name}")
            }
        };

        let format_key = key("format");
        let default_format = if defaults.json_format { "json" } else { "pretty" };
        let json_format = match config.as_string_or(&format_key, default_format)?.as_str() {
            "json" => true,
            "pretty" => false,
            other => {
                return Err(TelemetryError::invalid_config(
                    &format_key,
                    format!("unknown format '{other}', expected json or pretty"),
                ))
            }
        };

        Ok(Self {
            enabled: read_bool(config, &key("enabled"), defaults.enabled)?,
            level: config.as_string_or(&key("level"), defaults.level)?,
            json_format,
            span_events: read_bool(config, &key("span_events"), defaults.span_events)?,
            file_line_info: read_bool(config, &key("file_line_info"), defaults.file_line_info)?,
            thread_ids: read_bool(config, &key("thread_ids"), defaults.thread_ids)?,
            include_target: read_bool(config, &key("include_target"), defaults.include_target)?,
        })
    }
}

/// Initializes the logging subsystem.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the level directives are invalid
/// or a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    tracing_subscriber::registry()
        .with(fmt_layer(config).with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

// The formatting layer, JSON or pretty, with the shared field options.
fn fmt_layer(config: &LogConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_thread_ids(config.thread_ids)
        .with_target(config.include_target);

    if config.json_format {
        layer.json().boxed()
    } else {
        layer.pretty().boxed()
    }
}

fn read_bool<A: Adapter>(config: &Config<A>, key: &str, default: bool) -> TelemetryResult<bool> {
    match config.tree().resolve(key)? {
        None => Ok(default),
        Some(Node::Boolean(value)) => Ok(*value),
        // YAML infers "0" and "1" as integers.
        Some(Node::Integer(0)) => Ok(false),
        Some(Node::Integer(1)) => Ok(true),
        Some(Node::String(text)) => parse_bool(text).ok_or_else(|| {
            TelemetryError::invalid_config(key, format!("'{text}' is not a boolean"))
        }),
        Some(other) => Err(ConfigError::type_mismatch(key, NodeKind::Boolean, other.kind()).into()),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
