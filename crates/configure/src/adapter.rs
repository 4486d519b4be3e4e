//! Syntax adapters.
//!
//! An [`Adapter`] turns the text of one configuration syntax into a [`Table`].
//! TOML maps directly onto the node types. YAML has no typed scalars of its
//! own here, so every scalar is run through numeric inference: an integer
//! (with `0x`/leading-`0` radix prefixes) if the whole text parses as one,
//! else a real if the whole text parses as a float, else a string. JSON is
//! read as the YAML subset it is.
//!
//! Sequences are not supported by the tree and are skipped by every adapter.

use std::collections::HashMap;
use std::io::Read;

use tracing::debug;
use yaml_rust2::parser::{Event, EventReceiver, Parser};
use yaml_rust2::scanner::TScalarStyle;

use crate::error::Result;
use crate::node::{Node, Table};

/// Parses one configuration syntax into a [`Table`].
pub trait Adapter {
    /// Syntax name used in log events.
    const NAME: &'static str;

    /// Parse the whole of `source`.
    ///
    /// # Errors
    ///
    /// Returns the syntax's parse error, or the I/O or substitution error
    /// raised while reading `source`.
    fn parse<R: Read>(&self, source: R) -> Result<Table>;
}

/// TOML syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct Toml;

/// YAML syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct Yaml;

/// JSON syntax, parsed as YAML.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Adapter for Toml {
    const NAME: &'static str = "toml";

    fn parse<R: Read>(&self, source: R) -> Result<Table> {
        let text = read_source(source)?;
        let document: toml::Table = text.parse()?;
        Ok(from_toml(document))
    }
}

impl Adapter for Yaml {
    const NAME: &'static str = "yaml";

    fn parse<R: Read>(&self, source: R) -> Result<Table> {
        let text = read_source(source)?;
        let mut events = Events::default();
        Parser::new_from_str(&text).load(&mut events, false)?;
        Ok(YamlBuilder::new(events.0).document())
    }
}

impl Adapter for Json {
    const NAME: &'static str = "json";

    fn parse<R: Read>(&self, source: R) -> Result<Table> {
        Yaml.parse(source)
    }
}

fn read_source<R: Read>(mut source: R) -> Result<String> {
    let mut text = String::new();
    source.read_to_string(&mut text)?;
    Ok(text)
}

fn from_toml(document: toml::Table) -> Table {
    let mut table = Table::with_capacity(document.len());
    for (key, value) in document {
        let node = match value {
            toml::Value::String(value) => Node::String(value),
            toml::Value::Integer(value) => Node::Integer(value),
            toml::Value::Float(value) => Node::Real(value),
            toml::Value::Boolean(value) => Node::Boolean(value),
            toml::Value::Datetime(value) => Node::String(value.to_string()),
            toml::Value::Table(value) => Node::Table(from_toml(value)),
            toml::Value::Array(_) => {
                debug!(key = %key, "skipping array value");
                continue;
            }
        };
        table.insert(key, node);
    }
    table
}

#[derive(Default)]
struct Events(Vec<Event>);

impl EventReceiver for Events {
    fn on_event(&mut self, event: Event) {
        self.0.push(event);
    }
}

// Builds a table from a parsed event stream. Scalars keep their source text
// and are typed by `infer_scalar` alone, whatever their quoting style.
struct YamlBuilder {
    events: std::vec::IntoIter<Event>,
    // Anchor id to the node it names; `None` for skipped values.
    anchors: HashMap<usize, Option<Node>>,
}

impl YamlBuilder {
    fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into_iter(),
            anchors: HashMap::new(),
        }
    }

    // Only the first document is read. A document that is not a mapping
    // yields an empty table.
    fn document(mut self) -> Table {
        while let Some(event) = self.events.next() {
            match event {
                Event::MappingStart(..) => return self.mapping(),
                Event::Scalar(..) | Event::SequenceStart(..) | Event::Alias(..) => {
                    debug!(event = ?event, "document is not a mapping, ignoring");
                    break;
                }
                Event::DocumentEnd | Event::StreamEnd => break,
                _ => {}
            }
        }
        Table::new()
    }

    // Consumes events up to and including the matching `MappingEnd`.
    fn mapping(&mut self) -> Table {
        let mut table = Table::new();
        while let Some(event) = self.events.next() {
            let key = match event {
                Event::MappingEnd => break,
                Event::Scalar(text, ..) => Some(text),
                other => {
                    self.value(other);
                    None
                }
            };
            let value = self.events.next().and_then(|event| self.value(event));
            match (key, value) {
                (Some(key), Some(node)) => {
                    table.insert(key, node);
                }
                (Some(key), None) => debug!(key = %key, "skipping unsupported value"),
                (None, _) => debug!("skipping non-scalar key"),
            }
        }
        table
    }

    fn value(&mut self, event: Event) -> Option<Node> {
        match event {
            Event::Scalar(text, style, anchor, ..) => {
                let node = scalar_node(&text, style);
                self.remember(anchor, node.clone());
                node
            }
            Event::MappingStart(anchor, ..) => {
                let node = Some(Node::Table(self.mapping()));
                self.remember(anchor, node.clone());
                node
            }
            Event::SequenceStart(anchor, ..) => {
                self.skip_sequence();
                self.remember(anchor, None);
                None
            }
            Event::Alias(anchor) => self.anchors.get(&anchor).cloned().flatten(),
            _ => None,
        }
    }

    fn skip_sequence(&mut self) {
        while let Some(event) = self.events.next() {
            if matches!(event, Event::SequenceEnd) {
                return;
            }
            self.value(event);
        }
    }

    fn remember(&mut self, anchor: usize, node: Option<Node>) {
        if anchor > 0 {
            self.anchors.insert(anchor, node);
        }
    }
}

// Plain empty, `~` and `null` scalars are YAML nulls and are skipped.
fn scalar_node(text: &str, style: TScalarStyle) -> Option<Node> {
    let is_null = style == TScalarStyle::Plain && matches!(text, "" | "~" | "null" | "Null" | "NULL");
    (!is_null).then(|| infer_scalar(text))
}

/// Infer the node type of a scalar from its text.
///
/// The whole text must be consumed for a numeric interpretation to win, so
/// `"12abc"` stays a string.
pub fn infer_scalar(text: &str) -> Node {
    if let Some(value) = parse_integer(text) {
        Node::Integer(value)
    } else if let Some(value) = parse_real(text) {
        Node::Real(value)
    } else {
        Node::String(text.to_string())
    }
}

// Optional sign, then `0x`/`0X` for hex, a leading `0` for octal, or decimal.
fn parse_integer(text: &str) -> Option<i64> {
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, digits) = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        (16, hex)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        (10, unsigned)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

fn parse_real(text: &str) -> Option<f64> {
    text.parse().ok()
}
