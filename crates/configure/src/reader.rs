//! Parameter-substituting stream filter.
//!
//! [`SubstitutingReader`] sits between a raw byte source and a parser and
//! rewrites placeholders as data is pulled through it:
//!
//! - `${name}` is replaced by `params[name]`.
//! - `$name` is a shorthand terminated by `}` or a newline; the terminator is
//!   consumed.
//! - `$$` is a literal `$`.
//!
//! Scanning state is carried across refills, so a placeholder may straddle
//! any number of reads from the source.
//!
//! # Example
//!
//! ```
//! use std::io::Read;
//! use configure::{Params, SubstitutingReader};
//!
//! let params = Params::from([("host".to_string(), "localhost".to_string())]);
//! let mut reader = SubstitutingReader::new("addr = \"${host}:$$80\"".as_bytes(), &params);
//!
//! let mut text = String::new();
//! reader.read_to_string(&mut text).unwrap();
//! assert_eq!(text, "addr = \"localhost:$80\"");
//! ```

use std::collections::BTreeMap;
use std::io::{self, BufRead, Read};

use crate::error::{Result, SubstitutionError};

/// Substitution parameters: placeholder name to replacement text.
pub type Params = BTreeMap<String, String>;

/// Number of raw bytes pulled from the source per refill.
const CHUNK_SIZE: usize = 1024;

/// How braces outside a placeholder are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BracePolicy {
    /// A `{` not preceded by `$`, or a `}` with no open placeholder, is an
    /// error.
    #[default]
    Strict,
    /// Stray braces are copied through unchanged. Needed for syntaxes where
    /// braces are structural, such as JSON or TOML inline tables.
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    // A `$` has been seen and the next byte decides what it opens.
    Dollar,
    Param { braced: bool },
}

/// A reader that performs `${name}` substitution on its source.
///
/// With an empty parameter map the reader is a pure passthrough and does no
/// scanning. The reader makes a single forward pass and cannot be rewound.
///
/// Substitution failures are reported as [`io::ErrorKind::InvalidData`]
/// errors wrapping a [`SubstitutionError`]; once one has been returned the
/// reader yields no more data.
#[derive(Debug)]
pub struct SubstitutingReader<'p, R> {
    source: R,
    params: &'p Params,
    braces: BracePolicy,
    state: State,
    name: Vec<u8>,
    scratch: Vec<u8>,
    buffer: Vec<u8>,
    pos: usize,
    offset: u64,
    done: bool,
}

impl<'p, R: Read> SubstitutingReader<'p, R> {
    /// Wrap `source`, substituting placeholders from `params`.
    pub fn new(source: R, params: &'p Params) -> Self {
        Self {
            source,
            params,
            braces: BracePolicy::default(),
            state: State::Text,
            name: Vec::new(),
            scratch: vec![0; CHUNK_SIZE],
            buffer: Vec::with_capacity(CHUNK_SIZE),
            pos: 0,
            offset: 0,
            done: false,
        }
    }

    /// Set how braces outside a placeholder are treated.
    pub fn with_brace_policy(mut self, policy: BracePolicy) -> Self {
        self.braces = policy;
        self
    }

    /// Whether this reader copies its source unchanged.
    pub fn is_passthrough(&self) -> bool {
        self.params.is_empty()
    }

    // Pull raw chunks until at least one output byte is available or the
    // source is exhausted. An empty buffer afterwards means end of stream.
    fn refill(&mut self) -> io::Result<()> {
        self.buffer.clear();
        self.pos = 0;
        while self.buffer.is_empty() && !self.done {
            let count = match self.source.read(&mut self.scratch) {
                Ok(count) => count,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            let result = if count == 0 {
                self.done = true;
                self.finish()
            } else {
                self.filter(count)
            };
            if let Err(err) = result {
                self.done = true;
                self.buffer.clear();
                return Err(err.into());
            }
        }
        Ok(())
    }

    fn filter(&mut self, count: usize) -> Result<(), SubstitutionError> {
        if self.is_passthrough() {
            self.buffer.extend_from_slice(&self.scratch[..count]);
            self.offset += count as u64;
            return Ok(());
        }
        for index in 0..count {
            let byte = self.scratch[index];
            self.scan(byte)?;
            self.offset += 1;
        }
        Ok(())
    }

    fn scan(&mut self, byte: u8) -> Result<(), SubstitutionError> {
        let offset = self.offset;
        let strict = self.braces == BracePolicy::Strict;
        match self.state {
            State::Text => match byte {
                b'$' => self.state = State::Dollar,
                b'{' if strict => return Err(SubstitutionError::UnexpectedOpenBrace { offset }),
                b'}' if strict => return Err(SubstitutionError::UnmatchedCloseBrace { offset }),
                _ => self.buffer.push(byte),
            },
            State::Dollar => match byte {
                b'$' => {
                    self.buffer.push(b'$');
                    self.state = State::Text;
                }
                b'{' => self.state = State::Param { braced: true },
                b'}' | b'\n' => self.close()?,
                _ => {
                    self.name.push(byte);
                    self.state = State::Param { braced: false };
                }
            },
            State::Param { braced } => match byte {
                b'}' => self.close()?,
                b'\n' if braced => {
                    return Err(SubstitutionError::NewlineInParameter {
                        name: String::from_utf8_lossy(&self.name).into_owned(),
                        offset,
                    })
                }
                b'\n' => self.close()?,
                b'$' => return Err(SubstitutionError::UnexpectedDollar { offset }),
                b'{' => return Err(SubstitutionError::UnexpectedOpenBrace { offset }),
                _ => self.name.push(byte),
            },
        }
        Ok(())
    }

    // Emit the replacement for the placeholder that just closed.
    fn close(&mut self) -> Result<(), SubstitutionError> {
        let offset = self.offset;
        let name = std::str::from_utf8(&self.name)
            .map_err(|_| SubstitutionError::InvalidParameterName { offset })?;
        let value = self
            .params
            .get(name)
            .ok_or_else(|| SubstitutionError::UnknownParameter {
                name: name.to_string(),
                offset,
            })?;
        self.buffer.extend_from_slice(value.as_bytes());
        self.name.clear();
        self.state = State::Text;
        Ok(())
    }

    // The source is exhausted; any open placeholder is an error.
    fn finish(&mut self) -> Result<(), SubstitutionError> {
        match self.state {
            State::Text => Ok(()),
            State::Dollar | State::Param { .. } => Err(SubstitutionError::UnterminatedParameter {
                name: String::from_utf8_lossy(&self.name).into_owned(),
                offset: self.offset,
            }),
        }
    }
}

impl<R: Read> Read for SubstitutingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_passthrough() && self.pos >= self.buffer.len() {
            let count = self.source.read(buf)?;
            self.offset += count as u64;
            return Ok(count);
        }
        let available = self.fill_buf()?;
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.consume(count);
        Ok(count)
    }
}

impl<R: Read> BufRead for SubstitutingReader<'_, R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.buffer.len() {
            self.refill()?;
        }
        Ok(&self.buffer[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buffer.len());
    }
}

/// Substitute placeholders in an in-memory string.
///
/// Braces outside placeholders are copied through unchanged.
///
/// # Errors
///
/// Returns [`ConfigError::Substitution`](crate::ConfigError::Substitution)
/// for a malformed or unknown placeholder.
pub fn substitute(text: &str, params: &Params) -> Result<String> {
    let mut reader =
        SubstitutingReader::new(text.as_bytes(), params).with_brace_policy(BracePolicy::Literal);
    let mut output = String::with_capacity(text.len());
    reader.read_to_string(&mut output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use proptest::prelude::*;

    // Hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let count = self.step.min(buf.len()).min(self.data.len());
            buf[..count].copy_from_slice(&self.data[..count]);
            self.data = &self.data[count..];
            Ok(count)
        }
    }

    fn params() -> Params {
        Params::from([
            ("str".to_string(), "hello".to_string()),
            ("int".to_string(), "123".to_string()),
            ("empty".to_string(), String::new()),
        ])
    }

    fn run<R: Read>(source: R, params: &Params) -> io::Result<String> {
        let mut reader = SubstitutingReader::new(source, params);
        let mut output = String::new();
        reader.read_to_string(&mut output)?;
        Ok(output)
    }

    fn run_str(text: &str) -> io::Result<String> {
        run(text.as_bytes(), &params())
    }

    fn cause(err: io::Error) -> SubstitutionError {
        match ConfigError::from(err) {
            ConfigError::Substitution(cause) => cause,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_braced_parameter() {
        assert_eq!(run_str("value = \"${str}\"").unwrap(), "value = \"hello\"");
        assert_eq!(run_str("${str}${int}").unwrap(), "hello123");
        assert_eq!(run_str("a${empty}b").unwrap(), "ab");
    }

    #[test]
    fn test_shorthand_parameter() {
        assert_eq!(run_str("$str\n").unwrap(), "hello");
        assert_eq!(run_str("$str}").unwrap(), "hello");
        assert_eq!(run_str("x = $int\ny = 1\n").unwrap(), "x = 123y = 1\n");
    }

    #[test]
    fn test_shorthand_matches_braced() {
        assert_eq!(run_str("${str}").unwrap(), run_str("$str\n").unwrap());
    }

    #[test]
    fn test_dollar_escape() {
        assert_eq!(run_str("$$").unwrap(), "$");
        assert_eq!(run_str("cost: $$5").unwrap(), "cost: $5");
        assert_eq!(run_str("$$$$").unwrap(), "$$");
    }

    #[test]
    fn test_escape_then_placeholder() {
        assert_eq!(run_str("$$${str}").unwrap(), "$hello");
    }

    #[test]
    fn test_unknown_parameter() {
        let err = cause(run_str("${missing}").unwrap_err());
        assert_eq!(
            err,
            SubstitutionError::UnknownParameter {
                name: "missing".to_string(),
                offset: 9
            }
        );
    }

    #[test]
    fn test_unterminated_at_end_of_input() {
        for text in ["${str", "$str", "abc$"] {
            let err = cause(run_str(text).unwrap_err());
            assert!(matches!(err, SubstitutionError::UnterminatedParameter { .. }), "{text}");
        }
    }

    #[test]
    fn test_newline_inside_braces() {
        let err = cause(run_str("${str\n}").unwrap_err());
        assert!(matches!(err, SubstitutionError::NewlineInParameter { ref name, offset: 5 } if name == "str"));
    }

    #[test]
    fn test_nested_dollar() {
        let err = cause(run_str("${a$b}").unwrap_err());
        assert_eq!(err, SubstitutionError::UnexpectedDollar { offset: 3 });

        let err = cause(run_str("$a${b}").unwrap_err());
        assert_eq!(err, SubstitutionError::UnexpectedDollar { offset: 2 });
    }

    #[test]
    fn test_strict_braces() {
        let err = cause(run_str("a } b").unwrap_err());
        assert_eq!(err, SubstitutionError::UnmatchedCloseBrace { offset: 2 });

        let err = cause(run_str("{").unwrap_err());
        assert_eq!(err, SubstitutionError::UnexpectedOpenBrace { offset: 0 });

        // An escaped dollar does not open a placeholder.
        let err = cause(run_str("$${str}").unwrap_err());
        assert_eq!(err, SubstitutionError::UnexpectedOpenBrace { offset: 2 });
    }

    #[test]
    fn test_literal_braces() {
        let params = params();
        let mut reader = SubstitutingReader::new(r#"{"a": "${str}"}"#.as_bytes(), &params)
            .with_brace_policy(BracePolicy::Literal);
        let mut output = String::new();
        reader.read_to_string(&mut output).unwrap();
        assert_eq!(output, r#"{"a": "hello"}"#);
    }

    #[test]
    fn test_open_brace_inside_parameter() {
        let err = cause(run_str("${a{b}").unwrap_err());
        assert_eq!(err, SubstitutionError::UnexpectedOpenBrace { offset: 3 });
    }

    #[test]
    fn test_empty_params_is_passthrough() {
        let empty = Params::new();
        let text = "x = \"${str}\" { $ } \n";
        let reader = SubstitutingReader::new(text.as_bytes(), &empty);
        assert!(reader.is_passthrough());
        assert_eq!(run(text.as_bytes(), &empty).unwrap(), text);
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(run_str("").unwrap(), "");
    }

    #[test]
    fn test_placeholder_straddles_reads() {
        let text = "key = \"${str}\"\nother = $int\nprice = \"$$9\"\n";
        let expected = "key = \"hello\"\nother = 123price = \"$9\"\n";
        for step in 1..=text.len() {
            let source = Trickle {
                data: text.as_bytes(),
                step,
            };
            assert_eq!(run(source, &params()).unwrap(), expected, "step {step}");
        }
    }

    #[test]
    fn test_placeholder_straddles_chunk_boundary() {
        for pad in CHUNK_SIZE - 8..=CHUNK_SIZE + 1 {
            let text = format!("{}${{str}}$$tail", "a".repeat(pad));
            let expected = format!("{}hello$tail", "a".repeat(pad));
            assert_eq!(run_str(&text).unwrap(), expected, "pad {pad}");
        }
    }

    #[test]
    fn test_long_parameter_name_spans_chunks() {
        let name = "n".repeat(CHUNK_SIZE * 2 + 3);
        let params = Params::from([(name.clone(), "v".to_string())]);
        let text = format!("<${{{name}}}>");
        assert_eq!(run(text.as_bytes(), &params).unwrap(), "<v>");
    }

    #[test]
    fn test_no_data_after_error() {
        let params = params();
        let mut reader = SubstitutingReader::new("ok ${nope} more".as_bytes(), &params);
        let mut buf = [0_u8; 64];
        assert!(reader.read(&mut buf).is_err());
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_fill_buf_reports_end_of_stream() {
        let params = params();
        let mut reader = SubstitutingReader::new("${str}".as_bytes(), &params);
        assert_eq!(reader.fill_buf().unwrap(), b"hello");
        reader.consume(5);
        assert!(reader.fill_buf().unwrap().is_empty());
    }

    #[test]
    fn test_substitute() {
        assert_eq!(substitute("{ a = ${int} }", &params()).unwrap(), "{ a = 123 }");
        assert!(matches!(
            substitute("${none}", &params()),
            Err(ConfigError::Substitution(SubstitutionError::UnknownParameter { .. }))
        ));
    }

    #[test]
    fn test_multibyte_text_and_values() {
        let params = Params::from([("name".to_string(), "Grüße".to_string())]);
        assert_eq!(run("π = ${name} ✓".as_bytes(), &params).unwrap(), "π = Grüße ✓");
    }

    proptest! {
        #[test]
        fn prop_text_without_dollar_is_unchanged(text in "[^${}]*") {
            prop_assert_eq!(run_str(&text).unwrap(), text);
        }

        #[test]
        fn prop_double_dollar_is_literal(parts in proptest::collection::vec("[^${}]*", 1..8)) {
            let source = parts.join("$$");
            let expected = parts.join("$");
            prop_assert_eq!(run_str(&source).unwrap(), expected);
        }

        #[test]
        fn prop_read_size_does_not_matter(step in 1_usize..64, pad in 0_usize..2100) {
            let text = format!("{}${{str}}|$int\n|$$", "x".repeat(pad));
            let expected = format!("{}hello|123|$", "x".repeat(pad));
            let source = Trickle { data: text.as_bytes(), step };
            prop_assert_eq!(run(source, &params()).unwrap(), expected);
        }

        #[test]
        fn prop_shorthand_matches_braced(
            name in "[A-Za-z0-9_]{1,24}",
            value in "[^${}\n]*",
            text in "[^${}\n]*",
        ) {
            let params = Params::from([(name.clone(), value.clone())]);
            let braced = run(format!("{text}${{{name}}}{text}").as_bytes(), &params).unwrap();
            let shorthand = run(format!("{text}${name}\n{text}").as_bytes(), &params).unwrap();
            prop_assert_eq!(&braced, &shorthand);
            prop_assert_eq!(braced, format!("{text}{value}{text}"));
        }
    }
}
