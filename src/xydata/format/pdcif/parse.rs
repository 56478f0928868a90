//! Recursive-descent parser for the CIF 1.1 syntax.
//!
//! Produces an untyped list of data blocks holding tag/value pairs and
//! loops, in file order. Save frames, `global_` and `stop_` are recognized
//! and dropped. Lines that do not fit the grammar are skipped, but an
//! unterminated quoted string or text field stops the parse with the byte
//! offset where it started.

use std::sync::OnceLock;

use log::{trace, warn};
use regex::Regex;

use super::NAME;
use crate::xydata::types::error::{Location, Result, XyError};

/// A single CIF value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `.`
    Inapplicable,
    /// `?`
    Unknown,
    /// A number, kept as written, including any `(uncertainty)` suffix.
    Numeric(String),
    /// Any other string: unquoted, quoted or a text field.
    Text(String),
}

impl Value {
    /// Numeric value without its uncertainty; `None` for non-numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(s) => s.split('(').next()?.parse().ok(),
            _ => None,
        }
    }

    /// Literal text to store as metadata; `None` for `.` and `?`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Numeric(s) | Value::Text(s) => Some(s),
            Value::Inapplicable | Value::Unknown => None,
        }
    }
}

/// A loop: tags and a row-major list of values.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopTable {
    pub tags: Vec<String>,
    pub values: Vec<Value>,
}

impl LoopTable {
    pub fn row_count(&self) -> usize {
        if self.tags.is_empty() {
            0
        } else {
            self.values.len() / self.tags.len()
        }
    }

    /// Values of column `index`, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> {
        let stride = self.tags.len().max(1);
        self.values.iter().skip(index).step_by(stride)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataItem {
    Pair { tag: String, value: Value },
    Loop(LoopTable),
}

/// One `data_` block. Items that come before the first heading end up in a
/// block without a name.
#[derive(Debug, Clone, PartialEq)]
pub struct CifBlock {
    pub name: Option<String>,
    pub items: Vec<DataItem>,
}

/// Parses a whole CIF text.
pub fn parse(input: &str) -> Result<Vec<CifBlock>> {
    Parser::new(input).parse_file()
}

static NUMERIC: OnceLock<Regex> = OnceLock::new();

fn numeric_regex() -> &'static Regex {
    NUMERIC.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?(\(\d+\))?$")
            .expect("Invalid numeric regex pattern")
    })
}

#[derive(Debug)]
enum Token {
    DataHeading(String),
    Loop,
    SaveStart,
    SaveEnd,
    /// `global_` or `stop_`.
    Ignored,
    Tag(String),
    Val(Value),
    Eof,
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    at_line_start: bool,
    pending: Option<Token>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            at_line_start: true,
            pending: None,
        }
    }

    fn next(&mut self) -> Result<Token> {
        match self.pending.take() {
            Some(token) => Ok(token),
            None => self.scan_token(),
        }
    }

    fn push_back(&mut self, token: Token) {
        self.pending = Some(token);
    }

    fn error(&self, message: &str, offset: usize) -> XyError {
        XyError::format(NAME, message).at(Location::Byte(offset as u64))
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            match b {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'\n' => {
                    self.pos += 1;
                    self.at_line_start = true;
                }
                b'#' => self.skip_to_eol(),
                _ => break,
            }
        }
    }

    fn skip_to_eol(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn scan_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();
        let Some(&b) = self.bytes.get(self.pos) else {
            return Ok(Token::Eof);
        };

        if b == b';' && self.at_line_start {
            return self.scan_text_field();
        }
        self.at_line_start = false;

        if b == b'\'' || b == b'"' {
            return self.scan_quoted(b);
        }

        let start = self.pos;
        while self.pos < self.bytes.len() && !self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        Ok(classify_unquoted(&self.input[start..self.pos]))
    }

    /// A quoted string ends at a matching quote followed by whitespace or
    /// end of input, and may not span lines.
    fn scan_quoted(&mut self, quote: u8) -> Result<Token> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.bytes.get(self.pos) {
                None | Some(b'\n') => {
                    return Err(self.error("unterminated quoted string", start));
                }
                Some(&c) if c == quote => {
                    let next = self.bytes.get(self.pos + 1);
                    if next.map_or(true, u8::is_ascii_whitespace) {
                        let text = self.input[start + 1..self.pos].to_string();
                        self.pos += 1;
                        return Ok(Token::Val(Value::Text(text)));
                    }
                }
                Some(_) => {}
            }
            self.pos += 1;
        }
    }

    /// A text field runs from a `;` at the start of a line to the next line
    /// that starts with `;`.
    fn scan_text_field(&mut self) -> Result<Token> {
        let start = self.pos;
        self.pos += 1;
        self.at_line_start = false;
        let content_start = self.pos;

        loop {
            self.skip_to_eol();
            if self.pos >= self.bytes.len() {
                return Err(self.error("unterminated text field", start));
            }
            self.pos += 1;
            if self.bytes.get(self.pos) == Some(&b';') {
                let content = &self.input[content_start..self.pos - 1];
                self.pos += 1;
                return Ok(Token::Val(Value::Text(
                    content.trim_end_matches('\r').replace("\r\n", "\n"),
                )));
            }
        }
    }

    fn parse_file(&mut self) -> Result<Vec<CifBlock>> {
        let mut blocks = Vec::new();
        let mut name = None;
        loop {
            let block = self.parse_block(name)?;
            if block.name.is_some() || !block.items.is_empty() {
                blocks.push(block);
            }
            // `parse_block` stops at a data heading or at the end.
            match self.next()? {
                Token::DataHeading(next) => name = Some(next),
                _ => return Ok(blocks),
            }
        }
    }

    /// Reads items up to the next data heading or end of input, which is
    /// left for the caller.
    fn parse_block(&mut self, name: Option<String>) -> Result<CifBlock> {
        let mut items = Vec::new();
        loop {
            match self.next()? {
                token @ (Token::Eof | Token::DataHeading(_)) => {
                    self.push_back(token);
                    break;
                }
                Token::Loop => {
                    if let Some(table) = self.parse_loop()? {
                        items.push(DataItem::Loop(table));
                    }
                }
                Token::Tag(tag) => match self.next()? {
                    Token::Val(value) => items.push(DataItem::Pair { tag, value }),
                    other => {
                        warn!("Tag {} has no value", tag);
                        self.push_back(other);
                    }
                },
                Token::SaveStart => self.skip_save_frame()?,
                Token::SaveEnd | Token::Ignored => {}
                Token::Val(value) => {
                    trace!("Skipping stray value {:?} and the rest of its line", value);
                    self.skip_to_eol();
                }
            }
        }
        Ok(CifBlock { name, items })
    }

    fn parse_loop(&mut self) -> Result<Option<LoopTable>> {
        let loop_start = self.pos;
        let mut tags = Vec::new();
        loop {
            match self.next()? {
                Token::Tag(tag) => tags.push(tag),
                other => {
                    self.push_back(other);
                    break;
                }
            }
        }

        let mut values = Vec::new();
        loop {
            match self.next()? {
                Token::Val(value) => values.push(value),
                other => {
                    self.push_back(other);
                    break;
                }
            }
        }

        if tags.is_empty() {
            warn!("Loop without tags at byte {}", loop_start);
            return Ok(None);
        }
        if values.len() % tags.len() != 0 {
            return Err(self.error(
                &format!(
                    "loop has {} values, not a multiple of its {} tags",
                    values.len(),
                    tags.len()
                ),
                loop_start,
            ));
        }
        Ok(Some(LoopTable { tags, values }))
    }

    fn skip_save_frame(&mut self) -> Result<()> {
        loop {
            match self.next()? {
                Token::SaveEnd => return Ok(()),
                token @ (Token::Eof | Token::DataHeading(_)) => {
                    self.push_back(token);
                    return Ok(());
                }
                _ => {}
            }
        }
    }
}

fn classify_unquoted(s: &str) -> Token {
    let lower = s.to_ascii_lowercase();
    if lower.starts_with("data_") {
        Token::DataHeading(s[5..].to_string())
    } else if lower == "loop_" {
        Token::Loop
    } else if lower.starts_with("save_") {
        if s.len() == 5 {
            Token::SaveEnd
        } else {
            Token::SaveStart
        }
    } else if lower.starts_with("global_") || lower.starts_with("stop_") {
        Token::Ignored
    } else if s.starts_with('_') {
        Token::Tag(s.to_string())
    } else if s == "." {
        Token::Val(Value::Inapplicable)
    } else if s == "?" {
        Token::Val(Value::Unknown)
    } else if numeric_regex().is_match(s) {
        Token::Val(Value::Numeric(s.to_string()))
    } else {
        Token::Val(Value::Text(s.to_string()))
    }
}
