//! Low-level reading utilities shared by the decoders.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Cursor};
use std::sync::OnceLock;

use byteorder::{LittleEndian, ReadBytesExt};
use encoding_rs::{UTF_8, WINDOWS_1252};
use regex::Regex;

use super::types::error::{Location, Result, XyError};

/// Little-endian scalar reader over an in-memory file image.
///
/// All multi-byte fields in the supported binary formats are little-endian
/// on disk; `byteorder` converts them on any host. A read that runs past the
/// end of the buffer fails with [`XyError::UnexpectedEof`] carrying the
/// offset at which the read started.
pub struct BinReader<'a> {
    cursor: Cursor<&'a [u8]>,
    format: &'static str,
}

impl<'a> BinReader<'a> {
    pub fn new(data: &'a [u8], format: &'static str) -> Self {
        Self {
            cursor: Cursor::new(data),
            format,
        }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.position()) as usize
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.scalar(|c| c.read_u16::<LittleEndian>())
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.scalar(|c| c.read_u32::<LittleEndian>())
    }

    pub fn f32(&mut self) -> Result<f32> {
        self.scalar(|c| c.read_f32::<LittleEndian>())
    }

    pub fn f64(&mut self) -> Result<f64> {
        self.scalar(|c| c.read_f64::<LittleEndian>())
    }

    /// Borrows the next `len` bytes and advances past them.
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(self.eof());
        }
        let data: &'a [u8] = *self.cursor.get_ref();
        let start = self.position() as usize;
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len).map(|_| ())
    }

    /// Reads a fixed-width text field.
    ///
    /// The field ends at the first NUL byte, is decoded as Windows-1252 and
    /// trimmed of surrounding whitespace.
    pub fn string(&mut self, len: usize) -> Result<String> {
        self.bytes(len).map(fixed_string)
    }

    /// Reads `count` consecutive 4-byte floats, widened to `f64`.
    pub fn f32_array(&mut self, count: usize) -> Result<Vec<f64>> {
        let needed = count.checked_mul(4).ok_or_else(|| self.eof())?;
        if self.remaining() < needed {
            return Err(self.eof());
        }
        let mut values = vec![0f32; count];
        self.scalar(|c| c.read_f32_into::<LittleEndian>(&mut values))?;
        Ok(values.into_iter().map(f64::from).collect())
    }

    fn eof(&self) -> XyError {
        XyError::UnexpectedEof {
            format: self.format,
            offset: self.position(),
        }
    }

    fn scalar<T>(&mut self, read: impl FnOnce(&mut Cursor<&'a [u8]>) -> io::Result<T>) -> Result<T> {
        let start = self.position();
        let format = self.format;
        read(&mut self.cursor).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => XyError::UnexpectedEof {
                format,
                offset: start,
            },
            _ => XyError::Io(e),
        })
    }
}

/// Decodes a NUL-padded Windows-1252 field and trims it.
pub fn fixed_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(&raw[..end]);
    text.trim().to_string()
}

/// Decodes a text file image as UTF-8, dropping a leading BOM.
///
/// Invalid sequences become U+FFFD instead of failing; such bytes only ever
/// appear inside comments and free-text values in practice.
pub fn decode_text(input: &[u8]) -> Cow<'_, str> {
    let (text, _) = UTF_8.decode_with_bom_removal(input);
    text
}

/// First line that is neither blank nor starts with `comment`, trimmed.
pub fn first_logical_line<'t>(text: &'t str, comment: &str) -> Option<&'t str> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with(comment))
}

/// Cuts a trailing comment off `line` and trims the rest.
pub fn strip_comment<'l>(line: &'l str, marker: &str) -> &'l str {
    match line.find(marker) {
        Some(pos) => line[..pos].trim(),
        None => line.trim(),
    }
}

/// Splits `line` at the first `sep` into a trimmed key and value.
///
/// A line without the separator is all key.
pub fn split_key_value(line: &str, sep: char) -> (&str, &str) {
    match line.split_once(sep) {
        Some((key, value)) => (key.trim(), value.trim()),
        None => (line.trim(), ""),
    }
}

/// Why a token could not be read as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberError {
    Empty,
    Invalid,
    Overflow,
}

impl fmt::Display for NumberError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NumberError::Empty => write!(f, "empty number"),
            NumberError::Invalid => write!(f, "not a number"),
            NumberError::Overflow => write!(f, "numeric overflow"),
        }
    }
}

impl NumberError {
    pub fn at_line(self, format: &'static str, token: &str, line: usize) -> XyError {
        XyError::format(format, format!("{} in {:?}", self, token)).at(Location::Line(line))
    }
}

/// Parses a floating-point token, rejecting values that overflow to infinity.
pub fn parse_f64(token: &str) -> std::result::Result<f64, NumberError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(NumberError::Empty);
    }
    let value: f64 = token.parse().map_err(|_| NumberError::Invalid)?;
    if value.is_infinite() && !token.to_ascii_lowercase().contains("inf") {
        return Err(NumberError::Overflow);
    }
    Ok(value)
}

/// Delimiters between numbers on a data line: whitespace, `,`, `;` and `:`.
static NUMBER_DELIMITERS: OnceLock<Regex> = OnceLock::new();

/// Same as above but without `,`, which is then a decimal separator.
static DECIMAL_COMMA_DELIMITERS: OnceLock<Regex> = OnceLock::new();

fn delimiters(decimal_comma: bool) -> &'static Regex {
    if decimal_comma {
        DECIMAL_COMMA_DELIMITERS
            .get_or_init(|| Regex::new(r"[\s;:]+").expect("Invalid delimiter regex pattern"))
    } else {
        NUMBER_DELIMITERS
            .get_or_init(|| Regex::new(r"[\s,;:]+").expect("Invalid delimiter regex pattern"))
    }
}

fn tokens(line: &str, decimal_comma: bool) -> impl Iterator<Item = Cow<'_, str>> {
    delimiters(decimal_comma)
        .split(line.trim())
        .filter(|t| !t.is_empty())
        .map(move |t| {
            if decimal_comma && t.contains(',') {
                Cow::Owned(t.replace(',', "."))
            } else {
                Cow::Borrowed(t)
            }
        })
}

/// Parses the numbers at the start of `line`, stopping at the first token
/// that is not a number. Overflow is still an error.
pub fn leading_numbers(
    line: &str,
    decimal_comma: bool,
) -> std::result::Result<Vec<f64>, (NumberError, String)> {
    let mut values = Vec::new();
    for token in tokens(line, decimal_comma) {
        match parse_f64(&token) {
            Ok(v) => values.push(v),
            Err(NumberError::Overflow) => return Err((NumberError::Overflow, token.into_owned())),
            Err(_) => break,
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_scalars() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x80, 0x3f];
        let mut r = BinReader::new(&data, "test");
        assert_eq!(r.u16().unwrap(), 0x1234);
        assert_eq!(r.u32().unwrap(), 0x1234_5678);
        assert_eq!(r.f32().unwrap(), 1.0);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn short_read_reports_offset() {
        let data = [1, 2, 3, 4, 5];
        let mut r = BinReader::new(&data, "test");
        r.u32().unwrap();
        let err = r.u32().unwrap_err();
        assert!(matches!(err, XyError::UnexpectedEof { format: "test", offset: 4 }));
        assert!(matches!(r.f32_array(2), Err(XyError::UnexpectedEof { .. })));
        assert!(matches!(r.skip(2), Err(XyError::UnexpectedEof { .. })));
    }

    #[test]
    fn fixed_width_string_stops_at_nul() {
        let mut data = b"  quartz\0garbage".to_vec();
        data.resize(32, 0);
        let mut r = BinReader::new(&data, "test");
        assert_eq!(r.string(32).unwrap(), "quartz");
        assert_eq!(r.position(), 32);
    }

    #[test]
    fn overflow_is_detected() {
        assert_eq!(parse_f64("1e999"), Err(NumberError::Overflow));
        assert_eq!(parse_f64("abc"), Err(NumberError::Invalid));
        assert_eq!(parse_f64("  "), Err(NumberError::Empty));
        assert_eq!(parse_f64("-2.5e3"), Ok(-2500.0));
    }

    #[test]
    fn numbers_split_on_all_delimiters() {
        assert_eq!(
            leading_numbers("38.8 , 318;1:2\t3", false).unwrap(),
            vec![38.8, 318.0, 1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn leading_numbers_stop_at_text() {
        assert_eq!(leading_numbers("1 2 abc 3", false).unwrap(), vec![1.0, 2.0]);
        assert_eq!(leading_numbers("1,5 2,25", true).unwrap(), vec![1.5, 2.25]);
        assert!(leading_numbers("1 1e999", false).is_err());
    }

    #[test]
    fn key_value_split() {
        assert_eq!(split_key_value("_WL1 = 1.5406", '='), ("_WL1", "1.5406"));
        assert_eq!(split_key_value("_COUNTS", '='), ("_COUNTS", ""));
        assert_eq!(strip_comment("_START=10.0 ; x start", ";"), "_START=10.0");
    }
}
