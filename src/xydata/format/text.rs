//! Decoder for plain text columns of numbers.
//!
//! Every line that starts with numbers is one row:
//!
//! ```text
//! # Sample date: 2000/12/31 21:32
//! 38.834110      361
//! 38.872800  ,   318
//! 38.911500      352.431
//! ```
//!
//! Numbers are separated by whitespace, `,`, `;` or `:`. Lines starting with
//! `#` are comments, and lines that do not start with a number are skipped.
//! The first row fixes the number of columns.

use log::{debug, trace};

use crate::xydata::types::error::{Location, Result, XyError};
use crate::xydata::types::models::{Block, Column, DataSet};
use crate::xydata::utils::{decode_text, first_logical_line, leading_numbers};

pub const NAME: &str = "text";

/// `,` is a decimal separator instead of a delimiter.
pub const OPT_DECIMAL_COMMA: &str = "decimal-comma";

/// The first logical line holds column names.
pub const OPT_FIRST_LINE_HEADER: &str = "first-line-header";

const COMMENT: &str = "#";

pub fn check(head: &[u8]) -> bool {
    first_logical_line(&decode_text(head), COMMENT)
        .and_then(|line| leading_numbers(line, false).ok())
        .is_some_and(|numbers| numbers.len() >= 2)
}

fn column_names(line: &str) -> Vec<String> {
    line.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':'))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load(input: &[u8], dataset: &mut DataSet) -> Result<()> {
    let decimal_comma = dataset.has_option(OPT_DECIMAL_COMMA);
    let mut want_header = dataset.has_option(OPT_FIRST_LINE_HEADER);
    let text = decode_text(input);

    let mut names: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT) {
            continue;
        }

        let row = leading_numbers(line, decimal_comma)
            .map_err(|(e, token)| e.at_line(NAME, &token, line_no))?;
        if want_header {
            want_header = false;
            if row.is_empty() {
                names = column_names(line);
                debug!("Column names: {:?}", names);
                continue;
            }
        }
        if row.is_empty() {
            trace!("Skipping line {}: {:?}", line_no, line);
            continue;
        }
        if row.len() == 1 {
            return Err(XyError::format(NAME, "only one number in a line")
                .at(Location::Line(line_no)));
        }

        if columns.is_empty() {
            columns = vec![Vec::new(); row.len()];
        } else if row.len() != columns.len() {
            return Err(XyError::format(
                NAME,
                format!("{} numbers in a line, expected {}", row.len(), columns.len()),
            )
            .at(Location::Line(line_no)));
        }
        for (column, value) in columns.iter_mut().zip(row) {
            column.push(value);
        }
    }

    if columns.is_empty() {
        return Err(XyError::format(NAME, "no numeric data"));
    }

    let mut block = Block::new();
    for (i, values) in columns.into_iter().enumerate() {
        let mut column = Column::values(values);
        if let Some(name) = names.get(i) {
            column = column.with_name(name.as_str());
        }
        block.add_column(column)?;
    }
    debug!(
        "Read {} columns of {} points",
        block.column_count(),
        block.point_count().unwrap_or(0)
    );
    dataset.add_block(block);
    Ok(())
}
