//! Decoder for Siemens/Bruker DIFFRAC-AT UXD text files.
//!
//! A UXD file is a header of `_KEY=value` lines followed by ranges. Each
//! range opens with `_DRIVE=...`, continues with its own `_KEY=value` lines
//! and ends with rows of intensities:
//!
//! ```text
//! _FILEVERSION=1
//! _WL1=1.540600
//! ; Data for range 1
//! _DRIVE='COUPLED'
//! _STEPSIZE=0.020000
//! _START=10.0000
//! _COUNTS
//!      1048      1162      1108      1163
//! ```
//!
//! The decoder itself is driven by a [`LineDialect`], so other dialects with
//! the same shape can reuse it.

use std::mem;

use log::{debug, trace};

use super::lines::{LineDialect, LineKind};
use crate::xydata::types::error::{Location, Result, XyError};
use crate::xydata::types::metadata::MetaData;
use crate::xydata::types::models::{Block, Column, DataSet};
use crate::xydata::utils::{
    decode_text, first_logical_line, leading_numbers, parse_f64, split_key_value, strip_comment,
};

pub const NAME: &str = "uxd";

pub fn check(head: &[u8]) -> bool {
    accepts(&LineDialect::UXD, head)
}

pub fn load(input: &[u8], dataset: &mut DataSet) -> Result<()> {
    load_dialect(&LineDialect::UXD, NAME, input, dataset)
}

/// The first logical line must start with the dialect's header marker.
fn accepts(dialect: &LineDialect, head: &[u8]) -> bool {
    first_logical_line(&decode_text(head), dialect.comment)
        .is_some_and(|line| line.starts_with(dialect.header_marker))
}

/// A range being collected.
struct Range {
    meta: MetaData,
    start: f64,
    step: f64,
    counts: Vec<f64>,
}

impl Range {
    fn new() -> Self {
        Self {
            meta: MetaData::new(),
            start: 0.0,
            step: 1.0,
            counts: Vec::new(),
        }
    }

    fn into_block(self) -> Result<Block> {
        let mut block = Block::new();
        *block.meta_mut() = self.meta;
        block.add_column(Column::step(self.start, self.step))?;
        block.add_column(Column::values(self.counts))?;
        Ok(block)
    }
}

enum State {
    FileHeader,
    RangeHeader(Range),
    RangeData(Range),
}

impl State {
    fn range_mut(&mut self) -> Option<&mut Range> {
        match self {
            State::FileHeader => None,
            State::RangeHeader(range) | State::RangeData(range) => Some(range),
        }
    }

    fn into_range(self) -> Option<Range> {
        match self {
            State::FileHeader => None,
            State::RangeHeader(range) | State::RangeData(range) => Some(range),
        }
    }
}

fn push_range(dataset: &mut DataSet, range: Range) -> Result<()> {
    debug!("Range {}: {} points", dataset.block_count(), range.counts.len());
    dataset.add_block(range.into_block()?);
    Ok(())
}

/// Decodes a key/value dump described by `dialect`.
pub fn load_dialect(
    dialect: &LineDialect,
    format: &'static str,
    input: &[u8],
    dataset: &mut DataSet,
) -> Result<()> {
    if !accepts(dialect, input) {
        return Err(XyError::format(
            format,
            format!("file does not start with {}", dialect.header_marker),
        )
        .at(Location::Line(1)));
    }
    let text = decode_text(input);
    let mut state = State::FileHeader;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        match dialect.classify(raw) {
            LineKind::Blank | LineKind::Comment => {}
            LineKind::KeyValue => {
                let line = strip_comment(raw, dialect.comment);
                let (key, value) = split_key_value(line, dialect.separator);
                if key == dialect.range_start {
                    if let Some(range) = mem::replace(&mut state, State::FileHeader).into_range() {
                        push_range(dataset, range)?;
                    }
                    state = State::RangeHeader(Range::new());
                    continue;
                }

                match state.range_mut() {
                    Some(range) => {
                        if key == dialect.axis_start || key == dialect.axis_step {
                            let v = parse_f64(value).map_err(|e| e.at_line(format, value, line_no))?;
                            if key == dialect.axis_start {
                                range.start = v;
                            } else {
                                range.step = v;
                            }
                        }
                        range.meta.set(meta_key(key), value);
                    }
                    None => {
                        dataset.meta_mut().set(meta_key(key), value);
                    }
                }
            }
            LineKind::Numeric => {
                let values = leading_numbers(strip_comment(raw, dialect.comment), false)
                    .map_err(|(e, token)| e.at_line(format, &token, line_no))?;
                if values.is_empty() {
                    trace!("Skipping line {}: {:?}", line_no, raw.trim());
                    continue;
                }
                state = match mem::replace(&mut state, State::FileHeader) {
                    State::FileHeader => {
                        return Err(XyError::format(format, "data line before the first range")
                            .at(Location::Line(line_no)));
                    }
                    State::RangeHeader(mut range) | State::RangeData(mut range) => {
                        range.counts.extend(values);
                        State::RangeData(range)
                    }
                };
            }
            LineKind::Unrecognized => {
                trace!("Skipping line {}: {:?}", line_no, raw.trim());
            }
        }
    }

    if let Some(range) = state.into_range() {
        push_range(dataset, range)?;
    }
    Ok(())
}

/// Metadata keys are stored without the leading underscore.
fn meta_key(key: &str) -> &str {
    key.strip_prefix('_').unwrap_or(key)
}
