//! Core data structures: columns, blocks and data sets.
//!
//! A [`DataSet`] holds everything read from one file. It contains a list of
//! [`Block`]s (usually one), each block contains a list of [`Column`]s, and
//! each column yields a value per row. All values are `f64`, even when the
//! file stores integers.
//!
//! Columns are numbered from 1 when queried through a block; column 0 is a
//! pseudo-column that returns the row index.

use super::error::{Result, XyError};
use super::metadata::MetaData;
use crate::xydata::format::FormatInfo;

/// Storage behind a column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Generated sequence `start + n * step`. Has no length limit.
    Step { start: f64, step: f64 },
    /// Explicitly stored values.
    Values(Vec<f64>),
}

/// One sequence of scalar values addressable by row index.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

/// Returned by `Block::get_column(0)`.
static INDEX_COLUMN: Column = Column {
    name: String::new(),
    data: ColumnData::Step {
        start: 0.0,
        step: 1.0,
    },
};

impl Column {
    /// A generated column: the value of row `n` is `start + n * step`.
    pub fn step(start: f64, step: f64) -> Self {
        Self {
            name: String::new(),
            data: ColumnData::Step { start, step },
        }
    }

    /// A column of stored values.
    pub fn values(values: Vec<f64>) -> Self {
        Self {
            name: String::new(),
            data: ColumnData::Values(values),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Column name; usually empty.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Number of points, or `None` for a generated column of unlimited length.
    pub fn point_count(&self) -> Option<usize> {
        match &self.data {
            ColumnData::Step { .. } => None,
            ColumnData::Values(v) => Some(v.len()),
        }
    }

    /// Value of the `n`-th point (counting from 0).
    pub fn get_value(&self, n: usize) -> Result<f64> {
        match &self.data {
            ColumnData::Step { start, step } => Ok(start + step * n as f64),
            ColumnData::Values(v) => v.get(n).copied().ok_or(XyError::IndexOutOfRange {
                what: "point",
                index: n,
                len: v.len(),
            }),
        }
    }

    /// The step of a generated column, `None` for stored values.
    pub fn step_size(&self) -> Option<f64> {
        match self.data {
            ColumnData::Step { step, .. } => Some(step),
            ColumnData::Values(_) => None,
        }
    }

    /// Smallest value among the first `point_count` points.
    ///
    /// `point_count` only matters for generated columns; stored columns use
    /// their own length. Returns `None` when there are no points.
    pub fn min(&self, point_count: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Step { .. } => self.step_ends(point_count).map(|(a, b)| a.min(b)),
            ColumnData::Values(v) => v.iter().copied().reduce(f64::min),
        }
    }

    /// Largest value among the first `point_count` points. See [`min`](Self::min).
    pub fn max(&self, point_count: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Step { .. } => self.step_ends(point_count).map(|(a, b)| a.max(b)),
            ColumnData::Values(v) => v.iter().copied().reduce(f64::max),
        }
    }

    fn step_ends(&self, point_count: usize) -> Option<(f64, f64)> {
        if point_count == 0 {
            return None;
        }
        let first = self.get_value(0).ok()?;
        let last = self.get_value(point_count - 1).ok()?;
        Some((first, last))
    }
}

/// One table of columns sharing a row index, with its own metadata.
///
/// All columns with a finite length have the same number of points.
/// Generated columns can sit next to them and answer any row index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    name: String,
    meta: MetaData,
    columns: Vec<Column>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block name; usually empty.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> &MetaData {
        &self.meta
    }

    /// Number of real columns, not counting the index pseudo-column.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column `n`, where column 0 is the row-index pseudo-column and real
    /// columns start at 1.
    pub fn get_column(&self, n: usize) -> Result<&Column> {
        if n == 0 {
            return Ok(&INDEX_COLUMN);
        }
        self.columns.get(n - 1).ok_or(XyError::IndexOutOfRange {
            what: "column",
            index: n,
            len: self.columns.len(),
        })
    }

    /// Real columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of rows, or `None` if every column is generated.
    pub fn point_count(&self) -> Option<usize> {
        if self.columns.is_empty() {
            return Some(0);
        }
        self.columns.iter().find_map(Column::point_count)
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn meta_mut(&mut self) -> &mut MetaData {
        &mut self.meta
    }

    /// Appends a column, enforcing equal length of finite columns.
    pub(crate) fn add_column(&mut self, column: Column) -> Result<()> {
        if let (Some(found), Some(expected)) = (
            column.point_count(),
            self.columns.iter().find_map(Column::point_count),
        ) {
            if found != expected {
                return Err(XyError::ColumnLengthMismatch { expected, found });
            }
        }
        self.columns.push(column);
        Ok(())
    }
}

/// All data read from one file: an ordered list of blocks plus file-scope
/// metadata, tagged with the format that produced it.
#[derive(Debug, Clone)]
pub struct DataSet {
    format: &'static FormatInfo,
    meta: MetaData,
    blocks: Vec<Block>,
    options: Vec<String>,
}

impl DataSet {
    pub(crate) fn new(format: &'static FormatInfo, options: &[String]) -> Self {
        Self {
            format,
            meta: MetaData::new(),
            blocks: Vec::new(),
            options: options.to_vec(),
        }
    }

    /// Descriptor of the format this data set was decoded from.
    pub fn format(&self) -> &'static FormatInfo {
        self.format
    }

    pub fn meta(&self) -> &MetaData {
        &self.meta
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn get_block(&self, n: usize) -> Result<&Block> {
        self.blocks.get(n).ok_or(XyError::IndexOutOfRange {
            what: "block",
            index: n,
            len: self.blocks.len(),
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Value at `row` of `column` (1-based, 0 is the index) in `block`.
    pub fn value(&self, block: usize, column: usize, row: usize) -> Result<f64> {
        self.get_block(block)?.get_column(column)?.get_value(row)
    }

    /// Options passed to the decoder.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Drops all blocks and metadata. Format and options are kept.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.meta.clear();
    }

    /// Decodes `input` again with the same format and options.
    ///
    /// On failure the data set is left as it was.
    pub fn reload(&mut self, input: &[u8]) -> Result<()> {
        let fresh = crate::xydata::reader::load_bytes(input, self.format, &self.options)?;
        *self = fresh;
        Ok(())
    }

    pub(crate) fn meta_mut(&mut self) -> &mut MetaData {
        &mut self.meta
    }

    pub(crate) fn add_block(&mut self, block: Block) {
        self.blocks.push(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_column_is_unlimited() {
        let col = Column::step(10.0, 0.5);
        assert_eq!(col.point_count(), None);
        assert_eq!(col.get_value(0).unwrap(), 10.0);
        assert_eq!(col.get_value(1_000_000).unwrap(), 10.0 + 0.5 * 1_000_000.0);
        assert_eq!(col.step_size(), Some(0.5));
    }

    #[test]
    fn value_column_checks_range() {
        let col = Column::values(vec![1.0, 2.0]);
        assert_eq!(col.get_value(1).unwrap(), 2.0);
        assert!(matches!(
            col.get_value(2),
            Err(XyError::IndexOutOfRange { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn min_max_are_computed() {
        let col = Column::values(vec![3.0, -1.0, 7.5]);
        assert_eq!(col.min(0), Some(-1.0));
        assert_eq!(col.max(0), Some(7.5));

        let falling = Column::step(5.0, -1.0);
        assert_eq!(falling.min(3), Some(3.0));
        assert_eq!(falling.max(3), Some(5.0));
        assert_eq!(falling.max(0), None);
    }

    #[test]
    fn block_rejects_mismatched_lengths() {
        let mut block = Block::new();
        block.add_column(Column::step(0.0, 1.0)).unwrap();
        block.add_column(Column::values(vec![1.0, 2.0, 3.0])).unwrap();
        let err = block.add_column(Column::values(vec![1.0])).unwrap_err();
        assert!(matches!(
            err,
            XyError::ColumnLengthMismatch { expected: 3, found: 1 }
        ));
        assert_eq!(block.point_count(), Some(3));
        assert_eq!(block.column_count(), 2);
    }

    #[test]
    fn column_zero_is_index() {
        let mut block = Block::new();
        block.add_column(Column::values(vec![4.0, 5.0])).unwrap();
        assert_eq!(block.get_column(0).unwrap().get_value(1).unwrap(), 1.0);
        assert_eq!(block.get_column(1).unwrap().get_value(1).unwrap(), 5.0);
        assert!(block.get_column(2).is_err());
    }

    #[test]
    fn generated_only_block_is_unlimited() {
        let mut block = Block::new();
        block.add_column(Column::step(0.0, 2.0)).unwrap();
        assert_eq!(block.point_count(), None);
        assert_eq!(Block::new().point_count(), Some(0));
    }
}
