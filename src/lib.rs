//! # xydata-reader
//!
//! Reads x-y data files from powder diffractometers and similar instruments
//! into one uniform model: a data set holds blocks, a block holds columns,
//! and both carry string metadata.
//!
//! Supported formats: Siemens/Bruker RAW (versions 1 to 3), Siemens/Bruker
//! UXD, powder diffraction CIF and plain text columns.
pub mod xydata;

// Re-export the main types for convenience
pub use xydata::{
    export_file, format_by_name, formats, guess_format, load_bytes, load_file, load_stream,
    wildcards, write_dataset, Block, Cache, Column, ColumnData, DataSet, ExportOptions, FormatInfo,
    FormatKind, Location, MetaData, Result, XyError,
};
