//! Core x-y data reading module.
//!
//! # Module Organization
//!
//! - [`types`]: error type, metadata map and the column/block/data set model
//! - [`format`]: format registry, detection and one decoder per format
//! - [`reader`]: load entry points for files, streams and byte buffers
//! - [`cache`]: bounded cache of decoded files with shared handles
//! - [`export`]: plain text output
//! - [`utils`]: binary scalar reading and text tokenizing helpers

pub mod cache;
pub mod export;
pub mod format;
pub mod reader;
pub mod types;
pub mod utils;

pub use cache::Cache;
pub use export::{export_file, write_dataset, ExportOptions};
pub use format::{format_by_name, formats, wildcards, FormatInfo, FormatKind};
pub use reader::{guess_format, load_bytes, load_file, load_stream};
pub use types::error::{Location, Result, XyError};
pub use types::metadata::MetaData;
pub use types::models::{Block, Column, ColumnData, DataSet};
