//! Plain text export of a [`DataSet`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use super::types::error::Result;
use super::types::metadata::MetaData;
use super::types::models::{Block, DataSet};

/// Controls what [`write_dataset`] emits besides the data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Also write metadata, block headings and column names as comments.
    pub with_meta: bool,
    /// Prefix of comment lines.
    pub comment: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            with_meta: false,
            comment: "#".to_string(),
        }
    }
}

fn write_meta<W: Write>(out: &mut W, meta: &MetaData, comment: &str) -> Result<()> {
    for (key, value) in meta.iter() {
        writeln!(out, "{} {}: {}", comment, key, value)?;
    }
    Ok(())
}

fn column_label(block: &Block, n: usize) -> String {
    let name = block.get_column(n).map(|c| c.name()).unwrap_or("");
    if !name.is_empty() {
        return name.to_string();
    }
    match n {
        1 => "x".to_string(),
        2 => "y".to_string(),
        3 => "y_stddev".to_string(),
        _ => format!("column_{}", n),
    }
}

fn write_block<W: Write>(out: &mut W, index: usize, block: &Block, opts: &ExportOptions) -> Result<()> {
    let rows = block.point_count().unwrap_or(0);
    if opts.with_meta {
        writeln!(out)?;
        writeln!(out, "{}", opts.comment.repeat(40))?;
        writeln!(out, "{} block {}: {}", opts.comment, index, block.name())?;
        write_meta(out, block.meta(), &opts.comment)?;
        writeln!(out, "{} points: {}", opts.comment, rows)?;
        let labels: Vec<String> = (1..=block.column_count())
            .map(|n| column_label(block, n))
            .collect();
        writeln!(out, "{} {}", opts.comment, labels.join("\t"))?;
    }

    for row in 0..rows {
        let mut line = String::new();
        for (i, column) in block.columns().iter().enumerate() {
            if i > 0 {
                line.push('\t');
            }
            line.push_str(&column.get_value(row)?.to_string());
        }
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

/// Writes `dataset` as tab-separated text, one row per line.
pub fn write_dataset<W: Write>(out: &mut W, dataset: &DataSet, opts: &ExportOptions) -> Result<()> {
    if opts.with_meta {
        writeln!(
            out,
            "{} exported by xydata-reader from a {} file",
            opts.comment,
            dataset.format().description
        )?;
        write_meta(out, dataset.meta(), &opts.comment)?;
        writeln!(out, "{} blocks: {}", opts.comment, dataset.block_count())?;
    }
    for (i, block) in dataset.blocks().iter().enumerate() {
        write_block(out, i, block, opts)?;
    }
    Ok(())
}

/// Creates or truncates `path` and writes `dataset` to it.
pub fn export_file(dataset: &DataSet, path: impl AsRef<Path>, opts: &ExportOptions) -> Result<()> {
    let path = path.as_ref();
    info!("Exporting to {}", path.display());
    let mut out = BufWriter::new(File::create(path)?);
    write_dataset(&mut out, dataset, opts)?;
    out.flush()?;
    Ok(())
}
