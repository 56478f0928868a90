//! Entry points that turn a file, stream or byte buffer into a [`DataSet`].
//!
//! Every call reads its whole input into memory first and decodes it in one
//! pass. A failed decode never hands out a partially filled data set.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use log::{debug, info};

use super::format::{detect::detect, FormatInfo};
use super::types::error::{Result, XyError};
use super::types::models::DataSet;

/// Reads the file at `path`, inflating it first if the name ends in `.gz`.
///
/// Returns the bytes and the path to use for extension matching.
fn read_input(path: &Path) -> Result<(Vec<u8>, &Path)> {
    let raw = fs::read(path)?;
    let gzipped = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"));
    if !gzipped {
        return Ok((raw, path));
    }

    let mut inflated = Vec::new();
    GzDecoder::new(&raw[..]).read_to_end(&mut inflated)?;
    debug!("Inflated {} bytes to {}", raw.len(), inflated.len());
    // Detection looks at the inner name, e.g. `scan.uxd` for `scan.uxd.gz`.
    let inner = path.file_stem().map(Path::new).unwrap_or(path);
    Ok((inflated, inner))
}

/// Loads a data file.
///
/// # Arguments
/// * `path` - File to read; `.gz` files are inflated transparently
/// * `format_hint` - Short format name, or `None` to detect the format
/// * `options` - Decoder options; unrecognized ones are ignored
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The hint is unknown, or no format matches the content
/// - The content violates the chosen format
pub fn load_file(
    path: impl AsRef<Path>,
    format_hint: Option<&str>,
    options: &[String],
) -> Result<DataSet> {
    let path = path.as_ref();
    info!("Opening data file: {}", path.display());
    let (bytes, detect_path) = read_input(path)?;
    let format = detect(detect_path, &mut Cursor::new(&bytes[..]), format_hint)?;
    info!("Reading {} as {}", path.display(), format.name);
    load_bytes(&bytes, format, options)
}

/// Reads `stream` to its end and decodes it as `format`.
pub fn load_stream<R: Read>(
    mut stream: R,
    format: &'static FormatInfo,
    options: &[String],
) -> Result<DataSet> {
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    load_bytes(&bytes, format, options)
}

/// Decodes an in-memory file image as `format`.
pub fn load_bytes(
    input: &[u8],
    format: &'static FormatInfo,
    options: &[String],
) -> Result<DataSet> {
    let mut dataset = DataSet::new(format, options);
    format.kind.decode(input, &mut dataset)?;
    if dataset.block_count() == 0 {
        return Err(XyError::format(format.name, "no data blocks found"));
    }
    debug!("Decoded {} blocks", dataset.block_count());
    Ok(dataset)
}

/// Detects the format of the file at `path` without decoding it.
pub fn guess_format(path: impl AsRef<Path>) -> Result<&'static FormatInfo> {
    let path = path.as_ref();
    let (bytes, detect_path) = read_input(path)?;
    detect(detect_path, &mut Cursor::new(&bytes[..]), None)
}
