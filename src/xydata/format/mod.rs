//! Format registry and the decoders behind it.
//!
//! Every supported format has one static [`FormatInfo`] entry in [`FORMATS`].
//! The entry's [`FormatKind`] ties it to a decoder module, each of which
//! provides a content sniffer (`check`) and a full decoder (`load`).
//!
//! # Module Organization
//!
//! - [`detect`]: picks a format for an unknown file
//! - [`lines`]: line classification for key/value text dialects
//! - [`bruker_raw`]: Siemens/Bruker RAW, binary, three versions
//! - [`uxd`]: Siemens/Bruker UXD, key/value text
//! - [`pdcif`]: powder diffraction CIF, grammar-driven text
//! - [`text`]: plain columns of numbers

use std::io::{Read, Seek, SeekFrom};

use log::debug;

use crate::xydata::types::error::Result;
use crate::xydata::types::models::DataSet;

pub mod bruker_raw;
pub mod detect;
pub mod lines;
pub mod pdcif;
pub mod text;
pub mod uxd;

/// Closed set of supported formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    BrukerRaw,
    Uxd,
    PdCif,
    Text,
}

impl FormatKind {
    /// Tests whether `head` looks like this format. Never fails.
    pub(crate) fn sniff(self, head: &[u8]) -> bool {
        match self {
            FormatKind::BrukerRaw => bruker_raw::check(head),
            FormatKind::Uxd => uxd::check(head),
            FormatKind::PdCif => pdcif::check(head),
            FormatKind::Text => text::check(head),
        }
    }

    /// Decodes a whole file image into `dataset`.
    pub(crate) fn decode(self, input: &[u8], dataset: &mut DataSet) -> Result<()> {
        for option in dataset.options() {
            if !self.known_options().contains(&option.as_str()) {
                debug!("Ignoring option {:?}", option);
            }
        }
        match self {
            FormatKind::BrukerRaw => bruker_raw::load(input, dataset),
            FormatKind::Uxd => uxd::load(input, dataset),
            FormatKind::PdCif => pdcif::load(input, dataset),
            FormatKind::Text => text::load(input, dataset),
        }
    }

    /// Options the decoder acts on. Anything else is ignored.
    pub fn known_options(self) -> &'static [&'static str] {
        match self {
            FormatKind::BrukerRaw | FormatKind::Uxd => &[],
            FormatKind::PdCif => &[pdcif::OPT_ALL_LOOPS],
            FormatKind::Text => &[text::OPT_DECIMAL_COMMA, text::OPT_FIRST_LINE_HEADER],
        }
    }

    /// How many leading bytes the sniffer looks at; `None` means all of them.
    fn sniff_len(self) -> Option<u64> {
        match self {
            FormatKind::BrukerRaw => Some(bruker_raw::MAGIC_LEN as u64),
            FormatKind::Uxd | FormatKind::PdCif | FormatKind::Text => None,
        }
    }
}

/// Static description of a supported format.
#[derive(Debug)]
pub struct FormatInfo {
    pub kind: FormatKind,
    /// Short unique name, used as the format hint.
    pub name: &'static str,
    /// Full format name, reasonably short.
    pub description: &'static str,
    /// Typical file extensions, lower case, without the dot.
    pub extensions: &'static [&'static str],
    pub binary: bool,
    /// True if files of this format can hold more than one block.
    pub multiblock: bool,
}

impl FormatInfo {
    /// Case-insensitive check of `ext` against the extension list.
    pub fn has_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Checks whether `stream` holds this format.
    ///
    /// The read position is restored before returning. I/O failures count
    /// as "does not match".
    pub fn check<R: Read + Seek>(&self, stream: &mut R) -> bool {
        let Ok(start) = stream.stream_position() else {
            return false;
        };
        let mut head = Vec::new();
        let read = match self.kind.sniff_len() {
            Some(len) => stream.by_ref().take(len).read_to_end(&mut head),
            None => stream.read_to_end(&mut head),
        };
        let restored = stream.seek(SeekFrom::Start(start)).is_ok();
        read.is_ok() && restored && self.kind.sniff(&head)
    }
}

/// All supported formats. Content sniffing tries them in this order, so the
/// generic text format comes last.
pub static FORMATS: [FormatInfo; 4] = [
    FormatInfo {
        kind: FormatKind::BrukerRaw,
        name: bruker_raw::NAME,
        description: "Siemens/Bruker RAW ver. 1/2/3",
        extensions: &["raw"],
        binary: true,
        multiblock: true,
    },
    FormatInfo {
        kind: FormatKind::Uxd,
        name: uxd::NAME,
        description: "Siemens/Bruker UXD",
        extensions: &["uxd"],
        binary: false,
        multiblock: true,
    },
    FormatInfo {
        kind: FormatKind::PdCif,
        name: pdcif::NAME,
        description: "Crystallographic Information File for Powder Diffraction",
        extensions: &["cif"],
        binary: false,
        multiblock: true,
    },
    FormatInfo {
        kind: FormatKind::Text,
        name: text::NAME,
        description: "ascii x-y text",
        extensions: &["txt", "dat", "asc", "csv", "prn"],
        binary: false,
        multiblock: false,
    },
];

pub fn formats() -> &'static [FormatInfo] {
    &FORMATS
}

/// Looks up a format by its short name.
pub fn format_by_name(name: &str) -> Option<&'static FormatInfo> {
    FORMATS.iter().find(|f| f.name == name)
}

/// Filter string for file dialogs, e.g.
/// `"All Files (*)|*|Siemens/Bruker UXD (*.uxd)|*.uxd|..."`.
pub fn wildcards(all_files: &str) -> String {
    let mut out = format!("All Files ({all_files})|{all_files}");
    for info in &FORMATS {
        let patterns: Vec<String> = info.extensions.iter().map(|e| format!("*.{e}")).collect();
        out.push_str(&format!(
            "|{} ({})|{}",
            info.description,
            patterns.join(" "),
            patterns.join(";")
        ));
    }
    out
}
