//! Line classification for key/value instrument text dialects.

use crate::xydata::utils::strip_comment;

/// What a single line of a key/value dump contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Comment,
    /// Contains the dialect's key/value separator.
    KeyValue,
    /// Starts with a digit or a sign. Checked before `KeyValue`.
    Numeric,
    Unrecognized,
}

/// Markers that describe one key/value text dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDialect {
    /// A line starting with this is a comment; it also cuts trailing comments.
    pub comment: &'static str,
    pub separator: char,
    /// Key that opens a new range (block).
    pub range_start: &'static str,
    /// Key whose value seeds the step axis start of the current range.
    pub axis_start: &'static str,
    /// Key whose value seeds the step axis increment of the current range.
    pub axis_step: &'static str,
    /// Key the first logical line of a file must start with.
    pub header_marker: &'static str,
}

impl LineDialect {
    /// Siemens/Bruker DIFFRAC-AT UXD.
    pub const UXD: LineDialect = LineDialect {
        comment: ";",
        separator: '=',
        range_start: "_DRIVE",
        axis_start: "_START",
        axis_step: "_STEPSIZE",
        header_marker: "_FILEVERSION",
    };

    /// Classifies `line` after cutting its trailing comment.
    pub fn classify(&self, line: &str) -> LineKind {
        let line = line.trim();
        if line.starts_with(self.comment) {
            return LineKind::Comment;
        }
        let line = strip_comment(line, self.comment);
        let Some(first) = line.chars().next() else {
            return LineKind::Blank;
        };
        if first.is_ascii_digit() || first == '+' || first == '-' {
            LineKind::Numeric
        } else if line.contains(self.separator) {
            LineKind::KeyValue
        } else {
            LineKind::Unrecognized
        }
    }
}
