//! Picks a format descriptor for a file from a hint, its extension or its content.

use std::io::{Read, Seek};
use std::path::Path;

use log::{debug, trace};

use super::{FormatInfo, FORMATS};
use crate::xydata::types::error::{Result, XyError};

/// Resolves the format of `content`, which was read from `path`.
///
/// 1. A `hint` naming a registered format is used as is, without looking
///    at the content. An unknown hint is an error.
/// 2. Formats claiming the file extension are sniffed in registry order.
/// 3. Every format is sniffed in registry order.
///
/// The stream position is the same on return as on entry.
pub fn detect<R: Read + Seek>(
    path: &Path,
    content: &mut R,
    hint: Option<&str>,
) -> Result<&'static FormatInfo> {
    detect_in(&FORMATS, path, content, hint)
}

/// [`detect`] over an arbitrary descriptor table.
pub fn detect_in<'a, R: Read + Seek>(
    formats: &'a [FormatInfo],
    path: &Path,
    content: &mut R,
    hint: Option<&str>,
) -> Result<&'a FormatInfo> {
    if let Some(name) = hint.filter(|h| !h.is_empty()) {
        return formats
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| XyError::UnknownFormat(name.to_string()));
    }

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !extension.is_empty() {
        for info in formats.iter().filter(|f| f.has_extension(extension)) {
            trace!("Sniffing {} by extension .{}", info.name, extension);
            if info.check(content) {
                debug!("Detected {} for {}", info.name, path.display());
                return Ok(info);
            }
        }
    }

    for info in formats {
        if info.check(content) {
            debug!("Detected {} by content for {}", info.name, path.display());
            return Ok(info);
        }
    }

    Err(XyError::UnknownFormat(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xydata::format::FormatKind;
    use std::io::Cursor;

    const UXD: &[u8] = b"; header\n_FILEVERSION=1\n_DRIVE=COUPLED\n10 20\n";

    #[test]
    fn hint_wins_over_extension_and_content() {
        let mut c = Cursor::new(UXD.to_vec());
        let f = detect(Path::new("scan.raw"), &mut c, Some("text")).unwrap();
        assert_eq!(f.name, "text");
    }

    #[test]
    fn unknown_hint_fails() {
        let mut c = Cursor::new(UXD.to_vec());
        assert!(matches!(
            detect(Path::new("scan.uxd"), &mut c, Some("nope")),
            Err(XyError::UnknownFormat(_))
        ));
    }

    #[test]
    fn falls_back_to_content_when_extension_rejects() {
        let mut c = Cursor::new(UXD.to_vec());
        let f = detect(Path::new("scan.txt"), &mut c, None).unwrap();
        assert_eq!(f.name, "uxd");
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn shared_extension_goes_to_first_accepting_candidate() {
        static TABLE: [FormatInfo; 2] = [
            FormatInfo {
                kind: FormatKind::Uxd,
                name: "uxd",
                description: "",
                extensions: &["dat"],
                binary: false,
                multiblock: true,
            },
            FormatInfo {
                kind: FormatKind::Text,
                name: "text",
                description: "",
                extensions: &["dat"],
                binary: false,
                multiblock: false,
            },
        ];
        let mut plain = Cursor::new(b"1 2\n3 4\n".to_vec());
        let f = detect_in(&TABLE, Path::new("a.DAT"), &mut plain, None).unwrap();
        assert_eq!(f.name, "text");

        let mut uxd = Cursor::new(UXD.to_vec());
        let f = detect_in(&TABLE, Path::new("a.dat"), &mut uxd, None).unwrap();
        assert_eq!(f.name, "uxd");
    }

    #[test]
    fn unresolvable_content_fails() {
        let mut c = Cursor::new(b"hello world\n".to_vec());
        assert!(matches!(
            detect(Path::new("notes.xyz"), &mut c, None),
            Err(XyError::UnknownFormat(_))
        ));
    }

    #[test]
    fn detection_is_deterministic() {
        let mut c = Cursor::new(b"1 2\n3 4\n".to_vec());
        let a = detect(Path::new("x.bin"), &mut c, None).unwrap();
        let b = detect(Path::new("x.bin"), &mut c, None).unwrap();
        assert!(std::ptr::eq(a, b));
    }
}
