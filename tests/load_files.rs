use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use flate2::write::GzEncoder;
use flate2::Compression;
use xydata_reader::{
    export_file, guess_format, load_file, DataSet, ExportOptions, XyError,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Per-process scratch file, so parallel test binaries do not collide.
fn scratch(name: &str) -> PathBuf {
    env::temp_dir().join(format!("xydata-load-{}-{}", process::id(), name))
}

fn assert_finite_columns_agree(ds: &DataSet) {
    for block in ds.blocks() {
        let counts: Vec<usize> = block.columns().iter().filter_map(|c| c.point_count()).collect();
        assert!(
            counts.windows(2).all(|w| w[0] == w[1]),
            "block {:?} has columns of different length: {:?}",
            block.name(),
            counts
        );
    }
}

#[test]
fn uxd_fixture_has_two_ranges() {
    let ds = load_file(fixture("quartz.uxd"), None, &[]).unwrap();
    assert_eq!(ds.format().name, "uxd");
    assert_eq!(ds.block_count(), 2);
    assert_eq!(ds.meta().get("SAMPLE"), Some("'quartz'"));
    assert_eq!(ds.meta().get("WL1"), Some("1.540600"));
    assert_finite_columns_agree(&ds);

    let first = ds.get_block(0).unwrap();
    assert_eq!(first.point_count(), Some(6));
    assert_eq!(first.meta().get("STEPMODE"), Some("'C'"));
    assert!((ds.value(0, 1, 5).unwrap() - 20.1).abs() < 1e-9);
    assert_eq!(ds.value(0, 2, 5).unwrap(), 201.0);
    assert_eq!(ds.value(0, 0, 5).unwrap(), 5.0);

    let second = ds.get_block(1).unwrap();
    assert_eq!(second.point_count(), Some(3));
    assert_eq!(second.meta().get("STEPTIME"), Some("2.000000"));
    assert!(!second.meta().has_key("STEPMODE"));
}

#[test]
fn text_fixture_has_three_columns() {
    let ds = load_file(fixture("corundum.dat"), None, &[]).unwrap();
    assert_eq!(ds.format().name, "text");
    let block = ds.get_block(0).unwrap();
    assert_eq!(block.column_count(), 3);
    assert_eq!(block.point_count(), Some(4));
    assert_eq!(ds.value(0, 2, 2).unwrap(), 1810.0);
    assert_eq!(ds.value(0, 3, 3).unwrap(), 12.3);
    assert_eq!(block.get_column(1).unwrap().min(4), Some(25.0));
    assert_eq!(block.get_column(2).unwrap().max(4), Some(1810.0));
}

#[test]
fn pdcif_fixture_maps_pairs_and_loops() {
    let ds = load_file(fixture("silicon.cif"), None, &[]).unwrap();
    assert_eq!(ds.format().name, "pdcif");
    assert_eq!(ds.block_count(), 2);
    assert_finite_columns_agree(&ds);

    let pattern = ds.get_block(0).unwrap();
    assert_eq!(pattern.name(), "si_pattern");
    let meta = pattern.meta();
    assert_eq!(meta.get("pd_block_id"), Some("si|2024|lab"));
    assert_eq!(meta.get("diffrn_radiation_wavelength"), Some("1.5406(1)"));
    assert_eq!(meta.get("pd_meas_info_author_name"), Some("\nLab measurement,\nsecond line"));
    assert!(!meta.has_key("pd_proc_info_datetime"));
    assert_eq!(pattern.column_count(), 2);
    assert_eq!(pattern.get_column(1).unwrap().name(), "pd_meas_2theta_scan");
    assert_eq!(ds.value(0, 2, 2).unwrap(), 1410.0);

    let reflections = ds.get_block(1).unwrap();
    assert_eq!(reflections.name(), "si_pattern_1");
    assert_eq!(reflections.column_count(), 3);
    assert_eq!(reflections.point_count(), Some(2));
}

#[test]
fn hint_bypasses_misleading_extension() {
    let path = scratch("pattern.txt");
    fs::copy(fixture("silicon.cif"), &path).unwrap();

    let ds = load_file(&path, Some("pdcif"), &[]).unwrap();
    assert_eq!(ds.format().name, "pdcif");
    // Without a hint the text format rejects the content and sniffing finds pdCIF.
    assert_eq!(guess_format(&path).unwrap().name, "pdcif");

    let err = load_file(&path, Some("uxd"), &[]).unwrap_err();
    assert!(err.is_format_violation());
    fs::remove_file(&path).unwrap();
}

#[test]
fn unknown_content_is_rejected() {
    let path = scratch("notes.xyz");
    fs::write(&path, "just some words\nand more\n").unwrap();
    let err = load_file(&path, None, &[]).unwrap_err();
    assert!(matches!(err, XyError::UnknownFormat(_)));
    assert!(!err.is_format_violation());
    fs::remove_file(&path).unwrap();
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_file(scratch("does-not-exist.uxd"), None, &[]).unwrap_err();
    assert!(matches!(err, XyError::Io(_)));
}

#[test]
fn gzipped_file_is_detected_by_inner_name() {
    let path = scratch("quartz.uxd.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&fs::read(fixture("quartz.uxd")).unwrap()).unwrap();
    fs::write(&path, encoder.finish().unwrap()).unwrap();

    let ds = load_file(&path, None, &[]).unwrap();
    assert_eq!(ds.format().name, "uxd");
    assert_eq!(ds.block_count(), 2);
    fs::remove_file(&path).unwrap();
}

#[test]
fn export_writes_tab_separated_rows() {
    let ds = load_file(fixture("corundum.dat"), None, &[]).unwrap();
    let path = scratch("corundum.xy");
    export_file(&ds, &path, &ExportOptions::default()).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "25\t110\t10.5");
    fs::remove_file(&path).unwrap();
}
