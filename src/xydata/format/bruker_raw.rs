//! Decoder for Siemens/Bruker DIFFRAC-AT binary RAW files, versions 1, 2 and 3.
//!
//! The version is chosen by the 4-byte magic at offset 0:
//! - `"RAW "`: version 1, ranges chained by a "following range" flag
//! - `"RAW2"`: version 2, explicit 16-bit range count and variable range headers
//! - `"RAW1"` followed by `".01"`: version 3, fixed 712-byte file header and
//!   304-byte range headers
//!
//! Every range becomes one block with a generated 2θ column and a stored
//! intensity column. All fields are little-endian.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace, warn};

use crate::xydata::types::error::{Location, Result, XyError};
use crate::xydata::types::metadata::MetaData;
use crate::xydata::types::models::{Block, Column, DataSet};
use crate::xydata::utils::{fixed_string, BinReader};

pub const NAME: &str = "bruker_raw";

/// Bytes the content sniffer needs: the magic plus the version 3 suffix.
pub const MAGIC_LEN: usize = 7;

/// Value of an angular field that was not recorded.
const ABSENT_ANGLE: f32 = -1.0e6;

const V3_FILE_HEADER_LEN: usize = 712;
const V3_RANGE_HEADER_LEN: usize = 304;

/// Smallest version 2 range header; longer ones carry vendor fields we skip.
const V2_MIN_RANGE_HEADER_LEN: u16 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawVersion {
    V1,
    V2,
    V3,
}

impl RawVersion {
    fn from_magic(head: &[u8]) -> Option<Self> {
        match head.get(..4)? {
            b"RAW " => Some(RawVersion::V1),
            b"RAW2" => Some(RawVersion::V2),
            b"RAW1" if head.get(4..7) == Some(b".01") => Some(RawVersion::V3),
            _ => None,
        }
    }
}

pub fn check(head: &[u8]) -> bool {
    RawVersion::from_magic(head).is_some()
}

pub fn load(input: &[u8], dataset: &mut DataSet) -> Result<()> {
    let version = RawVersion::from_magic(input).ok_or_else(|| {
        XyError::format(NAME, "missing RAW/RAW2/RAW1 magic").at(Location::Byte(0))
    })?;
    debug!("Decoding Bruker RAW {:?}", version);

    let mut reader = BinReader::new(input, NAME);
    match version {
        RawVersion::V1 => {
            reader.skip(4)?;
            load_version1(&mut reader, dataset)
        }
        RawVersion::V2 => {
            reader.skip(4)?;
            load_version2(&mut reader, dataset)
        }
        RawVersion::V3 => load_version3(&mut reader, dataset),
    }
}

fn set_float(meta: &mut MetaData, key: &str, value: f32) {
    meta.set(key, value.to_string());
}

/// Like [`set_float`], but drops the "not recorded" sentinel.
fn set_angle(meta: &mut MetaData, key: &str, value: f32) {
    if value == ABSENT_ANGLE {
        trace!("{} not recorded", key);
    } else {
        set_float(meta, key, value);
    }
}

fn finish_range(dataset: &mut DataSet, mut block: Block, x: Column, y: Column) -> Result<()> {
    block.add_column(x)?;
    block.add_column(y)?;
    debug!(
        "Range {}: {} points",
        dataset.block_count(),
        block.point_count().unwrap_or(0)
    );
    dataset.add_block(block);
    Ok(())
}

/// Version 1: ranges follow each other until one clears the "following
/// range" flag. There is no range count.
fn load_version1(r: &mut BinReader, dataset: &mut DataSet) -> Result<()> {
    let magic = u32::from_le_bytes(*b"RAW ");
    let mut following_range = 1;

    while following_range != 0 {
        let mut block = Block::new();

        let mut steps = r.u32()?;
        // Early files do not repeat the magic before additional ranges.
        // When they do, the value just read is the magic itself.
        if dataset.block_count() > 0 && steps == magic {
            trace!("Skipping repeated magic at byte {}", r.position() - 4);
            steps = r.u32()?;
        }

        let meta = block.meta_mut();
        set_float(meta, "MEASUREMENT_TIME_PER_STEP", r.f32()?);
        let x_step = r.f32()?;
        meta.set("SCAN_MODE", r.u32()?.to_string());
        r.skip(4)?;
        let x_start = r.f32()?;
        set_angle(meta, "THETA_START", r.f32()?);
        set_angle(meta, "KHI_START", r.f32()?);
        set_angle(meta, "PHI_START", r.f32()?);
        meta.set("SAMPLE_NAME", r.string(32)?);
        set_float(meta, "K_ALPHA1", r.f32()?);
        set_float(meta, "K_ALPHA2", r.f32()?);
        r.skip(72)?;
        following_range = r.u32()?;

        let y = r.f32_array(steps as usize)?;
        finish_range(
            dataset,
            block,
            Column::step(f64::from(x_start), f64::from(x_step)),
            Column::values(y),
        )?;
    }
    Ok(())
}

/// Version 2: a 256-byte file header followed by `range_count` ranges,
/// each with a self-described header length.
fn load_version2(r: &mut BinReader, dataset: &mut DataSet) -> Result<()> {
    let range_count = r.u16()?;

    let meta = dataset.meta_mut();
    r.skip(162)?;
    meta.set("DATE_TIME_MEASURE", r.string(20)?);
    meta.set("TUBE_ANODE", r.string(2)?);
    set_float(meta, "LAMBDA1", r.f32()?);
    set_float(meta, "LAMBDA2", r.f32()?);
    set_float(meta, "INTENSITY_RATIO", r.f32()?);
    r.skip(8)?;
    set_float(meta, "TOTAL_SAMPLE_RUNTIME_IN_SEC", r.f32()?);
    r.skip(42)?;

    for _ in 0..range_count {
        let header_start = r.position();
        let header_len = r.u16()?;
        if header_len < V2_MIN_RANGE_HEADER_LEN {
            return Err(XyError::format(
                NAME,
                format!("range header length {} is shorter than 48 bytes", header_len),
            )
            .at(Location::Byte(header_start)));
        }
        let steps = r.u16()?;

        let mut block = Block::new();
        let meta = block.meta_mut();
        meta.set("RANGE_HEADER_LENGTH", header_len.to_string());
        r.skip(4)?;
        set_float(meta, "SEC_PER_STEP", r.f32()?);
        let x_step = r.f32()?;
        let x_start = r.f32()?;
        r.skip(26)?;
        meta.set("TEMP_IN_K", r.u16()?.to_string());
        r.skip(usize::from(header_len - V2_MIN_RANGE_HEADER_LEN))?;

        let y = r.f32_array(usize::from(steps))?;
        finish_range(
            dataset,
            block,
            Column::step(f64::from(x_start), f64::from(x_step)),
            Column::values(y),
        )?;
    }
    Ok(())
}

fn measurement_status(code: u32) -> String {
    match code {
        1 => "done".to_string(),
        2 => "active".to_string(),
        3 => "aborted".to_string(),
        4 => "interrupted".to_string(),
        other => other.to_string(),
    }
}

/// Version 3: fixed-size headers with fields at known offsets.
fn load_version3(r: &mut BinReader, dataset: &mut DataSet) -> Result<()> {
    let h = r.bytes(V3_FILE_HEADER_LEN)?;

    let meta = dataset.meta_mut();
    meta.set("MEASUREMENT_STATUS", measurement_status(LittleEndian::read_u32(&h[8..12])));
    let range_count = LittleEndian::read_u32(&h[12..16]);
    meta.set("MEASURE_DATE", fixed_string(&h[16..26]));
    meta.set("MEASURE_TIME", fixed_string(&h[26..36]));
    meta.set("USER", fixed_string(&h[36..108]));
    meta.set("SITE", fixed_string(&h[108..326]));
    meta.set("SAMPLE_ID", fixed_string(&h[326..386]));
    meta.set("COMMENT", fixed_string(&h[386..546]));
    meta.set("ANODE_MATERIAL", fixed_string(&h[608..612]));
    meta.set("ALPHA_AVERAGE", LittleEndian::read_f64(&h[616..624]).to_string());
    meta.set("ALPHA1", LittleEndian::read_f64(&h[624..632]).to_string());
    meta.set("ALPHA2", LittleEndian::read_f64(&h[632..640]).to_string());
    meta.set("BETA", LittleEndian::read_f64(&h[640..648]).to_string());
    meta.set("ALPHA_RATIO", LittleEndian::read_f64(&h[648..656]).to_string());
    set_float(meta, "MEASUREMENT_TIME", LittleEndian::read_f32(&h[664..668]));

    for _ in 0..range_count {
        let header_start = r.position();
        let h = r.bytes(V3_RANGE_HEADER_LEN)?;

        let header_len = LittleEndian::read_u32(&h[0..4]);
        if header_len as usize != V3_RANGE_HEADER_LEN {
            return Err(XyError::format(
                NAME,
                format!("range header length {} (expected 304)", header_len),
            )
            .at(Location::Byte(header_start)));
        }
        let steps = LittleEndian::read_u32(&h[4..8]);
        let start_theta = LittleEndian::read_f64(&h[8..16]);
        let start_2theta = LittleEndian::read_f64(&h[16..24]);
        let step_size = LittleEndian::read_f64(&h[176..184]);
        let supplementary_len = LittleEndian::read_u32(&h[256..260]);

        let mut block = Block::new();
        let meta = block.meta_mut();
        if start_theta as f32 != ABSENT_ANGLE {
            meta.set("START_THETA", start_theta.to_string());
        }
        meta.set("START_2THETA", start_2theta.to_string());
        set_float(meta, "HIGH_VOLTAGE", LittleEndian::read_f32(&h[100..104]));
        set_float(meta, "AMPLIFIER_GAIN", LittleEndian::read_f32(&h[104..108]));
        set_float(meta, "TIME_PER_STEP", LittleEndian::read_f32(&h[192..196]));
        set_float(meta, "ROTATION_SPEED", LittleEndian::read_f32(&h[208..212]));
        meta.set("GENERATOR_VOLTAGE", LittleEndian::read_u32(&h[224..228]).to_string());
        meta.set("GENERATOR_CURRENT", LittleEndian::read_u32(&h[228..232]).to_string());
        meta.set("USED_LAMBDA", LittleEndian::read_f64(&h[240..248]).to_string());

        if supplementary_len > 0 {
            warn!("Skipping {} bytes of supplementary range headers", supplementary_len);
            r.skip(supplementary_len as usize)?;
        }

        let y = r.f32_array(steps as usize)?;
        finish_range(
            dataset,
            block,
            Column::step(start_2theta, step_size),
            Column::values(y),
        )?;
    }
    Ok(())
}
