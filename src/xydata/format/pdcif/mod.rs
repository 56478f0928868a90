//! Decoder for the Crystallographic Information File for Powder Diffraction.
//!
//! [`parse`] turns the text into CIF data blocks. This module maps them onto
//! the data model: each `data_` block becomes a block named after it, single
//! tag/value pairs become block metadata (tag without the leading `_`) and
//! loops of powder data become columns.

pub mod parse;

use log::debug;

use self::parse::{CifBlock, DataItem, LoopTable, Value};
use crate::xydata::types::error::Result;
use crate::xydata::types::models::{Block, Column, DataSet};
use crate::xydata::utils::decode_text;

pub const NAME: &str = "pdcif";

/// Turn every loop into columns, not only those holding powder data.
pub const OPT_ALL_LOOPS: &str = "all-loops";

/// pdCIF data names whose loops hold per-point values.
const VALUED_KEYS: &[&str] = &[
    "pd_meas_2theta_scan",
    "pd_meas_time_of_flight",
    "pd_proc_2theta_corrected",
    "pd_proc_d_spacing",
    "pd_proc_energy_incident",
    "pd_proc_energy_detection",
    "pd_proc_recip_len_Q",
    "pd_proc_wavelength",
    "pd_meas_counts_total",
    "pd_meas_counts_background",
    "pd_meas_counts_container",
    "pd_meas_intensity_total",
    "pd_meas_intensity_background",
    "pd_meas_intensity_container",
    "pd_proc_intensity_net",
    "pd_proc_intensity_total",
    "pd_proc_intensity_bkg_calc",
    "pd_proc_intensity_bkg_fix",
    "pd_calc_intensity_net",
    "pd_calc_intensity_total",
    "pd_meas_step_count_time",
    "pd_meas_counts_monitor",
    "pd_meas_intensity_monitor",
    "pd_proc_intensity_norm",
    "pd_proc_intensity_incident",
    "pd_proc_ls_weight",
];

/// The first line that is not a comment opens a data block, and some later
/// line starts with a `_pd_` tag.
pub fn check(head: &[u8]) -> bool {
    let text = decode_text(head);
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));
    let opens_block = lines
        .next()
        .is_some_and(|line| line.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data_")));
    opens_block && lines.any(|line| line.starts_with("_pd_"))
}

pub fn load(input: &[u8], dataset: &mut DataSet) -> Result<()> {
    let all_loops = dataset.has_option(OPT_ALL_LOOPS);
    let text = decode_text(input);
    for cif_block in parse::parse(&text)? {
        for block in convert_block(cif_block, all_loops)? {
            dataset.add_block(block);
        }
    }
    Ok(())
}

fn tag_key(tag: &str) -> &str {
    tag.strip_prefix('_').unwrap_or(tag)
}

fn holds_point_data(table: &LoopTable, all_loops: bool) -> bool {
    if all_loops || table.tags.iter().any(|t| VALUED_KEYS.contains(&tag_key(t))) {
        return true;
    }
    let mut any_number = false;
    for value in &table.values {
        match value {
            Value::Numeric(_) => any_number = true,
            Value::Inapplicable | Value::Unknown => {}
            Value::Text(_) => return false,
        }
    }
    any_number
}

/// Maps one CIF block onto one or more data blocks.
///
/// Loops whose row count differs from the columns already collected go to
/// an extra block named `<name>_<n>`, `n` counting from 1.
fn convert_block(cif: CifBlock, all_loops: bool) -> Result<Vec<Block>> {
    let name = cif.name.unwrap_or_default();
    let mut main = Block::new();
    main.set_name(name.as_str());
    let mut extra: Vec<Block> = Vec::new();

    for item in cif.items {
        match item {
            DataItem::Pair { tag, value } => {
                if let Some(text) = value.as_str() {
                    main.meta_mut().set(tag_key(&tag), text);
                }
            }
            DataItem::Loop(table) => {
                if !holds_point_data(&table, all_loops) {
                    debug!("Skipping loop of {} in {:?}", table.tags.join(" "), name);
                    continue;
                }
                let rows = table.row_count();
                if rows == 0 {
                    continue;
                }
                let fits = |b: &Block| b.column_count() == 0 || b.point_count() == Some(rows);
                let target = if fits(&main) {
                    &mut main
                } else if let Some(i) = extra.iter().position(|b| fits(b)) {
                    &mut extra[i]
                } else {
                    let mut block = Block::new();
                    block.set_name(format!("{}_{}", name, extra.len() + 1));
                    extra.push(block);
                    let last = extra.len() - 1;
                    &mut extra[last]
                };
                for (i, tag) in table.tags.iter().enumerate() {
                    let values = table
                        .column(i)
                        .map(|v| v.as_f64().unwrap_or(f64::NAN))
                        .collect();
                    target.add_column(Column::values(values).with_name(tag_key(tag)))?;
                }
            }
        }
    }

    debug!(
        "Block {:?}: {} columns, {} extra blocks",
        name,
        main.column_count(),
        extra.len()
    );
    let mut blocks = vec![main];
    blocks.extend(extra);
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xydata::format::format_by_name;

    fn decode(input: &str, options: &[&str]) -> Result<DataSet> {
        let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
        let mut ds = DataSet::new(format_by_name(NAME).unwrap(), &options);
        load(input.as_bytes(), &mut ds)?;
        Ok(ds)
    }

    #[test]
    fn single_value_with_uncertainty() {
        let ds = decode("data_x\n_pd_meas_2theta_scan 1.0(2)\n", &[]).unwrap();
        assert_eq!(ds.block_count(), 1);
        let block = ds.get_block(0).unwrap();
        assert_eq!(block.name(), "x");
        assert_eq!(block.meta().get("pd_meas_2theta_scan"), Some("1.0(2)"));
    }

    #[test]
    fn numeric_loop_becomes_columns() {
        let ds = decode("loop_\n_a\n_b\n1 2 3 4\n", &[]).unwrap();
        let block = ds.get_block(0).unwrap();
        assert_eq!(block.name(), "");
        assert_eq!(block.column_count(), 2);
        assert_eq!(block.point_count(), Some(2));
        assert_eq!(ds.value(0, 1, 0).unwrap(), 1.0);
        assert_eq!(ds.value(0, 2, 0).unwrap(), 2.0);
        assert_eq!(ds.value(0, 1, 1).unwrap(), 3.0);
        assert_eq!(ds.value(0, 2, 1).unwrap(), 4.0);
        assert_eq!(block.get_column(2).unwrap().name(), "b");
    }

    #[test]
    fn special_values_are_not_stored() {
        let ds = decode("data_a\n_pd_x .\n_pd_y ?\n_pd_z 'q'\n", &[]).unwrap();
        let meta = ds.get_block(0).unwrap().meta();
        assert!(!meta.has_key("pd_x"));
        assert!(!meta.has_key("pd_y"));
        assert_eq!(meta.get("pd_z"), Some("q"));
    }

    #[test]
    fn text_loops_are_skipped_unless_asked() {
        let input = "data_a\nloop_\n_atom_label\n_atom_x\nO1 0.5\nSi1 0.25\n";
        let ds = decode(input, &[]).unwrap();
        assert_eq!(ds.get_block(0).unwrap().column_count(), 0);

        let ds = decode(input, &[OPT_ALL_LOOPS]).unwrap();
        let block = ds.get_block(0).unwrap();
        assert_eq!(block.column_count(), 2);
        assert!(block.get_column(1).unwrap().get_value(0).unwrap().is_nan());
        assert_eq!(block.get_column(2).unwrap().get_value(1).unwrap(), 0.25);
    }

    #[test]
    fn loops_of_different_length_split_blocks() {
        let input = "data_s\nloop_\n_pd_meas_2theta_scan\n_pd_meas_counts_total\n10 5 11 6 12 7\nloop_\n_pd_peak_pos\n1.5 2.5\n";
        let ds = decode(input, &[]).unwrap();
        assert_eq!(ds.block_count(), 2);
        assert_eq!(ds.get_block(0).unwrap().point_count(), Some(3));
        let second = ds.get_block(1).unwrap();
        assert_eq!(second.name(), "s_1");
        assert_eq!(second.point_count(), Some(2));
    }

    #[test]
    fn sniffs_pd_tags() {
        assert!(check(b"# c\ndata_quartz\n_cell_length_a 4.9\n_pd_meas_2theta_scan 10\n"));
        assert!(!check(b"data_quartz\n_cell_length_a 4.9\n"));
        assert!(!check(b"_pd_x 1\ndata_a\n"));
    }
}
