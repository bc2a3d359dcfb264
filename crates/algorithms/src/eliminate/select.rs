//! Victim selection
//!
//! Victims come from either an attribute predicate evaluated against
//! the source layer or an explicit feature-ID list.

use polyclean_core::error::Result;
use polyclean_core::vector::{parse_fid, Fid, VectorLayer};
use std::collections::HashSet;
use tracing::warn;

/// Collect the FIDs of features matching a predicate, in iteration
/// order. The predicate is installed as the layer's attribute filter
/// for the duration of the scan and removed afterwards.
pub fn select_by_predicate(layer: &mut VectorLayer, predicate: &str) -> Result<Vec<Fid>> {
    layer.set_attribute_filter(predicate)?;
    let fids = layer.features().filter_map(|f| f.fid).collect();
    layer.clear_attribute_filter();
    Ok(fids)
}

/// Parse an explicit feature-ID list with strict decimal semantics.
///
/// Invalid entries (empty, signed, trailing garbage, overflow) are
/// warned and dropped. Duplicates keep their first occurrence. Returns
/// the parsed FIDs and the number of rejected entries.
pub fn parse_fid_list<S: AsRef<str>>(items: &[S]) -> (Vec<Fid>, usize) {
    let mut seen: HashSet<Fid> = HashSet::new();
    let mut fids = Vec::new();
    let mut rejected = 0usize;
    for item in items {
        match parse_fid(item.as_ref()) {
            Some(fid) => {
                if seen.insert(fid) {
                    fids.push(fid);
                }
            }
            None => {
                warn!("Ignoring invalid feature ID '{}'", item.as_ref());
                rejected += 1;
            }
        }
    }
    (fids, rejected)
}
