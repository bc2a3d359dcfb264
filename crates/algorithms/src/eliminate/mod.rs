//! Polygon elimination
//!
//! Removes a selected subset of "victim" polygons from a layer by
//! merging each one into a touching neighbor chosen by a merge policy.
//! The standard GIS *eliminate* operation, used to clean up sliver
//! polygons produced by overlay or generalization.
//!
//! Pipeline: select victims → load features and build the spatial
//! index → resolve each victim's merge target → collapse merge chains →
//! union and emit survivors. Victim attributes are discarded; survivor
//! attributes pass through unchanged.

mod collapse;
mod emit;
mod load;
mod neighbors;
mod select;

pub use select::{parse_fid_list, select_by_predicate};

use polyclean_core::error::{Error, Result};
use polyclean_core::vector::{Fid, VectorLayer};
use polyclean_core::Algorithm;
use std::collections::HashSet;
use tracing::info;

/// Rule selecting which touching neighbor a victim is absorbed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Merge into the neighbor with the greatest area.
    #[default]
    LargestArea,
    /// Merge into the neighbor with the least area.
    SmallestArea,
    /// Merge into the neighbor sharing the longest boundary.
    LongestBoundary,
}

/// How victims are designated.
#[derive(Debug, Clone, PartialEq)]
pub enum VictimSpec {
    /// An attribute filter expression; matching features are victims.
    Where(String),
    /// An explicit feature-ID list.
    Fids(Vec<Fid>),
}

impl Default for VictimSpec {
    fn default() -> Self {
        VictimSpec::Fids(Vec::new())
    }
}

/// Parameters for the eliminate operation
#[derive(Debug, Clone, Default)]
pub struct EliminateParams {
    pub victims: VictimSpec,
    pub policy: MergePolicy,
}

/// Counts accumulated over one eliminate run.
///
/// Per-feature conditions are logged as warnings and tallied here; none
/// of them fail the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EliminateSummary {
    /// Features in the source layer.
    pub source_features: usize,
    /// Features materialized into the working arena.
    pub loaded: usize,
    /// Features dropped for missing or non-polygonal geometry.
    pub skipped: usize,
    /// Selected victims present in the source.
    pub victims_selected: usize,
    /// Selected FIDs not present in the source.
    pub selected_missing: usize,
    /// Victims absorbed into a survivor.
    pub victims_absorbed: usize,
    /// Victims with no bounding-box neighbor at all.
    pub victims_no_neighbors: usize,
    /// Victims with candidates but no touching neighbor.
    pub victims_no_touching: usize,
    /// Victims lost to victim-only merge cycles.
    pub victims_unresolved: usize,
    /// Features written to the output layer.
    pub emitted: usize,
}

/// Eliminate selected polygons from a layer by merging each into a
/// touching neighbor.
///
/// Returns the output layer (survivor attributes, merged geometry) and
/// a run summary. The source layer is only mutated transiently, to
/// install and remove the selection filter.
pub fn eliminate(
    src: &mut VectorLayer,
    params: &EliminateParams,
) -> Result<(VectorLayer, EliminateSummary)> {
    let fids: Vec<Fid> = match &params.victims {
        VictimSpec::Where(expr) => {
            if expr.trim().is_empty() {
                return Err(Error::NoVictimsSpecified);
            }
            select_by_predicate(src, expr)?
        }
        VictimSpec::Fids(list) => {
            if list.is_empty() {
                return Err(Error::NoVictimsSpecified);
            }
            list.clone()
        }
    };
    let victim_set: HashSet<Fid> = fids.into_iter().collect();

    let mut summary = EliminateSummary {
        source_features: src.len(),
        ..Default::default()
    };

    let load::LoadResult {
        mut nodes,
        keep,
        victims,
        index,
        skipped,
        missing,
    } = load::load(src, &victim_set);
    summary.loaded = nodes.len();
    summary.skipped = skipped;
    summary.selected_missing = missing;
    summary.victims_selected = victims.len();

    neighbors::resolve(&mut nodes, &victims, &index, params.policy, &mut summary);

    let mut out = emit::prepare_output_layer(src);
    let mut visited = vec![false; nodes.len()];
    emit::emit(&nodes, &keep, &mut visited, &mut out, &mut summary);
    summary.victims_unresolved = collapse::report_unresolved(&nodes, &victims, &mut visited);

    info!(
        "eliminate: {} features in, {} out, {} victim(s) absorbed",
        summary.source_features, summary.emitted, summary.victims_absorbed
    );
    Ok((out, summary))
}

/// Eliminate algorithm
#[derive(Debug, Clone, Default)]
pub struct Eliminate;

impl Algorithm for Eliminate {
    type Input = VectorLayer;
    type Output = (VectorLayer, EliminateSummary);
    type Params = EliminateParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Eliminate"
    }

    fn description(&self) -> &'static str {
        "Absorb selected polygons into a touching neighbor chosen by a merge policy"
    }

    fn execute(&self, mut input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        eliminate(&mut input, &params)
    }
}
