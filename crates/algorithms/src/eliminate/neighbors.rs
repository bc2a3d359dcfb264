//! Touching-neighbor discovery and merge-target selection
//!
//! For each victim: query the spatial index for bounding-box candidates,
//! keep the ones that topologically touch, measure the shared boundary,
//! and pick one neighbor under the configured merge policy.

use crate::eliminate::load::{FeatureNode, NeighborEdge, SpatialIndex};
use crate::eliminate::{EliminateSummary, MergePolicy};
use geo::Relate;
use geo_types::{Coord, LineString, MultiPolygon};
use tracing::warn;

/// Maximum perpendicular distance, in CRS units, at which two segments
/// are still considered to lie on the same supporting line.
const COLLINEAR_TOL: f64 = 1e-9;

/// Resolve the merge target of every victim, in loader order.
pub(crate) fn resolve(
    nodes: &mut [FeatureNode],
    victims: &[usize],
    index: &SpatialIndex,
    policy: MergePolicy,
    summary: &mut EliminateSummary,
) {
    for &v in victims {
        let mut candidates: Vec<usize> = index
            .locate_in_envelope_intersecting(&nodes[v].envelope())
            .map(|entry| entry.data)
            .filter(|&idx| idx != v)
            .collect();
        // The index reports hits in arbitrary order; canonicalize to
        // loader order so tie-breaks are reproducible.
        candidates.sort_unstable();

        if candidates.is_empty() {
            warn!("Victim {:?} has no neighbors", nodes[v].fid());
            summary.victims_no_neighbors += 1;
            continue;
        }

        let mut edges: Vec<NeighborEdge> = Vec::new();
        for &c in &candidates {
            if touches(&nodes[v], &nodes[c]) {
                let boundary = shared_boundary_length(&nodes[v].polygons, &nodes[c].polygons);
                edges.push(NeighborEdge { node: c, boundary });
            }
        }

        if edges.is_empty() {
            warn!("Victim {:?} has no touching neighbors", nodes[v].fid());
            summary.victims_no_touching += 1;
            continue;
        }

        let target = choose(nodes, &edges, policy);
        nodes[v].edges = edges;
        nodes[v].target = Some(target);
        nodes[target].assigned.push(v);
    }
}

/// Standard topological touches: closures share at least one point,
/// interiors share none.
fn touches(a: &FeatureNode, b: &FeatureNode) -> bool {
    a.polygons.relate(&b.polygons).is_touches()
}

/// Pick one neighbor under the merge policy. Strict comparison; ties
/// keep the first edge encountered.
fn choose(nodes: &[FeatureNode], edges: &[NeighborEdge], policy: MergePolicy) -> usize {
    debug_assert!(!edges.is_empty());
    let mut best = &edges[0];
    let mut best_key = policy_key(nodes, best, policy);
    for edge in &edges[1..] {
        let key = policy_key(nodes, edge, policy);
        let better = match policy {
            MergePolicy::LargestArea | MergePolicy::LongestBoundary => key > best_key,
            MergePolicy::SmallestArea => key < best_key,
        };
        if better {
            best = edge;
            best_key = key;
        }
    }
    best.node
}

fn policy_key(nodes: &[FeatureNode], edge: &NeighborEdge, policy: MergePolicy) -> f64 {
    match policy {
        MergePolicy::LargestArea | MergePolicy::SmallestArea => nodes[edge.node].area(),
        MergePolicy::LongestBoundary => edge.boundary,
    }
}

/// Total length of the boundary shared by two polygonal geometries.
///
/// Computed as the summed collinear overlap between boundary segments
/// of `a` and `b`. A touch at a single point contributes zero.
pub(crate) fn shared_boundary_length(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    let mut total = 0.0;
    for ring_a in rings(a) {
        for seg_a in ring_a.0.windows(2) {
            for ring_b in rings(b) {
                for seg_b in ring_b.0.windows(2) {
                    total += collinear_overlap(seg_a[0], seg_a[1], seg_b[0], seg_b[1]);
                }
            }
        }
    }
    total
}

fn rings(mp: &MultiPolygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    mp.0.iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors().iter()))
}

/// Length of the overlap between segment (a1, a2) and segment (b1, b2),
/// zero unless b lies on a's supporting line.
fn collinear_overlap(a1: Coord<f64>, a2: Coord<f64>, b1: Coord<f64>, b2: Coord<f64>) -> f64 {
    let dx = a2.x - a1.x;
    let dy = a2.y - a1.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return 0.0;
    }
    let len = len2.sqrt();

    // Perpendicular distance of both b endpoints from a's line
    let dist1 = ((b1.x - a1.x) * dy - (b1.y - a1.y) * dx).abs() / len;
    let dist2 = ((b2.x - a1.x) * dy - (b2.y - a1.y) * dx).abs() / len;
    if dist1 > COLLINEAR_TOL || dist2 > COLLINEAR_TOL {
        return 0.0;
    }

    // Project b's endpoints onto a, clamp to a's extent
    let t1 = ((b1.x - a1.x) * dx + (b1.y - a1.y) * dy) / len2;
    let t2 = ((b2.x - a1.x) * dx + (b2.y - a1.y) * dy) / len2;
    let lo = t1.min(t2).max(0.0);
    let hi = t1.max(t2).min(1.0);
    if hi > lo {
        (hi - lo) * len
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )])
    }

    #[test]
    fn test_shared_edge_length() {
        // Unit squares sharing the full edge x=1
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(1.0, 0.0, 2.0, 1.0);
        assert!((shared_boundary_length(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_edge_overlap() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(1.0, 0.25, 2.0, 0.75);
        assert!((shared_boundary_length(&a, &b) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_point_touch_has_zero_length() {
        // Corner-to-corner contact only
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(1.0, 1.0, 2.0, 2.0);
        assert_eq!(shared_boundary_length(&a, &b), 0.0);
    }

    #[test]
    fn test_disjoint_is_zero() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(5.0, 5.0, 6.0, 6.0);
        assert_eq!(shared_boundary_length(&a, &b), 0.0);
    }

    #[test]
    fn test_split_neighbor_segments_sum() {
        // b's edge along x=1 is covered by two shorter collinear segments
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (1.0, 0.0),
                (2.0, 0.0),
                (2.0, 1.0),
                (1.0, 1.0),
                (1.0, 0.5),
                (1.0, 0.0),
            ]),
            vec![],
        )]);
        assert!((shared_boundary_length(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_touches_predicate() {
        let edge = rect(0.0, 0.0, 1.0, 1.0);
        let adjacent = rect(1.0, 0.0, 2.0, 1.0);
        let overlapping = rect(0.5, 0.0, 1.5, 1.0);
        let disjoint = rect(5.0, 0.0, 6.0, 1.0);

        assert!(edge.relate(&adjacent).is_touches());
        assert!(!edge.relate(&overlapping).is_touches());
        assert!(!edge.relate(&disjoint).is_touches());
    }
}
