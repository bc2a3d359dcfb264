//! Merge-graph collapsing
//!
//! Victim-to-target edges form a functional graph (out-degree at most
//! one). Survivors have no outgoing edge, so everything reachable from
//! a survivor's assigned list is a tree; cycles can only occur among
//! victims that chose each other, and those are unreachable from any
//! survivor.

use crate::eliminate::load::FeatureNode;
use tracing::{debug, warn};

/// Collect the transitive set of victims assigned to a survivor.
///
/// Visited-set traversal: a node already absorbed elsewhere is skipped
/// rather than revisited.
pub(crate) fn collect_assigned(
    nodes: &[FeatureNode],
    survivor: usize,
    visited: &mut [bool],
) -> Vec<usize> {
    let mut group = Vec::new();
    let mut stack: Vec<usize> = nodes[survivor].assigned.clone();
    while let Some(idx) = stack.pop() {
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        group.push(idx);
        stack.extend(nodes[idx].assigned.iter().copied());
    }
    group
}

/// Report victims that chose a target but were never absorbed: they sit
/// on (or feed into) a victim-only cycle with no survivor reachable.
/// One diagnostic per closed cycle; members are dropped like unassigned
/// victims. Returns the number of dropped victims.
pub(crate) fn report_unresolved(
    nodes: &[FeatureNode],
    victims: &[usize],
    visited: &mut [bool],
) -> usize {
    let mut dropped = 0usize;
    for &v in victims {
        if visited[v] || nodes[v].target.is_none() {
            continue;
        }

        // Walk the chain; out-degree <= 1 makes termination trivial.
        let mut walk = Vec::new();
        let mut cur = v;
        while !visited[cur] {
            visited[cur] = true;
            walk.push(cur);
            match nodes[cur].target {
                Some(next) => cur = next,
                None => break,
            }
        }

        dropped += walk.len();
        if walk.contains(&cur) {
            warn!(
                "Unresolvable merge cycle among {} victim(s) starting at {:?}; dropped",
                walk.len(),
                nodes[cur].fid()
            );
        } else {
            debug!(
                "{} victim(s) feed an already-reported cycle; dropped",
                walk.len()
            );
        }
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, LineString, Polygon};
    use polyclean_core::vector::{Feature, GeometryType, Schema, VectorLayer};
    use std::collections::HashSet;

    /// Build an arena by hand-wiring targets, using trivial geometries.
    fn arena(n: usize) -> Vec<FeatureNode> {
        let mut layer = VectorLayer::new("t", Schema::new(vec![], GeometryType::Polygon));
        for i in 0..n {
            let x = i as f64 * 10.0;
            layer.push(Feature::new(Geometry::Polygon(Polygon::new(
                LineString::from(vec![
                    (x, 0.0),
                    (x + 1.0, 0.0),
                    (x + 1.0, 1.0),
                    (x, 1.0),
                    (x, 0.0),
                ]),
                vec![],
            ))));
        }
        crate::eliminate::load::load(&layer, &HashSet::new()).nodes
    }

    fn assign(nodes: &mut [FeatureNode], victim: usize, target: usize) {
        nodes[victim].is_victim = true;
        nodes[victim].target = Some(target);
        nodes[target].assigned.push(victim);
    }

    #[test]
    fn test_transitive_chain() {
        // 2 -> 1 -> 0 (survivor)
        let mut nodes = arena(3);
        assign(&mut nodes, 1, 0);
        assign(&mut nodes, 2, 1);

        let mut visited = vec![false; nodes.len()];
        let group = collect_assigned(&nodes, 0, &mut visited);
        assert_eq!(group.len(), 2);
        assert!(group.contains(&1) && group.contains(&2));
    }

    #[test]
    fn test_two_victim_cycle_is_dropped() {
        // 1 <-> 2, survivor 0 untouched
        let mut nodes = arena(3);
        assign(&mut nodes, 1, 2);
        assign(&mut nodes, 2, 1);

        let mut visited = vec![false; nodes.len()];
        let group = collect_assigned(&nodes, 0, &mut visited);
        assert!(group.is_empty());

        let dropped = report_unresolved(&nodes, &[1, 2], &mut visited);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_tail_into_cycle_is_dropped_with_it() {
        // 3 -> 1, 1 <-> 2
        let mut nodes = arena(4);
        assign(&mut nodes, 1, 2);
        assign(&mut nodes, 2, 1);
        assign(&mut nodes, 3, 1);

        let mut visited = vec![false; nodes.len()];
        let group = collect_assigned(&nodes, 0, &mut visited);
        assert!(group.is_empty());

        let dropped = report_unresolved(&nodes, &[1, 2, 3], &mut visited);
        assert_eq!(dropped, 3);
    }

    #[test]
    fn test_unassigned_victim_not_counted_as_cycle() {
        let mut nodes = arena(2);
        nodes[1].is_victim = true; // no target: dropped earlier with its own warning

        let mut visited = vec![false; nodes.len()];
        let dropped = report_unresolved(&nodes, &[1], &mut visited);
        assert_eq!(dropped, 0);
    }
}
