//! Feature loading and spatial indexing
//!
//! One pass over the source layer builds an arena of [`FeatureNode`]s,
//! classifies each as keep or victim, and bulk-loads an R-tree of
//! bounding rectangles keyed by arena index.

use geo::{Area, BoundingRect};
use geo_types::{Geometry, MultiPolygon, Rect};
use polyclean_core::vector::{Feature, Fid, VectorLayer};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use std::cell::OnceCell;
use std::collections::HashSet;
use tracing::warn;

/// R-tree entry: a bounding rectangle tagged with its arena index.
pub(crate) type IndexEntry = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Bulk-loaded bounding-box index over the node arena.
pub(crate) type SpatialIndex = RTree<IndexEntry>;

/// A touching neighbor of a victim, with the shared-boundary length.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NeighborEdge {
    pub node: usize,
    pub boundary: f64,
}

/// One node per loaded source feature.
///
/// Lives in a `Vec` arena for the duration of a run; the spatial index
/// and all merge edges refer to nodes by arena index.
pub(crate) struct FeatureNode {
    /// The original feature record (attributes + geometry).
    pub feature: Feature,
    /// Polygonal geometry, normalized to multi-part form at load time.
    pub polygons: MultiPolygon<f64>,
    /// Bounding rectangle of `polygons`.
    pub bbox: Rect<f64>,
    pub is_victim: bool,
    /// The neighbor this victim is assigned to merge into.
    pub target: Option<usize>,
    /// Touching neighbors, in candidate-enumeration order (victims only).
    pub edges: Vec<NeighborEdge>,
    /// Victims assigned to merge into this node.
    pub assigned: Vec<usize>,
    area: OnceCell<f64>,
}

impl FeatureNode {
    fn new(feature: Feature, polygons: MultiPolygon<f64>, bbox: Rect<f64>, is_victim: bool) -> Self {
        Self {
            feature,
            polygons,
            bbox,
            is_victim,
            target: None,
            edges: Vec::new(),
            assigned: Vec::new(),
            area: OnceCell::new(),
        }
    }

    pub fn fid(&self) -> Option<Fid> {
        self.feature.fid
    }

    /// Polygon area, computed once on first use.
    pub fn area(&self) -> f64 {
        *self.area.get_or_init(|| self.polygons.unsigned_area())
    }

    /// Query envelope for the spatial index.
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners(
            [self.bbox.min().x, self.bbox.min().y],
            [self.bbox.max().x, self.bbox.max().y],
        )
    }
}

pub(crate) struct LoadResult {
    pub nodes: Vec<FeatureNode>,
    /// Arena indices of survivors, in loader order.
    pub keep: Vec<usize>,
    /// Arena indices of victims, in loader order.
    pub victims: Vec<usize>,
    pub index: SpatialIndex,
    /// Features dropped for missing or non-polygonal geometry.
    pub skipped: usize,
    /// Selected FIDs not present in the source.
    pub missing: usize,
}

/// Load every source feature once, in natural order.
pub(crate) fn load(src: &VectorLayer, victim_fids: &HashSet<Fid>) -> LoadResult {
    let mut pending: HashSet<Fid> = victim_fids.clone();
    let mut nodes: Vec<FeatureNode> = Vec::with_capacity(src.len());
    let mut keep = Vec::new();
    let mut victims = Vec::new();
    let mut entries: Vec<IndexEntry> = Vec::with_capacity(src.len());
    let mut skipped = 0usize;

    for feature in src.features() {
        let polygons = match &feature.geometry {
            None => {
                warn!("Feature {:?} has no geometry; dropped", feature.fid);
                skipped += 1;
                continue;
            }
            Some(Geometry::Polygon(p)) => MultiPolygon::new(vec![p.clone()]),
            Some(Geometry::MultiPolygon(mp)) => mp.clone(),
            Some(_) => {
                warn!(
                    "Feature {:?} has non-polygonal geometry; dropped",
                    feature.fid
                );
                skipped += 1;
                continue;
            }
        };

        let bbox = match polygons.bounding_rect() {
            Some(rect) => rect,
            None => {
                warn!("Feature {:?} has empty geometry; dropped", feature.fid);
                skipped += 1;
                continue;
            }
        };

        let is_victim = match feature.fid {
            Some(fid) => pending.remove(&fid),
            None => false,
        };

        let idx = nodes.len();
        nodes.push(FeatureNode::new(feature.clone(), polygons, bbox, is_victim));
        entries.push(GeomWithData::new(
            Rectangle::from_corners(
                [bbox.min().x, bbox.min().y],
                [bbox.max().x, bbox.max().y],
            ),
            idx,
        ));
        if is_victim {
            victims.push(idx);
        } else {
            keep.push(idx);
        }
    }

    for fid in &pending {
        warn!("Selected feature {} not present in source", fid);
    }

    LoadResult {
        nodes,
        keep,
        victims,
        index: RTree::bulk_load(entries),
        skipped,
        missing: pending.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Point, Polygon};
    use polyclean_core::vector::{GeometryType, Schema};

    fn square(x0: f64, y0: f64, side: f64) -> Geometry<f64> {
        Geometry::Polygon(Polygon::new(
            LineString::from(vec![
                (x0, y0),
                (x0 + side, y0),
                (x0 + side, y0 + side),
                (x0, y0 + side),
                (x0, y0),
            ]),
            vec![],
        ))
    }

    fn layer(geometries: Vec<Option<Geometry<f64>>>) -> VectorLayer {
        let mut layer = VectorLayer::new("test", Schema::new(vec![], GeometryType::Polygon));
        for geometry in geometries {
            let mut f = Feature::empty();
            f.geometry = geometry;
            layer.push(f);
        }
        layer
    }

    #[test]
    fn test_load_classifies_and_indexes() {
        let src = layer(vec![
            Some(square(0.0, 0.0, 1.0)),
            Some(square(1.0, 0.0, 1.0)),
            Some(square(5.0, 5.0, 1.0)),
        ]);
        let result = load(&src, &HashSet::from([1]));

        assert_eq!(result.nodes.len(), 3);
        assert_eq!(result.keep, vec![0, 2]);
        assert_eq!(result.victims, vec![1]);
        assert_eq!(result.skipped, 0);
        assert_eq!(result.missing, 0);

        // The index finds the two touching squares from either's envelope
        let hits: Vec<usize> = result
            .index
            .locate_in_envelope_intersecting(&result.nodes[0].envelope())
            .map(|e| e.data)
            .collect();
        assert!(hits.contains(&0) && hits.contains(&1));
        assert!(!hits.contains(&2));
    }

    #[test]
    fn test_load_drops_missing_and_nonpolygonal() {
        let src = layer(vec![
            Some(square(0.0, 0.0, 1.0)),
            None,
            Some(Geometry::Point(Point::new(0.0, 0.0))),
        ]);
        let result = load(&src, &HashSet::new());

        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.skipped, 2);
    }

    #[test]
    fn test_load_reports_absent_selection() {
        let src = layer(vec![Some(square(0.0, 0.0, 1.0))]);
        let result = load(&src, &HashSet::from([0, 9999]));

        assert_eq!(result.victims, vec![0]);
        assert_eq!(result.missing, 1);
    }

    #[test]
    fn test_area_cached_once() {
        let src = layer(vec![Some(square(0.0, 0.0, 2.0))]);
        let result = load(&src, &HashSet::new());
        let node = &result.nodes[0];
        assert!((node.area() - 4.0).abs() < 1e-12);
        assert!((node.area() - 4.0).abs() < 1e-12);
    }
}
