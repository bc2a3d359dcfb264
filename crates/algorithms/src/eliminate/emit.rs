//! Result emission
//!
//! One output feature per survivor, carrying the survivor's attributes
//! and the union of its geometry with every transitively assigned
//! victim's geometry.

use crate::eliminate::collapse;
use crate::eliminate::load::FeatureNode;
use crate::eliminate::EliminateSummary;
use geo::unary_union;
use geo_types::{Geometry, MultiPolygon, Polygon};
use polyclean_core::vector::{Feature, GeometryType, Schema, VectorLayer};

/// Create the destination layer: the source schema with the geometry
/// field declared `Polygon` and the spatial reference copied verbatim.
pub(crate) fn prepare_output_layer(src: &VectorLayer) -> VectorLayer {
    let mut schema = Schema::new(src.schema().fields.clone(), GeometryType::Polygon);
    schema.srs = src.schema().srs.clone();
    schema.geometry_column = src.schema().geometry_column.clone();
    VectorLayer::new(src.name(), schema)
}

/// Emit every survivor in loader order, unioning its merge group.
pub(crate) fn emit(
    nodes: &[FeatureNode],
    keep: &[usize],
    visited: &mut [bool],
    out: &mut VectorLayer,
    summary: &mut EliminateSummary,
) {
    for &s in keep {
        let group = collapse::collect_assigned(nodes, s, visited);

        let geometry = if group.is_empty() {
            from_parts(nodes[s].polygons.clone())
        } else {
            // The whole merge group goes through one unary union, not a
            // fold of pairwise unions.
            let parts: Vec<Polygon<f64>> = nodes[s]
                .polygons
                .0
                .iter()
                .chain(group.iter().flat_map(|&idx| nodes[idx].polygons.0.iter()))
                .cloned()
                .collect();
            let unioned = unary_union(&parts);
            from_parts(unioned)
        };

        out.push(Feature {
            fid: None,
            geometry: Some(geometry),
            properties: nodes[s].feature.properties.clone(),
        });
        summary.emitted += 1;
        summary.victims_absorbed += group.len();
    }
}

/// A single-part result is written as `Polygon`, multi-part as
/// `MultiPolygon`.
fn from_parts(mut parts: MultiPolygon<f64>) -> Geometry<f64> {
    if parts.0.len() == 1 {
        Geometry::Polygon(parts.0.remove(0))
    } else {
        Geometry::MultiPolygon(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::LineString;

    fn poly(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )
    }

    #[test]
    fn test_from_parts_single() {
        let g = from_parts(MultiPolygon::new(vec![poly(0.0, 0.0, 1.0, 1.0)]));
        assert!(matches!(g, Geometry::Polygon(_)));
    }

    #[test]
    fn test_from_parts_multi() {
        let g = from_parts(MultiPolygon::new(vec![
            poly(0.0, 0.0, 1.0, 1.0),
            poly(5.0, 5.0, 6.0, 6.0),
        ]));
        assert!(matches!(g, Geometry::MultiPolygon(_)));
    }

    #[test]
    fn test_adjacent_union_dissolves_shared_edge() {
        use geo::Area;
        let parts = vec![poly(0.0, 0.0, 1.0, 1.0), poly(1.0, 0.0, 2.0, 1.0)];
        let unioned: MultiPolygon<f64> = unary_union(&parts);
        assert_eq!(unioned.0.len(), 1);
        assert!((unioned.unsigned_area() - 2.0).abs() < 1e-9);
    }
}
