//! Explode multi-part geometries
//!
//! Turns every multi-part feature into one single-part feature per
//! member, duplicating the attribute record. Single-part features are
//! copied through unchanged.

use geo_types::Geometry;
use polyclean_core::error::{Error, Result};
use polyclean_core::vector::{Feature, VectorLayer};
use polyclean_core::Algorithm;
use tracing::info;

/// Counts accumulated over one explode run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplodeSummary {
    /// Features in the source layer.
    pub source_features: usize,
    /// Features written to the output layer.
    pub emitted: usize,
    /// Multi-part features that were split.
    pub expanded: usize,
}

/// Split multi-part geometries into single-part features.
///
/// The output schema declares the single-part counterpart of the source
/// geometry type. Geometry types outside Point/LineString/Polygon and
/// their Multi counterparts are fatal, matching the operation's
/// contract of never inventing a part decomposition.
pub fn explode(src: &VectorLayer) -> Result<(VectorLayer, ExplodeSummary)> {
    ensure_supported_declared(src)?;

    let mut schema = src.schema().clone();
    schema.geometry_type = schema.geometry_type.single();
    let mut out = VectorLayer::new(src.name(), schema);

    let mut summary = ExplodeSummary {
        source_features: src.len(),
        ..Default::default()
    };

    for feature in src.features() {
        match &feature.geometry {
            None => {
                push_part(&mut out, feature, None);
                summary.emitted += 1;
            }
            Some(geometry) => {
                let parts = split(geometry)?;
                if parts.len() > 1 {
                    summary.expanded += 1;
                }
                for part in parts {
                    push_part(&mut out, feature, Some(part));
                    summary.emitted += 1;
                }
            }
        }
    }

    info!(
        "explode: {} features in, {} out ({} split)",
        summary.source_features, summary.emitted, summary.expanded
    );
    Ok((out, summary))
}

fn ensure_supported_declared(src: &VectorLayer) -> Result<()> {
    use polyclean_core::vector::GeometryType::*;
    match src.schema().geometry_type {
        Point | LineString | Polygon | MultiPoint | MultiLineString | MultiPolygon => Ok(()),
        other => Err(Error::UnsupportedGeometryType(other.to_string())),
    }
}

fn split(geometry: &Geometry<f64>) -> Result<Vec<Geometry<f64>>> {
    Ok(match geometry {
        Geometry::Point(_) | Geometry::LineString(_) | Geometry::Polygon(_) => {
            vec![geometry.clone()]
        }
        Geometry::MultiPoint(mp) => mp.0.iter().map(|p| Geometry::Point(*p)).collect(),
        Geometry::MultiLineString(mls) => {
            mls.0.iter().map(|ls| Geometry::LineString(ls.clone())).collect()
        }
        Geometry::MultiPolygon(mp) => {
            mp.0.iter().map(|p| Geometry::Polygon(p.clone())).collect()
        }
        other => {
            return Err(Error::UnsupportedGeometryType(geometry_name(other).to_string()))
        }
    })
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn push_part(out: &mut VectorLayer, source: &Feature, geometry: Option<Geometry<f64>>) {
    out.push(Feature {
        fid: None,
        geometry,
        properties: source.properties.clone(),
    });
}

/// Explode algorithm
#[derive(Debug, Clone, Default)]
pub struct Explode;

impl Algorithm for Explode {
    type Input = VectorLayer;
    type Output = (VectorLayer, ExplodeSummary);
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Explode"
    }

    fn description(&self) -> &'static str {
        "Split multi-part geometries into single-part features"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        explode(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{GeometryCollection, LineString, MultiPolygon, Point, Polygon};
    use polyclean_core::vector::{AttributeValue, FieldDef, FieldType, GeometryType, Schema};

    fn poly(x0: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (x0, 0.0),
                (x0 + 1.0, 0.0),
                (x0 + 1.0, 1.0),
                (x0, 1.0),
                (x0, 0.0),
            ]),
            vec![],
        )
    }

    fn multi_layer() -> VectorLayer {
        let schema = Schema::new(
            vec![FieldDef::new("tag", FieldType::String)],
            GeometryType::MultiPolygon,
        );
        let mut layer = VectorLayer::new("m", schema);

        let mut a = Feature::new(Geometry::MultiPolygon(MultiPolygon::new(vec![
            poly(0.0),
            poly(5.0),
            poly(10.0),
        ])));
        a.set_property("tag", AttributeValue::String("a".into()));
        layer.push(a);

        let mut b = Feature::new(Geometry::Polygon(poly(20.0)));
        b.set_property("tag", AttributeValue::String("b".into()));
        layer.push(b);

        layer
    }

    #[test]
    fn test_explode_fans_out_parts() {
        let (out, summary) = explode(&multi_layer()).unwrap();
        assert_eq!(summary.source_features, 2);
        assert_eq!(summary.emitted, 4);
        assert_eq!(summary.expanded, 1);
        assert_eq!(out.len(), 4);
        assert_eq!(out.schema().geometry_type, GeometryType::Polygon);

        // Attributes are duplicated onto every part
        let tags: Vec<_> = out
            .features()
            .map(|f| f.get_property("tag").cloned().unwrap())
            .collect();
        assert_eq!(
            tags,
            vec![
                AttributeValue::String("a".into()),
                AttributeValue::String("a".into()),
                AttributeValue::String("a".into()),
                AttributeValue::String("b".into()),
            ]
        );
    }

    #[test]
    fn test_explode_multipoint() {
        let schema = Schema::new(vec![], GeometryType::MultiPoint);
        let mut layer = VectorLayer::new("pts", schema);
        layer.push(Feature::new(Geometry::MultiPoint(
            vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)].into(),
        )));

        let (out, summary) = explode(&layer).unwrap();
        assert_eq!(summary.emitted, 2);
        assert_eq!(out.schema().geometry_type, GeometryType::Point);
    }

    #[test]
    fn test_explode_rejects_unsupported() {
        let schema = Schema::new(vec![], GeometryType::Polygon);
        let mut layer = VectorLayer::new("gc", schema);
        layer.push(Feature::new(Geometry::GeometryCollection(
            GeometryCollection(vec![Geometry::Point(Point::new(0.0, 0.0))]),
        )));

        assert!(matches!(
            explode(&layer),
            Err(Error::UnsupportedGeometryType(_))
        ));

        let schema = Schema::new(vec![], GeometryType::Unknown);
        let layer = VectorLayer::new("u", schema);
        assert!(explode(&layer).is_err());
    }
}
