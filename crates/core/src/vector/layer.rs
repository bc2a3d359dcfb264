//! In-memory vector layer
//!
//! The working representation all algorithms operate on. File backends
//! read into and write out of this type. Iteration order is insertion
//! order, and FIDs are stable once assigned.

use crate::error::Result;
use crate::vector::{CompiledFilter, Feature, Fid, Schema};

/// An in-memory vector layer: a schema plus features in natural order,
/// with optional attribute filtering.
#[derive(Debug, Clone)]
pub struct VectorLayer {
    name: String,
    driver: String,
    schema: Schema,
    features: Vec<Feature>,
    filter: Option<CompiledFilter>,
    next_fid: Fid,
}

impl VectorLayer {
    /// Create an empty layer with the given name and schema.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            driver: "Memory".to_string(),
            schema,
            features: Vec::new(),
            filter: None,
            next_fid: 0,
        }
    }

    /// Tag the layer with the driver it was read from.
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short name of the driver this layer came from ("Memory" if none).
    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Total number of stored features, ignoring any attribute filter.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Append a feature, assigning the next FID if it carries none.
    /// Returns the feature's FID.
    pub fn push(&mut self, mut feature: Feature) -> Fid {
        let fid = match feature.fid {
            Some(fid) => {
                self.next_fid = self.next_fid.max(fid.saturating_add(1));
                fid
            }
            None => {
                let fid = self.next_fid;
                feature.fid = Some(fid);
                self.next_fid += 1;
                fid
            }
        };
        self.features.push(feature);
        fid
    }

    /// Install an attribute filter. Subsequent [`VectorLayer::features`]
    /// iteration yields only matching features.
    pub fn set_attribute_filter(&mut self, expression: &str) -> Result<()> {
        self.filter = Some(CompiledFilter::parse(expression)?);
        Ok(())
    }

    /// Remove any installed attribute filter.
    pub fn clear_attribute_filter(&mut self) {
        self.filter = None;
    }

    /// Iterate features in natural order, honoring the attribute filter.
    pub fn features(&self) -> impl Iterator<Item = &Feature> + '_ {
        self.features
            .iter()
            .filter(move |f| self.filter.as_ref().map_or(true, |flt| flt.matches(f)))
    }

    /// Look up a feature by FID.
    pub fn feature(&self, fid: Fid) -> Option<&Feature> {
        self.features.iter().find(|f| f.fid == Some(fid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{AttributeValue, FieldDef, FieldType, GeometryType};
    use geo_types::{Geometry, LineString, Polygon};

    fn square(side: f64) -> Geometry<f64> {
        Geometry::Polygon(Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (side, 0.0),
                (side, side),
                (0.0, side),
                (0.0, 0.0),
            ]),
            vec![],
        ))
    }

    fn test_layer() -> VectorLayer {
        let schema = Schema::new(
            vec![FieldDef::new("kind", FieldType::String)],
            GeometryType::Polygon,
        );
        let mut layer = VectorLayer::new("parcels", schema);
        for (side, kind) in [(1.0, "small"), (5.0, "big"), (0.01, "small")] {
            let mut f = Feature::new(square(side));
            f.set_property("kind", AttributeValue::String(kind.into()));
            layer.push(f);
        }
        layer
    }

    #[test]
    fn test_push_assigns_sequential_fids() {
        let layer = test_layer();
        let fids: Vec<_> = layer.features().map(|f| f.fid).collect();
        assert_eq!(fids, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_push_respects_existing_fid() {
        let mut layer = test_layer();
        let mut f = Feature::new(square(2.0));
        f.fid = Some(100);
        assert_eq!(layer.push(f), 100);
        assert_eq!(layer.push(Feature::new(square(2.0))), 101);
    }

    #[test]
    fn test_attribute_filter() {
        let mut layer = test_layer();
        layer.set_attribute_filter("kind = 'small'").unwrap();
        assert_eq!(layer.features().count(), 2);
        layer.clear_attribute_filter();
        assert_eq!(layer.features().count(), 3);
    }

    #[test]
    fn test_geom_area_filter() {
        let mut layer = test_layer();
        layer.set_attribute_filter("OGR_GEOM_AREA < 0.005").unwrap();
        let fids: Vec<_> = layer.features().map(|f| f.fid.unwrap()).collect();
        assert_eq!(fids, vec![2]);
    }

    #[test]
    fn test_invalid_filter_is_an_error() {
        let mut layer = test_layer();
        assert!(layer.set_attribute_filter("kind >").is_err());
        // A rejected filter leaves the previous state untouched
        assert_eq!(layer.features().count(), 3);
    }

    #[test]
    fn test_feature_lookup() {
        let layer = test_layer();
        assert!(layer.feature(1).is_some());
        assert!(layer.feature(99).is_none());
    }
}
