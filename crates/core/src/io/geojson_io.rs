//! Native GeoJSON reading/writing (without GDAL dependency)
//!
//! Uses the `geojson` crate. For other vector formats (Shapefile,
//! GeoPackage, ...) and for filter pushdown to SQL drivers, enable the
//! `gdal` feature.

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::io::driver::guess_driver;
use crate::vector::{
    AttributeValue, Feature, FieldDef, FieldType, Fid, GeometryType, Schema, VectorLayer,
};
use geojson::{FeatureCollection, GeoJson};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use tracing::{debug, warn};

/// Read a GeoJSON file into a [`VectorLayer`].
///
/// GeoJSON datasets carry a single layer named after the file stem; a
/// `layer` argument naming anything else is an error.
pub fn read_vector(path: impl AsRef<Path>, layer: Option<&str>) -> Result<VectorLayer> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|_| Error::OpenFailed(path.display().to_string()))?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| Error::Other(format!("GeoJSON parse error: {}", e)))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(f) => FeatureCollection {
            bbox: None,
            features: vec![f],
            foreign_members: None,
        },
        GeoJson::Geometry(g) => FeatureCollection {
            bbox: None,
            features: vec![geojson::Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            foreign_members: None,
        },
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("layer")
        .to_string();
    let layer_name = collection
        .foreign_members
        .as_ref()
        .and_then(|m| m.get("name"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or(stem);

    if let Some(requested) = layer {
        if requested != layer_name {
            return Err(Error::LayerNotFound(requested.to_string()));
        }
    }
    debug!("processing layer {}", layer_name);

    // Infer the schema: field order is first-seen across all features,
    // field type comes from the first non-null value.
    let mut fields: Vec<FieldDef> = Vec::new();
    for feature in &collection.features {
        if let Some(props) = &feature.properties {
            for (name, value) in props {
                if fields.iter().any(|f| &f.name == name) {
                    continue;
                }
                fields.push(FieldDef::new(name.clone(), json_field_type(value)));
            }
        }
    }

    let geometry_type = collection
        .features
        .iter()
        .find_map(|f| f.geometry.as_ref())
        .map(|g| geometry_type_of(&g.value))
        .unwrap_or(GeometryType::Unknown);

    let mut schema = Schema::new(fields, geometry_type);
    schema.srs = Some(Crs::wgs84()); // RFC 7946
    for field in &schema.fields {
        debug!("processing field '{}'", field.name);
    }

    let mut out = VectorLayer::new(layer_name, schema).with_driver("GeoJSON");
    for gj_feature in collection.features {
        let geometry = match gj_feature.geometry {
            Some(g) => match geo_types::Geometry::<f64>::try_from(g.value) {
                Ok(geom) => Some(geom),
                Err(e) => {
                    warn!("Skipping unconvertible geometry: {}", e);
                    None
                }
            },
            None => None,
        };

        let mut feature = Feature {
            fid: fid_of(gj_feature.id.as_ref()),
            geometry,
            properties: Default::default(),
        };
        if let Some(props) = gj_feature.properties {
            for (name, value) in props {
                feature.set_property(name, attribute_from_json(value));
            }
        }
        out.push(feature);
    }

    Ok(out)
}

/// Collect the FIDs of features matching a filter expression, in
/// natural order.
pub fn select_fids_where(
    path: impl AsRef<Path>,
    layer: Option<&str>,
    expression: &str,
) -> Result<Vec<Fid>> {
    let mut src = read_vector(path, layer)?;
    src.set_attribute_filter(expression)?;
    let fids = src.features().filter_map(|f| f.fid).collect();
    src.clear_attribute_filter();
    Ok(fids)
}

/// Write a [`VectorLayer`] to a GeoJSON file.
///
/// The driver (given or guessed from the extension) must be `GeoJSON`;
/// other formats need the `gdal` feature.
pub fn write_vector(
    layer: &VectorLayer,
    path: impl AsRef<Path>,
    layer_name: Option<&str>,
    driver: Option<&str>,
) -> Result<()> {
    let path = path.as_ref();
    let resolved = match driver {
        Some(name) => name,
        None => guess_driver(path)?,
    };
    if resolved != "GeoJSON" {
        return Err(Error::Other(format!(
            "Driver '{}' is unavailable without the gdal feature; native output is GeoJSON only",
            resolved
        )));
    }

    let name = layer_name.unwrap_or_else(|| layer.name());
    let mut features = Vec::with_capacity(layer.len());
    for feature in layer.features() {
        let geometry = feature
            .geometry
            .as_ref()
            .map(|g| geojson::Geometry::new(geojson::Value::from(g)));

        let mut props = Map::new();
        for field in &layer.schema().fields {
            let value = feature
                .get_property(&field.name)
                .map(json_from_attribute)
                .unwrap_or(JsonValue::Null);
            props.insert(field.name.clone(), value);
        }

        features.push(geojson::Feature {
            bbox: None,
            geometry,
            id: feature
                .fid
                .map(|fid| geojson::feature::Id::Number(serde_json::Number::from(fid))),
            properties: Some(props),
            foreign_members: None,
        });
    }

    let mut foreign = Map::new();
    foreign.insert("name".to_string(), JsonValue::String(name.to_string()));
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign),
    };

    let text = serde_json::to_string_pretty(&collection)
        .map_err(|e| Error::WriteFailed(e.to_string()))?;
    std::fs::write(path, text).map_err(|_| Error::CreateFailed(path.display().to_string()))?;
    Ok(())
}

fn fid_of(id: Option<&geojson::feature::Id>) -> Option<Fid> {
    match id {
        Some(geojson::feature::Id::Number(n)) => n.as_u64(),
        Some(geojson::feature::Id::String(s)) => crate::vector::parse_fid(s),
        None => None,
    }
}

fn json_field_type(value: &JsonValue) -> FieldType {
    match value {
        JsonValue::Bool(_) => FieldType::Bool,
        JsonValue::Number(n) if n.is_i64() => FieldType::Int,
        JsonValue::Number(_) => FieldType::Float,
        _ => FieldType::String,
    }
}

fn attribute_from_json(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                AttributeValue::Int(i)
            } else {
                AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn json_from_attribute(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => JsonValue::Number((*i).into()),
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}

fn geometry_type_of(value: &geojson::Value) -> GeometryType {
    match value {
        geojson::Value::Point(_) => GeometryType::Point,
        geojson::Value::LineString(_) => GeometryType::LineString,
        geojson::Value::Polygon(_) => GeometryType::Polygon,
        geojson::Value::MultiPoint(_) => GeometryType::MultiPoint,
        geojson::Value::MultiLineString(_) => GeometryType::MultiLineString,
        geojson::Value::MultiPolygon(_) => GeometryType::MultiPolygon,
        geojson::Value::GeometryCollection(_) => GeometryType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, LineString, Polygon};
    use tempfile::TempDir;

    fn square(x0: f64, side: f64) -> Geometry<f64> {
        Geometry::Polygon(Polygon::new(
            LineString::from(vec![
                (x0, 0.0),
                (x0 + side, 0.0),
                (x0 + side, side),
                (x0, side),
                (x0, 0.0),
            ]),
            vec![],
        ))
    }

    fn sample_layer() -> VectorLayer {
        let schema = Schema::new(
            vec![
                FieldDef::new("name", FieldType::String),
                FieldDef::new("value", FieldType::Int),
            ],
            GeometryType::Polygon,
        );
        let mut layer = VectorLayer::new("cells", schema);
        for (i, x0) in [0.0, 2.0, 4.0].iter().enumerate() {
            let mut f = Feature::new(square(*x0, 1.0));
            f.set_property("name", AttributeValue::String(format!("cell{}", i)));
            f.set_property("value", AttributeValue::Int(i as i64));
            layer.push(f);
        }
        layer
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cells.geojson");

        let layer = sample_layer();
        write_vector(&layer, &path, None, None).unwrap();

        let loaded = read_vector(&path, None).unwrap();
        assert_eq!(loaded.name(), "cells");
        assert_eq!(loaded.driver(), "GeoJSON");
        assert_eq!(loaded.len(), 3);

        let first = loaded.feature(0).unwrap();
        assert_eq!(
            first.get_property("name"),
            Some(&AttributeValue::String("cell0".into()))
        );
        assert_eq!(first.get_property("value"), Some(&AttributeValue::Int(0)));
        assert!(first.geometry.is_some());
        assert_eq!(loaded.schema().geometry_type, GeometryType::Polygon);
    }

    #[test]
    fn test_read_named_layer_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cells.geojson");
        write_vector(&sample_layer(), &path, None, None).unwrap();

        assert!(matches!(
            read_vector(&path, Some("other")),
            Err(Error::LayerNotFound(_))
        ));
        assert!(read_vector(&path, Some("cells")).is_ok());
    }

    #[test]
    fn test_select_fids_where() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cells.geojson");
        write_vector(&sample_layer(), &path, None, None).unwrap();

        let fids = select_fids_where(&path, None, "value > 0").unwrap();
        assert_eq!(fids, vec![1, 2]);

        assert!(select_fids_where(&path, None, "value >").is_err());
    }

    #[test]
    fn test_write_rejects_non_geojson_driver() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cells.shp");
        assert!(write_vector(&sample_layer(), &path, None, None).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            read_vector("/nonexistent/nope.geojson", None),
            Err(Error::OpenFailed(_))
        ));
    }
}
