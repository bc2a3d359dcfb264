//! Vector dataset reading and writing using GDAL/OGR
//!
//! Any OGR-supported format. Attribute filters are pushed down to the
//! driver, with the `OGR_GEOM_AREA` token rewritten for SQL-backed
//! drivers that do not recognize it.

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::io::driver::guess_driver;
use crate::vector::{
    rewrite_geom_area, AttributeValue, Feature, FieldDef, FieldType, Fid, GeometryType, Schema,
    VectorLayer,
};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{
    Feature as GdalFeature, FieldValue, Geometry as GdalGeometry, Layer, LayerAccess,
    LayerOptions, OGRFieldType, OGRwkbGeometryType,
};
use gdal::{Dataset, DriverManager};
use std::path::Path;
use tracing::{debug, warn};

/// Read one layer of an OGR dataset into a [`VectorLayer`].
///
/// `layer` may be omitted only when the dataset has exactly one layer.
pub fn read_vector(path: impl AsRef<Path>, layer: Option<&str>) -> Result<VectorLayer> {
    let path = path.as_ref();
    let dataset =
        Dataset::open(path).map_err(|_| Error::OpenFailed(path.display().to_string()))?;
    let driver = dataset.driver().short_name();
    let mut src = resolve_layer(&dataset, layer)?;
    let layer_name = src.name();
    debug!("processing layer {}", layer_name);

    let schema = read_schema(&src)?;
    for field in &schema.fields {
        debug!("processing field '{}'", field.name);
    }

    let mut out = VectorLayer::new(layer_name, schema).with_driver(driver);
    for gdal_feature in src.features() {
        let geometry = match gdal_feature.geometry() {
            Some(g) => match g.to_geo() {
                Ok(geom) => Some(geom),
                Err(e) => {
                    warn!("Skipping unconvertible geometry: {}", e);
                    None
                }
            },
            None => None,
        };

        let mut feature = Feature {
            fid: gdal_feature.fid(),
            geometry,
            properties: Default::default(),
        };
        for (name, value) in gdal_feature.fields() {
            feature.set_property(name, attribute_from_field(value));
        }
        out.push(feature);
    }

    Ok(out)
}

/// Collect the FIDs of features matching an attribute filter, in
/// natural order. The filter is installed on the OGR layer (after any
/// driver-dialect rewriting), iterated once, and removed again.
pub fn select_fids_where(
    path: impl AsRef<Path>,
    layer: Option<&str>,
    expression: &str,
) -> Result<Vec<Fid>> {
    let path = path.as_ref();
    let dataset =
        Dataset::open(path).map_err(|_| Error::OpenFailed(path.display().to_string()))?;
    let driver = dataset.driver().short_name();
    let mut src = resolve_layer(&dataset, layer)?;

    let geometry_column = {
        let defn = src.defn();
        let geom_field = defn
            .geom_fields()
            .next()
            .ok_or(Error::MissingGeometryColumn)?;
        let name = geom_field.name();
        if name.is_empty() {
            "GEOMETRY".to_string()
        } else {
            name
        }
    };

    let rewritten = rewrite_geom_area(expression, &driver, &geometry_column);
    if rewritten != expression {
        debug!("rewrote filter for {} driver: {}", driver, rewritten);
    }
    src.set_attribute_filter(&rewritten)
        .map_err(|e| Error::InvalidFilter {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

    let fids = src.features().filter_map(|f| f.fid()).collect();
    src.clear_attribute_filter();
    Ok(fids)
}

/// Write a [`VectorLayer`] to an OGR dataset, creating it.
///
/// Per-feature write failures are warned and skipped; only dataset or
/// layer creation failures abort.
pub fn write_vector(
    layer: &VectorLayer,
    path: impl AsRef<Path>,
    layer_name: Option<&str>,
    driver: Option<&str>,
) -> Result<()> {
    let path = path.as_ref();
    let resolved = match driver {
        Some(name) => name.to_string(),
        None => guess_driver(path)?.to_string(),
    };
    let gdal_driver = DriverManager::get_driver_by_name(&resolved)
        .map_err(|_| Error::UnknownDriver(resolved.clone()))?;
    let mut dataset = gdal_driver
        .create_vector_only(path)
        .map_err(|_| Error::CreateFailed(path.display().to_string()))?;

    let schema = layer.schema();
    let srs = spatial_ref_of(schema)?;
    let mut dst = dataset
        .create_layer(LayerOptions {
            name: layer_name.unwrap_or_else(|| layer.name()),
            srs: srs.as_ref(),
            ty: wkb_type_of(schema.geometry_type),
            ..Default::default()
        })
        .map_err(|_| Error::CreateFailed(path.display().to_string()))?;

    let field_defs: Vec<(&str, u32)> = schema
        .fields
        .iter()
        .map(|f| (f.name.as_str(), ogr_field_type_of(f.field_type)))
        .collect();
    dst.create_defn_fields(&field_defs)
        .map_err(|e| Error::FieldCreateFailed(e.to_string()))?;

    let mut failures = 0usize;
    for feature in layer.features() {
        if let Err(e) = write_feature(&dst, schema, feature) {
            warn!("Failed writing feature {:?}: {}", feature.fid, e);
            failures += 1;
        }
    }
    if failures > 0 {
        warn!("{} feature(s) could not be written to {}", failures, path.display());
    }

    Ok(())
}

fn write_feature(dst: &Layer, schema: &Schema, feature: &Feature) -> Result<()> {
    let mut out = GdalFeature::new(dst.defn()).map_err(|e| Error::WriteFailed(e.to_string()))?;

    if let Some(geom) = &feature.geometry {
        let gdal_geom =
            GdalGeometry::try_from(geom).map_err(|e| Error::WriteFailed(e.to_string()))?;
        out.set_geometry(gdal_geom)
            .map_err(|e| Error::WriteFailed(e.to_string()))?;
    }

    for field in &schema.fields {
        let value = match feature.get_property(&field.name) {
            None | Some(AttributeValue::Null) => continue,
            Some(value) => field_from_attribute(value),
        };
        out.set_field(&field.name, &value)
            .map_err(|e| Error::WriteFailed(e.to_string()))?;
    }

    out.create(dst).map_err(|e| Error::WriteFailed(e.to_string()))
}

fn resolve_layer<'a>(dataset: &'a Dataset, name: Option<&str>) -> Result<Layer<'a>> {
    match name {
        Some(name) => dataset
            .layer_by_name(name)
            .map_err(|_| Error::LayerNotFound(name.to_string())),
        None => {
            let count = dataset.layer_count();
            if count != 1 {
                return Err(Error::AmbiguousLayer(count as usize));
            }
            dataset.layer(0).map_err(Error::from)
        }
    }
}

fn read_schema(layer: &Layer) -> Result<Schema> {
    let defn = layer.defn();

    let geom_fields: Vec<_> = defn.geom_fields().collect();
    if geom_fields.is_empty() {
        return Err(Error::MissingGeometryColumn);
    }
    if geom_fields.len() > 1 {
        return Err(Error::MultipleGeometryColumns(geom_fields.len()));
    }

    let fields = defn
        .fields()
        .map(|f| FieldDef::new(f.name(), field_type_of(f.field_type())))
        .collect();

    let mut schema = Schema::new(fields, geometry_type_of(geom_fields[0].field_type()));
    let geom_name = geom_fields[0].name();
    if !geom_name.is_empty() {
        schema.geometry_column = geom_name;
    }
    schema.srs = layer.spatial_ref().and_then(|srs| crs_of(&srs));
    Ok(schema)
}

fn crs_of(srs: &SpatialRef) -> Option<Crs> {
    if let Ok(code) = srs.auth_code() {
        return Some(Crs::Epsg(code as u32));
    }
    srs.to_wkt().ok().map(Crs::Wkt)
}

fn spatial_ref_of(schema: &Schema) -> Result<Option<SpatialRef>> {
    match &schema.srs {
        None => Ok(None),
        Some(Crs::Epsg(code)) => Ok(Some(SpatialRef::from_epsg(*code)?)),
        Some(Crs::Wkt(wkt)) => Ok(Some(SpatialRef::from_wkt(wkt)?)),
    }
}

fn field_type_of(ogr_type: u32) -> FieldType {
    match ogr_type {
        OGRFieldType::OFTInteger | OGRFieldType::OFTInteger64 => FieldType::Int,
        OGRFieldType::OFTReal => FieldType::Float,
        _ => FieldType::String,
    }
}

fn ogr_field_type_of(field_type: FieldType) -> u32 {
    match field_type {
        FieldType::Bool => OGRFieldType::OFTInteger,
        FieldType::Int => OGRFieldType::OFTInteger64,
        FieldType::Float => OGRFieldType::OFTReal,
        FieldType::String => OGRFieldType::OFTString,
    }
}

fn geometry_type_of(wkb: u32) -> GeometryType {
    match wkb {
        OGRwkbGeometryType::wkbPoint => GeometryType::Point,
        OGRwkbGeometryType::wkbLineString => GeometryType::LineString,
        OGRwkbGeometryType::wkbPolygon => GeometryType::Polygon,
        OGRwkbGeometryType::wkbMultiPoint => GeometryType::MultiPoint,
        OGRwkbGeometryType::wkbMultiLineString => GeometryType::MultiLineString,
        OGRwkbGeometryType::wkbMultiPolygon => GeometryType::MultiPolygon,
        _ => GeometryType::Unknown,
    }
}

fn wkb_type_of(geometry_type: GeometryType) -> u32 {
    match geometry_type {
        GeometryType::Point => OGRwkbGeometryType::wkbPoint,
        GeometryType::LineString => OGRwkbGeometryType::wkbLineString,
        GeometryType::Polygon => OGRwkbGeometryType::wkbPolygon,
        GeometryType::MultiPoint => OGRwkbGeometryType::wkbMultiPoint,
        GeometryType::MultiLineString => OGRwkbGeometryType::wkbMultiLineString,
        GeometryType::MultiPolygon => OGRwkbGeometryType::wkbMultiPolygon,
        GeometryType::Unknown => OGRwkbGeometryType::wkbUnknown,
    }
}

fn attribute_from_field(value: Option<FieldValue>) -> AttributeValue {
    match value {
        None => AttributeValue::Null,
        Some(FieldValue::IntegerValue(i)) => AttributeValue::Int(i as i64),
        Some(FieldValue::Integer64Value(i)) => AttributeValue::Int(i),
        Some(FieldValue::RealValue(f)) => AttributeValue::Float(f),
        Some(FieldValue::StringValue(s)) => AttributeValue::String(s),
        Some(other) => AttributeValue::String(format!("{:?}", other)),
    }
}

fn field_from_attribute(value: &AttributeValue) -> FieldValue {
    match value {
        AttributeValue::Bool(b) => FieldValue::IntegerValue(*b as i32),
        AttributeValue::Int(i) => FieldValue::Integer64Value(*i),
        AttributeValue::Float(f) => FieldValue::RealValue(*f),
        AttributeValue::String(s) => FieldValue::StringValue(s.clone()),
        AttributeValue::Null => FieldValue::StringValue(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{FieldDef, FieldType};
    use geo_types::{Geometry, LineString, Polygon};
    use tempfile::TempDir;

    fn sample_layer() -> VectorLayer {
        let schema = Schema::new(
            vec![FieldDef::new("label", FieldType::String)],
            GeometryType::Polygon,
        )
        .with_srs(Crs::Epsg(4326));
        let mut layer = VectorLayer::new("squares", schema);
        let mut f = Feature::new(Geometry::Polygon(Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (1.0, 0.0),
                (1.0, 1.0),
                (0.0, 1.0),
                (0.0, 0.0),
            ]),
            vec![],
        )));
        f.set_property("label", AttributeValue::String("a".into()));
        layer.push(f);
        layer
    }

    #[test]
    fn test_gpkg_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("squares.gpkg");

        write_vector(&sample_layer(), &path, None, None).unwrap();
        let loaded = read_vector(&path, None).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.driver(), "GPKG");
        assert_eq!(
            loaded.feature(loaded.features().next().unwrap().fid.unwrap())
                .unwrap()
                .get_property("label"),
            Some(&AttributeValue::String("a".into()))
        );
    }

    #[test]
    fn test_select_pushdown_with_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("squares.gpkg");
        write_vector(&sample_layer(), &path, None, None).unwrap();

        // GPKG is SQL-backed: OGR_GEOM_AREA must be rewritten to ST_Area
        let fids = select_fids_where(&path, None, "OGR_GEOM_AREA < 2").unwrap();
        assert_eq!(fids.len(), 1);
        let none = select_fids_where(&path, None, "OGR_GEOM_AREA < 0.5").unwrap();
        assert!(none.is_empty());
    }
}
