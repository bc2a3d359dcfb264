//! Vector data structures: attributes, features, schemas and layers

mod filter;
mod layer;

pub use filter::{rewrite_geom_area, CompiledFilter};
pub use layer::VectorLayer;

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Feature identifier, stable within a layer.
///
/// Zero is a valid FID. The "null FID" of formats that allow it maps to
/// `Option<Fid>` being `None`.
pub type Fid = u64;

/// Parse a feature identifier with strict decimal semantics.
///
/// Rejects empty strings, signs, trailing garbage and overflow.
/// Returns `None` for anything that is not a plain base-10 `u64`.
pub fn parse_fid(s: &str) -> Option<Fid> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<Fid>().ok()
}

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The field type this value naturally belongs to.
    pub fn field_type(&self) -> FieldType {
        match self {
            AttributeValue::Null => FieldType::String,
            AttributeValue::Bool(_) => FieldType::Bool,
            AttributeValue::Int(_) => FieldType::Int,
            AttributeValue::Float(_) => FieldType::Float,
            AttributeValue::String(_) => FieldType::String,
        }
    }
}

/// Declared type of an attribute field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    String,
}

/// Definition of one attribute field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Declared geometry type of a layer's geometry field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    Unknown,
}

impl GeometryType {
    /// Whether this is a multi-part type.
    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            GeometryType::MultiPoint | GeometryType::MultiLineString | GeometryType::MultiPolygon
        )
    }

    /// The single-part counterpart of a multi type; identity otherwise.
    pub fn single(&self) -> GeometryType {
        match self {
            GeometryType::MultiPoint => GeometryType::Point,
            GeometryType::MultiLineString => GeometryType::LineString,
            GeometryType::MultiPolygon => GeometryType::Polygon,
            other => *other,
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::MultiPolygon => "MultiPolygon",
            GeometryType::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Layer schema: ordered attribute fields, the declared geometry type
/// and the spatial reference system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldDef>,
    pub geometry_type: GeometryType,
    pub srs: Option<crate::crs::Crs>,
    /// Name of the geometry column, where the format has one.
    pub geometry_column: String,
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>, geometry_type: GeometryType) -> Self {
        Self {
            fields,
            geometry_type,
            srs: None,
            geometry_column: "geometry".to_string(),
        }
    }

    pub fn with_srs(mut self, srs: crate::crs::Crs) -> Self {
        self.srs = Some(srs);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature identifier; `None` means the null FID
    pub fid: Option<Fid>,
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            fid: None,
            geometry: Some(geometry),
            properties: HashMap::new(),
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            fid: None,
            geometry: None,
            properties: HashMap::new(),
        }
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// Area of the polygonal part of a geometry.
///
/// Non-polygonal geometries have zero area by convention, mirroring how
/// the `OGR_GEOM_AREA` special field behaves.
pub fn polygonal_area(geom: &Geometry<f64>) -> f64 {
    use geo::Area;
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        Geometry::Rect(r) => r.unsigned_area(),
        _ => 0.0,
    }
}
