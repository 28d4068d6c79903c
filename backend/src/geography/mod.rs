//! Geography provider: the external store that turns a join value into a
//! geometry.
//!
//! [`GeographyProvider`] is the collaborator contract: exact string equality
//! on one field, first match only. [`GeoJsonProvider`] implements it over a
//! GeoJSON FeatureCollection file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

use crate::error::GeographyError;
use crate::models::FieldValue;

/// Opaque geometry handle (a GeoJSON geometry object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry(pub Value);

impl Geometry {
    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

/// Geometry family of a feature layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeType {
    Point,
    Multipoint,
    Polyline,
    Polygon,
    Unknown,
}

impl ShapeType {
    /// Map a GeoJSON geometry `type`.
    pub fn from_geojson(kind: &str) -> Self {
        match kind {
            "Point" => ShapeType::Point,
            "MultiPoint" => ShapeType::Multipoint,
            "LineString" | "MultiLineString" => ShapeType::Polyline,
            "Polygon" | "MultiPolygon" => ShapeType::Polygon,
            _ => ShapeType::Unknown,
        }
    }
}

/// Spatial reference by well-known id. Selection only, no reprojection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: u32,
    pub name: String,
}

impl SpatialReference {
    pub fn wgs84() -> Self {
        Self {
            wkid: 4326,
            name: "GCS_WGS_1984".into(),
        }
    }

    pub fn web_mercator() -> Self {
        Self {
            wkid: 102100,
            name: "WGS_1984_Web_Mercator_Auxiliary_Sphere".into(),
        }
    }

    pub fn from_wkid(wkid: u32) -> Self {
        match wkid {
            4326 => Self::wgs84(),
            3857 | 102100 => Self::web_mercator(),
            _ => Self {
                wkid,
                name: format!("EPSG:{}", wkid),
            },
        }
    }

    /// EPSG code for this reference. Esri's 102100 is EPSG 3857.
    pub fn epsg(&self) -> u32 {
        match self.wkid {
            102100 | 102113 => 3857,
            wkid => wkid,
        }
    }
}

/// A provider hit: the geometry and the field value that matched.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoMatch {
    pub geometry: Geometry,
    pub matched_value: String,
}

/// External geography store.
pub trait GeographyProvider {
    /// Exact-match lookup `field = value`; first match only.
    fn find(&self, field: &str, value: &str) -> Result<Option<GeoMatch>, GeographyError>;

    fn shape_type(&self) -> ShapeType;

    fn spatial_reference(&self) -> SpatialReference;
}

/// Render the single-predicate query used for a lookup.
pub fn where_clause(field: &str, value: &str) -> String {
    format!("\"{}\" = '{}'", field, value.replace('\'', "''"))
}

// =============================================================================
// GeoJSON provider
// =============================================================================

/// Geography provider backed by a GeoJSON FeatureCollection.
#[derive(Debug, Clone)]
pub struct GeoJsonProvider {
    features: Vec<(Map<String, Value>, Value)>,
    fields: HashSet<String>,
    shape_type: ShapeType,
    spatial_reference: SpatialReference,
}

impl GeoJsonProvider {
    /// Load a FeatureCollection from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GeographyError> {
        let path = path.as_ref();
        let open_err = |message: String| GeographyError::Open {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| open_err(e.to_string()))?;
        let collection: Value = serde_json::from_str(&content).map_err(|e| open_err(e.to_string()))?;
        Self::from_collection(&collection).map_err(open_err)
    }

    /// Build from an already parsed FeatureCollection.
    pub fn from_collection(collection: &Value) -> Result<Self, String> {
        let features = collection
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| "not a FeatureCollection (no 'features' array)".to_string())?;

        let mut fields = HashSet::new();
        let mut parsed = Vec::with_capacity(features.len());
        for feature in features {
            let properties = feature
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            fields.extend(properties.keys().cloned());
            let geometry = feature.get("geometry").cloned().unwrap_or(Value::Null);
            parsed.push((properties, geometry));
        }

        let shape_type = parsed
            .iter()
            .find_map(|(_, g)| g.get("type").and_then(Value::as_str))
            .map(ShapeType::from_geojson)
            .unwrap_or(ShapeType::Unknown);

        Ok(Self {
            features: parsed,
            fields,
            shape_type,
            spatial_reference: crs_of(collection),
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl GeographyProvider for GeoJsonProvider {
    fn find(&self, field: &str, value: &str) -> Result<Option<GeoMatch>, GeographyError> {
        if !self.fields.contains(field) {
            return Err(GeographyError::Query {
                predicate: where_clause(field, value),
                message: format!("no field '{}' in geography layer", field),
            });
        }

        let hit = self.features.iter().find_map(|(props, geometry)| {
            let rendered = props
                .get(field)
                .and_then(FieldValue::from_json)
                .filter(|v| !v.is_null())?
                .to_string();
            (rendered == value).then(|| GeoMatch {
                geometry: Geometry(geometry.clone()),
                matched_value: rendered,
            })
        });
        Ok(hit)
    }

    fn shape_type(&self) -> ShapeType {
        self.shape_type
    }

    fn spatial_reference(&self) -> SpatialReference {
        self.spatial_reference.clone()
    }
}

/// Read a legacy `crs` member (`urn:ogc:def:crs:EPSG::3006`); default WGS84.
fn crs_of(collection: &Value) -> SpatialReference {
    collection
        .pointer("/crs/properties/name")
        .and_then(Value::as_str)
        .and_then(|name| {
            if name.contains("CRS84") {
                return Some(4326);
            }
            name.rsplit(':').next().and_then(|code| code.parse().ok())
        })
        .map(SpatialReference::from_wkid)
        .unwrap_or_else(SpatialReference::wgs84)
}
