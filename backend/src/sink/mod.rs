//! Output sinks and row assembly.
//!
//! A sink is created once with a shape type and spatial reference, receives
//! the field list once, then one record per row. A record is
//! `[geometry, attr1, attr2, ...]` in the exact order the fields were added.
//! Any sink error is fatal for the job.

use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

use crate::cache::Resolution;
use crate::error::{SinkError, SinkResult};
use crate::geography::{Geometry, ShapeType, SpatialReference};
use crate::models::{FieldDescriptor, FlatRow, FieldValue};

/// One sink-ready record. Geometry always comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkRecord {
    /// `None` when the join value had no geometry.
    pub geometry: Option<Geometry>,
    pub attributes: Vec<FieldValue>,
}

impl SinkRecord {
    /// Number of slots, geometry included.
    pub fn arity(&self) -> usize {
        self.attributes.len() + 1
    }

    /// The record as `[geometry, attr1, ...]` JSON values.
    pub fn to_values(&self) -> Vec<Value> {
        let geometry = self
            .geometry
            .as_ref()
            .map(|g| g.as_json().clone())
            .unwrap_or(Value::Null);
        std::iter::once(geometry)
            .chain(self.attributes.iter().map(FieldValue::to_json))
            .collect()
    }
}

/// Merge a decoded row with its geometry resolution.
///
/// `NotFound` rows are kept with a null geometry so every decoded row
/// reaches the sink exactly once.
pub fn assemble(row: &FlatRow, resolution: Resolution) -> SinkRecord {
    SinkRecord {
        geometry: resolution.into_geometry(),
        attributes: row.values.clone(),
    }
}

/// Output container collaborator.
pub trait FeatureSink {
    fn create(&mut self, shape_type: ShapeType, spatial_reference: &SpatialReference) -> SinkResult<()>;

    fn add_fields(&mut self, fields: &[FieldDescriptor]) -> SinkResult<()>;

    fn insert(&mut self, record: SinkRecord) -> SinkResult<()>;

    /// Flush the container. Called once after the last insert.
    fn finish(&mut self) -> SinkResult<()> {
        Ok(())
    }
}

fn check_fields(existing: &[FieldDescriptor], new: &[FieldDescriptor]) -> SinkResult<()> {
    let mut seen: Vec<&str> = existing.iter().map(|f| f.name.as_str()).collect();
    for field in new {
        if field.name.is_empty() {
            return Err(SinkError::AddField {
                name: field.name.clone(),
                message: "empty field name".into(),
            });
        }
        if seen.contains(&field.name.as_str()) {
            return Err(SinkError::AddField {
                name: field.name.clone(),
                message: "duplicate field name".into(),
            });
        }
        seen.push(&field.name);
    }
    Ok(())
}

// =============================================================================
// In-memory sink
// =============================================================================

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub shape_type: Option<ShapeType>,
    pub spatial_reference: Option<SpatialReference>,
    pub fields: Vec<FieldDescriptor>,
    pub records: Vec<SinkRecord>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeatureSink for MemorySink {
    fn create(&mut self, shape_type: ShapeType, spatial_reference: &SpatialReference) -> SinkResult<()> {
        self.shape_type = Some(shape_type);
        self.spatial_reference = Some(spatial_reference.clone());
        Ok(())
    }

    fn add_fields(&mut self, fields: &[FieldDescriptor]) -> SinkResult<()> {
        if self.shape_type.is_none() {
            return Err(SinkError::NotCreated);
        }
        check_fields(&self.fields, fields)?;
        self.fields.extend_from_slice(fields);
        Ok(())
    }

    fn insert(&mut self, record: SinkRecord) -> SinkResult<()> {
        if self.shape_type.is_none() {
            return Err(SinkError::NotCreated);
        }
        if record.attributes.len() != self.fields.len() {
            return Err(SinkError::Rejected {
                row: self.records.len(),
                message: format!(
                    "expected {} values, got {}",
                    self.fields.len() + 1,
                    record.arity()
                ),
            });
        }
        self.records.push(record);
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        self.finished = true;
        Ok(())
    }
}

// =============================================================================
// GeoJSON sink
// =============================================================================

/// Writes a GeoJSON FeatureCollection on `finish`.
#[derive(Debug)]
pub struct GeoJsonSink {
    path: PathBuf,
    name: String,
    shape_type: Option<ShapeType>,
    spatial_reference: Option<SpatialReference>,
    fields: Vec<FieldDescriptor>,
    features: Vec<Value>,
}

impl GeoJsonSink {
    /// Sink writing `{dir}/{name}.geojson`.
    pub fn new(dir: impl AsRef<Path>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: Self::path_for(dir, &name),
            name,
            shape_type: None,
            spatial_reference: None,
            fields: Vec::new(),
            features: Vec::new(),
        }
    }

    pub fn path_for(dir: impl AsRef<Path>, name: &str) -> PathBuf {
        dir.as_ref().join(format!("{}.geojson", name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FeatureSink for GeoJsonSink {
    fn create(&mut self, shape_type: ShapeType, spatial_reference: &SpatialReference) -> SinkResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.is_dir() {
                return Err(SinkError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("output directory {} does not exist", dir.display()),
                )));
            }
        }
        self.shape_type = Some(shape_type);
        self.spatial_reference = Some(spatial_reference.clone());
        Ok(())
    }

    fn add_fields(&mut self, fields: &[FieldDescriptor]) -> SinkResult<()> {
        if self.shape_type.is_none() {
            return Err(SinkError::NotCreated);
        }
        check_fields(&self.fields, fields)?;
        self.fields.extend_from_slice(fields);
        Ok(())
    }

    fn insert(&mut self, record: SinkRecord) -> SinkResult<()> {
        if self.shape_type.is_none() {
            return Err(SinkError::NotCreated);
        }
        let values = record.to_values();
        if values.len() != self.fields.len() + 1 {
            return Err(SinkError::Rejected {
                row: self.features.len(),
                message: format!(
                    "expected {} values, got {}",
                    self.fields.len() + 1,
                    values.len()
                ),
            });
        }

        let mut values = values.into_iter();
        let geometry = values.next().unwrap_or(Value::Null);
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| f.name.clone())
            .zip(values)
            .collect();

        self.features.push(json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": properties,
        }));
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        let Some(sr) = &self.spatial_reference else {
            return Err(SinkError::NotCreated);
        };
        let collection = json!({
            "type": "FeatureCollection",
            "name": self.name,
            "crs": {
                "type": "name",
                "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", sr.epsg()) }
            },
            "fields": self.fields,
            "features": self.features,
        });
        let file = std::fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &collection)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::text("REGION_CODE", "Region code"),
            FieldDescriptor::double("VALUE", "VALUE"),
        ]
    }

    fn row() -> FlatRow {
        FlatRow::new(vec![FieldValue::from("0180"), FieldValue::Double(4.5)])
    }

    #[test]
    fn test_assemble_geometry_first() {
        let geometry = Geometry(json!({ "type": "Point", "coordinates": [18.0, 59.3] }));
        let record = assemble(&row(), Resolution::Found(geometry.clone()));
        let values = record.to_values();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], *geometry.as_json());
        assert_eq!(values[1], json!("0180"));
    }

    #[test]
    fn test_assemble_not_found_keeps_row() {
        let record = assemble(&row(), Resolution::NotFound);
        assert!(record.geometry.is_none());
        assert_eq!(record.to_values()[0], Value::Null);
        assert_eq!(record.arity(), 3);
    }

    #[test]
    fn test_memory_sink_rejects_bad_arity() {
        let mut sink = MemorySink::new();
        sink.create(ShapeType::Polygon, &SpatialReference::wgs84()).unwrap();
        sink.add_fields(&fields()).unwrap();
        let bad = SinkRecord {
            geometry: None,
            attributes: vec![FieldValue::Null],
        };
        assert!(matches!(sink.insert(bad), Err(SinkError::Rejected { row: 0, .. })));
    }

    #[test]
    fn test_sink_requires_create() {
        let mut sink = MemorySink::new();
        assert!(matches!(sink.add_fields(&fields()), Err(SinkError::NotCreated)));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut sink = MemorySink::new();
        sink.create(ShapeType::Point, &SpatialReference::wgs84()).unwrap();
        let mut dup = fields();
        dup.push(FieldDescriptor::text("VALUE", "again"));
        assert!(matches!(sink.add_fields(&dup), Err(SinkError::AddField { .. })));
    }

    #[test]
    fn test_geojson_sink_writes_collection() {
        let dir = tempdir().unwrap();
        let mut sink = GeoJsonSink::new(dir.path(), "population");
        sink.create(ShapeType::Polygon, &SpatialReference::web_mercator()).unwrap();
        sink.add_fields(&fields()).unwrap();
        sink.insert(assemble(&row(), Resolution::NotFound)).unwrap();
        sink.finish().unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(sink.path()).unwrap()).unwrap();
        assert_eq!(written["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::3857");
        let feature = &written["features"][0];
        assert_eq!(feature["geometry"], Value::Null);
        let keys: Vec<&String> = feature["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["REGION_CODE", "VALUE"]);
        assert_eq!(written["fields"][1]["type"], "DOUBLE");
    }

    #[test]
    fn test_geojson_sink_missing_directory() {
        let mut sink = GeoJsonSink::new("/nonexistent/out", "x");
        assert!(sink.create(ShapeType::Point, &SpatialReference::wgs84()).is_err());
    }
}
