//! Domain models shared by the decoders, the join engine and the sinks.
//!
//! - [`Dimension`] / [`Category`] / [`Unit`] - decoded cube axes
//! - [`Cube`] - a JSON-stat dataset ready for flattening
//! - [`FieldDescriptor`] / [`FieldType`] - output schema, in sink order
//! - [`FieldValue`] / [`FlatRow`] - typed row values keyed by descriptor position
//! - [`Table`] - descriptors plus rows, the hand-off between decode and join

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Cube structure
// =============================================================================

/// Role a dimension plays in its dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DimensionRole {
    Metric,
    Time,
    Geo,
    #[default]
    Other,
}

/// Unit metadata carried by metric-role categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    /// Base unit symbol, e.g. "number" or "euro".
    pub base: String,
    /// Decimal precision, if declared.
    pub decimals: Option<u32>,
}

/// One discrete value within a dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Stable index, unique and contiguous from 0 within its dimension.
    pub index: usize,
    pub code: String,
    pub label: String,
    #[serde(default)]
    pub unit: Option<Unit>,
}

/// A named axis holding an ordered set of categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dimension {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub role: DimensionRole,
    /// Categories ordered by their stable index, so `categories[i].index == i`.
    pub categories: Vec<Category>,
}

impl Dimension {
    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Category at a stable index.
    pub fn category(&self, index: usize) -> Option<&Category> {
        self.categories.get(index).filter(|c| c.index == index)
    }

    /// Find the unit of the first category whose label matches.
    ///
    /// The scan visits at most `len()` categories and returns `None` once
    /// they are exhausted.
    pub fn unit_for_label(&self, label: &str) -> Option<&Unit> {
        let count = self.len();
        (0..count)
            .filter_map(|i| self.category(i))
            .find(|c| c.label == label)
            .and_then(|c| c.unit.as_ref())
    }
}

/// A multidimensional dataset addressed by one category index per dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cube {
    /// Dataset label, used as the default output name.
    pub label: Option<String>,
    pub dimensions: Vec<Dimension>,
    /// Row-major value array (last dimension varies fastest).
    pub values: Vec<FieldValue>,
}

impl Cube {
    /// Size of the full cross-product space, `None` if it overflows `usize`.
    pub fn cell_count(&self) -> Option<usize> {
        self.dimensions
            .iter()
            .try_fold(1usize, |acc, d| acc.checked_mul(d.len()))
    }

    /// Find a dimension by trimmed label equality.
    pub fn dimension_by_label(&self, label: &str) -> Option<(usize, &Dimension)> {
        let wanted = label.trim();
        self.dimensions
            .iter()
            .enumerate()
            .find(|(_, d)| d.label.trim() == wanted)
    }

    /// Value stored at a coordinate, `Null` for absent cells.
    pub fn value_at(&self, coordinate: &[usize]) -> FieldValue {
        let mut offset = 0;
        for (dim, &idx) in self.dimensions.iter().zip(coordinate) {
            offset = offset * dim.len() + idx;
        }
        self.values.get(offset).cloned().unwrap_or(FieldValue::Null)
    }
}

// =============================================================================
// Output schema
// =============================================================================

/// Semantic type of an output field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    Text,
    Long,
    Double,
}

impl FieldType {
    /// Type name handed to the sink.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Long => "LONG",
            FieldType::Double => "DOUBLE",
        }
    }
}

/// One output field: name, alias, type and (for text) length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub alias: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub length: Option<usize>,
}

impl FieldDescriptor {
    pub fn text(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            field_type: FieldType::Text,
            length: None,
        }
    }

    pub fn double(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            field_type: FieldType::Double,
            length: None,
        }
    }

    pub fn long(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            field_type: FieldType::Long,
            length: None,
        }
    }
}

// =============================================================================
// Rows
// =============================================================================

/// A typed cell value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Integer(i64),
    Double(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert a JSON scalar. Arrays and objects are not cell values.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(FieldValue::Null),
            serde_json::Value::String(s) => Some(FieldValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
            serde_json::Value::Number(n) => Some(match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Double(n.as_f64().unwrap_or(f64::NAN)),
            }),
            _ => None,
        }
    }

    /// Convert to a JSON scalar.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Integer(i) => serde_json::Value::from(*i),
            FieldValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Double(d) => write!(f, "{}", d),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// One decoded row; `values[i]` belongs to `Table::fields[i]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FlatRow {
    pub values: Vec<FieldValue>,
}

impl FlatRow {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }
}

/// Ordered field descriptors plus the rows decoded against them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Table {
    pub fields: Vec<FieldDescriptor>,
    pub rows: Vec<FlatRow>,
}

impl Table {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self {
            fields,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Field names in sink order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Value of a named field in a row.
    pub fn value(&self, row: usize, field: &str) -> Option<&FieldValue> {
        let idx = self.field_index(field)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Set text field lengths to the longest rendered value (at least 1).
    pub fn measure_text_lengths(&mut self) {
        for (i, field) in self.fields.iter_mut().enumerate() {
            if field.field_type != FieldType::Text {
                continue;
            }
            let longest = self
                .rows
                .iter()
                .filter_map(|r| r.get(i))
                .map(|v| v.to_string().chars().count())
                .max()
                .unwrap_or(0);
            field.length = Some(longest.max(1));
        }
    }
}
