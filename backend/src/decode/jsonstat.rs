//! JSON-stat cube decoder (PxWeb responses).
//!
//! [`parse_cube`] reads a JSON-stat 2.0 dataset or the first dataset of a
//! JSON-stat 1.0 bundle into a [`Cube`]; [`decode_cube`] flattens the cube
//! into one row per coordinate of the full cross-product space.
//!
//! ```text
//! Region × Contents × Year  →  REGION_CODE | REGION | ... | VALUE | UNITS | DECIMALS
//!   3    ×    2     ×  2    →  12 rows, last dimension varying fastest
//! ```

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::schema::SchemaBuilder;
use crate::error::{DecodeError, DecodeResult};
use crate::models::{
    Category, Cube, Dimension, DimensionRole, FieldDescriptor, FieldValue, FlatRow, Table, Unit,
};

/// Placeholder for unit metadata that could not be recovered.
pub const UNKNOWN: &str = "UNKNOWN";

pub const VALUE_FIELD: &str = "VALUE";
pub const UNITS_FIELD: &str = "UNITS";
pub const DECIMALS_FIELD: &str = "DECIMALS";

/// A flattened cube plus the field names of its join dimension.
#[derive(Debug, Clone)]
pub struct DecodedCube {
    pub table: Table,
    /// Dataset label, if the payload carried one.
    pub label: Option<String>,
    /// `{ID}_CODE` field of the join dimension.
    pub join_code_field: String,
    /// Label field of the join dimension.
    pub join_label_field: String,
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a JSON-stat payload into a [`Cube`].
pub fn parse_cube(payload: &Value) -> DecodeResult<Cube> {
    let dataset = locate_dataset(payload)?;
    let dimension = dataset
        .get("dimension")
        .and_then(Value::as_object)
        .ok_or_else(|| DecodeError::MissingMember("dimension".into()))?;

    // 2.0 keeps id/size/role on the dataset, 1.0 inside `dimension`.
    let ids = string_list(dataset.get("id").or_else(|| dimension.get("id")))
        .ok_or_else(|| DecodeError::MissingMember("id".into()))?;
    let sizes = size_list(dataset.get("size").or_else(|| dimension.get("size")))
        .ok_or_else(|| DecodeError::MissingMember("size".into()))?;
    if ids.len() != sizes.len() {
        return Err(DecodeError::InvalidPayload(format!(
            "{} dimension ids but {} sizes",
            ids.len(),
            sizes.len()
        )));
    }
    let cell_count = sizes
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(too_large)?;
    let roles = parse_roles(dataset.get("role").or_else(|| dimension.get("role")));

    let mut dimensions = Vec::with_capacity(ids.len());
    for (id, &size) in ids.iter().zip(&sizes) {
        let dim = dimension
            .get(id)
            .and_then(Value::as_object)
            .ok_or_else(|| DecodeError::MissingMember(format!("dimension.{}", id)))?;
        let parsed = parse_dimension(id, dim, roles.get(id.as_str()).copied())?;
        if parsed.len() != size {
            return Err(DecodeError::SizeMismatch {
                dimension: id.clone(),
                declared: size,
                actual: parsed.len(),
            });
        }
        dimensions.push(parsed);
    }

    let values = parse_values(dataset.get("value"), cell_count)?;

    Ok(Cube {
        label: dataset.get("label").and_then(Value::as_str).map(String::from),
        dimensions,
        values,
    })
}

fn locate_dataset(payload: &Value) -> DecodeResult<&Map<String, Value>> {
    let obj = payload
        .as_object()
        .ok_or_else(|| DecodeError::InvalidPayload("JSON-stat payload is not an object".into()))?;

    if obj.contains_key("dimension") {
        return Ok(obj);
    }
    // 1.0 bundle: first member that looks like a dataset.
    obj.values()
        .filter_map(Value::as_object)
        .find(|d| d.contains_key("dimension"))
        .ok_or_else(|| DecodeError::MissingMember("dataset".into()))
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(String::from))
        .collect()
}

fn size_list(value: Option<&Value>) -> Option<Vec<usize>> {
    value?
        .as_array()?
        .iter()
        .map(|v| v.as_u64().map(|n| n as usize))
        .collect()
}

fn parse_roles(value: Option<&Value>) -> HashMap<String, DimensionRole> {
    let mut roles = HashMap::new();
    let Some(obj) = value.and_then(Value::as_object) else {
        return roles;
    };
    for (role, ids) in obj {
        let role = match role.as_str() {
            "metric" => DimensionRole::Metric,
            "time" => DimensionRole::Time,
            "geo" => DimensionRole::Geo,
            _ => DimensionRole::Other,
        };
        for id in string_list(Some(ids)).unwrap_or_default() {
            roles.insert(id, role);
        }
    }
    roles
}

fn parse_dimension(
    id: &str,
    dim: &Map<String, Value>,
    role: Option<DimensionRole>,
) -> DecodeResult<Dimension> {
    let category = dim
        .get("category")
        .and_then(Value::as_object)
        .ok_or_else(|| DecodeError::MissingMember(format!("dimension.{}.category", id)))?;
    let labels = category.get("label").and_then(Value::as_object);
    let units = category.get("unit").and_then(Value::as_object);

    let indexed: Vec<(String, usize)> = match category.get("index") {
        Some(Value::Array(codes)) => codes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                c.as_str()
                    .map(|code| (code.to_string(), i))
                    .ok_or_else(|| category_error(id, "non-string code in index"))
            })
            .collect::<DecodeResult<_>>()?,
        Some(Value::Object(map)) => map
            .iter()
            .map(|(code, i)| {
                i.as_u64()
                    .map(|i| (code.clone(), i as usize))
                    .ok_or_else(|| category_error(id, "non-integer index"))
            })
            .collect::<DecodeResult<_>>()?,
        // Index may be omitted when labels alone enumerate the categories.
        None => labels
            .map(|l| l.keys().cloned().enumerate().map(|(i, c)| (c, i)).collect())
            .unwrap_or_default(),
        Some(_) => return Err(category_error(id, "index is neither array nor object")),
    };

    let mut categories: Vec<Category> = indexed
        .into_iter()
        .map(|(code, index)| Category {
            index,
            label: labels
                .and_then(|l| l.get(&code))
                .and_then(Value::as_str)
                .unwrap_or(&code)
                .to_string(),
            unit: units.and_then(|u| u.get(&code)).and_then(parse_unit),
            code,
        })
        .collect();
    categories.sort_by_key(|c| c.index);

    if let Some((pos, c)) = categories.iter().enumerate().find(|(pos, c)| c.index != *pos) {
        return Err(category_error(
            id,
            &format!("expected index {} but found {} for '{}'", pos, c.index, c.code),
        ));
    }

    Ok(Dimension {
        id: id.to_string(),
        label: dim
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(id)
            .to_string(),
        role: role.unwrap_or_default(),
        categories,
    })
}

fn parse_unit(value: &Value) -> Option<Unit> {
    let obj = value.as_object()?;
    let base = ["base", "label", "symbol"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();
    Some(Unit {
        base,
        decimals: obj.get("decimals").and_then(Value::as_u64).map(|d| d as u32),
    })
}

fn parse_values(value: Option<&Value>, cell_count: usize) -> DecodeResult<Vec<FieldValue>> {
    match value {
        Some(Value::Array(items)) => {
            if items.len() != cell_count {
                return Err(DecodeError::InvalidPayload(format!(
                    "{} values for {} cells",
                    items.len(),
                    cell_count
                )));
            }
            Ok(items
                .iter()
                .map(|v| FieldValue::from_json(v).unwrap_or_default())
                .collect())
        }
        Some(Value::Object(sparse)) => {
            let mut values = vec![FieldValue::Null; cell_count];
            for (key, v) in sparse {
                let idx: usize = key.parse().map_err(|_| {
                    DecodeError::InvalidPayload(format!("sparse value key '{}' is not an index", key))
                })?;
                let slot = values.get_mut(idx).ok_or_else(|| {
                    DecodeError::InvalidPayload(format!(
                        "sparse value index {} outside {} cells",
                        idx, cell_count
                    ))
                })?;
                *slot = FieldValue::from_json(v).unwrap_or_default();
            }
            Ok(values)
        }
        _ => Err(DecodeError::MissingMember("value".into())),
    }
}

fn too_large() -> DecodeError {
    DecodeError::InvalidPayload("cube has more cells than can be addressed".into())
}

fn category_error(id: &str, message: &str) -> DecodeError {
    DecodeError::CategoryIndex {
        dimension: id.to_string(),
        message: message.to_string(),
    }
}

// =============================================================================
// Flattening
// =============================================================================

/// Flatten a cube into rows, selecting the join dimension by trimmed label.
pub fn decode_cube(cube: &Cube, join_label: &str) -> DecodeResult<DecodedCube> {
    let (join_idx, _) = cube
        .dimension_by_label(join_label)
        .ok_or_else(|| DecodeError::JoinDimensionNotFound(join_label.trim().to_string()))?;

    let mut schema = SchemaBuilder::new();
    let mut positions = Vec::with_capacity(cube.dimensions.len());
    for dim in &cube.dimensions {
        let code = schema.push_code(&dim.id);
        let label = schema.push_label(&dim.label, &dim.id);
        positions.push((code, label));
    }
    schema.push_value(FieldDescriptor::double(VALUE_FIELD, "Value"));
    schema.push_value(FieldDescriptor::text(UNITS_FIELD, UNITS_FIELD));
    schema.push_value(FieldDescriptor::text(DECIMALS_FIELD, DECIMALS_FIELD));
    let fields = schema.build();

    let join_code_field = fields[positions[join_idx].0].name.clone();
    let join_label_field = fields[positions[join_idx].1].name.clone();

    let metric = cube
        .dimensions
        .iter()
        .position(|d| d.role == DimensionRole::Metric && d.categories.iter().any(|c| c.unit.is_some()));

    let sizes: Vec<usize> = cube.dimensions.iter().map(Dimension::len).collect();
    let total = cube.cell_count().ok_or_else(too_large)?;
    let mut table = Table::new(fields);
    table.rows.reserve(total);

    let mut coordinate = vec![0usize; sizes.len()];
    for _ in 0..total {
        let mut values = Vec::with_capacity(table.fields.len());
        for (dim, &idx) in cube.dimensions.iter().zip(&coordinate) {
            let category = dim.category(idx).ok_or_else(|| DecodeError::IndexOutOfRange {
                id: dim.id.clone(),
                index: idx,
                len: dim.len(),
            })?;
            values.push(FieldValue::Text(category.code.clone()));
            values.push(FieldValue::Text(category.label.clone()));
        }

        values.push(numeric(cube.value_at(&coordinate)));

        let unit = metric.and_then(|m| {
            let dim = &cube.dimensions[m];
            let row_label = &dim.categories[coordinate[m]].label;
            dim.unit_for_label(row_label)
        });
        match unit {
            Some(unit) => {
                values.push(FieldValue::Text(unit.base.to_uppercase()));
                values.push(FieldValue::Text(
                    unit.decimals
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| UNKNOWN.to_string()),
                ));
            }
            None => {
                values.push(UNKNOWN.into());
                values.push(UNKNOWN.into());
            }
        }

        table.rows.push(FlatRow::new(values));
        advance(&mut coordinate, &sizes);
    }

    table.measure_text_lengths();
    Ok(DecodedCube {
        table,
        label: cube.label.clone(),
        join_code_field,
        join_label_field,
    })
}

/// Parse and flatten in one step.
pub fn decode_jsonstat(payload: &Value, join_label: &str) -> DecodeResult<DecodedCube> {
    let cube = parse_cube(payload)?;
    decode_cube(&cube, join_label)
}

/// Step a row-major coordinate (last dimension fastest).
fn advance(coordinate: &mut [usize], sizes: &[usize]) {
    for i in (0..coordinate.len()).rev() {
        coordinate[i] += 1;
        if coordinate[i] < sizes[i] {
            return;
        }
        coordinate[i] = 0;
    }
}

fn numeric(value: FieldValue) -> FieldValue {
    match value {
        FieldValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(FieldValue::Double)
            .unwrap_or(FieldValue::Null),
        FieldValue::Integer(i) => FieldValue::Double(i as f64),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn pxweb_payload() -> Value {
        json!({
            "version": "2.0",
            "class": "dataset",
            "label": "Population by region, contents and year",
            "id": ["Region", "ContentsCode", "Tid"],
            "size": [3, 2, 2],
            "role": { "time": ["Tid"], "metric": ["ContentsCode"], "geo": ["Region"] },
            "dimension": {
                "Region": {
                    "label": "region",
                    "category": {
                        "index": { "0180": 1, "0114": 0, "0181": 2 },
                        "label": { "0114": "Upplands Väsby", "0180": "Stockholm", "0181": "Södertälje" }
                    }
                },
                "ContentsCode": {
                    "label": "Information",
                    "category": {
                        "index": { "POP": 0, "INC": 1 },
                        "label": { "POP": "Population", "INC": "Mean income" },
                        "unit": {
                            "POP": { "base": "number", "decimals": 0 },
                            "INC": { "base": "sek", "decimals": 1 }
                        }
                    }
                },
                "Tid": {
                    "label": "year",
                    "category": { "index": ["2021", "2022"] }
                }
            },
            "value": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
        })
    }

    #[test]
    fn test_row_count_is_cross_product() {
        let decoded = decode_jsonstat(&pxweb_payload(), "region").unwrap();
        assert_eq!(decoded.table.len(), 12);

        let coords: HashSet<String> = decoded
            .table
            .rows
            .iter()
            .map(|r| format!("{}|{}|{}", r.values[0], r.values[2], r.values[4]))
            .collect();
        assert_eq!(coords.len(), 12);
    }

    #[test]
    fn test_categories_follow_stable_index() {
        let decoded = decode_jsonstat(&pxweb_payload(), "region").unwrap();
        let t = &decoded.table;
        // "0114" has index 0 even though it is listed second.
        assert_eq!(t.value(0, "REGION_CODE"), Some(&FieldValue::from("0114")));
        assert_eq!(t.value(0, "REGION"), Some(&FieldValue::from("Upplands Väsby")));
        assert_eq!(t.value(4, "REGION_CODE"), Some(&FieldValue::from("0180")));
        assert_eq!(t.value(4, "VALUE"), Some(&FieldValue::Double(5.0)));
        assert_eq!(decoded.join_code_field, "REGION_CODE");
        assert_eq!(decoded.join_label_field, "REGION");
    }

    #[test]
    fn test_units_from_metric_dimension() {
        let decoded = decode_jsonstat(&pxweb_payload(), "region").unwrap();
        let t = &decoded.table;
        assert_eq!(t.value(0, "UNITS"), Some(&FieldValue::from("NUMBER")));
        assert_eq!(t.value(0, "DECIMALS"), Some(&FieldValue::from("0")));
        assert_eq!(t.value(2, "UNITS"), Some(&FieldValue::from("SEK")));
        assert_eq!(t.value(2, "DECIMALS"), Some(&FieldValue::from("1")));
    }

    #[test]
    fn test_units_unknown_without_metric() {
        let mut payload = pxweb_payload();
        payload["role"] = json!({});
        let decoded = decode_jsonstat(&payload, "region").unwrap();
        assert_eq!(decoded.table.value(0, "UNITS"), Some(&FieldValue::from(UNKNOWN)));
        assert_eq!(decoded.table.value(0, "DECIMALS"), Some(&FieldValue::from(UNKNOWN)));
    }

    #[test]
    fn test_join_label_is_trimmed() {
        assert!(decode_jsonstat(&pxweb_payload(), "  region ").is_ok());
        let err = decode_jsonstat(&pxweb_payload(), "county").unwrap_err();
        assert!(matches!(err, DecodeError::JoinDimensionNotFound(_)));
    }

    #[test]
    fn test_jsonstat_v1_bundle() {
        let v2 = pxweb_payload();
        let mut dimension = v2["dimension"].clone();
        dimension["id"] = v2["id"].clone();
        dimension["size"] = v2["size"].clone();
        dimension["role"] = v2["role"].clone();
        let bundle = json!({
            "dataset": {
                "label": "Bundled",
                "dimension": dimension,
                "value": v2["value"].clone()
            }
        });
        let decoded = decode_jsonstat(&bundle, "region").unwrap();
        assert_eq!(decoded.table.len(), 12);
        assert_eq!(decoded.label.as_deref(), Some("Bundled"));
        assert_eq!(decoded.table.value(1, "UNITS"), Some(&FieldValue::from("NUMBER")));
    }

    #[test]
    fn test_sparse_values() {
        let mut payload = pxweb_payload();
        payload["value"] = json!({ "3": 40, "11": 1.5 });
        let decoded = decode_jsonstat(&payload, "region").unwrap();
        assert_eq!(decoded.table.value(0, "VALUE"), Some(&FieldValue::Null));
        assert_eq!(decoded.table.value(3, "VALUE"), Some(&FieldValue::Double(40.0)));
        assert_eq!(decoded.table.value(11, "VALUE"), Some(&FieldValue::Double(1.5)));
    }

    #[test]
    fn test_value_count_must_match_cells() {
        let mut payload = pxweb_payload();
        payload["value"] = json!([1]);
        let err = parse_cube(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPayload(_)));

        payload["value"] = json!((0..13).collect::<Vec<i32>>());
        assert!(parse_cube(&payload).is_err());
    }

    #[test]
    fn test_sparse_index_beyond_cells_is_fatal() {
        let mut payload = pxweb_payload();
        payload["value"] = json!({ "3": 40, "12": 1 });
        let err = parse_cube(&payload).unwrap_err();
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn test_overflowing_sizes_are_fatal() {
        let mut payload = pxweb_payload();
        payload["size"] = json!([u64::MAX, 2, 2]);
        let err = parse_cube(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPayload(_)));
    }

    #[test]
    fn test_non_contiguous_index_is_fatal() {
        let mut payload = pxweb_payload();
        payload["dimension"]["Region"]["category"]["index"] = json!({ "0114": 0, "0180": 1, "0181": 5 });
        let err = parse_cube(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::CategoryIndex { .. }));
    }

    #[test]
    fn test_size_mismatch_is_fatal() {
        let mut payload = pxweb_payload();
        payload["size"] = json!([4, 2, 2]);
        let err = parse_cube(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::SizeMismatch { declared: 4, actual: 3, .. }));
    }

    #[test]
    fn test_missing_dimension_is_fatal() {
        let err = parse_cube(&json!({ "error": "not found" })).unwrap_err();
        assert!(matches!(err, DecodeError::MissingMember(_)));
    }

    #[test]
    fn test_decoding_is_idempotent() {
        let payload = pxweb_payload();
        let first = decode_jsonstat(&payload, "region").unwrap();
        let second = decode_jsonstat(&payload, "region").unwrap();
        assert_eq!(first.table, second.table);
    }
}
