//! SDMX-JSON composite-key decoder.
//!
//! Observations are keyed by colon-delimited category indices, e.g.
//! `"0:3:1"`. Segment `i` belongs to the dimension whose declared
//! `keyPosition` is `i`, which need not match the order of the dimension
//! metadata array. The observation value list is `[OBS_VALUE, attr0, attr1, ...]`
//! with attribute entries matched to attribute metadata by position.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::period::normalize_period;
use super::schema::SchemaBuilder;
use crate::error::{DecodeError, DecodeResult};
use crate::models::{FieldDescriptor, FieldValue, FlatRow, Table};

/// Dimension id whose labels are normalized to `YYYY-MM`.
pub const TIME_PERIOD: &str = "TIME_PERIOD";

pub const OBS_VALUE_FIELD: &str = "OBS_VALUE";

/// Media type requested from SDMX endpoints.
pub const SDMX_ACCEPT: &str = "application/vnd.sdmx.data+json;version=1.0.0-wd";

const DEFAULT_LANGUAGE: &str = "en";

// =============================================================================
// Structure
// =============================================================================

/// A name that is either a plain string or a language → text map.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl LocalizedText {
    /// Text in `lang`, then English, then any language.
    pub fn resolve(&self, lang: &str) -> Option<&str> {
        match self {
            LocalizedText::Plain(s) => Some(s),
            LocalizedText::Localized(map) => map
                .get(lang)
                .or_else(|| map.get(DEFAULT_LANGUAGE))
                .or_else(|| map.values().next())
                .map(String::as_str),
        }
    }
}

/// One code of a dimension or attribute.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentValue {
    pub id: String,
    #[serde(default)]
    pub name: Option<LocalizedText>,
}

impl ComponentValue {
    fn label(&self, lang: &str) -> &str {
        self.name
            .as_ref()
            .and_then(|n| n.resolve(lang))
            .unwrap_or(&self.id)
    }
}

/// Dimension or attribute metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(default)]
    pub name: Option<LocalizedText>,
    #[serde(default, rename = "keyPosition")]
    pub key_position: Option<usize>,
    #[serde(default)]
    pub values: Vec<ComponentValue>,
}

impl Component {
    /// Localized name, falling back to the raw id.
    pub fn display_name(&self, lang: &str) -> &str {
        self.name
            .as_ref()
            .and_then(|n| n.resolve(lang))
            .unwrap_or(&self.id)
    }

    fn value_at(&self, index: usize) -> DecodeResult<&ComponentValue> {
        self.values.get(index).ok_or_else(|| DecodeError::IndexOutOfRange {
            id: self.id.clone(),
            index,
            len: self.values.len(),
        })
    }
}

/// The parts of an SDMX-JSON response the decoder uses.
#[derive(Debug, Clone)]
pub struct SdmxResponse {
    pub dimensions: Vec<Component>,
    pub attributes: Vec<Component>,
    /// Observations in payload order.
    pub observations: Map<String, Value>,
}

impl SdmxResponse {
    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }
}

/// Pull dimensions, attributes and observations out of a response.
pub fn parse_sdmx(payload: &Value) -> DecodeResult<SdmxResponse> {
    // Some endpoints omit the `data` envelope.
    let root = payload
        .get("data")
        .filter(|d| d.get("structure").is_some())
        .unwrap_or(payload);

    let dimensions = components(root, "/structure/dimensions/observation")?;
    let attributes = components(root, "/structure/attributes/observation")?;
    let observations = root
        .pointer("/dataSets/0/observations")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| DecodeError::MissingMember("data.dataSets[0].observations".into()))?;

    Ok(SdmxResponse {
        dimensions,
        attributes,
        observations,
    })
}

fn components(root: &Value, pointer: &str) -> DecodeResult<Vec<Component>> {
    let raw = root
        .pointer(pointer)
        .ok_or_else(|| DecodeError::MissingMember(format!("data{}", pointer.replace('/', "."))))?;
    Ok(serde_json::from_value(raw.clone())?)
}

// =============================================================================
// Decoding
// =============================================================================

/// Field positions of one dimension or attribute.
#[derive(Debug, Clone, Copy)]
struct Slots {
    code: usize,
    label: usize,
}

/// Decode every observation into a row.
pub fn decode_sdmx(response: &SdmxResponse, lang: &str) -> DecodeResult<Table> {
    let by_position = key_order(&response.dimensions)?;

    let mut schema = SchemaBuilder::new();
    let dim_slots: Vec<Slots> = response
        .dimensions
        .iter()
        .map(|d| {
            let name = d.display_name(lang);
            Slots {
                code: schema.push_code(&d.id),
                label: schema.push_label(name, name),
            }
        })
        .collect();
    let attr_slots: Vec<Slots> = response
        .attributes
        .iter()
        .map(|a| Slots {
            code: schema.push_code(&a.id),
            label: schema.push_label(&a.id, a.display_name(lang)),
        })
        .collect();
    let obs_slot = schema.push_value(FieldDescriptor::double(OBS_VALUE_FIELD, OBS_VALUE_FIELD));

    let mut table = Table::new(schema.build());
    table.rows.reserve(response.observation_count());

    for (key, observation) in &response.observations {
        let mut values = vec![FieldValue::Null; table.fields.len()];

        let segments: Vec<&str> = key.split(':').collect();
        if segments.len() != by_position.len() {
            return Err(invalid_key(
                key,
                format!("{} segments for {} dimensions", segments.len(), by_position.len()),
            ));
        }
        for (position, segment) in segments.iter().enumerate() {
            let index: usize = segment
                .trim()
                .parse()
                .map_err(|_| invalid_key(key, format!("segment '{}' is not an index", segment)))?;
            let dim_idx = by_position[position];
            let dim = &response.dimensions[dim_idx];
            let value = dim.value_at(index)?;
            let slots = dim_slots[dim_idx];

            if dim.id == TIME_PERIOD {
                let period = time_period(value)?;
                values[slots.code] = FieldValue::Text(period.clone());
                values[slots.label] = FieldValue::Text(period);
            } else {
                values[slots.code] = FieldValue::Text(value.id.clone());
                values[slots.label] = FieldValue::Text(value.label(lang).to_string());
            }
        }

        let entries = observation.as_array().ok_or_else(|| {
            DecodeError::InvalidPayload(format!("observation '{}' is not an array", key))
        })?;
        if entries.len() > response.attributes.len() + 1 {
            return Err(DecodeError::InvalidPayload(format!(
                "observation '{}' has {} attribute values for {} attributes",
                key,
                entries.len() - 1,
                response.attributes.len()
            )));
        }

        values[obs_slot] = entries.first().map(obs_value).unwrap_or_default();

        for (j, attribute) in response.attributes.iter().enumerate() {
            // Missing trailing entries mean "no value".
            let Some(entry) = entries.get(j + 1).filter(|v| !v.is_null()) else {
                continue;
            };
            let index = entry.as_u64().ok_or_else(|| {
                DecodeError::InvalidPayload(format!(
                    "attribute '{}' of observation '{}' is not an index",
                    attribute.id, key
                ))
            })? as usize;
            let value = attribute.value_at(index)?;
            values[attr_slots[j].code] = FieldValue::Text(value.id.clone());
            values[attr_slots[j].label] = FieldValue::Text(value.label(lang).to_string());
        }

        table.rows.push(FlatRow::new(values));
    }

    table.measure_text_lengths();
    Ok(table)
}

/// Periods are read from the English name whatever the requested language,
/// then from the code.
fn time_period(value: &ComponentValue) -> DecodeResult<String> {
    let name = value
        .name
        .as_ref()
        .and_then(|n| n.resolve(DEFAULT_LANGUAGE))
        .unwrap_or(&value.id);
    normalize_period(name).or_else(|err| normalize_period(&value.id).map_err(|_| err))
}

/// Parse and decode in one step.
pub fn decode_sdmx_payload(payload: &Value, lang: &str) -> DecodeResult<Table> {
    decode_sdmx(&parse_sdmx(payload)?, lang)
}

/// Map key position → index into the dimension array.
fn key_order(dimensions: &[Component]) -> DecodeResult<Vec<usize>> {
    let mut by_position: Vec<Option<usize>> = vec![None; dimensions.len()];
    for (i, dim) in dimensions.iter().enumerate() {
        let position = dim.key_position.ok_or_else(|| {
            DecodeError::KeyPosition(format!("dimension '{}' has no keyPosition", dim.id))
        })?;
        let slot = by_position.get_mut(position).ok_or_else(|| {
            DecodeError::KeyPosition(format!(
                "dimension '{}' has keyPosition {} beyond {} dimensions",
                dim.id,
                position,
                dimensions.len()
            ))
        })?;
        if let Some(other) = slot.replace(i) {
            return Err(DecodeError::KeyPosition(format!(
                "dimensions '{}' and '{}' share keyPosition {}",
                dimensions[other].id, dim.id, position
            )));
        }
    }
    // Positions are unique and in range, so every slot is filled.
    Ok(by_position.into_iter().flatten().collect())
}

fn obs_value(value: &Value) -> FieldValue {
    match value {
        Value::Number(n) => n.as_f64().map(FieldValue::Double).unwrap_or_default(),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(FieldValue::Double)
            .unwrap_or_default(),
        _ => FieldValue::Null,
    }
}

fn invalid_key(key: &str, message: String) -> DecodeError {
    DecodeError::InvalidKey {
        key: key.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Dimension metadata listed in an order that differs from key order.
    fn sdmx_payload() -> Value {
        json!({
            "data": {
                "structure": {
                    "dimensions": {
                        "observation": [
                            {
                                "id": "REF_AREA",
                                "name": { "en": "Reference area", "fr": "Zone de référence" },
                                "keyPosition": 1,
                                "values": [
                                    { "id": "AT", "name": { "en": "Austria" } },
                                    { "id": "BE", "name": { "en": "Belgium", "fr": "Belgique" } }
                                ]
                            },
                            {
                                "id": "FREQ",
                                "name": { "en": "Frequency" },
                                "keyPosition": 0,
                                "values": [ { "id": "M", "name": { "en": "Monthly" } } ]
                            },
                            {
                                "id": "TIME_PERIOD",
                                "name": { "en": "Time period" },
                                "keyPosition": 2,
                                "values": [
                                    { "id": "2023-01", "name": { "en": "2023 January" } },
                                    { "id": "2023-02", "name": { "en": "2023 February" } }
                                ]
                            }
                        ]
                    },
                    "attributes": {
                        "observation": [
                            {
                                "id": "OBS_STATUS",
                                "name": { "en": "Observation status" },
                                "values": [
                                    { "id": "A", "name": { "en": "Normal" } },
                                    { "id": "E", "name": { "en": "Estimated" } }
                                ]
                            },
                            {
                                "id": "UNIT_MULT",
                                "values": [ { "id": "3", "name": { "en": "Thousands" } } ]
                            }
                        ]
                    }
                },
                "dataSets": [{
                    "observations": {
                        "0:1:0": [12.5, 1, 0],
                        "0:0:1": [7, null, 0],
                        "0:1:1": [3.25, 0]
                    }
                }]
            }
        })
    }

    #[test]
    fn test_decodes_by_declared_key_position() {
        let table = decode_sdmx_payload(&sdmx_payload(), "en").unwrap();
        assert_eq!(table.len(), 3);

        // "0:1:0" → FREQ[0], REF_AREA[1], TIME_PERIOD[0]
        assert_eq!(table.value(0, "FREQ_CODE"), Some(&FieldValue::from("M")));
        assert_eq!(table.value(0, "REF_AREA_CODE"), Some(&FieldValue::from("BE")));
        assert_eq!(table.value(0, "REFERENCE_AREA"), Some(&FieldValue::from("Belgium")));
        assert_eq!(table.value(1, "REF_AREA_CODE"), Some(&FieldValue::from("AT")));
    }

    #[test]
    fn test_position_matches_direct_indexing() {
        let payload = sdmx_payload();
        let response = parse_sdmx(&payload).unwrap();
        let table = decode_sdmx(&response, "en").unwrap();

        for (row, key) in response.observations.keys().enumerate() {
            let segments: Vec<usize> = key.split(':').map(|s| s.parse().unwrap()).collect();
            for dim in response.dimensions.iter().filter(|d| d.id != TIME_PERIOD) {
                let expected = &dim.values[segments[dim.key_position.unwrap()]];
                let code_field = format!("{}_CODE", dim.id);
                assert_eq!(
                    table.value(row, &code_field),
                    Some(&FieldValue::Text(expected.id.clone()))
                );
            }
        }
    }

    #[test]
    fn test_time_period_normalized() {
        let table = decode_sdmx_payload(&sdmx_payload(), "en").unwrap();
        assert_eq!(table.value(0, "TIME_PERIOD_CODE"), Some(&FieldValue::from("2023-01")));
        assert_eq!(table.value(0, "TIME_PERIOD"), Some(&FieldValue::from("2023-01")));
        assert_eq!(table.value(1, "TIME_PERIOD"), Some(&FieldValue::from("2023-02")));
    }

    #[test]
    fn test_time_period_ignores_requested_language() {
        let mut payload = sdmx_payload();
        let periods = &mut payload["data"]["structure"]["dimensions"]["observation"][2]["values"];
        periods[0]["name"] = json!({ "en": "2023 January", "fr": "janvier 2023" });
        periods[1]["name"] = json!({ "fr": "février 2023" });

        let table = decode_sdmx_payload(&payload, "fr").unwrap();
        assert_eq!(table.value(0, "TIME_PERIOD"), Some(&FieldValue::from("2023-01")));
        // no English name, the code is used
        assert_eq!(table.value(1, "TIME_PERIOD_CODE"), Some(&FieldValue::from("2023-02")));
    }

    #[test]
    fn test_unparseable_time_period_is_fatal() {
        let mut payload = sdmx_payload();
        payload["data"]["structure"]["dimensions"]["observation"][2]["values"][0] =
            json!({ "id": "someday", "name": { "en": "someday" } });
        let err = decode_sdmx_payload(&payload, "en").unwrap_err();
        assert!(matches!(err, DecodeError::TimePeriod(_)));
    }

    #[test]
    fn test_obs_value_and_attributes() {
        let table = decode_sdmx_payload(&sdmx_payload(), "en").unwrap();
        assert_eq!(table.value(0, "OBS_VALUE"), Some(&FieldValue::Double(12.5)));
        assert_eq!(table.value(0, "OBS_STATUS_CODE"), Some(&FieldValue::from("E")));
        assert_eq!(table.value(0, "OBS_STATUS"), Some(&FieldValue::from("Estimated")));
        assert_eq!(table.value(0, "UNIT_MULT"), Some(&FieldValue::from("Thousands")));

        // null attribute index
        assert_eq!(table.value(1, "OBS_STATUS_CODE"), Some(&FieldValue::Null));
        assert_eq!(table.value(1, "OBS_STATUS"), Some(&FieldValue::Null));
        assert_eq!(table.value(1, "OBS_VALUE"), Some(&FieldValue::Double(7.0)));
    }

    #[test]
    fn test_short_value_list_means_null_attributes() {
        let table = decode_sdmx_payload(&sdmx_payload(), "en").unwrap();
        assert_eq!(table.value(2, "OBS_STATUS_CODE"), Some(&FieldValue::from("A")));
        assert_eq!(table.value(2, "UNIT_MULT_CODE"), Some(&FieldValue::Null));
        assert_eq!(table.value(2, "UNIT_MULT"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_field_schema() {
        let table = decode_sdmx_payload(&sdmx_payload(), "en").unwrap();
        assert_eq!(
            table.field_names(),
            vec![
                "REF_AREA_CODE",
                "REFERENCE_AREA",
                "FREQ_CODE",
                "FREQUENCY",
                "TIME_PERIOD_CODE",
                "TIME_PERIOD",
                "OBS_STATUS_CODE",
                "OBS_STATUS",
                "UNIT_MULT_CODE",
                "UNIT_MULT",
                "OBS_VALUE",
            ]
        );
        assert_eq!(table.fields[7].alias, "Observation status");
        // missing name falls back to the id
        assert_eq!(table.fields[9].alias, "UNIT_MULT");
    }

    #[test]
    fn test_language_fallback() {
        let table = decode_sdmx_payload(&sdmx_payload(), "fr").unwrap();
        assert_eq!(table.fields[1].name, "ZONE_DE_R_F_RENCE");
        assert_eq!(table.fields[1].alias, "Zone de référence");
        assert_eq!(table.value(0, "ZONE_DE_R_F_RENCE"), Some(&FieldValue::from("Belgique")));
        // no French label for Austria → English
        assert_eq!(table.value(1, "ZONE_DE_R_F_RENCE"), Some(&FieldValue::from("Austria")));
    }

    #[test]
    fn test_malformed_key_is_fatal() {
        let mut payload = sdmx_payload();
        payload["data"]["dataSets"][0]["observations"] = json!({ "0:x:0": [1.0] });
        let err = decode_sdmx_payload(&payload, "en").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidKey { .. }));

        payload["data"]["dataSets"][0]["observations"] = json!({ "0:0": [1.0] });
        let err = decode_sdmx_payload(&payload, "en").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidKey { .. }));
    }

    #[test]
    fn test_index_out_of_range_is_fatal() {
        let mut payload = sdmx_payload();
        payload["data"]["dataSets"][0]["observations"] = json!({ "0:5:0": [1.0] });
        let err = decode_sdmx_payload(&payload, "en").unwrap_err();
        assert!(matches!(err, DecodeError::IndexOutOfRange { index: 5, .. }));
    }

    #[test]
    fn test_duplicate_key_position_is_fatal() {
        let mut payload = sdmx_payload();
        payload["data"]["structure"]["dimensions"]["observation"][1]["keyPosition"] = json!(1);
        let err = decode_sdmx_payload(&payload, "en").unwrap_err();
        assert!(matches!(err, DecodeError::KeyPosition(_)));
    }

    #[test]
    fn test_missing_structure_is_fatal() {
        let err = parse_sdmx(&json!({ "data": { "dataSets": [] } })).unwrap_err();
        assert!(matches!(err, DecodeError::MissingMember(_)));

        let mut payload = sdmx_payload();
        payload["data"]["dataSets"] = json!([]);
        let err = parse_sdmx(&payload).unwrap_err();
        assert!(err.to_string().contains("observations"));
    }

    #[test]
    fn test_decoding_is_idempotent() {
        let payload = sdmx_payload();
        let first = decode_sdmx_payload(&payload, "en").unwrap();
        let second = decode_sdmx_payload(&payload, "en").unwrap();
        assert_eq!(first, second);
    }
}
