//! SDMX-JSON data messages, flattened into one row per observation.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{DataTable, Observation};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataMessage {
    // SDMX-JSON 2.0 wraps everything in `data`; 1.0 kept it at the root.
    #[serde(default)]
    data: Option<DataBody>,
    #[serde(default)]
    data_sets: Vec<DataSet>,
    #[serde(default)]
    structure: Option<StructureDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataBody {
    #[serde(default)]
    data_sets: Vec<DataSet>,
    #[serde(default)]
    structures: Vec<StructureDef>,
    #[serde(default)]
    structure: Option<StructureDef>,
}

#[derive(Debug, Deserialize)]
struct DataSet {
    #[serde(default)]
    structure: Option<usize>,
    #[serde(default)]
    attributes: Vec<Option<usize>>,
    #[serde(default)]
    series: HashMap<String, SeriesDef>,
}

#[derive(Debug, Deserialize)]
struct SeriesDef {
    #[serde(default)]
    attributes: Vec<Option<usize>>,
    #[serde(default)]
    observations: HashMap<String, Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct StructureDef {
    dimensions: ComponentGroups,
    #[serde(default)]
    attributes: Option<ComponentGroups>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComponentGroups {
    #[serde(default)]
    data_set: Vec<ComponentDef>,
    #[serde(default)]
    series: Vec<ComponentDef>,
    #[serde(default)]
    observation: Vec<ComponentDef>,
}

#[derive(Debug, Deserialize)]
struct ComponentDef {
    id: String,
    #[serde(default)]
    values: Vec<ComponentValue>,
}

#[derive(Debug, Deserialize)]
struct ComponentValue {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    name: Option<String>,
}

impl ComponentValue {
    fn text(&self) -> Option<String> {
        self.id
            .clone()
            .or_else(|| self.value.as_ref().map(value_text))
            .or_else(|| self.name.clone())
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::DataRequest(format!("malformed data message: {}", msg.into()))
}

impl DataMessage {
    pub(crate) fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| malformed(e.to_string()))
    }

    /// Flattens every data set into rows; fails on any dangling index.
    pub(crate) fn into_table(self) -> Result<DataTable> {
        let (data_sets, structures) = match self.data {
            Some(body) => {
                let mut structures = body.structures;
                structures.extend(body.structure);
                (body.data_sets, structures)
            }
            None => (self.data_sets, self.structure.into_iter().collect()),
        };

        if data_sets.is_empty() {
            return Err(Error::DataRequest("response contains no data sets".into()));
        }

        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        for ds in data_sets {
            let idx = ds.structure.unwrap_or(0);
            let structure = structures
                .get(idx)
                .ok_or_else(|| malformed(format!("data set refers to missing structure {idx}")))?;
            let cols = structure.columns();
            match &columns {
                Some(existing) if *existing != cols => {
                    return Err(malformed("data sets use different structures"));
                }
                Some(_) => {}
                None => columns = Some(cols),
            }
            flatten_data_set(structure, ds, &mut rows)?;
        }

        if rows.is_empty() {
            return Err(Error::DataRequest("response contains no observations".into()));
        }
        Ok(DataTable::new(columns.unwrap_or_default(), rows))
    }
}

impl StructureDef {
    fn attribute_groups(&self) -> &ComponentGroups {
        static EMPTY: ComponentGroups = ComponentGroups {
            data_set: Vec::new(),
            series: Vec::new(),
            observation: Vec::new(),
        };
        self.attributes.as_ref().unwrap_or(&EMPTY)
    }

    fn columns(&self) -> Vec<String> {
        let attrs = self.attribute_groups();
        self.dimensions
            .series
            .iter()
            .chain(self.dimensions.observation.iter())
            .map(|c| c.id.clone())
            .chain(std::iter::once("value".to_string()))
            .chain(
                attrs
                    .data_set
                    .iter()
                    .chain(attrs.series.iter())
                    .chain(attrs.observation.iter())
                    .map(|c| c.id.clone()),
            )
            .collect()
    }
}

/// Resolves `indices` against `components`; `None` entries are skipped.
fn resolve_attributes(
    components: &[ComponentDef],
    indices: &[Option<usize>],
    out: &mut Vec<(String, String)>,
) -> Result<()> {
    if let Some(pos) = indices
        .iter()
        .skip(components.len())
        .position(Option::is_some)
    {
        return Err(malformed(format!(
            "attribute index at position {} has no attribute component",
            components.len() + pos
        )));
    }
    for (comp, idx) in components.iter().zip(indices) {
        let Some(i) = idx else { continue };
        let text = comp
            .values
            .get(*i)
            .ok_or_else(|| malformed(format!("attribute {} has no value #{i}", comp.id)))?
            .text()
            .ok_or_else(|| malformed(format!("attribute {} value #{i} is empty", comp.id)))?;
        out.push((comp.id.clone(), text));
    }
    Ok(())
}

fn dimension_code(comp: &ComponentDef, i: usize) -> Result<String> {
    comp.values
        .get(i)
        .and_then(ComponentValue::text)
        .ok_or_else(|| malformed(format!("dimension {} has no value #{i}", comp.id)))
}

fn parse_index(s: &str, what: &str) -> Result<usize> {
    s.parse()
        .map_err(|_| malformed(format!("invalid {what} index '{s}'")))
}

fn flatten_data_set(structure: &StructureDef, ds: DataSet, rows: &mut Vec<Observation>) -> Result<()> {
    let attrs = structure.attribute_groups();
    let series_dims = &structure.dimensions.series;
    let obs_dims = &structure.dimensions.observation;

    let mut data_set_attrs = Vec::new();
    resolve_attributes(&attrs.data_set, &ds.attributes, &mut data_set_attrs)?;

    let mut series: Vec<(Vec<usize>, SeriesDef)> = ds
        .series
        .into_iter()
        .map(|(key, s)| -> Result<(Vec<usize>, SeriesDef)> {
            let idx = if key.is_empty() {
                Vec::new()
            } else {
                key.split(':')
                    .map(|p| parse_index(p, "series"))
                    .collect::<Result<Vec<_>>>()?
            };
            Ok((idx, s))
        })
        .collect::<Result<_>>()?;
    series.sort_by(|a, b| a.0.cmp(&b.0));

    for (key, s) in series {
        if key.len() != series_dims.len() {
            return Err(malformed(format!(
                "series key has {} part(s) but the structure declares {} series dimension(s)",
                key.len(),
                series_dims.len()
            )));
        }
        let mut dims = Vec::with_capacity(series_dims.len() + obs_dims.len());
        for (comp, &i) in series_dims.iter().zip(&key) {
            dims.push((comp.id.clone(), dimension_code(comp, i)?));
        }
        let mut series_attrs = data_set_attrs.clone();
        resolve_attributes(&attrs.series, &s.attributes, &mut series_attrs)?;

        let mut observations: Vec<(Vec<usize>, Vec<Value>)> = s
            .observations
            .into_iter()
            .map(|(key, values)| -> Result<(Vec<usize>, Vec<Value>)> {
                let idx = key
                    .split(':')
                    .map(|p| parse_index(p, "observation"))
                    .collect::<Result<Vec<_>>>()?;
                Ok((idx, values))
            })
            .collect::<Result<_>>()?;
        observations.sort_by(|a, b| a.0.cmp(&b.0));

        for (obs_key, values) in observations {
            if obs_key.len() != obs_dims.len() {
                return Err(malformed("observation key does not match observation dimensions"));
            }
            let mut row_dims = dims.clone();
            for (comp, &i) in obs_dims.iter().zip(&obs_key) {
                row_dims.push((comp.id.clone(), dimension_code(comp, i)?));
            }

            let (value, obs_attr_idx) = values
                .split_first()
                .ok_or_else(|| malformed("observation without a value"))?;
            let value = parse_value(value)?;
            let obs_attr_idx: Vec<Option<usize>> = obs_attr_idx
                .iter()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Number(n) => n
                        .as_u64()
                        .map(|n| Some(n as usize))
                        .ok_or_else(|| malformed(format!("invalid attribute index {n}"))),
                    other => Err(malformed(format!("invalid attribute index {other}"))),
                })
                .collect::<Result<_>>()?;
            let mut row_attrs = series_attrs.clone();
            resolve_attributes(&attrs.observation, &obs_attr_idx, &mut row_attrs)?;

            rows.push(Observation {
                dimensions: row_dims,
                value,
                attributes: row_attrs,
                date: None,
            });
        }
    }
    Ok(())
}

/// Observation values arrive as numbers, numeric strings, or null.
fn parse_value(v: &Value) -> Result<Option<f64>> {
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("nan") {
                return Ok(None);
            }
            s.parse::<f64>()
                .map(Some)
                .map_err(|_| malformed(format!("non-numeric observation value '{s}'")))
        }
        other => Err(malformed(format!("unexpected observation value {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    const WEO_DATA: &str = include_str!("../tests/fixtures/data_weo_lur.json");

    fn table(v: Value) -> Result<DataTable> {
        DataMessage::from_json(&v.to_string())?.into_table()
    }

    #[test]
    fn flattens_series_in_key_order() {
        let t = DataMessage::from_json(WEO_DATA).unwrap().into_table().unwrap();
        assert_eq!(
            t.columns(),
            ["COUNTRY", "INDICATOR", "FREQUENCY", "TIME_PERIOD", "value", "SCALE", "OBS_STATUS"]
        );
        assert_eq!(t.len(), 5);

        let first = &t.rows()[0];
        assert_eq!(first.dimension("COUNTRY"), Some("USA"));
        assert_eq!(first.time_period(), Some("2022"));
        assert_eq!(first.value, Some(3.6));
        assert_eq!(first.attribute("SCALE"), Some("0"));
        assert_eq!(first.attribute("OBS_STATUS"), None);

        let estimated = &t.rows()[2];
        assert_eq!(estimated.time_period(), Some("2024"));
        assert_eq!(estimated.attribute("OBS_STATUS"), Some("E"));

        let last = &t.rows()[4];
        assert_eq!(last.dimension("COUNTRY"), Some("NLD"));
        assert_eq!(last.value, None);
    }

    #[test]
    fn reads_legacy_root_layout() {
        let t = table(json!({
            "dataSets": [{ "series": { "0": { "observations": { "0": [1.5] } } } }],
            "structure": {
                "dimensions": {
                    "series": [{ "id": "COUNTRY", "values": [{ "id": "JPN" }] }],
                    "observation": [{ "id": "TIME_PERIOD", "values": [{ "value": "2020-Q1" }] }]
                }
            }
        }))
        .unwrap();
        assert_eq!(t.rows()[0].time_period(), Some("2020-Q1"));
        assert_eq!(t.rows()[0].value, Some(1.5));
    }

    #[rstest]
    #[case::no_data_sets(json!({ "data": { "dataSets": [], "structures": [] } }))]
    #[case::no_observations(json!({ "data": {
        "dataSets": [{ "structure": 0, "series": {} }],
        "structures": [{ "dimensions": { "series": [], "observation": [] } }]
    }}))]
    #[case::dangling_series_index(json!({ "data": {
        "dataSets": [{ "series": { "3": { "observations": { "0": [1.0] } } } }],
        "structures": [{ "dimensions": {
            "series": [{ "id": "COUNTRY", "values": [{ "id": "USA" }] }],
            "observation": [{ "id": "TIME_PERIOD", "values": [{ "value": "2020" }] }]
        }}]
    }}))]
    #[case::short_series_key(json!({ "data": {
        "dataSets": [{ "series": { "0": { "observations": { "0": [1.0] } } } }],
        "structures": [{ "dimensions": {
            "series": [
                { "id": "COUNTRY", "values": [{ "id": "USA" }] },
                { "id": "FREQ", "values": [{ "id": "A" }] }
            ],
            "observation": [{ "id": "TIME_PERIOD", "values": [{ "value": "2020" }] }]
        }}]
    }}))]
    #[case::text_value(json!({ "data": {
        "dataSets": [{ "series": { "0": { "observations": { "0": ["n/a"] } } } }],
        "structures": [{ "dimensions": {
            "series": [{ "id": "COUNTRY", "values": [{ "id": "USA" }] }],
            "observation": [{ "id": "TIME_PERIOD", "values": [{ "value": "2020" }] }]
        }}]
    }}))]
    #[case::empty_observation(json!({ "data": {
        "dataSets": [{ "series": { "0": { "observations": { "0": [] } } } }],
        "structures": [{ "dimensions": {
            "series": [{ "id": "COUNTRY", "values": [{ "id": "USA" }] }],
            "observation": [{ "id": "TIME_PERIOD", "values": [{ "value": "2020" }] }]
        }}]
    }}))]
    #[case::attribute_without_component(json!({ "data": {
        "dataSets": [{ "series": { "0": { "attributes": [0, 5], "observations": { "0": [1.0] } } } }],
        "structures": [{
            "dimensions": {
                "series": [{ "id": "COUNTRY", "values": [{ "id": "USA" }] }],
                "observation": [{ "id": "TIME_PERIOD", "values": [{ "value": "2020" }] }]
            },
            "attributes": { "series": [{ "id": "SCALE", "values": [{ "id": "0" }] }] }
        }]
    }}))]
    #[case::blank_attribute_value(json!({ "data": {
        "dataSets": [{ "series": { "0": { "attributes": [0], "observations": { "0": [1.0] } } } }],
        "structures": [{
            "dimensions": {
                "series": [{ "id": "COUNTRY", "values": [{ "id": "USA" }] }],
                "observation": [{ "id": "TIME_PERIOD", "values": [{ "value": "2020" }] }]
            },
            "attributes": { "series": [{ "id": "SCALE", "values": [{}] }] }
        }]
    }}))]
    #[case::missing_structure(json!({ "data": {
        "dataSets": [{ "structure": 1, "series": {} }],
        "structures": []
    }}))]
    fn rejects_unusable_payloads(#[case] payload: Value) {
        assert!(matches!(table(payload), Err(Error::DataRequest(_))));
    }

    #[rstest]
    #[case(json!(2.5), Some(2.5))]
    #[case(json!("4.25"), Some(4.25))]
    #[case(json!("NaN"), None)]
    #[case(json!(null), None)]
    fn parses_observation_values(#[case] v: Value, #[case] expected: Option<f64>) {
        assert_eq!(parse_value(&v).unwrap(), expected);
    }
}
