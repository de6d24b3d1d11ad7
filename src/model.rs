use chrono::NaiveDate;
use serde::Serialize;

/// Name of the time dimension; it never carries a codelist.
pub const TIME_PERIOD: &str = "TIME_PERIOD";

/// A dataset exposed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataflow {
    pub id: String,
    pub agency: String,
    pub version: String,
    pub description: String,
}

/// One axis of a dataset's query key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub id: String,
    /// Zero-based position in the key.
    pub position: usize,
    /// `None` for the time dimension or when nothing resolves.
    pub codelist: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Code {
    pub code_id: String,
    pub name: String,
    pub description: String,
}

/// Row of [`Client::codelists_summary`](crate::Client::codelists_summary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodelistSummary {
    pub codelist_id: String,
    pub name: String,
    pub version: String,
    pub n_codes: usize,
}

/// One observation of a time series, flattened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// `(dimension id, code)` in key order, ending with `TIME_PERIOD`.
    pub dimensions: Vec<(String, String)>,
    pub value: Option<f64>,
    /// `(attribute id, value)` passed through from the payload.
    pub attributes: Vec<(String, String)>,
    /// Period-end date, filled when date conversion was requested.
    pub date: Option<NaiveDate>,
}

impl Observation {
    pub fn dimension(&self, id: &str) -> Option<&str> {
        lookup(&self.dimensions, id)
    }

    pub fn attribute(&self, id: &str) -> Option<&str> {
        lookup(&self.attributes, id)
    }

    pub fn time_period(&self) -> Option<&str> {
        self.dimension(TIME_PERIOD)
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], id: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == id)
        .map(|(_, v)| v.as_str())
}

/// Result of [`Client::get_data`](crate::Client::get_data): one row per observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Observation>,
}

impl DataTable {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Observation>) -> Self {
        Self { columns, rows }
    }

    /// Column names: dimensions, `value`, attributes, then `date` when converted.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.rows.iter()
    }

    /// Renders one column as strings; `None` if the table has no such column.
    pub fn column(&self, name: &str) -> Option<Vec<Option<String>>> {
        if !self.columns.iter().any(|c| c == name) {
            return None;
        }
        let cells = self
            .rows
            .iter()
            .map(|r| match name {
                "value" => r.value.map(|v| v.to_string()),
                "date" => r.date.map(|d| d.to_string()),
                _ => r
                    .dimension(name)
                    .or_else(|| r.attribute(name))
                    .map(str::to_string),
            })
            .collect();
        Some(cells)
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Observation] {
        &mut self.rows
    }

    pub(crate) fn push_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }
}

impl<'a> IntoIterator for &'a DataTable {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
