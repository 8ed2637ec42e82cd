use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder shown for fields the platform did not return.
pub const MISSING_TEXT: &str = "N/A";

/// One platform record: an `id` plus `field_N` / `field_N_raw` entries.
///
/// Accessors never fail: absent or oddly-shaped fields fall back to
/// [`MISSING_TEXT`], `None`, or an empty list so callers can always render.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

/// Entry of a connection field (`field_N_raw` arrays).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRef {
    pub id: String,
    #[serde(default)]
    pub identifier: String,
}

impl Record {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Record(map),
            _ => Record::default(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn raw(&self, field: &str) -> Option<&Value> {
        self.0.get(&format!("{}_raw", field))
    }

    /// Display text of a field with the fallback applied.
    pub fn text(&self, field: &str) -> String {
        self.text_opt(field)
            .unwrap_or_else(|| MISSING_TEXT.to_string())
    }

    pub fn text_opt(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        let v = self.raw(field).or_else(|| self.get(field))?;
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Email fields come back raw as `{ "email": "..." }`.
    pub fn email(&self, field: &str) -> Option<String> {
        match self.raw(field)? {
            Value::Object(o) => o.get("email").and_then(Value::as_str).map(str::to_string),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    pub fn connections(&self, field: &str) -> Vec<ConnectionRef> {
        match self.raw(field) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default = "one", deserialize_with = "lenient_u32")]
    pub total_pages: u32,
    #[serde(default = "one", deserialize_with = "lenient_u32")]
    pub current_page: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub total_records: u32,
}

fn one() -> u32 {
    1
}

// The platform sends page counters as numbers or numeric strings.
fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let wide = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    Ok(u32::try_from(wide).unwrap_or(u32::MAX))
}

impl RecordPage {
    /// Parse a list payload; anything unrecognisable becomes an empty single page.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|_| RecordPage::empty())
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            total_pages: 1,
            current_page: 1,
            total_records: 0,
        }
    }

    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }
}

pub const MAX_ROWS_PER_PAGE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Paging, sorting and filtering for list calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub filter: Option<super::Filter>,
    pub page: u32,
    pub rows_per_page: u32,
    pub sort: Option<(String, SortOrder)>,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            filter: None,
            page: 1,
            rows_per_page: 100,
            sort: None,
        }
    }
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: super::Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn rows_per_page(mut self, rows: u32) -> Self {
        self.rows_per_page = rows.clamp(1, MAX_ROWS_PER_PAGE);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn to_pairs(&self) -> serde_json::Result<Vec<(String, String)>> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("rows_per_page".to_string(), self.rows_per_page.to_string()),
        ];
        if let Some((field, order)) = &self.sort {
            pairs.push(("sort_field".to_string(), field.clone()));
            let order = match order {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            pairs.push(("sort_order".to_string(), order.to_string()));
        }
        if let Some(filter) = self.filter.as_ref().filter(|f| !f.is_empty()) {
            pairs.push(("filters".to_string(), filter.to_query_value()?));
        }
        Ok(pairs)
    }
}
