use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// One page of rows decoded from any list envelope the backend emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Decoded rows.
    pub rows: Vec<T>,
    /// Server page count, when the envelope carried one.
    pub total_pages: Option<u32>,
    /// Server row count across all pages, when the envelope carried one.
    pub total_elements: Option<u64>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            total_pages: None,
            total_elements: None,
        }
    }
}

impl<T> Page<T> {
    /// Returns the server total, or the row count for unpaged envelopes.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total_elements
            .unwrap_or_else(|| u64::try_from(self.rows.len()).unwrap_or(u64::MAX))
    }

    /// Returns the page count for `page_size`, preferring the server value.
    #[must_use]
    pub fn page_count(&self, page_size: u32) -> u32 {
        if let Some(total_pages) = self.total_pages {
            return total_pages;
        }

        let page_size = u64::from(page_size.max(1));
        u32::try_from(self.total().div_ceil(page_size)).unwrap_or(u32::MAX)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListEnvelope {
    Bare(Vec<Value>),
    Paged {
        content: Vec<Value>,
        #[serde(default, rename = "totalPages")]
        total_pages: Option<u32>,
        #[serde(default, rename = "totalElements")]
        total_elements: Option<u64>,
    },
    Wrapped {
        data: Value,
    },
}

/// Decodes a list payload.
///
/// Accepts a bare array, a paged `{content, totalPages, totalElements}`
/// object, or a `{data}` wrapper whose value is an array or an object holding
/// `roles`, `content`, or some array. Any other object falls back to its
/// first array-valued property. Rows that fail to decode are skipped and a
/// payload matching no shape yields an empty page.
#[must_use]
pub fn decode_page<T>(payload: Value) -> Page<T>
where
    T: DeserializeOwned,
{
    let (rows, total_pages, total_elements) = match classify(payload) {
        Some(found) => found,
        None => {
            tracing::warn!("list payload matched no known envelope");
            return Page::default();
        }
    };

    let rows = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(row) => Some(row),
            Err(error) => {
                tracing::warn!(error = %error, "skipping list row that failed to decode");
                None
            }
        })
        .collect();

    Page {
        rows,
        total_pages,
        total_elements,
    }
}

/// Decodes a list payload and keeps only the rows.
#[must_use]
pub fn decode_rows<T>(payload: Value) -> Vec<T>
where
    T: DeserializeOwned,
{
    decode_page(payload).rows
}

type Classified = (Vec<Value>, Option<u32>, Option<u64>);

fn classify(payload: Value) -> Option<Classified> {
    let fallback = match &payload {
        Value::Object(map) => first_array(map),
        _ => None,
    };

    match serde_json::from_value::<ListEnvelope>(payload) {
        Ok(ListEnvelope::Bare(rows)) => Some((rows, None, None)),
        Ok(ListEnvelope::Paged {
            content,
            total_pages,
            total_elements,
        }) => Some((content, total_pages, total_elements)),
        Ok(ListEnvelope::Wrapped { data }) => classify_data(data),
        Err(_) => fallback.map(|rows| (rows, None, None)),
    }
}

fn classify_data(data: Value) -> Option<Classified> {
    match data {
        Value::Array(rows) => Some((rows, None, None)),
        Value::Object(mut map) => match map.remove("roles") {
            Some(Value::Array(rows)) => Some((rows, None, None)),
            _ => classify(Value::Object(map)),
        },
        _ => None,
    }
}

fn first_array(map: &Map<String, Value>) -> Option<Vec<Value>> {
    map.values().find_map(|value| value.as_array().cloned())
}
