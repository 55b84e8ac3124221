use std::cmp::Ordering;

use kkvat_core::{AppError, AppResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};

use crate::flags::{coerce_flag, deserialize_lenient_bool};

const DEFAULT_DATATYPE: &str = "string";
const DEFAULT_COLUMN_TYPE: &str = "freefield";

const NAME_KEYS: &[&str] = &["column_name", "columnName", "name"];
const SEQ_KEYS: &[&str] = &["column_seq", "seq"];
const LENGTH_KEYS: &[&str] = &["column_length", "length"];
const DATATYPE_KEYS: &[&str] = &["column_datatype", "datatype"];
const TYPE_KEYS: &[&str] = &["column_type", "type"];
const FLAG_KEYS: &[&str] = &[
    "column_index",
    "column_primary",
    "column_part_of_search",
    "column_referential_integrity",
];

/// One column of an entity definition submitted to the code generator.
///
/// Flags use the canonical `0`/`1` form the generator expects. Keys the
/// console does not model (widget hints such as `is_dropdown`) are kept in
/// `extra` so an edit round-trips them unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityColumn {
    /// 1-based position of the column.
    pub column_seq: u32,
    /// Column name; may be blank while the row is being edited.
    pub column_name: String,
    /// Optional maximum length.
    pub column_length: Option<u32>,
    /// Storage datatype, `string` by default.
    pub column_datatype: String,
    /// Input widget type, `freefield` by default.
    pub column_type: String,
    /// Whether an index is generated.
    pub column_index: u8,
    /// Whether the column is part of the primary key.
    pub column_primary: u8,
    /// Whether the column is searchable.
    pub column_part_of_search: u8,
    /// Whether a foreign-key constraint is generated.
    pub column_referential_integrity: u8,
    /// Unmodelled keys carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EntityColumn {
    /// Creates the blank row added by the "add column" action.
    #[must_use]
    pub fn blank(column_seq: u32) -> Self {
        let mut extra = Map::new();
        extra.insert("is_dropdown".to_owned(), json!(0));
        extra.insert("is_radiobutton".to_owned(), json!(0));
        extra.insert("is_checkbox".to_owned(), json!(0));
        extra.insert("is_freefield".to_owned(), json!(1));

        Self {
            column_seq,
            column_name: String::new(),
            column_length: None,
            column_datatype: DEFAULT_DATATYPE.to_owned(),
            column_type: DEFAULT_COLUMN_TYPE.to_owned(),
            column_index: 0,
            column_primary: 0,
            column_part_of_search: 0,
            column_referential_integrity: 0,
            extra,
        }
    }

    /// Returns whether the row is indistinguishable from an untouched placeholder.
    ///
    /// A deliberately blank-named column with default settings also matches,
    /// and is discarded along with real placeholders.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.column_name.trim().is_empty()
            && self.column_datatype == DEFAULT_DATATYPE
            && self.column_type == DEFAULT_COLUMN_TYPE
            && self.column_length.is_none()
            && self.column_index == 0
            && self.column_primary == 0
            && self.column_part_of_search == 0
            && self.column_referential_integrity == 0
    }

    fn from_raw(raw: &Value, position: usize) -> Self {
        let mut extra = raw.as_object().cloned().unwrap_or_default();
        let fallback_seq = u32::try_from(position + 1).unwrap_or(u32::MAX);

        let column_seq = first_present(&extra, SEQ_KEYS)
            .and_then(positive_integer)
            .unwrap_or(fallback_seq);
        let column_name = first_present(&extra, NAME_KEYS)
            .map(text_of)
            .unwrap_or_default();
        let column_length = first_present(&extra, LENGTH_KEYS).and_then(positive_integer);
        let column_datatype = first_present(&extra, DATATYPE_KEYS)
            .map(text_of)
            .unwrap_or_else(|| DEFAULT_DATATYPE.to_owned());
        let column_type = first_present(&extra, TYPE_KEYS)
            .map(text_of)
            .unwrap_or_else(|| DEFAULT_COLUMN_TYPE.to_owned());
        let [column_index, column_primary, column_part_of_search, column_referential_integrity] =
            [0, 1, 2, 3].map(|slot| coerce_flag(extra.get(FLAG_KEYS[slot])));

        for key in NAME_KEYS
            .iter()
            .chain(SEQ_KEYS)
            .chain(LENGTH_KEYS)
            .chain(DATATYPE_KEYS)
            .chain(TYPE_KEYS)
            .chain(FLAG_KEYS)
        {
            extra.remove(*key);
        }

        Self {
            column_seq,
            column_name,
            column_length,
            column_datatype,
            column_type,
            column_index,
            column_primary,
            column_part_of_search,
            column_referential_integrity,
            extra,
        }
    }
}

/// Normalizes a column collection of unknown shape.
///
/// Accepts a JSON array, a JSON-encoded string of one, or a key-less object
/// map (`{"0": {...}, "1": {...}}`). Placeholder rows are dropped. Anything
/// unparseable yields an empty list.
#[must_use]
pub fn normalize_columns(raw: &Value) -> Vec<EntityColumn> {
    let rows: Vec<&Value> = match raw {
        Value::Array(rows) => rows.iter().collect(),
        Value::Object(map) => ordered_map_values(map),
        Value::String(text) => {
            return match serde_json::from_str::<Value>(text) {
                Ok(parsed @ (Value::Array(_) | Value::Object(_))) => normalize_columns(&parsed),
                _ => Vec::new(),
            };
        }
        _ => return Vec::new(),
    };

    rows.into_iter()
        .enumerate()
        .map(|(position, row)| EntityColumn::from_raw(row, position))
        .filter(|column| !column.is_placeholder())
        .collect()
}

fn ordered_map_values(map: &Map<String, Value>) -> Vec<&Value> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|(left, _), (right, _)| {
        match (left.parse::<u64>(), right.parse::<u64>()) {
            (Ok(left), Ok(right)) => left.cmp(&right),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => left.cmp(right),
        }
    });
    entries.into_iter().map(|(_, value)| value).collect()
}

fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

fn positive_integer(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }?;

    u32::try_from(number).ok().filter(|number| *number > 0)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn deserialize_columns<'de, D>(deserializer: D) -> Result<Vec<EntityColumn>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.map(|raw| normalize_columns(&raw)).unwrap_or_default())
}

/// Entity definition driving server-side code generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfig {
    /// Backend identifier, absent until created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Logical entity name.
    #[serde(default)]
    pub entity_name: String,
    /// Physical table name.
    #[serde(default)]
    pub entity_table_name: String,
    /// Ordered column definitions.
    #[serde(default, deserialize_with = "deserialize_columns")]
    pub columns: Vec<EntityColumn>,
    /// Generate workflow support.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub do_we_need_workflow: bool,
    /// Generate a single approval level.
    #[serde(
        rename = "doWeNeed1LevelWorkflow",
        default,
        deserialize_with = "deserialize_lenient_bool"
    )]
    pub do_we_need_one_level_workflow: bool,
    /// Generate two approval levels.
    #[serde(
        rename = "doWeNeed2LevelWorkflow",
        default,
        deserialize_with = "deserialize_lenient_bool"
    )]
    pub do_we_need_two_level_workflow: bool,
    /// Initial workflow status.
    #[serde(default)]
    pub workflow_status: Option<String>,
    /// Generate an audit table.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub do_we_need_audit_table: bool,
    /// Generate archive tables.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub do_we_need_archive_records: bool,
    /// Generate a reporting view.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub do_we_need_create_view: bool,
    /// Months kept in the main table.
    #[serde(default)]
    pub how_many_months_main_table: Option<u32>,
    /// Months kept in the archive table.
    #[serde(default)]
    pub how_many_months_archive_table: Option<u32>,
    /// Archive predicate.
    #[serde(default)]
    pub criteria_to_move_from_main_to_archive_table: Option<String>,
    /// Purge predicate.
    #[serde(default)]
    pub criteria_to_move_from_archive_to_delete_table: Option<String>,
    /// Criteria field list, free-form JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_fields: Option<Value>,
    /// Criteria values, free-form JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_values: Option<Value>,
    /// Artifact list requested from the generator.
    #[serde(default)]
    pub things_to_create: Option<String>,
    /// Menu the generated screen is attached to.
    #[serde(default)]
    pub parent_menu: Option<String>,
    /// Role granted access to the generated screen.
    #[serde(default)]
    pub which_role_is_eligible: Option<String>,
    /// Server-managed generation status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl EntityConfig {
    /// Creates an empty definition for the given entity and table.
    #[must_use]
    pub fn new(entity_name: impl Into<String>, entity_table_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            entity_table_name: entity_table_name.into(),
            ..Self::default()
        }
    }

    /// Appends a blank column and returns its index.
    pub fn add_column(&mut self) -> usize {
        let next_seq = u32::try_from(self.columns.len() + 1).unwrap_or(u32::MAX);
        self.columns.push(EntityColumn::blank(next_seq));
        self.resequence();
        self.columns.len() - 1
    }

    /// Removes the column at `index`. Out-of-range indexes are ignored.
    pub fn delete_column(&mut self, index: usize) -> bool {
        if index >= self.columns.len() {
            return false;
        }

        self.columns.remove(index);
        self.resequence();
        true
    }

    /// Renumbers `column_seq` as `1..=n` in current order.
    pub fn resequence(&mut self) {
        for (position, column) in self.columns.iter_mut().enumerate() {
            column.column_seq = u32::try_from(position + 1).unwrap_or(u32::MAX);
        }
    }

    /// Drops placeholder rows, renumbers, and checks required fields.
    pub fn prepare_for_submit(&mut self) -> AppResult<()> {
        if self.entity_name.trim().is_empty() {
            return Err(AppError::Validation("entity name is required".to_owned()));
        }

        if self.entity_table_name.trim().is_empty() {
            self.entity_table_name = self.entity_name.trim().to_owned();
        }

        self.columns.retain(|column| !column.is_placeholder());
        self.resequence();
        Ok(())
    }
}

/// Result reported by the generator endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// `ok` or `error`.
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable summary.
    #[serde(default)]
    pub message: Option<String>,
}

impl GenerationOutcome {
    /// Returns the message to show, `OK` when the backend sent none.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.message
            .as_deref()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or("OK")
    }
}

/// Folder of generated artifacts on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Folder name, used as the delete key.
    pub name: String,
    /// Absolute folder path on the server.
    #[serde(default)]
    pub path: Option<String>,
    /// Manifest file path on the server.
    #[serde(default)]
    pub manifest: Option<String>,
}

/// One record of the generator progress log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressStep {
    /// Step number.
    pub step: Option<u32>,
    /// Step name.
    pub name: Option<String>,
    /// Step status.
    pub status: Option<String>,
    /// Detail message.
    pub message: Option<String>,
    /// Server timestamp of the update.
    pub updated_at: Option<String>,
}

/// Decodes a progress payload. Anything but an array yields no steps.
#[must_use]
pub fn decode_progress_steps(payload: &Value) -> Vec<ProgressStep> {
    payload
        .as_array()
        .map(|steps| {
            steps
                .iter()
                .filter_map(|step| serde_json::from_value(step.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}
