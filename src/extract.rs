//! Container extraction
//!
//! Locates the per-task records inside an arbitrarily shaped payload. Games have
//! been sent under several container names over time; the first usable one wins.

use serde_json::{Map, Value};

use crate::coerce::{first_truthy, get_object, value_to_string};
use crate::types::positional_name;

/// One raw task record paired with the name it was found under
pub type RawTask = (String, Map<String, Value>);

/// Where a task container may live in the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerPath {
    /// Top-level key
    Root(&'static str),
    /// Key nested one level below another object
    Nested(&'static str, &'static str),
}

impl ContainerPath {
    fn resolve<'a>(&self, payload: &'a Map<String, Value>) -> Option<&'a Value> {
        match self {
            ContainerPath::Root(key) => payload.get(*key),
            ContainerPath::Nested(outer, inner) => get_object(payload, outer)?.get(*inner),
        }
    }

    pub fn label(&self) -> String {
        match self {
            ContainerPath::Root(key) => key.to_string(),
            ContainerPath::Nested(outer, inner) => format!("{outer}.{inner}"),
        }
    }
}

/// Candidate containers in priority order
pub const CONTAINER_PRIORITY: [ContainerPath; 6] = [
    ContainerPath::Root("games"),
    ContainerPath::Nested("assessment_data", "games"),
    ContainerPath::Root("tests"),
    ContainerPath::Root("sections"),
    ContainerPath::Root("tasks"),
    ContainerPath::Root("results"),
];

/// Extract `(name, record)` pairs from the first non-empty, usable container.
///
/// Returns an empty list when no candidate yields anything.
pub fn extract_raw_tasks(payload: &Map<String, Value>) -> Vec<RawTask> {
    for path in CONTAINER_PRIORITY {
        let Some(container) = path.resolve(payload) else {
            continue;
        };

        let tasks = match container {
            Value::Object(map) => from_mapping(map),
            Value::Array(items) => from_sequence(items),
            _ => Vec::new(),
        };

        if !tasks.is_empty() {
            tracing::debug!(container = %path.label(), tasks = tasks.len(), "task container found");
            return tasks;
        }
    }

    tracing::debug!("no task container found in payload");
    Vec::new()
}

/// Keys become task names; non-object values are wrapped as `{"value": ...}`.
fn from_mapping(map: &Map<String, Value>) -> Vec<RawTask> {
    map.iter()
        .map(|(name, value)| {
            let record = match value {
                Value::Object(record) => record.clone(),
                other => {
                    let mut wrapped = Map::new();
                    wrapped.insert("value".to_string(), other.clone());
                    wrapped
                }
            };
            (name.clone(), record)
        })
        .collect()
}

/// Names come from `name`, then `id`, then the 1-based position. Non-object
/// items are skipped but still count toward positions.
fn from_sequence(items: &[Value]) -> Vec<RawTask> {
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let record = item.as_object()?;
            let name = first_truthy(record, &["name", "id"])
                .map(value_to_string)
                .unwrap_or_else(|| positional_name(idx + 1));
            Some((name, record.clone()))
        })
        .collect()
}
