//! Session builder
//!
//! Turns a whole request payload into the canonical `{"games": {...}}` session
//! consumed by the scoring models. Always returns at least one task.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::adapter::TaskAdapter;
use crate::coerce::{is_truthy, value_to_string};
use crate::extract::extract_raw_tasks;
use crate::types::{positional_name, CanonicalSession, CanonicalTaskRecord};

/// Lower-cased, trimmed disorder category for a payload.
///
/// An explicit non-blank value wins over `payload["disorder_type"]`.
pub fn resolve_disorder(payload: &Value, disorder_type: Option<&str>) -> String {
    let explicit = disorder_type.filter(|d| !d.trim().is_empty());
    let raw = match explicit {
        Some(d) => d.to_string(),
        None => payload
            .get("disorder_type")
            .filter(|v| is_truthy(v))
            .map(value_to_string)
            .unwrap_or_default(),
    };
    raw.trim().to_lowercase()
}

/// Build the canonical session for a payload.
///
/// Non-object payloads are treated as empty. Never fails.
pub fn build_session(payload: &Value, disorder_type: Option<&str>) -> CanonicalSession {
    let disorder = resolve_disorder(payload, disorder_type);
    let empty = Map::new();
    let root = payload.as_object().unwrap_or(&empty);

    let raw_tasks = extract_raw_tasks(root);
    let mut used = HashSet::new();
    let mut games = Vec::with_capacity(raw_tasks.len().max(1));

    for (idx, (name, raw)) in raw_tasks.iter().enumerate() {
        let name = unique_name(name, idx + 1, &mut used);
        games.push(TaskAdapter::adapt(raw, &name, &disorder));
    }

    if games.is_empty() {
        tracing::warn!(disorder = %disorder, "no tasks found in payload, synthesizing default task");
        games.push(CanonicalTaskRecord::default_task(&disorder));
    }

    tracing::info!(tasks = games.len(), disorder = %disorder, "session built");
    CanonicalSession::from_games(games)
}

/// Pick a session-unique name: the given one, else the positional name, else a
/// numbered variant of the positional name.
fn unique_name(name: &str, position: usize, used: &mut HashSet<String>) -> String {
    let positional = positional_name(position);
    let mut candidates = [name, positional.as_str()]
        .into_iter()
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let chosen = candidates.find(|c| !used.contains(c)).unwrap_or_else(|| {
        (2..)
            .map(|k| format!("{positional}_{k}"))
            .find(|c| !used.contains(c))
            .unwrap_or(positional.clone())
    });

    if chosen != name {
        tracing::debug!(original = name, renamed = %chosen, "task renamed to keep names unique");
    }
    used.insert(chosen.clone());
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_TASK_NAME, GENERAL_TASK_TYPE};
    use serde_json::json;

    #[test]
    fn test_resolve_disorder() {
        let payload = json!({"disorder_type": "  Dyslexia "});
        assert_eq!(resolve_disorder(&payload, None), "dyslexia");
        assert_eq!(resolve_disorder(&payload, Some(" DYSCALCULIA")), "dyscalculia");
        assert_eq!(resolve_disorder(&payload, Some("   ")), "dyslexia");
        assert_eq!(resolve_disorder(&json!({}), None), "");
        assert_eq!(resolve_disorder(&json!({"disorder_type": null}), None), "");
    }

    #[test]
    fn test_default_task_for_unrecognized_payload() {
        let session = build_session(&json!({"foo": 1}), None);

        assert_eq!(session.len(), 1);
        let task = session.get(DEFAULT_TASK_NAME).unwrap();
        assert_eq!((task.correct, task.total), (0, 1));
        assert_eq!(task.task_type, GENERAL_TASK_TYPE);
    }

    #[test]
    fn test_default_task_takes_disorder_type() {
        let session = build_session(&json!({"disorder_type": "Dysgraphia"}), None);
        assert_eq!(session.get(DEFAULT_TASK_NAME).unwrap().task_type, "dysgraphia");
    }

    #[test]
    fn test_non_object_payloads_are_tolerated() {
        for payload in [json!(null), json!([1, 2]), json!("games"), json!(3)] {
            let session = build_session(&payload, Some("dyslexia"));
            assert_eq!(session.names().collect::<Vec<_>>(), vec![DEFAULT_TASK_NAME]);
        }
    }

    #[test]
    fn test_disorder_flows_into_task_type() {
        let session = build_session(
            &json!({"disorder_type": "dyscalculia", "games": {"counting": {"score": 4}}}),
            None,
        );
        let task = session.get("counting").unwrap();
        assert_eq!(task.task_type, "dyscalculia");
        assert_eq!((task.correct, task.total), (4, 4));
    }

    #[test]
    fn test_duplicate_names_fall_back_to_positions() {
        let session = build_session(
            &json!({"tasks": [
                {"name": "reading"},
                {"name": "reading"},
                {"name": "game_2"},
                {}
            ]}),
            None,
        );

        assert_eq!(
            session.names().collect::<Vec<_>>(),
            vec!["reading", "game_2", "game_3", "game_4"]
        );
    }

    #[test]
    fn test_empty_mapping_key_gets_positional_name() {
        let session = build_session(&json!({"games": {"": {"score": 1}, "b": {}}}), None);
        assert_eq!(session.names().collect::<Vec<_>>(), vec!["game_1", "b"]);
    }

    #[test]
    fn test_unique_name_numbers_exhausted_positions() {
        let mut used: HashSet<String> = ["x", "game_1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique_name("x", 1, &mut used), "game_1_2");
        assert!(used.contains("game_1_2"));
    }
}
