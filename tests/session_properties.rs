//! End-to-end properties of session normalization through the public API.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use swarsetu_flux::types::{DEFAULT_RESPONSE_TIME_MS, DEFAULT_TASK_NAME};
use swarsetu_flux::{build_session, CanonicalSession};

fn only_task(session: &CanonicalSession) -> &swarsetu_flux::CanonicalTaskRecord {
    assert_eq!(session.len(), 1);
    &session.games()[0]
}

fn odd_payloads() -> Vec<Value> {
    vec![
        json!({}),
        json!(null),
        json!([1, 2, 3]),
        json!("games"),
        json!({"games": null}),
        json!({"games": {"a": null, "b": 7, "c": "text"}}),
        json!({"games": [null, 1, "x", {"answers": "nope"}]}),
        json!({"tasks": [{"correct": "abc", "total": {}, "response_times": "fast"}]}),
        json!({"results": {"r": {"answers": [null, 3, {"is_correct": "true"}]}}}),
        json!({"sections": {"s": {"strokes": 5, "drawing_metrics": [1], "voice_metrics": "loud"}}}),
        json!({"assessment_data": {"games": {"g": {"percentage": "lots", "score": -4}}}}),
        json!({"games": {"g": {"error_count": -3, "errors": null, "timings": [0, -1, "x"]}}}),
    ]
}

#[test]
fn normalization_is_total() {
    for payload in odd_payloads() {
        let session = build_session(&payload, None);
        assert!(!session.is_empty(), "empty session for {payload}");
    }
}

#[test]
fn structural_invariants_hold_for_every_task() {
    for payload in odd_payloads() {
        let session = build_session(&payload, Some("dyslexia"));
        for task in session.games() {
            assert!(!task.response_times.is_empty());
            assert!(task.total >= 1);
            assert!(task.total_count >= 1);
            assert!(task.correct >= 0);
            assert_eq!(task.total_errors, task.errors.len());
            assert!(task.speed >= 0.0);
            assert!(task.duration_ms >= 0);
            assert!(!task.name.is_empty());
        }
    }
}

#[test]
fn explicit_counts_win_over_answers() {
    let payload = json!({
        "games": {
            "g": {
                "correct": 3,
                "total": 5,
                "answers": [{"is_correct": true}, {"is_correct": true}]
            }
        }
    });
    let session = build_session(&payload, None);
    let task = only_task(&session);
    assert_eq!((task.correct, task.total), (3, 5));
    assert_eq!((task.correct_count, task.total_count), (3, 5));
}

#[test]
fn answers_are_counted() {
    let payload = json!({
        "games": {
            "g": {"answers": [{"is_correct": true}, {"is_correct": false}, {"score": 1.0}]}
        }
    });
    let session = build_session(&payload, None);
    let task = only_task(&session);
    assert_eq!((task.correct, task.total), (2, 3));
}

#[test]
fn percentage_fallback() {
    let session = build_session(&json!({"games": {"g": {"percentage": 87.6}}}), None);
    let task = only_task(&session);
    assert_eq!((task.correct, task.total), (87, 100));
    assert_eq!(task.total_errors, 13);
}

#[test]
fn speed_from_response_times() {
    let session = build_session(&json!({"games": {"g": {"response_times": [1500, 2500]}}}), None);
    let task = only_task(&session);
    assert_eq!(task.avg_response_time_ms, 2000);
    assert_eq!(task.speed, 30.0);
}

#[test]
fn games_container_wins_over_tests() {
    let payload = json!({
        "tests": {"from_tests": {"correct": 1, "total": 1}},
        "games": {"from_games": {"correct": 2, "total": 4}}
    });
    let session = build_session(&payload, None);
    let names: Vec<&str> = session.names().collect();
    assert_eq!(names, vec!["from_games"]);
}

#[test]
fn unnamed_sequence_items_are_numbered() {
    let payload = json!({"tasks": [{"correct": 1}, {"correct": 2}, {"correct": 3}]});
    let session = build_session(&payload, None);
    let names: Vec<&str> = session.names().collect();
    assert_eq!(names, vec!["game_1", "game_2", "game_3"]);
}

#[test]
fn default_task_for_unrecognized_payload() {
    let session = build_session(&json!({"foo": 1}), None);
    let task = only_task(&session);
    assert_eq!(task.name, DEFAULT_TASK_NAME);
    assert_eq!((task.correct, task.total), (0, 1));
    assert_eq!(task.response_times, vec![DEFAULT_RESPONSE_TIME_MS]);
    assert_eq!(task.task_type, "general");

    let session = build_session(&json!({"foo": 1, "disorder_type": " Dysgraphia "}), None);
    assert_eq!(only_task(&session).task_type, "dysgraphia");
}

#[test]
fn phoneme_score_tags_task_type_once() {
    let payload = json!({
        "games": {
            "g": {"task_type": "reading", "voice_metrics": {"phoneme_score": 0.8}}
        }
    });
    let session = build_session(&payload, None);
    let task = only_task(&session);
    assert_eq!(task.task_type, "reading_phoneme");
    assert_eq!(task.phoneme_awareness_score, Some(0.8));

    let payload = json!({
        "games": {
            "g": {"task_type": "reading_PHONEME", "voice_metrics": {"phoneme_score": 0.8}}
        }
    });
    let session = build_session(&payload, None);
    assert_eq!(only_task(&session).task_type, "reading_PHONEME");
}

#[test]
fn session_serializes_as_games_mapping() {
    let payload = json!({
        "games": {"b": {"correct": 1, "total": 2}, "a": {"correct": 2, "total": 2}}
    });
    let value = serde_json::to_value(build_session(&payload, None)).unwrap();

    let games = value["games"].as_object().unwrap();
    let keys: Vec<&String> = games.keys().collect();
    assert_eq!(keys, vec!["b", "a"]);
    assert_eq!(games["a"]["correct"], 2);
    assert_eq!(games["a"]["type"], "a");
    assert!(games["a"].get("phoneme_awareness_score").is_none());
}

#[test]
fn explicit_errors_kept_verbatim() {
    let payload = json!({"games": {"g": {"correct": 1, "total": 10, "errors": ["reversal"]}}});
    let session = build_session(&payload, None);
    let task = only_task(&session);
    assert_eq!(task.errors, vec![json!("reversal")]);
    assert_eq!(task.total_errors, 1);
}
