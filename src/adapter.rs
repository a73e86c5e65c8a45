//! Task adapter
//!
//! Assembles one canonical task record from a raw task record: the derived
//! fields from [`crate::derive`] plus typed pass-through fields.

use serde_json::Value;

use crate::coerce::{coerce_bool, coerce_float, coerce_int, first_truthy, get_array, value_to_string};
use crate::derive::{
    derive_correctness, derive_errors, derive_phoneme_score, derive_response_times, derive_speed,
    derive_strokes, mean_response_time, tag_phoneme, RawRecord,
};
use crate::types::{CanonicalTaskRecord, DEFAULT_DIFFICULTY, GENERAL_TASK_TYPE, NEUTRAL_SCORE};

/// Adapter from raw task telemetry to [`CanonicalTaskRecord`]
pub struct TaskAdapter;

impl TaskAdapter {
    /// Adapt one raw task. Total over any input.
    ///
    /// `disorder` is the session's lower-cased disorder category (possibly empty),
    /// used as the task type when the record names none.
    pub fn adapt(raw: &RawRecord, name: &str, disorder: &str) -> CanonicalTaskRecord {
        let _span = tracing::debug_span!("adapt_task", task = name).entered();

        let correctness = derive_correctness(raw);
        let response_times = derive_response_times(raw);
        let avg_response_time_ms = mean_response_time(&response_times);
        let errors = derive_errors(raw, correctness);
        let speed = derive_speed(raw, avg_response_time_ms);

        let mut task_type = first_truthy(raw, &["task_type", "type"])
            .map(value_to_string)
            .unwrap_or_else(|| fallback_task_type(disorder));
        let kind = first_truthy(raw, &["type", "task_type"])
            .map(value_to_string)
            .unwrap_or_else(|| name.to_string());
        let difficulty = first_truthy(raw, &["difficulty"])
            .map(value_to_string)
            .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string());

        let phoneme_awareness_score = derive_phoneme_score(raw);
        if phoneme_awareness_score.is_some() {
            task_type = tag_phoneme(&task_type);
        }

        let record = CanonicalTaskRecord {
            name: name.to_string(),
            task_type,
            kind,
            difficulty,
            correct: correctness.correct,
            total: correctness.total,
            correct_count: correctness.correct,
            total_count: correctness.total,
            response_times,
            avg_response_time_ms,
            duration_ms: coerce_int(first_truthy(raw, &["duration_ms", "duration", "time"]), 0)
                .max(0),
            total_errors: errors.len(),
            errors,
            error_types: list_or_empty(raw, "error_types"),
            error_sequence: list_or_empty(raw, "error_sequence"),
            speed,
            operation: passthrough(raw, "operation"),
            complexity: passthrough(raw, "complexity"),
            complexity_level: coerce_int(raw.get("complexity_level"), 0),
            requires_planning: coerce_bool(raw.get("requires_planning"), false),
            self_corrections: coerce_int(raw.get("self_corrections"), 0),
            conceptual_errors: coerce_int(raw.get("conceptual_errors"), 0),
            error_recovery: neutral_score(raw, "error_recovery"),
            cognitive_load: neutral_score(raw, "cognitive_load"),
            visual_processing_score: neutral_score(raw, "visual_processing_score"),
            strokes: derive_strokes(raw),
            phoneme_awareness_score,
        };

        tracing::debug!(
            correct = record.correct,
            total = record.total,
            total_errors = record.total_errors,
            avg_response_time_ms = record.avg_response_time_ms,
            "task adapted"
        );

        record
    }
}

fn fallback_task_type(disorder: &str) -> String {
    if disorder.is_empty() {
        GENERAL_TASK_TYPE.to_string()
    } else {
        disorder.to_string()
    }
}

fn list_or_empty(raw: &RawRecord, key: &str) -> Vec<Value> {
    get_array(raw, key).cloned().unwrap_or_default()
}

fn passthrough(raw: &RawRecord, key: &str) -> Value {
    raw.get(key).cloned().unwrap_or(Value::Null)
}

fn neutral_score(raw: &RawRecord, key: &str) -> f64 {
    coerce_float(raw.get(key), Some(NEUTRAL_SCORE)).unwrap_or(NEUTRAL_SCORE)
}
