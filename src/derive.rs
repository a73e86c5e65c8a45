//! Per-task field derivation
//!
//! Each derived field is computed from an ordered table of named rules. Rules are
//! pure functions over the raw task record; the first one that applies wins and
//! every table ends in a terminal default, so derivation cannot fail.

use serde_json::{Map, Value};

use crate::coerce::{
    coerce_float, coerce_int, first_present, first_truthy, get_array, get_object, is_truthy,
};
use crate::types::{
    StrokeMetrics, DEFAULT_RESPONSE_TIME_MS, ERROR_MARKER, INCORRECT_MARKER, MS_PER_MINUTE,
    NEUTRAL_SCORE, PHONEME_SUFFIX,
};

/// Raw task record as received
pub type RawRecord = Map<String, Value>;

/// Upper bound on synthesized error markers, so a bogus count cannot blow up memory
pub const MAX_SYNTHESIZED_ERRORS: usize = 10_000;

const RESPONSE_TIME_SERIES_KEYS: [&str; 3] = ["response_times", "responseTimes", "timings"];
const AVERAGE_RESPONSE_TIME_KEYS: [&str; 3] = ["avg_response_time_ms", "avg_rt", "response_time"];

/// Correct and attempted answer counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correctness {
    pub correct: i64,
    /// Never below 1
    pub total: i64,
}

impl Correctness {
    /// Counts used when nothing in the record says otherwise
    pub const NONE: Correctness = Correctness { correct: 0, total: 1 };

    /// Answers not accounted for as correct
    pub fn shortfall(&self) -> i64 {
        (self.total - self.correct).max(0)
    }
}

/// The record's answer list: first truthy of `answers`/`responses`, if it is an array
pub fn answers(raw: &RawRecord) -> Option<&Vec<Value>> {
    first_truthy(raw, &["answers", "responses"]).and_then(Value::as_array)
}

fn answer_flagged(answer: &Map<String, Value>, flag: bool) -> bool {
    ["is_correct", "correct"]
        .iter()
        .any(|key| answer.get(*key) == Some(&Value::Bool(flag)))
}

fn answer_scored_correct(answer: &Map<String, Value>) -> bool {
    answer.contains_key("score")
        && coerce_float(answer.get("score"), Some(0.0)).unwrap_or(0.0) >= 1.0
}

// ============================================================================
// Correctness
// ============================================================================

type CorrectnessRule = fn(&RawRecord) -> Option<Correctness>;

/// Correctness rules in priority order
pub const CORRECTNESS_RULES: [(&str, CorrectnessRule); 4] = [
    ("explicit_counts", correctness_from_counts),
    ("answer_list", correctness_from_answers),
    ("percentage", correctness_from_percentage),
    ("positive_score", correctness_from_score),
];

/// Derive correct/total counts for a task
pub fn derive_correctness(raw: &RawRecord) -> Correctness {
    apply_rules("correctness", &CORRECTNESS_RULES, |rule| rule(raw)).unwrap_or(Correctness::NONE)
}

/// Explicit `correct`/`correct_count` and `total`/`total_count`, both present
fn correctness_from_counts(raw: &RawRecord) -> Option<Correctness> {
    let correct = first_present(raw, &["correct", "correct_count"])?;
    let total = first_present(raw, &["total", "total_count"])?;

    Some(Correctness {
        correct: coerce_int(Some(correct), 0).max(0),
        total: coerce_int(Some(total), 1).max(1),
    })
}

/// Count entries flagged correct, or carrying a `score` of at least 1
fn correctness_from_answers(raw: &RawRecord) -> Option<Correctness> {
    let answers = answers(raw).filter(|a| !a.is_empty())?;

    let correct = answers
        .iter()
        .filter_map(Value::as_object)
        .filter(|answer| answer_flagged(answer, true) || answer_scored_correct(answer))
        .count();

    Some(Correctness {
        correct: correct as i64,
        total: answers.len() as i64,
    })
}

/// Percentage clipped to 0-100, read as correct out of 100
fn correctness_from_percentage(raw: &RawRecord) -> Option<Correctness> {
    let percentage = coerce_float(raw.get("percentage"), None)?;

    Some(Correctness {
        correct: percentage.clamp(0.0, 100.0).trunc() as i64,
        total: 100,
    })
}

/// A positive raw score counts as that many correct out of itself
fn correctness_from_score(raw: &RawRecord) -> Option<Correctness> {
    let score = coerce_float(raw.get("score"), Some(0.0)).unwrap_or(0.0);
    if score <= 0.0 {
        return None;
    }

    let correct = score.trunc() as i64;
    Some(Correctness {
        correct,
        total: correct.max(1),
    })
}

// ============================================================================
// Timing
// ============================================================================

type ResponseTimeRule = fn(&RawRecord) -> Option<Vec<i64>>;

/// Response-time rules in priority order
pub const RESPONSE_TIME_RULES: [(&str, ResponseTimeRule); 2] = [
    ("series", response_times_from_series),
    ("single_average", response_times_from_average),
];

/// Derive the response-time series (ms). Never empty.
pub fn derive_response_times(raw: &RawRecord) -> Vec<i64> {
    apply_rules("response_times", &RESPONSE_TIME_RULES, |rule| rule(raw))
        .unwrap_or_else(|| vec![DEFAULT_RESPONSE_TIME_MS])
}

/// First series whose positive entries are non-empty
fn response_times_from_series(raw: &RawRecord) -> Option<Vec<i64>> {
    RESPONSE_TIME_SERIES_KEYS.iter().find_map(|key| {
        let series: Vec<i64> = get_array(raw, key)?
            .iter()
            .map(|value| coerce_int(Some(value), 0))
            .filter(|ms| *ms > 0)
            .collect();
        (!series.is_empty()).then_some(series)
    })
}

/// A single positive average stands in for the whole series
fn response_times_from_average(raw: &RawRecord) -> Option<Vec<i64>> {
    AVERAGE_RESPONSE_TIME_KEYS
        .iter()
        .map(|key| coerce_int(raw.get(*key), 0))
        .find(|ms| *ms > 0)
        .map(|ms| vec![ms])
}

/// Arithmetic mean truncated to whole milliseconds
pub fn mean_response_time(times: &[i64]) -> i64 {
    if times.is_empty() {
        return DEFAULT_RESPONSE_TIME_MS;
    }
    let sum: i128 = times.iter().map(|&ms| ms as i128).sum();
    (sum / times.len() as i128) as i64
}

/// Answers per minute: the explicit `speed` if positive, else derived from the mean time
pub fn derive_speed(raw: &RawRecord, avg_response_time_ms: i64) -> f64 {
    let explicit = coerce_float(raw.get("speed"), Some(0.0)).unwrap_or(0.0);
    if explicit > 0.0 {
        return explicit;
    }
    if avg_response_time_ms > 0 {
        return round3(MS_PER_MINUTE / avg_response_time_ms as f64);
    }
    0.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ============================================================================
// Errors
// ============================================================================

type ErrorRule = fn(&RawRecord, Correctness) -> Option<Vec<Value>>;

/// Error rules in priority order
pub const ERROR_RULES: [(&str, ErrorRule); 4] = [
    ("explicit_list", errors_from_list),
    ("error_count", errors_from_count),
    ("incorrect_answers", errors_from_answers),
    ("correctness_shortfall", errors_from_shortfall),
];

/// Derive the error marker list.
///
/// An explicit list is used verbatim even when its length disagrees with the
/// correctness counts.
pub fn derive_errors(raw: &RawRecord, correctness: Correctness) -> Vec<Value> {
    apply_rules("errors", &ERROR_RULES, |rule| rule(raw, correctness)).unwrap_or_default()
}

fn markers(marker: &str, count: i64) -> Vec<Value> {
    let count = usize::try_from(count.max(0))
        .unwrap_or(MAX_SYNTHESIZED_ERRORS)
        .min(MAX_SYNTHESIZED_ERRORS);
    vec![Value::String(marker.to_string()); count]
}

fn errors_from_list(raw: &RawRecord, _: Correctness) -> Option<Vec<Value>> {
    get_array(raw, "errors").cloned()
}

fn errors_from_count(raw: &RawRecord, _: Correctness) -> Option<Vec<Value>> {
    let count = raw.get("error_count").filter(|v| !v.is_null())?;
    Some(markers(ERROR_MARKER, coerce_int(Some(count), 0)))
}

/// `error_type` (or the generic marker) of every answer flagged incorrect
fn errors_from_answers(raw: &RawRecord, _: Correctness) -> Option<Vec<Value>> {
    let inferred: Vec<Value> = answers(raw)?
        .iter()
        .filter_map(Value::as_object)
        .filter(|answer| answer_flagged(answer, false))
        .map(|answer| match answer.get("error_type") {
            Some(kind) if is_truthy(kind) => kind.clone(),
            _ => Value::String(INCORRECT_MARKER.to_string()),
        })
        .collect();

    (!inferred.is_empty()).then_some(inferred)
}

fn errors_from_shortfall(_: &RawRecord, correctness: Correctness) -> Option<Vec<Value>> {
    Some(markers(INCORRECT_MARKER, correctness.shortfall()))
}

// ============================================================================
// Modality
// ============================================================================

type StrokeRule = fn(&RawRecord) -> Option<Vec<Value>>;

/// Stroke rules in priority order
pub const STROKE_RULES: [(&str, StrokeRule); 3] = [
    ("stroke_list", strokes_from_list),
    ("drawing_stroke_list", strokes_from_drawing_list),
    ("drawing_summary", strokes_from_drawing_summary),
];

/// Derive per-stroke drawing metrics; empty when the task has no drawing telemetry
pub fn derive_strokes(raw: &RawRecord) -> Vec<Value> {
    apply_rules("strokes", &STROKE_RULES, |rule| rule(raw)).unwrap_or_default()
}

fn non_empty_array(value: Option<&Vec<Value>>) -> Option<Vec<Value>> {
    value.filter(|items| !items.is_empty()).cloned()
}

fn strokes_from_list(raw: &RawRecord) -> Option<Vec<Value>> {
    non_empty_array(get_array(raw, "strokes"))
}

fn strokes_from_drawing_list(raw: &RawRecord) -> Option<Vec<Value>> {
    non_empty_array(get_object(raw, "drawing_metrics").and_then(|d| get_array(d, "strokes")))
}

/// One stroke summarizing the whole drawing
fn strokes_from_drawing_summary(raw: &RawRecord) -> Option<Vec<Value>> {
    let drawing = get_object(raw, "drawing_metrics").filter(|d| !d.is_empty())?;
    Some(vec![stroke_from_summary(drawing).to_value()])
}

/// Stroke metrics read from a drawing summary, neutral where missing
pub fn stroke_from_summary(drawing: &Map<String, Value>) -> StrokeMetrics {
    let metric = |key: &str| coerce_float(drawing.get(key), Some(NEUTRAL_SCORE)).unwrap_or(NEUTRAL_SCORE);

    StrokeMetrics {
        smoothness: metric("smoothness"),
        straightness: metric("straightness"),
        pressure: metric("pressure"),
        tremor: metric("tremor"),
    }
}

/// Phoneme awareness from `voice_metrics.phoneme_score`, if numeric
pub fn derive_phoneme_score(raw: &RawRecord) -> Option<f64> {
    let voice = get_object(raw, "voice_metrics")?;
    coerce_float(voice.get("phoneme_score"), None)
}

/// Tag a task type as phoneme-scored, unless it already mentions phonemes
pub fn tag_phoneme(task_type: &str) -> String {
    if task_type.to_lowercase().contains("phoneme") {
        task_type.to_string()
    } else {
        format!("{task_type}{PHONEME_SUFFIX}")
    }
}

/// Evaluate `rules` in order, returning the first result
fn apply_rules<R, T>(
    field: &str,
    rules: &[(&str, R)],
    mut eval: impl FnMut(&R) -> Option<T>,
) -> Option<T> {
    let matched = rules
        .iter()
        .find_map(|(name, rule)| eval(rule).map(|value| (*name, value)));

    match matched {
        Some((rule, value)) => {
            tracing::trace!(field, rule, "derivation rule matched");
            Some(value)
        }
        None => {
            tracing::trace!(field, "no derivation rule matched, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    fn counts(correct: i64, total: i64) -> Correctness {
        Correctness { correct, total }
    }

    #[test]
    fn test_explicit_counts_win_over_answers() {
        let raw = record(json!({
            "correct": 3,
            "total": 5,
            "answers": [{"is_correct": true}]
        }));
        assert_eq!(derive_correctness(&raw), counts(3, 5));
    }

    #[test]
    fn test_explicit_counts_floor_total_and_accept_alternate_names() {
        let raw = record(json!({"correct_count": "2", "total_count": 0}));
        assert_eq!(derive_correctness(&raw), counts(2, 1));
    }

    #[test]
    fn test_explicit_counts_need_both_fields() {
        let raw = record(json!({"correct": 4, "percentage": 50}));
        assert_eq!(derive_correctness(&raw), counts(50, 100));
    }

    #[test]
    fn test_answer_list_inference() {
        let raw = record(json!({
            "answers": [{"is_correct": true}, {"is_correct": false}, {"score": 1.0}]
        }));
        assert_eq!(derive_correctness(&raw), counts(2, 3));
    }

    #[test]
    fn test_answer_list_counts_non_objects_in_total_only() {
        let raw = record(json!({
            "answers": [],
            "responses": ["a", {"correct": true}, {"is_correct": "true"}, {"score": "0.4"}]
        }));
        assert_eq!(derive_correctness(&raw), counts(1, 4));
    }

    #[test]
    fn test_percentage_fallback() {
        let raw = record(json!({"percentage": 87.6}));
        assert_eq!(derive_correctness(&raw), counts(87, 100));

        let raw = record(json!({"percentage": "140"}));
        assert_eq!(derive_correctness(&raw), counts(100, 100));

        let raw = record(json!({"percentage": -3}));
        assert_eq!(derive_correctness(&raw), counts(0, 100));
    }

    #[test]
    fn test_positive_score_fallback() {
        assert_eq!(derive_correctness(&record(json!({"score": 7.9}))), counts(7, 7));
        assert_eq!(derive_correctness(&record(json!({"score": 0.5}))), counts(0, 1));
        assert_eq!(derive_correctness(&record(json!({"score": -2}))), Correctness::NONE);
    }

    #[test]
    fn test_correctness_default() {
        assert_eq!(derive_correctness(&record(json!({}))), Correctness::NONE);
        assert_eq!(
            derive_correctness(&record(json!({"percentage": "n/a", "answers": {}}))),
            Correctness::NONE
        );
    }

    #[test]
    fn test_response_times_discard_non_positive_entries() {
        let raw = record(json!({"response_times": [1500, 0, -4, "2500", "fast", 812.9]}));
        assert_eq!(derive_response_times(&raw), vec![1500, 2500, 812]);
    }

    #[test]
    fn test_response_times_try_series_in_order() {
        let raw = record(json!({
            "response_times": [0, -1],
            "responseTimes": "oops",
            "timings": [900, 1100]
        }));
        assert_eq!(derive_response_times(&raw), vec![900, 1100]);
    }

    #[test]
    fn test_response_times_single_average_and_default() {
        let raw = record(json!({"avg_response_time_ms": 0, "avg_rt": "1750"}));
        assert_eq!(derive_response_times(&raw), vec![1750]);

        let raw = record(json!({"response_times": []}));
        assert_eq!(derive_response_times(&raw), vec![DEFAULT_RESPONSE_TIME_MS]);
    }

    #[test]
    fn test_mean_and_speed() {
        let times = vec![1500, 2500];
        let avg = mean_response_time(&times);
        assert_eq!(avg, 2000);
        assert_eq!(derive_speed(&record(json!({})), avg), 30.0);

        assert_eq!(mean_response_time(&[1000, 1001]), 1000);
        assert_eq!(derive_speed(&record(json!({})), 7000), 8.571);
        assert_eq!(derive_speed(&record(json!({"speed": 12.5})), 2000), 12.5);
        assert_eq!(derive_speed(&record(json!({"speed": -1})), 0), 0.0);
    }

    #[test]
    fn test_explicit_error_list_is_verbatim() {
        let raw = record(json!({"errors": ["reversal", {"kind": "omission"}], "error_count": 9}));
        let errors = derive_errors(&raw, counts(0, 10));
        assert_eq!(errors, vec![json!("reversal"), json!({"kind": "omission"})]);
    }

    #[test]
    fn test_error_count_expands_to_markers() {
        let raw = record(json!({"error_count": "3"}));
        assert_eq!(derive_errors(&raw, counts(5, 5)), vec![json!(ERROR_MARKER); 3]);

        let raw = record(json!({"error_count": -2}));
        assert!(derive_errors(&raw, counts(0, 5)).is_empty());
    }

    #[test]
    fn test_errors_inferred_from_incorrect_answers() {
        let raw = record(json!({
            "answers": [
                {"is_correct": false, "error_type": "letter_reversal"},
                {"correct": false, "error_type": ""},
                {"is_correct": true}
            ]
        }));
        let errors = derive_errors(&raw, derive_correctness(&raw));
        assert_eq!(errors, vec![json!("letter_reversal"), json!(INCORRECT_MARKER)]);
    }

    #[test]
    fn test_errors_fall_back_to_shortfall() {
        let raw = record(json!({"answers": [{"score": 0}, {"score": 2}]}));
        let errors = derive_errors(&raw, derive_correctness(&raw));
        assert_eq!(errors, vec![json!(INCORRECT_MARKER)]);

        assert!(derive_errors(&record(json!({})), counts(4, 2)).is_empty());
    }

    #[test]
    fn test_synthesized_errors_are_capped() {
        let raw = record(json!({"error_count": 1e12}));
        assert_eq!(derive_errors(&raw, Correctness::NONE).len(), MAX_SYNTHESIZED_ERRORS);
    }

    #[test]
    fn test_strokes_verbatim_then_drawing_summary() {
        let raw = record(json!({"strokes": [{"smoothness": 0.9}]}));
        assert_eq!(derive_strokes(&raw), vec![json!({"smoothness": 0.9})]);

        let raw = record(json!({"drawing_metrics": {"strokes": [{"tremor": 0.2}]}}));
        assert_eq!(derive_strokes(&raw), vec![json!({"tremor": 0.2})]);

        let raw = record(json!({"drawing_metrics": {"smoothness": "0.7", "tremor": null}}));
        assert_eq!(
            derive_strokes(&raw),
            vec![json!({"smoothness": 0.7, "straightness": 0.5, "pressure": 0.5, "tremor": 0.5})]
        );

        assert!(derive_strokes(&record(json!({"drawing_metrics": {}}))).is_empty());
        assert!(derive_strokes(&record(json!({"strokes": "many"}))).is_empty());
    }

    #[test]
    fn test_empty_drawing_summary_is_neutral() {
        assert_eq!(stroke_from_summary(&Map::new()), StrokeMetrics::default());
    }

    #[test]
    fn test_phoneme_score_and_tagging() {
        let raw = record(json!({"voice_metrics": {"phoneme_score": 0.8}}));
        assert_eq!(derive_phoneme_score(&raw), Some(0.8));
        assert_eq!(derive_phoneme_score(&record(json!({"voice_metrics": {}}))), None);
        assert_eq!(derive_phoneme_score(&record(json!({"voice_metrics": 0.8}))), None);

        assert_eq!(tag_phoneme("reading"), "reading_phoneme");
        assert_eq!(tag_phoneme("reading_phoneme"), "reading_phoneme");
        assert_eq!(tag_phoneme("Phoneme_Blend"), "Phoneme_Blend");
    }
}
