//! Core types for the SwarSetu Flux pipeline
//!
//! Raw payloads stay as loosely-typed `serde_json` maps; only the canonical
//! output is strongly typed. Shared defaults live here as named constants.

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};

/// Response time used when a task carries no usable timing data (ms)
pub const DEFAULT_RESPONSE_TIME_MS: i64 = 2000;

/// Neutral value for 0-1 scores that were not reported
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Difficulty assigned when none is reported
pub const DEFAULT_DIFFICULTY: &str = "medium";

/// Task type used when neither the task nor the session names one
pub const GENERAL_TASK_TYPE: &str = "general";

/// Name of the task synthesized for payloads without any recognizable task
pub const DEFAULT_TASK_NAME: &str = "default_task";

/// Prefix of positional task names (`game_1`, `game_2`, ...)
pub const POSITIONAL_NAME_PREFIX: &str = "game_";

/// Suffix appended to `task_type` when voice telemetry carries a phoneme score
pub const PHONEME_SUFFIX: &str = "_phoneme";

/// Marker for errors inferred from incorrect answers or missing correctness
pub const INCORRECT_MARKER: &str = "incorrect";

/// Marker for errors expanded from a bare `error_count`
pub const ERROR_MARKER: &str = "error";

/// Milliseconds per minute; speed is answers per minute at the mean response time
pub const MS_PER_MINUTE: f64 = 60_000.0;

/// Positional task name for the 1-based `position`
pub fn positional_name(position: usize) -> String {
    format!("{POSITIONAL_NAME_PREFIX}{position}")
}

/// Drawing quality metrics for a single stroke (each nominally 0-1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeMetrics {
    pub smoothness: f64,
    pub straightness: f64,
    pub pressure: f64,
    pub tremor: f64,
}

impl StrokeMetrics {
    pub fn to_value(&self) -> Value {
        json!({
            "smoothness": self.smoothness,
            "straightness": self.straightness,
            "pressure": self.pressure,
            "tremor": self.tremor,
        })
    }
}

impl Default for StrokeMetrics {
    fn default() -> Self {
        Self {
            smoothness: NEUTRAL_SCORE,
            straightness: NEUTRAL_SCORE,
            pressure: NEUTRAL_SCORE,
            tremor: NEUTRAL_SCORE,
        }
    }
}

/// Canonical, fully-populated record for one assessment task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTaskRecord {
    /// Task name, unique within its session
    pub name: String,
    /// Scoring category of the task (may carry a `_phoneme` tag)
    pub task_type: String,
    /// Raw task kind as reported by the game
    #[serde(rename = "type")]
    pub kind: String,
    pub difficulty: String,

    /// Correct answers
    pub correct: i64,
    /// Attempted answers, never below 1
    pub total: i64,
    /// Same as `correct`, for consumers that read the `_count` names
    pub correct_count: i64,
    /// Same as `total`, for consumers that read the `_count` names
    pub total_count: i64,

    /// Per-answer response times (ms), never empty
    pub response_times: Vec<i64>,
    /// Truncated mean of `response_times` (ms)
    pub avg_response_time_ms: i64,
    pub duration_ms: i64,

    /// Error markers, as reported or inferred
    pub errors: Vec<Value>,
    /// Always `errors.len()`
    pub total_errors: usize,
    pub error_types: Vec<Value>,
    pub error_sequence: Vec<Value>,

    /// Answers per minute
    pub speed: f64,
    pub operation: Value,
    pub complexity: Value,
    pub complexity_level: i64,
    pub requires_planning: bool,
    pub self_corrections: i64,
    pub conceptual_errors: i64,
    pub error_recovery: f64,
    pub cognitive_load: f64,
    pub visual_processing_score: f64,

    /// Per-stroke drawing metrics
    pub strokes: Vec<Value>,
    /// Phoneme awareness from voice telemetry, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phoneme_awareness_score: Option<f64>,
}

impl CanonicalTaskRecord {
    /// Neutral placeholder task for payloads that yielded no tasks at all
    pub fn default_task(disorder: &str) -> Self {
        let task_type = if disorder.is_empty() {
            GENERAL_TASK_TYPE.to_string()
        } else {
            disorder.to_string()
        };

        Self {
            name: DEFAULT_TASK_NAME.to_string(),
            task_type,
            kind: DEFAULT_TASK_NAME.to_string(),
            difficulty: DEFAULT_DIFFICULTY.to_string(),
            correct: 0,
            total: 1,
            correct_count: 0,
            total_count: 1,
            response_times: vec![DEFAULT_RESPONSE_TIME_MS],
            avg_response_time_ms: DEFAULT_RESPONSE_TIME_MS,
            duration_ms: 0,
            errors: Vec::new(),
            total_errors: 0,
            error_types: Vec::new(),
            error_sequence: Vec::new(),
            speed: 0.0,
            operation: Value::Null,
            complexity: Value::Null,
            complexity_level: 0,
            requires_planning: false,
            self_corrections: 0,
            conceptual_errors: 0,
            error_recovery: NEUTRAL_SCORE,
            cognitive_load: NEUTRAL_SCORE,
            visual_processing_score: NEUTRAL_SCORE,
            strokes: Vec::new(),
            phoneme_awareness_score: None,
        }
    }
}

/// Canonical session handed to the scoring models.
///
/// Serializes as `{"games": {"<name>": {...}}}`, keeping task order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalSession {
    games: Vec<CanonicalTaskRecord>,
}

impl CanonicalSession {
    pub(crate) fn from_games(games: Vec<CanonicalTaskRecord>) -> Self {
        Self { games }
    }

    /// Look up a task by name
    pub fn get(&self, name: &str) -> Option<&CanonicalTaskRecord> {
        self.games.iter().find(|g| g.name == name)
    }

    /// Tasks in session order
    pub fn games(&self) -> &[CanonicalTaskRecord] {
        &self.games
    }

    /// Task names in session order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.games.iter().map(|g| g.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Session as a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for CanonicalSession {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Games<'a>(&'a [CanonicalTaskRecord]);

        impl Serialize for Games<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for game in self.0 {
                    map.serialize_entry(&game.name, game)?;
                }
                map.end()
            }
        }

        let mut state = serializer.serialize_struct("CanonicalSession", 1)?;
        state.serialize_field("games", &Games(&self.games))?;
        state.end()
    }
}
