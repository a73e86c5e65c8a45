//! Parent-friendly explanations of a prediction
//!
//! Text generation is delegated to a [`TextGenerator`]. Whenever it is not
//! configured or fails in any way, a deterministic local explanation keyed by the
//! risk level is returned instead, so explaining never fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::value_to_string;
use crate::error::ComputeError;
use crate::scoring::RiskLevel;

/// Model used when `GEMINI_MODEL` is not set
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Environment variable holding the generator credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable selecting the generator model
pub const MODEL_ENV: &str = "GEMINI_MODEL";

/// Explainer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainerConfig {
    /// Generator credential; without one the fallback is always used
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ExplainerConfig {
    /// Read `GEMINI_API_KEY` and `GEMINI_MODEL` from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_key: non_blank(API_KEY_ENV),
            model: non_blank(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// One text-generation call
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub api_key: &'a str,
    pub model: &'a str,
    pub prompt: &'a str,
}

/// External text-generation backend
pub trait TextGenerator: Send + Sync {
    /// Return the raw generated text for `request`
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ComputeError>;
}

/// Where an explanation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationSource {
    Gemini,
    Fallback,
}

/// Context attached to fallback explanations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationMeta {
    pub disorder_type: String,
    pub risk_level: String,
}

/// Explanation of a prediction for parents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub source: ExplanationSource,
    pub explanation: String,
    pub recommended_steps: Vec<String>,
    pub confidence_note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ExplanationMeta>,
}

/// Fields of a prediction the explainer reads
#[derive(Debug, Clone, PartialEq)]
struct PredictionSummary {
    risk_level: String,
    risk_score: Value,
    confidence: Value,
}

impl PredictionSummary {
    fn from_prediction(prediction: &Value) -> Self {
        let field = |key: &str| prediction.get(key).filter(|v| !v.is_null());

        Self {
            risk_level: field("risk_level")
                .map(value_to_string)
                .unwrap_or_else(|| "Unknown".to_string()),
            risk_score: field("risk_score").cloned().unwrap_or(Value::from(0)),
            confidence: field("confidence").cloned().unwrap_or(Value::from(0)),
        }
    }
}

/// Produces explanations, preferring the generator when one is configured
pub struct Explainer {
    config: ExplainerConfig,
    generator: Option<Box<dyn TextGenerator>>,
}

impl Default for Explainer {
    fn default() -> Self {
        Self::new(ExplainerConfig::default())
    }
}

impl Explainer {
    /// Explainer without a generator; always produces fallback explanations
    pub fn new(config: ExplainerConfig) -> Self {
        Self {
            config,
            generator: None,
        }
    }

    /// Attach a text-generation backend
    pub fn with_generator(mut self, generator: impl TextGenerator + 'static) -> Self {
        self.generator = Some(Box::new(generator));
        self
    }

    pub fn config(&self) -> &ExplainerConfig {
        &self.config
    }

    /// Explain `prediction` for `disorder_type`. Never fails.
    pub fn explain(&self, disorder_type: &str, prediction: &Value, context: &Value) -> Explanation {
        let summary = PredictionSummary::from_prediction(prediction);

        let (Some(api_key), Some(generator)) = (self.config.api_key.as_deref(), &self.generator)
        else {
            tracing::debug!("text generator not configured, using fallback explanation");
            return fallback_for(disorder_type, &summary);
        };

        let prompt = build_prompt(disorder_type, &summary, context);
        let request = GenerationRequest {
            api_key,
            model: &self.config.model,
            prompt: &prompt,
        };

        match generator
            .generate(&request)
            .and_then(|text| parse_generated(&text))
        {
            Ok(explanation) => {
                tracing::info!(model = %self.config.model, "generated explanation");
                explanation
            }
            Err(e) => {
                tracing::warn!(error = %e, "explanation generation failed, using fallback");
                fallback_for(disorder_type, &summary)
            }
        }
    }
}

/// Deterministic local explanation for a prediction
pub fn fallback_explanation(disorder_type: &str, prediction: &Value) -> Explanation {
    fallback_for(disorder_type, &PredictionSummary::from_prediction(prediction))
}

fn fallback_for(disorder_type: &str, summary: &PredictionSummary) -> Explanation {
    let level = RiskLevel::parse(&summary.risk_level).unwrap_or(RiskLevel::Low);

    Explanation {
        source: ExplanationSource::Fallback,
        explanation: fallback_message(level).to_string(),
        recommended_steps: fallback_steps(level).iter().map(|s| s.to_string()).collect(),
        confidence_note: format!(
            "Model confidence: {}. Risk score: {}. This output is for screening, not diagnosis.",
            value_to_string(&summary.confidence),
            value_to_string(&summary.risk_score),
        ),
        meta: Some(ExplanationMeta {
            disorder_type: disorder_type.to_string(),
            risk_level: summary.risk_level.clone(),
        }),
    }
}

fn fallback_message(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::None => "Current assessment signals do not show clear risk indicators. Continue normal support and periodic monitoring.",
        RiskLevel::Low => "The assessment shows mild indicators that should be watched. This is not a diagnosis, but early support can help.",
        RiskLevel::Medium => "The assessment shows notable indicators. A professional screening is recommended to confirm learning needs.",
        RiskLevel::High => "The assessment shows strong indicators. Please schedule a specialist evaluation soon for a full support plan.",
    }
}

fn fallback_steps(level: RiskLevel) -> [&'static str; 4] {
    match level {
        RiskLevel::None => [
            "Continue current learning routine.",
            "Track progress every few weeks.",
            "Maintain practice in foundational skills.",
            "Repeat assessment in the next term.",
        ],
        RiskLevel::Low => [
            "Start targeted daily practice at home or school.",
            "Track weekly trends in speed and accuracy.",
            "Inform teachers to add light accommodations.",
            "Reassess in 4 to 6 weeks.",
        ],
        RiskLevel::Medium => [
            "Book a specialist screening.",
            "Begin structured intervention sessions.",
            "Apply classroom accommodations consistently.",
            "Review progress every 2 to 4 weeks.",
        ],
        RiskLevel::High => [
            "Schedule comprehensive specialist evaluation immediately.",
            "Initiate formal school support procedures.",
            "Use intensive structured interventions.",
            "Hold frequent teacher-parent progress reviews.",
        ],
    }
}

fn build_prompt(disorder_type: &str, summary: &PredictionSummary, context: &Value) -> String {
    let context_json = match context {
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    };

    format!(
        "Return ONLY valid JSON (no markdown) with keys:\n\
         - explanation: string, 2 to 4 short parent-friendly sentences\n\
         - recommended_steps: string array with exactly 4 practical steps\n\
         - confidence_note: one sentence clarifying this is a screening output\n\
         \n\
         Context:\n\
         disorder_type={disorder_type}\n\
         risk_level={}\n\
         risk_score={}\n\
         confidence={}\n\
         student_context={context_json}\n",
        summary.risk_level,
        value_to_string(&summary.risk_score),
        value_to_string(&summary.confidence),
    )
}

/// Parse generator output into an explanation
fn parse_generated(text: &str) -> Result<Explanation, ComputeError> {
    let parsed: Value = serde_json::from_str(&strip_code_fences(text))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| ComputeError::InvalidResponse("expected a JSON object".to_string()))?;

    let text_field = |key: &str| {
        object
            .get(key)
            .filter(|v| !v.is_null())
            .map(value_to_string)
            .unwrap_or_default()
    };

    let recommended_steps = object
        .get("recommended_steps")
        .and_then(Value::as_array)
        .map(|steps| steps.iter().map(value_to_string).collect())
        .unwrap_or_default();

    Ok(Explanation {
        source: ExplanationSource::Gemini,
        explanation: text_field("explanation"),
        recommended_steps,
        confidence_note: text_field("confidence_note"),
        meta: None,
    })
}

/// Remove Markdown code fences (and a language tag line) around generated text
pub fn strip_code_fences(text: &str) -> String {
    let mut stripped = text.trim();
    if stripped.starts_with("```") {
        stripped = stripped.trim_matches('`');
        if let Some((_, rest)) = stripped.split_once('\n') {
            stripped = rest;
        }
    }
    if let Some(rest) = stripped.strip_suffix("```") {
        stripped = rest;
    }
    stripped.trim().to_string()
}
