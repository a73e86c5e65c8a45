//! Pipeline orchestration
//!
//! End-to-end assessment flow used by the request layer:
//! payload → canonical session → disorder-specific scoring → explanation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ComputeError;
use crate::explainer::{Explainer, Explanation};
use crate::scoring::{Disorder, Prediction, RiskPredictor};
use crate::session::{build_session, resolve_disorder};
use crate::types::CanonicalSession;

/// Score context reported by the client alongside the payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreContext {
    pub score: Option<Value>,
    pub percentage: Option<Value>,
}

impl ScoreContext {
    /// Read `score` and `percentage` from a request body
    pub fn from_payload(payload: &Value) -> Self {
        let field = |key: &str| payload.get(key).filter(|v| !v.is_null()).cloned();
        Self {
            score: field("score"),
            percentage: field("percentage"),
        }
    }
}

/// Result of one assessment run
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentOutcome {
    pub disorder: Disorder,
    pub prediction: Prediction,
    #[serde(rename = "ai_explanation")]
    pub explanation: Explanation,
    pub session_data: CanonicalSession,
    pub computed_at: DateTime<Utc>,
}

/// Runs the assessment flow against a scoring backend and an explainer.
pub struct AssessmentPipeline<P> {
    predictor: P,
    explainer: Explainer,
}

impl<P: RiskPredictor> AssessmentPipeline<P> {
    pub fn new(predictor: P, explainer: Explainer) -> Self {
        Self {
            predictor,
            explainer,
        }
    }

    /// Run the full assessment.
    ///
    /// # Arguments
    /// * `payload` - Request body, any shape
    /// * `disorder_type` - Explicit category; falls back to `payload["disorder_type"]`
    /// * `context` - Client-reported score/percentage forwarded to the explainer
    ///
    /// # Errors
    /// `UnsupportedDisorder` when the category is not one of the three models, or
    /// whatever the predictor returns. Explanation failures never surface.
    pub fn run(
        &self,
        payload: &Value,
        disorder_type: Option<&str>,
        context: &ScoreContext,
    ) -> Result<AssessmentOutcome, ComputeError> {
        let disorder_key = resolve_disorder(payload, disorder_type);
        let disorder: Disorder = disorder_key.parse().map_err(|_| {
            ComputeError::UnsupportedDisorder(disorder_type.unwrap_or(disorder_key.as_str()).to_string())
        })?;

        let session = build_session(payload, Some(disorder.as_str()));
        let prediction = self.predictor.predict(disorder, &session)?;

        let student_context = json!({
            "score": context.score,
            "percentage": context.percentage,
            "student_id": payload.get("student_id"),
            "assessment_id": payload.get("assessment_id"),
        });
        let explanation = self
            .explainer
            .explain(disorder.as_str(), &prediction, &student_context);

        tracing::info!(
            disorder = %disorder,
            tasks = session.len(),
            explanation_source = ?explanation.source,
            "assessment complete"
        );

        Ok(AssessmentOutcome {
            disorder,
            prediction,
            explanation,
            session_data: session,
            computed_at: Utc::now(),
        })
    }
}
