//! Error types for SwarSetu Flux
//!
//! Session normalization itself never fails; these errors only surface at the
//! orchestration boundary and inside collaborators.

use thiserror::Error;

/// Errors that can occur around the normalization core
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported disorder_type: {0}")]
    UnsupportedDisorder(String),

    #[error("Prediction failed: {0}")]
    PredictionError(String),

    #[error("Text generation failed: {0}")]
    GenerationError(String),

    #[error("Invalid generator response: {0}")]
    InvalidResponse(String),
}
