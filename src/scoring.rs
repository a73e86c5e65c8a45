//! Scoring collaborator seam
//!
//! The statistical models live outside this crate. They receive the canonical
//! session and return an opaque prediction mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ComputeError;
use crate::types::CanonicalSession;

/// Opaque prediction returned by a scoring model
pub type Prediction = Value;

/// Learning disorder a session is screened for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disorder {
    Dyslexia,
    Dyscalculia,
    Dysgraphia,
}

impl Disorder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disorder::Dyslexia => "dyslexia",
            Disorder::Dyscalculia => "dyscalculia",
            Disorder::Dysgraphia => "dysgraphia",
        }
    }
}

impl fmt::Display for Disorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disorder {
    type Err = ComputeError;

    /// Case-insensitive, ignoring surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dyslexia" => Ok(Disorder::Dyslexia),
            "dyscalculia" => Ok(Disorder::Dyscalculia),
            "dysgraphia" => Ok(Disorder::Dysgraphia),
            _ => Err(ComputeError::UnsupportedDisorder(s.to_string())),
        }
    }
}

/// Disorder-specific scoring models
pub trait RiskPredictor {
    fn predict_dyslexia(&self, session: &CanonicalSession) -> Result<Prediction, ComputeError>;

    fn predict_dyscalculia(&self, session: &CanonicalSession) -> Result<Prediction, ComputeError>;

    fn predict_dysgraphia(&self, session: &CanonicalSession) -> Result<Prediction, ComputeError>;

    /// Dispatch to the model for `disorder`
    fn predict(
        &self,
        disorder: Disorder,
        session: &CanonicalSession,
    ) -> Result<Prediction, ComputeError> {
        match disorder {
            Disorder::Dyslexia => self.predict_dyslexia(session),
            Disorder::Dyscalculia => self.predict_dyscalculia(session),
            Disorder::Dysgraphia => self.predict_dysgraphia(session),
        }
    }
}

/// Risk vocabulary shared by the models and the explanation fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Exact match on the model's label; anything else is not a known level
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "None" => Some(RiskLevel::None),
            "Low" => Some(RiskLevel::Low),
            "Medium" => Some(RiskLevel::Medium),
            "High" => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "None",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}
