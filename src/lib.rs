//! SwarSetu Flux - normalization engine for learning-screening game telemetry
//!
//! Flux turns loosely structured, per-game interaction logs into a canonical,
//! strongly shaped session for the disorder-specific scoring models through a
//! deterministic pipeline: container extraction → per-task derivation → task
//! adaptation → session building.
//!
//! ## Modules
//!
//! - **Normalization core** (`coerce`, `extract`, `derive`, `adapter`, `session`):
//!   total over arbitrary JSON input, never fails.
//! - **Assessment pipeline** (`scoring`, `explainer`, `pipeline`): dispatches the
//!   session to a scoring backend and explains the result for parents.

pub mod adapter;
pub mod coerce;
pub mod derive;
pub mod error;
pub mod explainer;
pub mod extract;
pub mod pipeline;
pub mod scoring;
pub mod session;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use adapter::TaskAdapter;
pub use error::ComputeError;
pub use explainer::{Explainer, ExplainerConfig, Explanation, ExplanationSource, TextGenerator};
pub use pipeline::{AssessmentOutcome, AssessmentPipeline, ScoreContext};
pub use scoring::{Disorder, Prediction, RiskLevel, RiskPredictor};
pub use session::build_session;
pub use types::{CanonicalSession, CanonicalTaskRecord, StrokeMetrics};

/// Flux version
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "swarsetu-flux";
