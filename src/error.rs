//! Error types for the edgequake-loan-eval library.
//!
//! An evaluation either produces a complete [`crate::pipeline::decision::LoanDecision`]
//! or fails as a whole: there is no partial result and no retry at any stage.
//! [`EvaluationError`] is therefore the only error type, and every variant
//! knows the [`PipelineStage`] it aborts at via [`EvaluationError::stage`].
//!
//! Three decision-stage variants are kept apart on purpose:
//!
//! * [`EvaluationError::Decision`] — the model service could not be reached
//!   or answered with a failure status.
//! * [`EvaluationError::DecisionParse`] — the service answered, but the text
//!   is not JSON.
//! * [`EvaluationError::DecisionValidation`] — the text is JSON, but not the
//!   four-field decision object.

use std::fmt;
use thiserror::Error;

/// Where an evaluation is, or where it stopped.
///
/// ```text
/// Fetching → ExtractingLayout → Summarizing(0..n) → Assembling → Deciding → Done
///     └──────────────┴──────────────┴──────────────┴────────────┴─────→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Fetching,
    ExtractingLayout,
    /// Summarizing the page with this zero-based index.
    Summarizing(usize),
    Assembling,
    Deciding,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Fetching => write!(f, "FETCHING"),
            PipelineStage::ExtractingLayout => write!(f, "EXTRACTING_LAYOUT"),
            PipelineStage::Summarizing(page) => write!(f, "SUMMARIZING(page {page})"),
            PipelineStage::Assembling => write!(f, "ASSEMBLING"),
            PipelineStage::Deciding => write!(f, "DECIDING"),
            PipelineStage::Done => write!(f, "DONE"),
        }
    }
}

/// All fatal errors returned by the edgequake-loan-eval library.
#[derive(Debug, Error)]
pub enum EvaluationError {
    // ── Fetch errors ──────────────────────────────────────────────────────
    /// The document reference is not an HTTP/HTTPS URL.
    #[error("Invalid document reference '{input}': not a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// The document could not be downloaded, or the remote answered non-2xx.
    #[error("Failed to fetch document '{url}': {reason}")]
    Fetch { url: String, reason: String },

    /// The download exceeded the configured timeout.
    #[error("Fetching '{url}' timed out after {secs}s")]
    FetchTimeout { url: String, secs: u64 },

    // ── Layout errors ─────────────────────────────────────────────────────
    /// The layout-analysis service was unreachable, timed out or answered non-2xx.
    #[error("Layout analysis failed: {reason}")]
    Extraction { reason: String },

    /// The layout-analysis response could not be interpreted.
    #[error("Layout analysis returned an unusable response: {detail}")]
    MalformedLayout { detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The summarization call for a page failed.
    #[error("Summarization failed for page {page}: {reason}")]
    Summary { page: usize, reason: String },

    /// The decision call failed at the transport or service level.
    #[error("Decision request failed: {reason}")]
    Decision { reason: String },

    /// The decision service answered with text that is not valid JSON.
    #[error("Decision response is not valid JSON: {reason}")]
    DecisionParse { reason: String, raw: String },

    /// The decision JSON does not have the required four-field shape.
    #[error("Decision response has the wrong shape: {reason}")]
    DecisionValidation { reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// No usable chat-completion provider could be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EvaluationError {
    /// The pipeline stage this error terminates the evaluation at.
    ///
    /// Configuration errors happen before any document is touched and are
    /// reported as [`PipelineStage::Fetching`].
    pub fn stage(&self) -> PipelineStage {
        match self {
            EvaluationError::InvalidInput { .. }
            | EvaluationError::Fetch { .. }
            | EvaluationError::FetchTimeout { .. }
            | EvaluationError::ProviderNotConfigured { .. }
            | EvaluationError::InvalidConfig(_)
            | EvaluationError::Internal(_) => PipelineStage::Fetching,
            EvaluationError::Extraction { .. } | EvaluationError::MalformedLayout { .. } => {
                PipelineStage::ExtractingLayout
            }
            EvaluationError::Summary { page, .. } => PipelineStage::Summarizing(*page),
            EvaluationError::Decision { .. }
            | EvaluationError::DecisionParse { .. }
            | EvaluationError::DecisionValidation { .. } => PipelineStage::Deciding,
        }
    }

    /// True for the three decision-stage failures.
    pub fn is_decision_error(&self) -> bool {
        self.stage() == PipelineStage::Deciding
    }
}
