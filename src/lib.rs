//! # edgequake-loan-eval
//!
//! Turn a financial document into a three-insight loan decision.
//!
//! A document URL goes in; a strict four-field JSON decision comes out:
//!
//! ```json
//! {"stance": true, "insight_1": "…", "insight_2": "…", "insight_3": "…"}
//! ```
//!
//! ## Pipeline Overview
//!
//! ```text
//! file URL
//!  │
//!  ├─ 1. Fetch      download the document bytes (one attempt)
//!  ├─ 2. Layout     multipart upload to the layout-analysis service
//!  ├─ 3. Aggregate  one text blob per billed page, tables as markup
//!  ├─ 4. Summarize  one model call per non-empty page, page order
//!  ├─ 5. Assemble   concatenate summaries into the evaluation context
//!  └─ 6. Decide     chat or adapter backend, strict JSON validation
//! ```
//!
//! Every failure carries the [`PipelineStage`] it happened in. Nothing is
//! retried and no partial decision is ever returned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_loan_eval::{evaluate, EvaluatorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // UPSTAGE_API_KEY plus an LLM provider key, read from the environment / .env
//!     let config = EvaluatorConfig::from_env()?;
//!     let evaluation = evaluate("https://example.com/statement.pdf", &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&evaluation.decision)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | `POST /evaluate-loan` HTTP surface (axum) |
//! | `cli`    | on      | The `loan-eval` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Library-only users can opt out:
//! ```toml
//! edgequake-loan-eval = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod evaluate;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AdapterSettings, DecisionBackend, EvaluatorConfig, EvaluatorConfigBuilder};
pub use error::{EvaluationError, PipelineStage};
pub use evaluate::{evaluate, evaluate_sync, Evaluation, EvaluationStats, LoanEvaluator};
pub use pipeline::aggregate::PageContent;
pub use pipeline::decision::{parse_decision, LoanDecision};
pub use pipeline::generator::{AdapterDecisionGenerator, ChatDecisionGenerator, DecisionGenerator};
pub use pipeline::layout::{
    ElementCategory, LayoutAnalysis, LayoutElement, LayoutExtractor, UpstageLayoutClient,
};
pub use pipeline::summarize::{LlmSummarizer, PageSummary, Summarizer};
pub use progress::{EvaluationProgressCallback, NoopProgressCallback, ProgressCallback};
