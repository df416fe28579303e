//! Evaluation entry points.
//!
//! [`LoanEvaluator`] owns the three network seams (layout, summarizer,
//! decision backend) and runs one document through the pipeline per call.
//! It holds no per-request state, so one evaluator can serve many
//! concurrent requests; each call owns its bytes, elements and context.

use crate::config::{EvaluatorConfig, DEFAULT_CHAT_MODEL};
use crate::error::{EvaluationError, PipelineStage};
use crate::pipeline::aggregate::aggregate_pages;
use crate::pipeline::context::assemble_context;
use crate::pipeline::decision::LoanDecision;
use crate::pipeline::fetch::fetch_document;
use crate::pipeline::generator::{decision_generator, DecisionGenerator};
use crate::pipeline::layout::{LayoutExtractor, UpstageLayoutClient};
use crate::pipeline::summarize::{summarize_pages, LlmSummarizer, PageSummary, Summarizer};
use edgequake_llm::{LLMProvider, ProviderFactory};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything an evaluation produced.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub decision: LoanDecision,
    /// The assembled context the decision was made from.
    pub context: String,
    /// Per-page summaries in page order.
    pub summaries: Vec<PageSummary>,
    pub stats: EvaluationStats,
}

/// Counters and timings for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationStats {
    pub billed_pages: usize,
    /// Pages sent to the summarizer.
    pub summarized_pages: usize,
    /// Summaries that came back (or were skipped) empty.
    pub empty_pages: usize,
    pub context_chars: usize,
    pub total_duration_ms: u64,
    pub fetch_duration_ms: u64,
    pub layout_duration_ms: u64,
    pub summary_duration_ms: u64,
    pub decision_duration_ms: u64,
}

/// Runs documents through the evaluation pipeline.
pub struct LoanEvaluator {
    layout: Arc<dyn LayoutExtractor>,
    summarizer: Arc<dyn Summarizer>,
    decider: Arc<dyn DecisionGenerator>,
    config: EvaluatorConfig,
}

impl LoanEvaluator {
    /// Assemble an evaluator from explicit components.
    pub fn new(
        config: EvaluatorConfig,
        layout: Arc<dyn LayoutExtractor>,
        summarizer: Arc<dyn Summarizer>,
        decider: Arc<dyn DecisionGenerator>,
    ) -> Self {
        Self {
            layout,
            summarizer,
            decider,
            config,
        }
    }

    /// Build the production components described by `config`.
    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, EvaluationError> {
        let provider = resolve_provider(config)?;
        info!(
            "Evaluator ready: provider={}, model={}, backend={:?}",
            provider.name(),
            provider.model(),
            config.decision_backend
        );
        let layout = Arc::new(UpstageLayoutClient::from_config(config)?);
        let summarizer = Arc::new(LlmSummarizer::new(Arc::clone(&provider), config));
        let decider = decision_generator(config, Some(provider))?;
        Ok(Self::new(config.clone(), layout, summarizer, decider))
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate the document at `file_url`.
    ///
    /// # Errors
    /// The first failing stage's error; see [`EvaluationError::stage`].
    /// Nothing is retried and no partial decision is returned.
    pub async fn evaluate(&self, file_url: &str) -> Result<Evaluation, EvaluationError> {
        info!("Starting evaluation: {}", file_url);
        let result = self.run(file_url).await;

        let progress = self.config.progress_callback.as_ref();
        match &result {
            Ok(evaluation) => {
                info!(
                    "Evaluation complete: stance={}, {} pages, {}ms",
                    evaluation.decision.stance,
                    evaluation.stats.billed_pages,
                    evaluation.stats.total_duration_ms
                );
                if let Some(cb) = progress {
                    cb.on_stage(PipelineStage::Done);
                    cb.on_evaluation_complete(evaluation.decision.stance);
                }
            }
            Err(e) => {
                warn!("Evaluation failed at {}: {}", e.stage(), e);
                if let Some(cb) = progress {
                    cb.on_evaluation_failed(e.stage(), &e.to_string());
                }
            }
        }
        result
    }

    async fn run(&self, file_url: &str) -> Result<Evaluation, EvaluationError> {
        let total_start = Instant::now();
        let progress = self.config.progress_callback.as_ref();
        let stage = |s: PipelineStage| {
            if let Some(cb) = progress {
                cb.on_stage(s);
            }
        };
        let mut stats = EvaluationStats::default();

        // ── Step 1: Fetch ────────────────────────────────────────────────
        stage(PipelineStage::Fetching);
        let start = Instant::now();
        let document = fetch_document(file_url, self.config.download_timeout_secs).await?;
        stats.fetch_duration_ms = start.elapsed().as_millis() as u64;

        // ── Step 2: Layout analysis ──────────────────────────────────────
        stage(PipelineStage::ExtractingLayout);
        let start = Instant::now();
        let analysis = self.layout.extract(document).await?;
        stats.layout_duration_ms = start.elapsed().as_millis() as u64;
        stats.billed_pages = analysis.billed_pages;
        info!(
            "Layout: {} billed pages, {} elements",
            analysis.billed_pages,
            analysis.elements.len()
        );
        if let Some(cb) = progress {
            cb.on_pages_known(analysis.billed_pages);
        }

        // ── Step 3: Aggregate + summarize ────────────────────────────────
        let pages = aggregate_pages(&analysis.elements, analysis.billed_pages);
        drop(analysis);
        stats.summarized_pages = pages.iter().filter(|p| !p.is_empty()).count();

        let start = Instant::now();
        let summaries = summarize_pages(
            self.summarizer.as_ref(),
            &pages,
            self.config.summary_concurrency,
            progress,
        )
        .await?;
        stats.summary_duration_ms = start.elapsed().as_millis() as u64;
        stats.empty_pages = summaries.iter().filter(|s| s.text.is_empty()).count();

        // ── Step 4: Assemble ─────────────────────────────────────────────
        stage(PipelineStage::Assembling);
        let context = assemble_context(&summaries);
        stats.context_chars = context.chars().count();
        if context.is_empty() {
            // The decision call is still made for an empty context.
            warn!("Evaluation context is empty; requesting a decision anyway");
        }
        debug!("Context: {} chars from {} pages", stats.context_chars, summaries.len());

        // ── Step 5: Decide ───────────────────────────────────────────────
        stage(PipelineStage::Deciding);
        let start = Instant::now();
        let decision = self.decider.generate(&context).await?;
        stats.decision_duration_ms = start.elapsed().as_millis() as u64;
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

        Ok(Evaluation {
            decision,
            context,
            summaries,
            stats,
        })
    }
}

/// Evaluate the document at `file_url` with components built from `config`.
pub async fn evaluate(
    file_url: impl AsRef<str>,
    config: &EvaluatorConfig,
) -> Result<Evaluation, EvaluationError> {
    LoanEvaluator::from_config(config)?
        .evaluate(file_url.as_ref())
        .await
}

/// Synchronous wrapper around [`evaluate`].
///
/// Creates a temporary tokio runtime internally.
pub fn evaluate_sync(
    file_url: impl AsRef<str>,
    config: &EvaluatorConfig,
) -> Result<Evaluation, EvaluationError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| EvaluationError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(evaluate(file_url, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn create_chat_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, EvaluationError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        EvaluationError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the chat provider, from most-specific to least-specific:
///
/// 1. `config.provider`: constructed by the caller, used as-is
/// 2. `config.provider_name` + `config.chat_model` (default [`DEFAULT_CHAT_MODEL`])
/// 3. `ProviderFactory::from_env()` auto-detection. A `config.chat_model` the
///    detected provider is not running rebuilds it with that model.
fn resolve_provider(config: &EvaluatorConfig) -> Result<Arc<dyn LLMProvider>, EvaluationError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.chat_model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL);
        return create_chat_provider(name, model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| EvaluationError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set EDGEQUAKE_LLM_PROVIDER and EDGEQUAKE_MODEL, or an API key the provider factory recognises.\n\
                Error: {}",
                e
            ),
        })?;

    if let Some(model) = model_override(config, llm_provider.as_ref()) {
        info!(
            "Auto-detected provider '{}' runs '{}'; switching to '{}'",
            llm_provider.name(),
            llm_provider.model(),
            model
        );
        return create_chat_provider(llm_provider.name(), model);
    }

    Ok(llm_provider)
}

/// The requested model, when `detected` is not already running it.
fn model_override<'a>(config: &'a EvaluatorConfig, detected: &dyn LLMProvider) -> Option<&'a str> {
    config
        .chat_model
        .as_deref()
        .filter(|model| *model != detected.model())
}
