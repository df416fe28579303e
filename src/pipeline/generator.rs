//! Decision generation: two interchangeable backends behind one trait.
//!
//! * [`ChatDecisionGenerator`] — chat completion (system + user message)
//!   through an [`LLMProvider`].
//! * [`AdapterDecisionGenerator`] — raw generation against a deployed
//!   fine-tuned adapter; the reply's `generated_text` field is itself the
//!   decision JSON.
//!
//! The chat backend sends [`crate::prompts::DECISION_SYSTEM_PROMPT`]; the
//! adapter gets the single-string layout it was fine-tuned on
//! ([`crate::prompts::adapter_prompt`]). Both run the answer through
//! [`parse_decision`]. The backend is chosen once from
//! [`crate::config::EvaluatorConfig::decision_backend`].

use crate::config::{AdapterSettings, EvaluatorConfig};
use crate::error::EvaluationError;
use crate::pipeline::decision::{parse_decision, LoanDecision};
use crate::prompts::{adapter_prompt, decision_user_message, DECISION_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Produces a validated decision from the evaluation context.
#[async_trait]
pub trait DecisionGenerator: Send + Sync {
    async fn generate(&self, context: &str) -> Result<LoanDecision, EvaluationError>;
}

// ── Chat backend ─────────────────────────────────────────────────────────

/// [`DecisionGenerator`] backed by a chat-completion provider.
pub struct ChatDecisionGenerator {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl ChatDecisionGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &EvaluatorConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }
}

#[async_trait]
impl DecisionGenerator for ChatDecisionGenerator {
    async fn generate(&self, context: &str) -> Result<LoanDecision, EvaluationError> {
        let messages = vec![
            ChatMessage::system(DECISION_SYSTEM_PROMPT),
            ChatMessage::user(decision_user_message(context)),
        ];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = timeout(self.timeout, self.provider.chat(&messages, Some(&options)))
            .await
            .map_err(|_| EvaluationError::Decision {
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| EvaluationError::Decision {
                reason: e.to_string(),
            })?;

        debug!(
            "Decision: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        parse_decision(&response.content)
    }
}

// ── Adapter backend ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: String,
    parameters: GenerateParameters<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateParameters<'a> {
    adapter_id: &'a str,
    adapter_source: &'a str,
    temperature: f32,
    max_new_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    generated_text: String,
}

/// [`DecisionGenerator`] that calls a deployed adapter's generate endpoint.
#[derive(Debug, Clone)]
pub struct AdapterDecisionGenerator {
    client: reqwest::Client,
    settings: AdapterSettings,
    url: String,
}

impl AdapterDecisionGenerator {
    pub fn new(settings: AdapterSettings, timeout_secs: u64) -> Result<Self, EvaluationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EvaluationError::Internal(format!("HTTP client: {e}")))?;
        let url = settings.generate_url();
        Ok(Self {
            client,
            settings,
            url,
        })
    }

    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, EvaluationError> {
        Self::new(config.adapter.clone(), config.api_timeout_secs)
    }
}

#[async_trait]
impl DecisionGenerator for AdapterDecisionGenerator {
    async fn generate(&self, context: &str) -> Result<LoanDecision, EvaluationError> {
        let request = GenerateRequest {
            inputs: adapter_prompt(context),
            parameters: GenerateParameters {
                adapter_id: &self.settings.adapter_id,
                adapter_source: &self.settings.adapter_source,
                temperature: self.settings.temperature,
                max_new_tokens: self.settings.max_new_tokens,
            },
        };

        debug!(
            "Requesting decision from adapter '{}' at {}",
            self.settings.adapter_id, self.url
        );
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EvaluationError::Decision {
                reason: if e.is_timeout() {
                    format!("request timed out: {e}")
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EvaluationError::Decision {
                reason: format!("HTTP {status}"),
            });
        }

        let body = response.text().await.map_err(|e| EvaluationError::Decision {
            reason: e.to_string(),
        })?;
        // The envelope is service-controlled; only `generated_text` is model output.
        let envelope: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| EvaluationError::Decision {
                reason: format!("unexpected response envelope: {e}"),
            })?;
        parse_decision(&envelope.generated_text)
    }
}

/// Construct the configured backend.
pub fn decision_generator(
    config: &EvaluatorConfig,
    provider: Option<Arc<dyn LLMProvider>>,
) -> Result<Arc<dyn DecisionGenerator>, EvaluationError> {
    use crate::config::DecisionBackend;

    match config.decision_backend {
        DecisionBackend::Adapter => Ok(Arc::new(AdapterDecisionGenerator::from_config(config)?)),
        DecisionBackend::Chat => {
            let provider = provider.ok_or_else(|| EvaluationError::ProviderNotConfigured {
                provider: config
                    .provider_name
                    .clone()
                    .unwrap_or_else(|| "auto".to_string()),
                hint: "The chat decision backend needs an LLM provider.".into(),
            })?;
            Ok(Arc::new(ChatDecisionGenerator::new(provider, config)))
        }
    }
}
