//! Configuration types for loan evaluation.
//!
//! Every credential, endpoint and knob lives in [`EvaluatorConfig`], built
//! once at process entry (via [`EvaluatorConfig::builder()`] or
//! [`EvaluatorConfig::from_env()`]) and then passed by reference into each
//! pipeline component. Nothing here is mutated after the evaluator starts.

use crate::error::EvaluationError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default layout-analysis endpoint.
pub const DEFAULT_LAYOUT_URL: &str = "https://api.upstage.ai/v1/document-ai/layout-analysis";

/// Default chat model used for page summaries and the chat decision backend.
pub const DEFAULT_CHAT_MODEL: &str = "solar-1-mini-chat";

/// Default base model the fine-tuned adapter is layered on.
pub const DEFAULT_BASE_MODEL: &str = "solar-1-mini-chat-240612";

/// Default serving host for adapter deployments.
pub const DEFAULT_SERVING_URL: &str = "https://serving.app.predibase.com";

/// Configuration for a loan evaluation.
///
/// # Example
/// ```rust
/// use edgequake_loan_eval::{DecisionBackend, EvaluatorConfig};
///
/// let config = EvaluatorConfig::builder()
///     .layout_api_key("up-test")
///     .decision_backend(DecisionBackend::Chat)
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.summary_concurrency, 1);
/// ```
#[derive(Clone)]
pub struct EvaluatorConfig {
    /// Bearer credential for the layout-analysis service.
    pub layout_api_key: String,

    /// Layout-analysis endpoint. Default: [`DEFAULT_LAYOUT_URL`].
    pub layout_url: String,

    /// Chat model identifier for summaries (and the chat decision backend).
    ///
    /// `None` means [`DEFAULT_CHAT_MODEL`] for a named provider and the
    /// provider's own default when it is auto-detected.
    pub chat_model: Option<String>,

    /// LLM provider name (e.g. "openai", "openai-compatible", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for chat completions. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens per chat completion. Default: 1024.
    ///
    /// Summaries are capped at ~200 words by the prompt, and the decision
    /// object is four short fields, so this is a ceiling rather than a budget.
    pub max_tokens: usize,

    /// Which service produces the final decision. Default: [`DecisionBackend::Chat`].
    pub decision_backend: DecisionBackend,

    /// Settings for [`DecisionBackend::Adapter`].
    pub adapter: AdapterSettings,

    /// Pages summarized at once. Default: 1 (strictly sequential).
    ///
    /// Values above 1 overlap summary calls; the assembled context is still
    /// in page order.
    pub summary_concurrency: usize,

    /// Document download timeout in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Layout-analysis request timeout in seconds. Default: 180.
    pub layout_timeout_secs: u64,

    /// Per model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Optional stage/page progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            layout_api_key: String::new(),
            layout_url: DEFAULT_LAYOUT_URL.to_string(),
            chat_model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 1024,
            decision_backend: DecisionBackend::default(),
            adapter: AdapterSettings::default(),
            summary_concurrency: 1,
            download_timeout_secs: 120,
            layout_timeout_secs: 180,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for EvaluatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorConfig")
            .field("layout_api_key", &redact(&self.layout_api_key))
            .field("layout_url", &self.layout_url)
            .field("chat_model", &self.chat_model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("decision_backend", &self.decision_backend)
            .field("adapter", &self.adapter)
            .field("summary_concurrency", &self.summary_concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("layout_timeout_secs", &self.layout_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl EvaluatorConfig {
    /// Create a new builder for `EvaluatorConfig`.
    pub fn builder() -> EvaluatorConfigBuilder {
        EvaluatorConfigBuilder {
            config: Self::default(),
            invalid_backend: None,
        }
    }

    /// Load a `.env` file (if present) and build from the process environment.
    pub fn from_env() -> Result<Self, EvaluationError> {
        Self::builder_from_env().build()
    }

    /// Like [`EvaluatorConfig::from_env`] but returns the builder so callers
    /// (the CLI) can layer overrides before validating.
    pub fn builder_from_env() -> EvaluatorConfigBuilder {
        // A missing .env is the normal case in containers.
        let _ = dotenvy::dotenv();
        EvaluatorConfigBuilder::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Builder for [`EvaluatorConfig`].
#[derive(Debug)]
pub struct EvaluatorConfigBuilder {
    config: EvaluatorConfig,
    invalid_backend: Option<String>,
}

impl EvaluatorConfigBuilder {
    /// Populate a builder from a key lookup (the environment, in production).
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `UPSTAGE_API_KEY` | `layout_api_key` |
    /// | `LAYOUT_API_URL` | `layout_url` |
    /// | `EDGEQUAKE_LLM_PROVIDER` | `provider_name` |
    /// | `EDGEQUAKE_MODEL` | `chat_model` |
    /// | `LOAN_EVAL_BACKEND` | `decision_backend` (`chat` / `adapter`) |
    /// | `PB_API_KEY` | `adapter.api_key` |
    /// | `TENANT_ID` | `adapter.tenant_id` |
    /// | `BASE_MODEL` | `adapter.base_model` |
    /// | `ADAPTER_ID` | `adapter.adapter_id` |
    ///
    /// Empty values count as unset. An unparseable `LOAN_EVAL_BACKEND` is
    /// kept so [`EvaluatorConfigBuilder::build`] can report it.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = EvaluatorConfig::builder();

        if let Some(v) = get("UPSTAGE_API_KEY") {
            builder = builder.layout_api_key(v);
        }
        if let Some(v) = get("LAYOUT_API_URL") {
            builder = builder.layout_url(v);
        }
        if let Some(v) = get("EDGEQUAKE_LLM_PROVIDER") {
            builder = builder.provider_name(v);
        }
        if let Some(v) = get("EDGEQUAKE_MODEL") {
            builder = builder.chat_model(v);
        }
        if let Some(v) = get("LOAN_EVAL_BACKEND") {
            match v.parse::<DecisionBackend>() {
                Ok(backend) => builder = builder.decision_backend(backend),
                Err(_) => builder.invalid_backend = Some(v),
            }
        }
        if let Some(v) = get("PB_API_KEY") {
            builder.config.adapter.api_key = v;
        }
        if let Some(v) = get("TENANT_ID") {
            builder.config.adapter.tenant_id = v;
        }
        if let Some(v) = get("BASE_MODEL") {
            builder.config.adapter.base_model = v;
        }
        if let Some(v) = get("ADAPTER_ID") {
            builder.config.adapter.adapter_id = v;
        }
        builder
    }

    pub fn layout_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.layout_api_key = key.into();
        self
    }

    pub fn layout_url(mut self, url: impl Into<String>) -> Self {
        self.config.layout_url = url.into();
        self
    }

    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.config.chat_model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn decision_backend(mut self, backend: DecisionBackend) -> Self {
        self.config.decision_backend = backend;
        self
    }

    pub fn adapter(mut self, adapter: AdapterSettings) -> Self {
        self.config.adapter = adapter;
        self
    }

    pub fn summary_concurrency(mut self, n: usize) -> Self {
        self.config.summary_concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn layout_timeout_secs(mut self, secs: u64) -> Self {
        self.config.layout_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EvaluatorConfig, EvaluationError> {
        if let Some(raw) = self.invalid_backend {
            return Err(EvaluationError::InvalidConfig(format!(
                "unknown decision backend '{raw}' (expected 'chat' or 'adapter')"
            )));
        }

        let c = &self.config;
        if c.layout_api_key.trim().is_empty() {
            return Err(EvaluationError::InvalidConfig(
                "layout-analysis API key is required (UPSTAGE_API_KEY)".into(),
            ));
        }
        if !is_http_url(&c.layout_url) {
            return Err(EvaluationError::InvalidConfig(format!(
                "layout URL must be http(s), got '{}'",
                c.layout_url
            )));
        }
        if c.summary_concurrency == 0 {
            return Err(EvaluationError::InvalidConfig(
                "summary concurrency must be ≥ 1".into(),
            ));
        }
        for (name, secs) in [
            ("download", c.download_timeout_secs),
            ("layout", c.layout_timeout_secs),
            ("api", c.api_timeout_secs),
        ] {
            if secs == 0 {
                return Err(EvaluationError::InvalidConfig(format!(
                    "{name} timeout must be ≥ 1s"
                )));
            }
        }
        if c.decision_backend == DecisionBackend::Adapter {
            c.adapter.validate()?;
        }
        Ok(self.config)
    }
}

// ── Decision backend ─────────────────────────────────────────────────────

/// Service that turns the evaluation context into a decision.
///
/// Both backends share one prompt contract and one output parser; the choice
/// is made once, here, rather than per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecisionBackend {
    /// Chat completion through the configured LLM provider. (default)
    #[default]
    Chat,
    /// Raw generation against a deployed fine-tuned adapter.
    Adapter,
}

impl FromStr for DecisionBackend {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(DecisionBackend::Chat),
            "adapter" => Ok(DecisionBackend::Adapter),
            other => Err(EvaluationError::InvalidConfig(format!(
                "unknown decision backend '{other}'"
            ))),
        }
    }
}

/// Connection and sampling settings for the adapter decision backend.
#[derive(Clone)]
pub struct AdapterSettings {
    /// Bearer credential for the serving endpoint.
    pub api_key: String,
    /// Tenant identifier; part of the deployment URL.
    pub tenant_id: String,
    /// Base model the adapter is layered on. Default: [`DEFAULT_BASE_MODEL`].
    pub base_model: String,
    /// Adapter identifier, e.g. `"loan-model/7"`.
    pub adapter_id: String,
    /// Adapter registry. Default: `"pbase"`.
    pub adapter_source: String,
    /// Serving host. Default: [`DEFAULT_SERVING_URL`].
    pub serving_url: String,
    /// Default: 0.1.
    pub temperature: f32,
    /// Default: 300.
    pub max_new_tokens: u32,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            tenant_id: String::new(),
            base_model: DEFAULT_BASE_MODEL.to_string(),
            adapter_id: String::new(),
            adapter_source: "pbase".to_string(),
            serving_url: DEFAULT_SERVING_URL.to_string(),
            temperature: 0.1,
            max_new_tokens: 300,
        }
    }
}

impl fmt::Debug for AdapterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterSettings")
            .field("api_key", &redact(&self.api_key))
            .field("tenant_id", &self.tenant_id)
            .field("base_model", &self.base_model)
            .field("adapter_id", &self.adapter_id)
            .field("adapter_source", &self.adapter_source)
            .field("serving_url", &self.serving_url)
            .field("temperature", &self.temperature)
            .field("max_new_tokens", &self.max_new_tokens)
            .finish()
    }
}

impl AdapterSettings {
    /// The generation endpoint for this tenant's base-model deployment.
    pub fn generate_url(&self) -> String {
        format!(
            "{}/{}/deployments/v2/llms/{}/generate",
            self.serving_url.trim_end_matches('/'),
            self.tenant_id,
            self.base_model
        )
    }

    fn validate(&self) -> Result<(), EvaluationError> {
        for (name, value) in [
            ("adapter API key (PB_API_KEY)", &self.api_key),
            ("tenant id (TENANT_ID)", &self.tenant_id),
            ("adapter id (ADAPTER_ID)", &self.adapter_id),
            ("base model (BASE_MODEL)", &self.base_model),
        ] {
            if value.trim().is_empty() {
                return Err(EvaluationError::InvalidConfig(format!(
                    "{name} is required for the adapter backend"
                )));
            }
        }
        if !is_http_url(&self.serving_url) {
            return Err(EvaluationError::InvalidConfig(format!(
                "serving URL must be http(s), got '{}'",
                self.serving_url
            )));
        }
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// True for `http://` and `https://` references; the scheme is case-insensitive.
pub(crate) fn is_http_url(input: &str) -> bool {
    match input.split_once("://") {
        Some((scheme, rest)) => {
            !rest.is_empty()
                && (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
        }
        None => false,
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}
