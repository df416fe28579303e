//! CLI binary for edgequake-loan-eval.
//!
//! A thin shim over the library crate: `evaluate` runs one document and
//! prints the decision, `serve` starts the HTTP service.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_loan_eval::server;
use edgequake_loan_eval::{
    DecisionBackend, Evaluation, EvaluationProgressCallback, EvaluatorConfig, LoanEvaluator,
    PipelineStage, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────

/// Spinner for the fetch/layout/decide stages, switching to a page bar
/// while summaries are produced.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Summarizing");
    }
}

impl EvaluationProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: PipelineStage) {
        match stage {
            PipelineStage::Fetching => {
                self.bar.set_prefix("Fetching");
                self.bar.set_message("downloading document…");
            }
            PipelineStage::ExtractingLayout => {
                self.bar.set_prefix("Layout");
                self.bar.set_message("analysing document layout…");
            }
            PipelineStage::Summarizing(page) => self.bar.set_message(format!("page {page}")),
            PipelineStage::Assembling => self.bar.set_message("assembling context…"),
            PipelineStage::Deciding => {
                self.bar.set_prefix("Deciding");
                self.bar.set_message("requesting loan decision…");
            }
            PipelineStage::Done => {}
        }
    }

    fn on_pages_known(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_start(&self, page: usize, _total_pages: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page, Instant::now());
        }
    }

    fn on_page_complete(&self, page: usize, total_pages: usize, summary_len: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .ok()
            .and_then(|mut t| t.remove(&page))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        let note = if summary_len == 0 {
            dim("  (nothing relevant)")
        } else {
            String::new()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}{}",
            green("✓"),
            page,
            total_pages,
            dim(&format!("{summary_len:>5} chars")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
            note,
        ));
        self.bar.inc(1);
    }

    fn on_evaluation_complete(&self, stance: bool) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Evaluation complete: {}",
            green("✔"),
            bold(if stance { "APPROVE" } else { "DECLINE" })
        );
    }

    fn on_evaluation_failed(&self, stage: PipelineStage, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} Failed during {}: {}", red("✘"), bold(&stage.to_string()), error);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Evaluate a document and print the decision
  loan-eval evaluate https://example.com/statements/q3.pdf

  # Full evaluation (decision, summaries, stats) as JSON
  loan-eval evaluate --json https://example.com/statements/q3.pdf > evaluation.json

  # Use the fine-tuned adapter for the decision
  loan-eval evaluate --backend adapter https://example.com/statements/q3.pdf

  # Run the HTTP service
  loan-eval serve --port 8000

ENVIRONMENT VARIABLES (a .env file is loaded if present):
  UPSTAGE_API_KEY         Layout-analysis API key (required)
  LAYOUT_API_URL          Override the layout-analysis endpoint
  EDGEQUAKE_LLM_PROVIDER  Chat provider (openai, anthropic, gemini, ollama, …)
  EDGEQUAKE_MODEL         Chat model for summaries and the chat backend
  LOAN_EVAL_BACKEND       Decision backend: chat (default) or adapter
  PB_API_KEY              Adapter serving API key
  TENANT_ID               Adapter serving tenant
  BASE_MODEL              Base model the adapter is deployed on
  ADAPTER_ID              Adapter identifier (e.g. loan-model/3)
"#;

/// Evaluate financial documents for a loan decision.
#[derive(Parser, Debug)]
#[command(
    name = "loan-eval",
    version,
    about = "Evaluate financial documents and produce a loan decision with three insights",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LOAN_EVAL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "LOAN_EVAL_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one document and print the decision.
    Evaluate(EvaluateArgs),
    /// Serve `POST /evaluate-loan` over HTTP.
    Serve(ServeArgs),
}

/// Flags shared by both subcommands.
#[derive(Args, Debug)]
struct PipelineArgs {
    /// Decision backend: chat or adapter.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Chat model for summaries and the chat decision backend.
    #[arg(long)]
    model: Option<String>,

    /// Chat provider: openai, anthropic, gemini, ollama, …
    #[arg(long)]
    provider: Option<String>,

    /// Page summaries kept in flight at once.
    #[arg(long, env = "LOAN_EVAL_SUMMARY_CONCURRENCY", default_value_t = 1)]
    summary_concurrency: usize,

    /// Document download timeout in seconds.
    #[arg(long, env = "LOAN_EVAL_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Layout-analysis request timeout in seconds.
    #[arg(long, env = "LOAN_EVAL_LAYOUT_TIMEOUT", default_value_t = 180)]
    layout_timeout: u64,

    /// Per-call model timeout in seconds.
    #[arg(long, env = "LOAN_EVAL_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// HTTP/HTTPS URL of the document.
    file_url: String,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Print the full evaluation (decision, summaries, stats) as JSON.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Interface to bind.
    #[arg(long, env = "LOAN_EVAL_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, env = "LOAN_EVAL_PORT", default_value_t = 8000)]
    port: u16,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum BackendArg {
    Chat,
    Adapter,
}

impl From<BackendArg> for DecisionBackend {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Chat => DecisionBackend::Chat,
            BackendArg::Adapter => DecisionBackend::Adapter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs for interactive evaluations.
    let show_progress = match &cli.command {
        Command::Evaluate(args) => !cli.quiet && !args.no_progress && !args.json,
        Command::Serve(_) => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Evaluate(args) => run_evaluate(args, show_progress, cli.quiet).await,
        Command::Serve(args) => run_serve(args).await,
    }
}

async fn run_evaluate(args: EvaluateArgs, show_progress: bool, quiet: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn EvaluationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&args.pipeline, progress)?;
    let evaluator = LoanEvaluator::from_config(&config).context("Failed to set up evaluator")?;

    let evaluation = evaluator
        .evaluate(&args.file_url)
        .await
        .context("Evaluation failed")?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&evaluation).context("Failed to serialise evaluation")?;
        println!("{json}");
    } else {
        print_decision(&evaluation);
        if !quiet {
            eprintln!(
                "   {} pages  /  {} summarized  /  {} context chars  —  {}ms total",
                dim(&evaluation.stats.billed_pages.to_string()),
                dim(&evaluation.stats.summarized_pages.to_string()),
                dim(&evaluation.stats.context_chars.to_string()),
                evaluation.stats.total_duration_ms,
            );
        }
    }
    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = build_config(&args.pipeline, None)?;
    let evaluator = LoanEvaluator::from_config(&config).context("Failed to set up evaluator")?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.host, args.port))?;
    server::serve(Arc::new(evaluator), addr)
        .await
        .with_context(|| format!("Server on {addr} stopped"))
}

fn print_decision(evaluation: &Evaluation) {
    let decision = &evaluation.decision;
    let verdict = if decision.stance {
        green("APPROVE")
    } else {
        red("DECLINE")
    };
    println!("{} {}", bold("Decision:"), verdict);
    println!("  1. {}", decision.insight_1);
    println!("  2. {}", decision.insight_2);
    println!("  3. {}", decision.insight_3);
}

/// Layer CLI flags over the environment-derived configuration.
fn build_config(args: &PipelineArgs, progress: Option<ProgressCallback>) -> Result<EvaluatorConfig> {
    let mut builder = EvaluatorConfig::builder_from_env()
        .summary_concurrency(args.summary_concurrency)
        .download_timeout_secs(args.download_timeout)
        .layout_timeout_secs(args.layout_timeout)
        .api_timeout_secs(args.api_timeout);

    if let Some(ref backend) = args.backend {
        builder = builder.decision_backend(backend.clone().into());
    }
    if let Some(ref model) = args.model {
        builder = builder.chat_model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
