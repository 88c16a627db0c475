//! Readiness - compliance readiness assessment CLI
//!
//! The `readiness` command scores evidence documents against a compliance
//! framework's control catalog.
//!
//! ## Commands
//!
//! - `frameworks`: List the built-in frameworks
//! - `controls`: Show the controls of one framework
//! - `assess`: Run an assessment over evidence files and write a report

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use evidence_store::{BlobStore, FsBlobStore};
use readiness_core::corpus::mime_type_for;
use readiness_core::obs::AssessmentSpan;
use readiness_core::reporting::{write_report_json, write_report_md};
use readiness_core::{
    AssessmentReport, AssessmentRun, Catalog, ControlCatalog, EngineConfig, EngineError,
    FrameworkCategory, OpenAiOracle, OpenAiOracleConfig, Orchestrator, StoredDocument,
    WindowStrategy,
};
use tracing::{info, Level};

/// Exit code for a run that failed structurally (empty corpus, unknown framework, ...).
const EXIT_ASSESSMENT_FAILED: u8 = 2;

#[derive(Parser)]
#[command(name = "readiness")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compliance readiness assessments", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in frameworks
    Frameworks {
        /// Only frameworks of this category (security, privacy, industry, government, ai)
        #[arg(short, long)]
        category: Option<FrameworkCategory>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the controls of a framework
    Controls {
        /// Framework id, e.g. iso27001 or soc2
        framework: String,

        /// Only controls of this domain
        #[arg(short, long)]
        domain: Option<String>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Assess evidence files against a framework
    Assess {
        /// Framework id, e.g. iso27001 or soc2
        #[arg(short, long)]
        framework: String,

        /// Evidence files (PDF, text, Word, spreadsheets)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Assessment id (default: random UUID)
        #[arg(long)]
        assessment_id: Option<String>,

        /// Evidence blob store directory (default: a temporary directory)
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Write the JSON report here (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also write a Markdown summary here
        #[arg(long)]
        markdown: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Engine and oracle overrides. Unset flags fall back to the environment.
#[derive(clap::Args, Debug, Default)]
struct EngineArgs {
    /// Maximum oracle calls in flight
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Per-control oracle deadline in seconds
    #[arg(long)]
    oracle_timeout_secs: Option<u64>,

    /// Characters of evidence sent per control
    #[arg(long)]
    window_chars: Option<usize>,

    /// Window selection strategy (prefix or keyword)
    #[arg(long)]
    window_strategy: Option<WindowStrategy>,

    /// Chat-completions base URL
    #[arg(long)]
    oracle_url: Option<String>,

    /// Oracle model name
    #[arg(long)]
    oracle_model: Option<String>,

    /// Oracle API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl EngineArgs {
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::from_env();
        if let Some(n) = self.max_concurrency {
            config = config.with_max_concurrency(n);
        }
        if let Some(secs) = self.oracle_timeout_secs {
            config = config.with_oracle_timeout(Duration::from_secs(secs));
        }
        let chars = self.window_chars.unwrap_or(config.window.max_chars);
        let strategy = self.window_strategy.unwrap_or(config.window.strategy);
        config.with_window(chars, strategy)
    }

    fn oracle_config(&self) -> OpenAiOracleConfig {
        let mut config = OpenAiOracleConfig::from_env();
        if let Some(url) = &self.oracle_url {
            config.base_url = url.clone();
        }
        if let Some(model) = &self.oracle_model {
            config.model = model.clone();
        }
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key);
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    readiness_core::telemetry::init_tracing(cli.json, level);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Frameworks { category, format } => cmd_frameworks(category, format),
        Commands::Controls {
            framework,
            domain,
            format,
        } => cmd_controls(&framework, domain.as_deref(), format),
        Commands::Assess {
            framework,
            files,
            assessment_id,
            store_dir,
            out,
            markdown,
            engine,
        } => {
            cmd_assess(
                &framework,
                &files,
                assessment_id,
                store_dir.as_deref(),
                out.as_deref(),
                markdown.as_deref(),
                &engine,
            )
            .await
        }
    }
}

/// Structural assessment failures exit with 2, everything else with 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<EngineError>() {
        Some(e) if e.is_structural() => EXIT_ASSESSMENT_FAILED,
        _ => 1,
    }
}

fn cmd_frameworks(category: Option<FrameworkCategory>, format: OutputFormat) -> Result<()> {
    let catalog = Catalog::builtin()?;
    let summaries: Vec<_> = catalog
        .summaries()
        .into_iter()
        .filter(|s| category.map_or(true, |c| s.category == c))
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Text => {
            for s in &summaries {
                println!(
                    "{:<10} {:<40} {:<10} {:>3} domains {:>4} controls",
                    s.id.as_str(),
                    s.name,
                    s.category.to_string(),
                    s.domain_count,
                    s.control_count
                );
            }
        }
    }
    Ok(())
}

fn cmd_controls(framework: &str, domain: Option<&str>, format: OutputFormat) -> Result<()> {
    let catalog = Catalog::builtin()?;
    let controls: Vec<_> = catalog
        .list_controls(framework)?
        .into_iter()
        .filter(|c| domain.map_or(true, |d| c.domain_id == d))
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&controls)?),
        OutputFormat::Text => {
            let mut current_domain = "";
            for c in &controls {
                if c.domain_id != current_domain {
                    println!("\n[{}] {}", c.domain_id, c.domain_name);
                    current_domain = c.domain_id.as_str();
                }
                println!("  {:<24} {}", c.id, c.name);
            }
        }
    }
    Ok(())
}

/// Read evidence files into the blob store.
async fn store_documents(store: &dyn BlobStore, files: &[PathBuf]) -> Result<Vec<StoredDocument>> {
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read evidence file: {:?}", path))?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let handle = store
            .store(&bytes)
            .await
            .with_context(|| format!("Failed to store {label}"))?;
        documents.push(StoredDocument {
            mime_type: mime_type_for(&label).to_string(),
            label,
            handle,
        });
    }
    Ok(documents)
}

async fn cmd_assess(
    framework: &str,
    files: &[PathBuf],
    assessment_id: Option<String>,
    store_dir: Option<&Path>,
    out: Option<&Path>,
    markdown: Option<&Path>,
    engine: &EngineArgs,
) -> Result<()> {
    // Held until the run ends so a temporary store outlives it.
    let scratch = match store_dir {
        Some(_) => None,
        None => Some(tempfile::tempdir().context("Failed to create scratch store")?),
    };
    let store_root = store_dir
        .or_else(|| scratch.as_ref().map(|d| d.path()))
        .context("no evidence store directory")?;
    let store = FsBlobStore::new(store_root)
        .with_context(|| format!("Failed to open evidence store at {:?}", store_root))?;

    let documents = store_documents(&store, files).await?;

    let catalog = Catalog::builtin()?;
    let oracle = OpenAiOracle::new(engine.oracle_config())?;
    let orchestrator = Orchestrator::new(Arc::new(catalog), Arc::new(oracle), engine.engine_config());

    let run = match assessment_id {
        Some(id) => AssessmentRun::new(id),
        None => AssessmentRun::generate(),
    };
    let id = run.assessment_id();
    info!(assessment_id = %id, framework, documents = documents.len(), "starting assessment");

    let outcome = orchestrator
        .run_stored(&run, framework, &store, &documents)
        .await?;
    let report = AssessmentReport::from_outcome(outcome);

    let _span = AssessmentSpan::enter(&id);
    match out {
        Some(path) => {
            write_report_json(path, &report)?;
            println!("Report written to {:?}", path);
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    if let Some(path) = markdown {
        write_report_md(path, &report)?;
        println!("Markdown summary written to {:?}", path);
    }
    if out.is_some() {
        println!("{}", summary_line(&report));
    }
    Ok(())
}

fn summary_line(report: &AssessmentReport) -> String {
    let s = &report.summary;
    format!(
        "{}: {}% ({} met, {} partial, {} not met, {} could not be evaluated)",
        report.framework_name, s.overall_score, s.met, s.partial, s.not_met, s.unevaluated
    )
}
