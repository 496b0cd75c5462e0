//! smartdoc - Document contradiction analysis

mod cli;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smartdoc_core::intake::DocumentIntake;
use smartdoc_core::{
    exporter_for, normalizer, AnalysisOrchestrator, BackendResponse, CostLedger, ExportFormat,
    FileCandidate, HttpBackend, Notification, SmartDocConfig,
};
use smartdoc_types::{AnalysisPhase, DocumentId, UploadedDocument};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "smartdoc",
    version,
    about = "Find contradictions between documents",
    long_about = "Compares 2 to 3 documents (PDF, DOCX or TXT, up to 10 MB each) through the\n\
                  analysis backend and lists the statements that contradict each other.\n\
                  \n\
                  Pricing: $0.10 per analyzed document, $2.00 per exported report.\n\
                  \n\
                  Examples:\n\
                    smartdoc analyze syllabus.pdf policy.docx            # Analyze two documents\n\
                    smartdoc analyze a.pdf b.pdf c.txt --export          # Analyze and export a report\n\
                    smartdoc analyze a.pdf b.pdf --format markdown --export\n\
                    smartdoc estimate a.pdf b.pdf c.txt                  # Cost estimate, no backend call\n\
                    smartdoc normalize response.json --documents a.pdf,b.pdf\n\
                  \n\
                  Environment Variables:\n\
                    SMARTDOC_CONFIG                  # Config file (default: <config dir>/smartdoc/config.toml)\n\
                    SMARTDOC_BACKEND_URL             # Override the analysis endpoint\n\
                    SMARTDOC_OUTPUT_DIR              # Directory for exported reports\n\
                    SMARTDOC_NO_COLOR                # Disable ANSI colors (log-friendly)\n\
                    RUST_LOG                         # Log filter (default: warn)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to config file
    #[arg(long, env = "SMARTDOC_CONFIG")]
    config: Option<PathBuf>,

    /// Analysis endpoint URL
    #[arg(long, env = "SMARTDOC_BACKEND_URL")]
    backend_url: Option<String>,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, env = "SMARTDOC_NO_COLOR")]
    no_color: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze documents for contradictions
    Analyze {
        /// Documents to compare (2 to 3)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Export a report after a successful analysis ($2.00)
        #[arg(long)]
        export: bool,
        /// Report format
        #[arg(long, value_parser = ["json", "markdown", "md"])]
        format: Option<String>,
        /// Directory for exported reports
        #[arg(long, env = "SMARTDOC_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate documents and show the cost estimate
    Estimate {
        /// Documents to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Normalize a saved backend response
    Normalize {
        /// Backend response body (JSON)
        response: PathBuf,
        /// Document names in upload order, for responses that reference names
        #[arg(long, value_delimiter = ',')]
        documents: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    let config = load_config(cli.config.as_deref(), cli.backend_url)?;
    let no_color = cli.no_color;

    match cli.command {
        Command::Analyze {
            files,
            export,
            format,
            output_dir,
            json,
        } => {
            run_analyze(config, files, export, format, output_dir, json, no_color).await?;
        }
        Command::Estimate { files, json } => {
            run_estimate(config, files, json, no_color).await?;
        }
        Command::Normalize {
            response,
            documents,
            json,
        } => {
            run_normalize(response, documents, json, no_color)?;
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Explicit config paths must exist; the default location is optional
fn load_config(path: Option<&Path>, backend_url: Option<String>) -> Result<SmartDocConfig> {
    let mut config = match path {
        Some(path) => SmartDocConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => match SmartDocConfig::default_path() {
            Some(default_path) => SmartDocConfig::load_or_default(&default_path)
                .with_context(|| format!("Failed to load config: {}", default_path.display()))?,
            None => SmartDocConfig::default(),
        },
    };

    if let Some(url) = backend_url {
        config.backend.url = url;
    }
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

async fn read_candidates(files: &[PathBuf]) -> Result<Vec<FileCandidate>> {
    let mut candidates = Vec::with_capacity(files.len());
    for path in files {
        let candidate = FileCandidate::from_path(path)
            .await
            .with_context(|| format!("Failed to read document: {}", path.display()))?;
        candidates.push(candidate);
    }
    Ok(candidates)
}

fn print_notifications(rx: &mut broadcast::Receiver<Notification>) {
    while let Ok(notification) = rx.try_recv() {
        eprintln!("{}", cli::format_notification(&notification));
    }
}

async fn run_analyze(
    config: SmartDocConfig,
    files: Vec<PathBuf>,
    export: bool,
    format: Option<String>,
    output_dir: Option<PathBuf>,
    json: bool,
    no_color: bool,
) -> Result<()> {
    let mut export_config = config.export.clone();
    if let Some(dir) = output_dir {
        export_config.output_dir = dir;
    }
    if let Some(format) = format.as_deref().and_then(ExportFormat::parse) {
        export_config.format = format;
    }

    let backend = HttpBackend::new(&config.backend).context("Failed to create backend client")?;
    tracing::info!(url = backend.url(), "Using analysis backend");

    let mut orchestrator =
        AnalysisOrchestrator::with_config(backend, exporter_for(&export_config), &config);
    let mut notifications = orchestrator.subscribe();

    orchestrator.add_documents(read_candidates(&files).await?);
    print_notifications(&mut notifications);

    let mut progress = cli::BarProgress::new(json)?;
    let outcome = orchestrator.run_analysis(&mut progress).await;
    progress.finish();
    print_notifications(&mut notifications);

    let phase = outcome?;
    let result = orchestrator
        .result()
        .context("Analysis settled without a result")?;

    println!("{}", cli::format_findings_table(result, json, no_color));
    if !json {
        println!();
        println!("{}", cli::format_result_summary(result));
        println!();
        println!("{}", cli::format_billing(&orchestrator.billing_summary()));
    }

    if phase == AnalysisPhase::Failed {
        let reason = orchestrator
            .last_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        anyhow::bail!("Analysis failed: {}", reason);
    }

    if export {
        let exported = orchestrator.export_report();
        print_notifications(&mut notifications);
        exported?;
        if !json {
            println!("{}", cli::format_billing(&orchestrator.billing_summary()));
        }
    }

    Ok(())
}

async fn run_estimate(
    config: SmartDocConfig,
    files: Vec<PathBuf>,
    json: bool,
    no_color: bool,
) -> Result<()> {
    let mut intake = DocumentIntake::new();
    for (name, outcome) in intake.validate_all(read_candidates(&files).await?) {
        if let Err(e) = outcome {
            eprintln!("rejected {}: {}", name, e);
        }
    }

    let estimate = CostLedger::with_pricing(&config.pricing).estimate(intake.len());

    if json {
        let output = serde_json::json!({
            "documents": intake.documents(),
            "estimate": estimate,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{}",
        cli::format_documents_table(intake.documents(), false, no_color)
    );
    println!();
    println!("{}", cli::format_estimate(&estimate));

    Ok(())
}

fn run_normalize(response: PathBuf, names: Vec<String>, json: bool, no_color: bool) -> Result<()> {
    let content = std::fs::read_to_string(&response)
        .with_context(|| format!("Failed to read response: {}", response.display()))?;
    let body: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", response.display()))?;

    // Only names matter for position lookup
    let documents: Vec<UploadedDocument> = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| UploadedDocument {
            id: DocumentId::new(idx as u64 + 1),
            name,
            size_bytes: 0,
            mime_type: String::new(),
            payload: Vec::new(),
        })
        .collect();

    let paired = BackendResponse::from_json(&body)
        .context("Unrecognized response shape")?
        .into_paired(&documents);
    let result = normalizer::normalize(&paired, Duration::ZERO);

    println!("{}", cli::format_findings_table(&result, json, no_color));
    if !json {
        println!();
        println!("{}", cli::format_result_summary(&result));
    }

    Ok(())
}
