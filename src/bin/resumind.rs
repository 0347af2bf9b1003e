//! CLI binary for resumind.
//!
//! A thin shim over the library crate: maps CLI flags to `AnalyzerConfig`,
//! wires the local-directory stores, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use resumind::pipeline::render::PdfiumConverter;
use resumind::pipeline::score::LlmScorer;
use resumind::services::PDF_MIME;
use resumind::storage::{LocalBlobStore, LocalKvStore};
use resumind::{
    AnalysisError, AnalysisProgressCallback, AnalysisStep, Analyzer, AnalyzerConfig, BlobStore,
    CardEvent, CardPreview, KvStore, PreviewUrls, ResumeCard, ResumeLibrary, SubmissionFields,
    SubmitOutcome, UploadFile, UploadForm,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner whose message follows the pipeline's status line.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_step_start(&self, step: AnalysisStep) {
        self.bar.set_message(step.status_text());
    }

    fn on_failure(&self, _error: &AnalysisError) {
        self.bar.finish_and_clear();
    }

    fn on_complete(&self, _redirect_to: &str) {
        self.bar.finish_and_clear();
    }
}

/// Score resumes against job descriptions with a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "resumind",
    version,
    about = "Score resumes against job descriptions with a vision LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// Directory holding uploaded files and records.
    #[arg(long, env = "RESUMIND_DATA_DIR", default_value = ".resumind", global = true)]
    data_dir: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RESUMIND_VERBOSE", global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RESUMIND_QUIET", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a resume and analyze it for a job.
    Analyze(AnalyzeArgs),
    /// Show every stored resume as a card.
    List {
        /// Print records as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print one record as JSON.
    Show { id: String },
    /// Delete a record with its files.
    Delete { id: String },
}

#[derive(clap::Args, Debug)]
struct AnalyzeArgs {
    /// Resume PDF.
    file: PathBuf,

    #[arg(long = "company")]
    company_name: String,

    #[arg(long = "title")]
    job_title: String,

    #[arg(long = "description", required_unless_present = "description_file")]
    job_description: Option<String>,

    /// Read the job description from a file instead.
    #[arg(long, conflicts_with = "job_description")]
    description_file: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Pages of the resume attached to the scoring request.
    #[arg(long, env = "RESUMIND_SCORING_PAGES", default_value_t = 2)]
    scoring_pages: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RESUMIND_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Scoring call timeout in seconds.
    #[arg(long, env = "RESUMIND_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// PDF user password for encrypted resumes.
    #[arg(long, env = "RESUMIND_PDF_PASSWORD")]
    password: Option<String>,
}

struct Stores {
    blobs: Arc<dyn BlobStore>,
    kv: Arc<dyn KvStore>,
}

impl Stores {
    fn open(data_dir: &Path) -> Self {
        Self {
            blobs: Arc::new(LocalBlobStore::new(data_dir.join("blobs"))),
            kv: Arc::new(LocalKvStore::new(data_dir.join("kv"))),
        }
    }

    fn library(&self) -> ResumeLibrary {
        ResumeLibrary::new(Arc::clone(&self.kv), Arc::clone(&self.blobs))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let stores = Stores::open(&cli.data_dir);

    match cli.command {
        Command::Analyze(ref args) => analyze(&cli, args, &stores).await,
        Command::List { json } => list(&stores, json).await,
        Command::Show { ref id } => show(&stores, id).await,
        Command::Delete { ref id } => delete(&stores, id).await,
    }
}

async fn analyze(cli: &Cli, args: &AnalyzeArgs, stores: &Stores) -> Result<()> {
    let config = build_config(args)?;

    let job_description = match args.description_file {
        Some(ref path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read job description from {:?}", path))?,
        None => args.job_description.clone().unwrap_or_default(),
    };
    let file = read_upload(&args.file).await?;

    let scorer = LlmScorer::from_config(Arc::clone(&stores.blobs), &config)
        .context("Failed to set up the scoring model")?;
    let mut analyzer = Analyzer::new(
        Arc::clone(&stores.blobs),
        Arc::clone(&stores.kv),
        Arc::new(PdfiumConverter::from_config(&config)),
        Arc::new(scorer),
        config,
    );
    if !cli.quiet {
        analyzer = analyzer.with_progress(CliProgressCallback::new());
    }
    let form = UploadForm::new(Arc::new(analyzer));

    let fields = SubmissionFields::new(
        args.company_name.clone(),
        args.job_title.clone(),
        job_description,
    );
    match form.submit(&fields, Some(file)).await {
        SubmitOutcome::Completed(outcome) => {
            let score = outcome
                .record
                .feedback
                .overall_score()
                .map(|s| format!("{s:.0}"))
                .unwrap_or_else(|| "—".into());
            if !cli.quiet {
                eprintln!("{} {}", green("✔"), form.status());
            }
            println!(
                "{}  score {}  →  {}",
                outcome.record.id,
                bold(&score),
                outcome.redirect_to
            );
            Ok(())
        }
        SubmitOutcome::Rejected(errors) => {
            for (field, message) in errors.iter() {
                eprintln!("{} {}: {}", red("✘"), field, message);
            }
            anyhow::bail!("Submission rejected")
        }
        SubmitOutcome::Failed(e) => {
            eprintln!("{} {}", red("✘"), form.status());
            Err(e).context("Analysis failed")
        }
        SubmitOutcome::Busy => anyhow::bail!("An analysis is already running"),
    }
}

/// Map CLI args to `AnalyzerConfig`.
fn build_config(args: &AnalyzeArgs) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .scoring_max_pages(args.scoring_pages)
        .temperature(args.temperature)
        .api_timeout_secs(args.api_timeout);
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = args.password {
        builder = builder.pdf_password(password);
    }
    builder.build().context("Invalid configuration")
}

/// Load a file from disk, typing it by its `%PDF` magic bytes.
async fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume.pdf".into());
    let mime = if bytes.starts_with(b"%PDF") {
        PDF_MIME
    } else {
        "application/octet-stream"
    };
    Ok(UploadFile::new(name, mime, bytes))
}

async fn list(stores: &Stores, json: bool) -> Result<()> {
    let library = stores.library();
    let records = library.list().await.context("Failed to list records")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("Failed to serialise records")?
        );
        return Ok(());
    }
    if records.is_empty() {
        eprintln!("{}", dim("No resumes yet."));
        return Ok(());
    }

    let urls = PreviewUrls::new();
    for record in records {
        let card = ResumeCard::new(
            record,
            Arc::clone(&stores.blobs),
            urls.clone(),
            library.delete_fn(),
        );
        card.load_preview().await;
        let Some(view) = card.view() else { continue };

        let score = view
            .score
            .map(|s| format!("{s:>3.0}"))
            .unwrap_or_else(|| dim("  …"));
        let preview = match view.preview {
            CardPreview::Image { .. } => card.record().image_path.clone(),
            CardPreview::Placeholder => dim(resumind::card::NO_IMAGE),
        };
        println!(
            "{}  {}  {}  {}",
            score,
            bold(&view.heading.lines().join(" · ")),
            dim(&view.link),
            preview
        );
    }
    Ok(())
}

async fn show(stores: &Stores, id: &str) -> Result<()> {
    let record = stores
        .library()
        .get(id)
        .await
        .context("Failed to read record")?
        .with_context(|| format!("No resume with id '{id}'"))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&record).context("Failed to serialise record")?
    );
    Ok(())
}

async fn delete(stores: &Stores, id: &str) -> Result<()> {
    let library = stores.library();
    let record = library
        .get(id)
        .await
        .context("Failed to read record")?
        .with_context(|| format!("No resume with id '{id}'"))?;

    let card = ResumeCard::new(
        record,
        Arc::clone(&stores.blobs),
        PreviewUrls::new(),
        library.delete_fn(),
    );
    if let Some(task) = card.delete(&mut CardEvent::new()) {
        task.await.context("Delete task failed")?;
    }
    // Background failures are only logged; report what is actually left.
    if library.get(id).await.ok().flatten().is_some() {
        anyhow::bail!("Resume '{id}' could not be deleted (see log)");
    }
    eprintln!("{} Deleted {}", green("✔"), id);
    Ok(())
}
