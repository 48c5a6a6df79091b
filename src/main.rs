//! # tracecase CLI
//!
//! The `tracecase` binary is the primary interface for the toolkit. It
//! provides commands for database initialization, artifact ingestion,
//! remote fetching, job inspection, and proof bundle export.
//!
//! ## Usage
//!
//! ```bash
//! tracecase --config ./tracecase.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tracecase init` | Create the SQLite database and run schema migrations |
//! | `tracecase ingest <file>` | Ingest a local artifact through the full pipeline |
//! | `tracecase fetch <url>` | Download and ingest a remote artifact (opt-in) |
//! | `tracecase show <id>` | Print a job with entities, derived files, and audit trail |
//! | `tracecase jobs` | List recent ingest jobs |
//! | `tracecase delete <id>` | Delete a job and its database children |
//! | `tracecase export <id>` | Copy a job's proof bundle out of the store |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tracecase::{config, db, export, ingest, migrate, show};

/// tracecase — artifact ingestion and evidence packaging for forensic
/// and OSINT analysts.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `tracecase.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "tracecase",
    about = "tracecase — artifact ingestion and evidence packaging for forensic and OSINT analysts",
    version,
    long_about = "tracecase ingests artifacts (images, videos, PDFs, text, URLs), extracts \
    content and metadata, recognizes entities such as emails, phone numbers and monetary \
    amounts, and packages everything with a redacted audit trail into a hash-verifiable \
    proof bundle."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./tracecase.toml`. Storage, database, network, and
    /// external tool settings are read from this file.
    #[arg(long, global = true, default_value = "./tracecase.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize storage directories and the database schema.
    ///
    /// Creates the data, proof, and log directories, the SQLite database
    /// file, and all required tables. Idempotent — running it multiple
    /// times is safe.
    Init,

    /// Ingest a local artifact.
    ///
    /// Copies the file into the artifact store, hashes it, detects its
    /// kind, extracts content and entities, records an audit trail, and
    /// assembles the proof bundle.
    Ingest {
        /// Path to the artifact file.
        file: PathBuf,

        /// Override the recorded source URI (defaults to the file path).
        #[arg(long)]
        source: Option<String>,

        /// Declared MIME type, used as a detection hint.
        #[arg(long)]
        mime: Option<String>,
    },

    /// Download and ingest a remote artifact.
    ///
    /// Requires `enable_fetch = true` under `[network]` in the
    /// configuration file; fetching is disabled by default.
    Fetch {
        /// URL of the remote artifact.
        url: String,
    },

    /// Show a job with its entities, derived artifacts, and audit trail.
    Show {
        /// Job UUID.
        id: String,
    },

    /// List recent ingest jobs, newest first.
    Jobs {
        /// Maximum number of jobs to list.
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Delete a job and its entities, derived records, and audit rows.
    ///
    /// Stored artifact files and already-exported bundles are not removed.
    Delete {
        /// Job UUID.
        id: String,
    },

    /// Export a job's proof bundle.
    ///
    /// Prints the archive path, or copies the archive when `--out` is
    /// given.
    Export {
        /// Job UUID.
        id: String,

        /// Destination path for the copied archive.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            cfg.ensure_dirs()?;
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { file, source, mime } => {
            cfg.ensure_dirs()?;
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            let service = ingest::IngestService::new(cfg, pool);
            let job = match mime {
                Some(mime) => {
                    let name = file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned());
                    let source_uri =
                        source.unwrap_or_else(|| file.display().to_string());
                    let bytes = std::fs::read(&file)?;
                    service
                        .ingest_bytes(name.as_deref(), Some(&mime), &bytes, Some(&source_uri))
                        .await?
                }
                None => service.ingest_path(&file, source.as_deref()).await?,
            };
            print_job_result(&job);
        }
        Commands::Fetch { url } => {
            cfg.ensure_dirs()?;
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            let service = ingest::IngestService::new(cfg, pool);
            let job = service.ingest_url(&url).await?;
            print_job_result(&job);
        }
        Commands::Show { id } => {
            show::run_show(&cfg, &id).await?;
        }
        Commands::Jobs { limit } => {
            show::run_jobs(&cfg, limit).await?;
        }
        Commands::Delete { id } => {
            show::run_delete(&cfg, &id).await?;
        }
        Commands::Export { id, out } => {
            export::run_export(&cfg, &id, out.as_deref()).await?;
        }
    }

    Ok(())
}

fn print_job_result(job: &tracecase::models::IngestJob) {
    println!("Job {} {}", job.id, job.status);
    println!("  kind:   {}", job.kind);
    println!("  sha256: {}", job.sha256);
    if let Some(archive) = job.summary.get("proof_archive").and_then(|v| v.as_str()) {
        println!("  proof:  {}", archive);
    }
}
