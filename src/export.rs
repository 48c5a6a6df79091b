//! Proof bundle export.
//!
//! Locates the archive recorded in a completed job's summary and either
//! prints its location or copies it to a caller-chosen destination.

use anyhow::{Context, Result};

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db;
use crate::error::TraceError;
use crate::jobs;

/// Resolve the proof archive for `job_id`, verifying it is still on disk.
pub async fn locate_proof(config: &Config, job_id: &str) -> Result<PathBuf> {
    let pool = db::connect(config).await?;
    let record = jobs::fetch_job(&pool, job_id).await?;
    pool.close().await;

    let record = record.ok_or_else(|| TraceError::JobNotFound(job_id.to_string()))?;
    let archive = record
        .job
        .summary
        .get("proof_archive")
        .and_then(|value| value.as_str())
        .map(PathBuf::from)
        .ok_or_else(|| TraceError::ProofNotBuilt(job_id.to_string()))?;

    if !archive.is_file() {
        return Err(TraceError::ProofMissing {
            job_id: job_id.to_string(),
            path: archive.display().to_string(),
        }
        .into());
    }
    Ok(archive)
}

/// CLI entry point for `tracecase export <id>`.
pub async fn run_export(config: &Config, job_id: &str, out: Option<&Path>) -> Result<()> {
    let archive = locate_proof(config, job_id).await?;
    match out {
        Some(destination) => {
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&archive, destination).with_context(|| {
                format!("Failed to copy proof bundle to {}", destination.display())
            })?;
            println!("Exported proof bundle to {}", destination.display());
        }
        None => {
            println!("{}", archive.display());
        }
    }
    Ok(())
}
