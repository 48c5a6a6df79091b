//! Job inspection and maintenance commands.
//!
//! Fetches a full ingest job with its entities, derived artifacts, and
//! audit trail, and prints it to stdout. Also backs the `tracecase jobs`
//! listing and `tracecase delete`.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::error::TraceError;
use crate::jobs;

/// CLI entry point for `tracecase show <id>`.
pub async fn run_show(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let record = jobs::fetch_job(&pool, id).await?;
    pool.close().await;

    let record = match record {
        Some(record) => record,
        None => return Err(TraceError::JobNotFound(id.to_string()).into()),
    };
    let job = &record.job;

    println!("--- Job ---");
    println!("id:           {}", job.id);
    println!("source:       {}", job.source_uri);
    if let Some(ref name) = job.original_filename {
        println!("filename:     {}", name);
    }
    println!("kind:         {}", job.kind);
    println!("status:       {}", job.status);
    println!("sha256:       {}", job.sha256);
    println!("size:         {} bytes", job.size_bytes);
    println!("content_type: {}", job.content_type);
    println!("created_at:   {}", job.created_at);
    if let Some(ref completed) = job.completed_at {
        println!("completed_at: {}", completed);
    }
    println!(
        "summary:      {}",
        serde_json::Value::Object(job.summary.clone())
    );
    println!(
        "metadata:     {}",
        serde_json::Value::Object(job.metadata.clone())
    );
    println!();

    println!("--- Entities ({}) ---", record.entities.len());
    for entity in &record.entities {
        let shown = entity.normalized.as_deref().unwrap_or(&entity.value);
        match entity.score {
            Some(score) => println!("[{}] {} (score {:.2})", entity.kind, shown, score),
            None => println!("[{}] {}", entity.kind, shown),
        }
    }
    println!();

    if !record.derived.is_empty() {
        println!("--- Derived ({}) ---", record.derived.len());
        for derived in &record.derived {
            println!("[{}] {} sha256={}", derived.label, derived.path, derived.sha256);
        }
        println!();
    }

    println!("--- Audit trail ({}) ---", record.logs.len());
    for row in &record.logs {
        println!(
            "{} {:<5} {} {}",
            row.created_at, row.level, row.event, row.details
        );
    }

    Ok(())
}

/// CLI entry point for `tracecase jobs`.
pub async fn run_jobs(config: &Config, limit: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    let rows = jobs::list_jobs(&pool, limit).await?;
    pool.close().await;

    if rows.is_empty() {
        println!("No ingest jobs recorded.");
        return Ok(());
    }

    println!("Jobs ({}):", rows.len());
    for job in &rows {
        let entities = job
            .summary
            .get("entities")
            .and_then(|value| value.as_i64())
            .unwrap_or(0);
        println!(
            "  {}  {:<10} {:<6} {:>3} entities  {}  {}",
            job.id,
            job.status,
            job.kind,
            entities,
            job.created_at,
            job.original_filename.as_deref().unwrap_or(&job.source_uri)
        );
    }
    Ok(())
}

/// CLI entry point for `tracecase delete <id>`. Database children cascade;
/// stored artifacts and already-exported bundles are left on disk.
pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let deleted = jobs::delete_job(&pool, id).await?;
    pool.close().await;

    if !deleted {
        return Err(TraceError::JobNotFound(id.to_string()).into());
    }
    println!("Deleted job {}", id);
    Ok(())
}
