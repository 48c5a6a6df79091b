//! Job retrieval and row mapping.
//!
//! Shared by the orchestrator's finalize step, the proof builder, and the
//! CLI read paths. `fetch_job` eagerly loads all three child collections
//! in one call so callers never operate on partial state.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::models::{
    ArtifactKind, AuditLogRow, DerivedArtifact, ExtractedEntity, IngestJob, IngestStatus, MetaMap,
};

/// A job with all of its children, as stored.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job: IngestJob,
    pub entities: Vec<ExtractedEntity>,
    pub derived: Vec<DerivedArtifact>,
    pub logs: Vec<AuditLogRow>,
}

const JOB_COLUMNS: &str = "id, source_uri, original_filename, artifact_path, kind, status, \
     sha256, size_bytes, content_type, created_at, completed_at, metadata_json, \
     text_content, summary_json";

/// Fetch one job with entities, derived artifacts, and audit rows.
pub async fn fetch_job(pool: &SqlitePool, id: &str) -> Result<Option<JobRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM ingest_jobs WHERE id = ?",
        JOB_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let job = match row {
        Some(row) => job_from_row(&row),
        None => return Ok(None),
    };

    let entity_rows = sqlx::query(
        "SELECT id, job_id, kind, value, normalized, context, score \
         FROM entities WHERE job_id = ? ORDER BY rowid",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    let entities = entity_rows
        .iter()
        .map(|row| ExtractedEntity {
            id: row.get("id"),
            job_id: row.get("job_id"),
            kind: row.get("kind"),
            value: row.get("value"),
            normalized: row.get("normalized"),
            context: row.get("context"),
            score: row.get("score"),
        })
        .collect();

    let derived_rows = sqlx::query(
        "SELECT id, job_id, label, path, sha256, metadata_json \
         FROM derived_artifacts WHERE job_id = ? ORDER BY rowid",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    let derived = derived_rows
        .iter()
        .map(|row| DerivedArtifact {
            id: row.get("id"),
            job_id: row.get("job_id"),
            label: row.get("label"),
            path: row.get("path"),
            sha256: row.get("sha256"),
            metadata: parse_map(row.get("metadata_json")),
        })
        .collect();

    let log_rows = sqlx::query(
        "SELECT id, job_id, created_at, level, event, details_json \
         FROM audit_logs WHERE job_id = ? ORDER BY rowid",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    let logs = log_rows
        .iter()
        .map(|row| AuditLogRow {
            id: row.get("id"),
            job_id: row.get("job_id"),
            created_at: row.get("created_at"),
            level: row.get("level"),
            event: row.get("event"),
            details: parse_value(row.get("details_json")),
        })
        .collect();

    Ok(Some(JobRecord {
        job,
        entities,
        derived,
        logs,
    }))
}

/// List recent jobs, most recent first.
pub async fn list_jobs(pool: &SqlitePool, limit: i64) -> Result<Vec<IngestJob>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM ingest_jobs ORDER BY created_at DESC LIMIT ?",
        JOB_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(job_from_row).collect())
}

/// Delete a job; entities, derived artifacts, and audit rows cascade.
pub async fn delete_job(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM ingest_jobs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) fn job_from_row(row: &sqlx::sqlite::SqliteRow) -> IngestJob {
    let kind: String = row.get("kind");
    let status: String = row.get("status");
    IngestJob {
        id: row.get("id"),
        source_uri: row.get("source_uri"),
        original_filename: row.get("original_filename"),
        artifact_path: row.get("artifact_path"),
        kind: ArtifactKind::parse(&kind),
        status: IngestStatus::parse(&status),
        sha256: row.get("sha256"),
        size_bytes: row.get("size_bytes"),
        content_type: row.get("content_type"),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
        metadata: parse_map(row.get("metadata_json")),
        text_content: row.get("text_content"),
        summary: parse_map(row.get("summary_json")),
    }
}

fn parse_map(raw: String) -> MetaMap {
    serde_json::from_str(&raw).unwrap_or_default()
}

fn parse_value(raw: String) -> serde_json::Value {
    serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null)
}
