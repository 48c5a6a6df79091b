//! Ingestion pipeline orchestration.
//!
//! Drives the full flow for one artifact: persist job record → detect
//! kind → extract → recognize entities → persist children and audit
//! events → summarize → finalize → build the proof bundle. The job row is
//! committed before extraction begins and is never rolled back; everything
//! after it shares one transaction, so a failed run leaves a discoverable
//! `failed` job without partial writes from the failing attempt.

use anyhow::{Context, Result};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use std::path::{Path, PathBuf};

use crate::audit::AuditTrail;
use crate::config::Config;
use crate::detect::ArtifactDetector;
use crate::entities::{extract_entities, EntityMatch};
use crate::error::TraceError;
use crate::extract::{DerivedFile, ExtractionResult, ExtractorSet};
use crate::fetch;
use crate::files::resolve_artifact_path;
use crate::hash::sha256_file;
use crate::jobs::{self, JobRecord};
use crate::models::{ArtifactKind, IngestJob, IngestStatus, MetaMap};
use crate::proof::ProofBuilder;

pub struct IngestService {
    config: Config,
    pool: SqlitePool,
    detector: ArtifactDetector,
    extractors: ExtractorSet,
}

impl IngestService {
    pub fn new(config: Config, pool: SqlitePool) -> IngestService {
        let extractors = ExtractorSet::from_config(&config);
        IngestService {
            config,
            pool,
            detector: ArtifactDetector::new(),
            extractors,
        }
    }

    /// Replace the extraction strategy table. Test seam, also usable by
    /// embedders that bring their own tooling.
    pub fn with_extractors(mut self, extractors: ExtractorSet) -> IngestService {
        self.extractors = extractors;
        self
    }

    /// Copy a file from disk into the artifact store and ingest it.
    pub async fn ingest_path(&self, path: &Path, source_uri: Option<&str>) -> Result<IngestJob> {
        let original_filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let destination =
            resolve_artifact_path(original_filename.as_deref(), &self.config.storage.data_dir)?;
        std::fs::copy(path, &destination)
            .with_context(|| format!("Failed to copy artifact from {}", path.display()))?;
        let source = source_uri
            .map(str::to_string)
            .unwrap_or_else(|| path.display().to_string());
        self.process_artifact(destination, source, original_filename, None)
            .await
    }

    /// Ingest already-materialized content handed over by a transport
    /// collaborator (HTTP upload, GUI drop, etc.).
    pub async fn ingest_bytes(
        &self,
        filename: Option<&str>,
        declared_mime: Option<&str>,
        bytes: &[u8],
        source_uri: Option<&str>,
    ) -> Result<IngestJob> {
        let destination = resolve_artifact_path(filename, &self.config.storage.data_dir)?;
        std::fs::write(&destination, bytes)
            .with_context(|| format!("Failed to store artifact: {}", destination.display()))?;
        let source = source_uri
            .or(filename)
            .unwrap_or("upload")
            .to_string();
        self.process_artifact(
            destination,
            source,
            filename.map(str::to_string),
            declared_mime,
        )
        .await
    }

    /// Download and ingest a remote artifact. Fails immediately with a
    /// configuration error when network fetching is disabled — no file is
    /// stored and no job row is created in that case.
    pub async fn ingest_url(&self, url: &str) -> Result<IngestJob> {
        if !self.config.network.enable_fetch {
            return Err(TraceError::NetworkFetchDisabled.into());
        }
        let filename = fetch::url_filename(url);
        let destination =
            resolve_artifact_path(filename.as_deref(), &self.config.storage.data_dir)?;
        let (path, mime) = fetch::download_url(&self.config, url, &destination).await?;
        let original_filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        self.process_artifact(path, url.to_string(), original_filename, Some(&mime))
            .await
    }

    /// Retrieve a job with all child collections populated.
    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        jobs::fetch_job(&self.pool, job_id).await
    }

    async fn process_artifact(
        &self,
        path: PathBuf,
        source_uri: String,
        original_filename: Option<String>,
        declared_mime: Option<&str>,
    ) -> Result<IngestJob> {
        let mut audit = AuditTrail::new(&self.config.storage.log_dir)?;
        audit.record(
            "info",
            "ingest.received",
            json!({"source": source_uri, "path": path.display().to_string()}),
        )?;

        let sha256 = sha256_file(&path)?;
        let size_bytes = std::fs::metadata(&path)?.len() as i64;
        let (kind, mime) = self.detector.detect(&path, declared_mime);
        audit.record(
            "info",
            "ingest.detected",
            json!({"kind": kind.as_str(), "mime": mime, "size": size_bytes}),
        )?;

        let job_id = self
            .create_job(
                &source_uri,
                original_filename.as_deref(),
                &path,
                kind,
                &sha256,
                &mime,
                size_bytes,
                &mut audit,
            )
            .await?;

        match self.run_pipeline(&job_id, kind, &path, &mut audit).await {
            Ok(job) => {
                audit.record("info", "ingest.completed", json!({"job_id": job_id}))?;
                tracing::info!(job_id, kind = kind.as_str(), "ingest completed");
                Ok(job)
            }
            Err(error) => {
                // the job row survives with a terminal failed status
                sqlx::query("UPDATE ingest_jobs SET status = ? WHERE id = ?")
                    .bind(IngestStatus::Failed.as_str())
                    .bind(&job_id)
                    .execute(&self.pool)
                    .await?;
                audit.record(
                    "error",
                    "ingest.failed",
                    json!({"job_id": job_id, "error": error.to_string()}),
                )?;
                tracing::warn!(job_id, error = %error, "ingest failed");
                Err(error)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_job(
        &self,
        source_uri: &str,
        original_filename: Option<&str>,
        path: &Path,
        kind: ArtifactKind,
        sha256: &str,
        mime: &str,
        size_bytes: i64,
        audit: &mut AuditTrail,
    ) -> Result<String> {
        let job_id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO ingest_jobs
                (id, source_uri, original_filename, artifact_path, kind, status,
                 sha256, size_bytes, content_type, created_at, metadata_json, summary_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '{}', '{}')
            "#,
        )
        .bind(&job_id)
        .bind(source_uri)
        .bind(original_filename)
        .bind(path.display().to_string())
        .bind(kind.as_str())
        .bind(IngestStatus::Processing.as_str())
        .bind(sha256)
        .bind(size_bytes)
        .bind(mime)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;
        audit.record("info", "ingest.job_created", json!({"job_id": job_id}))?;
        Ok(job_id)
    }

    async fn run_pipeline(
        &self,
        job_id: &str,
        kind: ArtifactKind,
        path: &Path,
        audit: &mut AuditTrail,
    ) -> Result<IngestJob> {
        audit.record(
            "info",
            format!("extract.{}", kind.as_str()).as_str(),
            json!({"path": path.display().to_string()}),
        )?;
        let work_dir = path
            .parent()
            .unwrap_or(&self.config.storage.data_dir)
            .join("keyframes");
        let result = self.extractors.get(kind).extract(path, &work_dir).await?;

        let text = result.text.clone().unwrap_or_default();
        let matches = if text.is_empty() {
            Vec::new()
        } else {
            extract_entities(&text)
        };

        let summary = self.summarize(kind, &matches);
        self.finalize(job_id, &result, &matches, &summary, audit)
            .await?;

        // step 8: assemble the proof bundle and record its path
        let builder = ProofBuilder::new(&self.config)?;
        let archive_path = builder.build(&self.pool, job_id, Some(audit.path())).await?;
        sqlx::query(
            "UPDATE ingest_jobs \
             SET summary_json = json_set(summary_json, '$.proof_archive', ?) \
             WHERE id = ?",
        )
        .bind(archive_path.display().to_string())
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        let record = jobs::fetch_job(&self.pool, job_id)
            .await?
            .context("job vanished during finalize")?;
        Ok(record.job)
    }

    /// Steps 2–7 of the pipeline share this transaction: entities, derived
    /// artifacts, audit rows, and the finalizing job update either all
    /// commit or none do.
    async fn finalize(
        &self,
        job_id: &str,
        result: &ExtractionResult,
        matches: &[EntityMatch],
        summary: &MetaMap,
        audit: &AuditTrail,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for entity in matches {
            sqlx::query(
                "INSERT INTO entities (id, job_id, kind, value, normalized, context, score) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(job_id)
            .bind(&entity.kind)
            .bind(&entity.value)
            .bind(&entity.normalized)
            .bind(&entity.context)
            .bind(entity.score)
            .execute(&mut *tx)
            .await?;
        }

        for derived in &result.derived_files {
            let sha256 = self.hash_derived(derived)?;
            sqlx::query(
                "INSERT INTO derived_artifacts (id, job_id, label, path, sha256, metadata_json) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(job_id)
            .bind(&derived.label)
            .bind(derived.path.display().to_string())
            .bind(&sha256)
            .bind(serde_json::to_string(&derived.metadata)?)
            .execute(&mut *tx)
            .await?;
        }

        for event in audit.events() {
            sqlx::query(
                "INSERT INTO audit_logs (id, job_id, created_at, level, event, details_json) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(job_id)
            .bind(event.timestamp.to_rfc3339())
            .bind(&event.level)
            .bind(&event.event)
            .bind(serde_json::to_string(&event.details)?)
            .execute(&mut *tx)
            .await?;
        }

        let completed_at = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE ingest_jobs \
             SET metadata_json = ?, text_content = ?, summary_json = ?, \
                 status = ?, completed_at = ? \
             WHERE id = ?",
        )
        .bind(serde_json::to_string(&result.metadata)?)
        .bind(&result.text)
        .bind(serde_json::to_string(summary)?)
        .bind(IngestStatus::Completed.as_str())
        .bind(&completed_at)
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Derived files are re-hashed at persistence time: what lands in the
    /// database is what was actually on disk, not what the extractor
    /// claims.
    fn hash_derived(&self, derived: &DerivedFile) -> Result<String> {
        sha256_file(&derived.path).with_context(|| {
            format!(
                "Failed to hash derived artifact '{}' at {}",
                derived.label,
                derived.path.display()
            )
        })
    }

    fn summarize(&self, kind: ArtifactKind, matches: &[EntityMatch]) -> MetaMap {
        let mut summary = MetaMap::new();
        summary.insert("artifact_kind".to_string(), json!(kind.as_str()));
        summary.insert("entities".to_string(), json!(matches.len()));
        if !matches.is_empty() {
            let kinds: Vec<&str> = matches
                .iter()
                .map(|entity| entity.kind.as_str())
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect();
            summary.insert("entity_kinds".to_string(), json!(kinds));
        }
        summary
    }
}
