//! Typed error conditions that callers need to distinguish.
//!
//! Most of the pipeline propagates `anyhow::Error`; this enum covers the
//! handful of conditions with distinct user-visible behavior (configuration
//! gates, missing proof inputs, evidence integrity violations).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    /// URL ingestion attempted while `[network] enable_fetch` is off.
    /// Raised before any job row is created.
    #[error("network fetching is disabled by configuration")]
    NetworkFetchDisabled,

    #[error("ingest job {0} not found")]
    JobNotFound(String),

    /// The job completed but no proof bundle was ever recorded for it.
    #[error("no proof bundle has been built for job {0}")]
    ProofNotBuilt(String),

    /// A bundle was recorded for the job but the archive file is gone.
    #[error("proof bundle for job {job_id} recorded at {path} but the file is missing")]
    ProofMissing { job_id: String, path: String },

    /// A derived artifact's bytes no longer match the hash recorded at
    /// creation time. The bundle must not be built from tampered evidence.
    #[error("derived artifact '{label}' hash mismatch: recorded {recorded}, computed {computed}")]
    DerivedHashMismatch {
        label: String,
        recorded: String,
        computed: String,
    },
}
