//! Append-only, redacted audit trail for a single ingestion run.
//!
//! Every recorded event is redacted (emails and phone numbers masked),
//! kept in an in-memory ordered list for later persistence, and appended
//! as one JSON line to a per-run log file. The append is flushed and
//! synced before `record` returns, so a crash after return cannot lose
//! the event.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::files::timestamped_stem;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z0-9._%+-]+)@([A-Za-z0-9.-]+\.[A-Za-z]{2,})\b").unwrap()
});
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d[\d\s().-]{6,}\d").unwrap());

/// Mask emails and phone numbers inside an arbitrary string.
///
/// Emails keep the first local-part character and the domain
/// (`a***@example.com`); phones keep the last 4 digits (`+***5678`), or
/// collapse to `***` when 4 digits or fewer survive stripping.
pub fn redact_text(value: &str) -> String {
    let masked_emails = EMAIL_RE.replace_all(value, |caps: &Captures| {
        let local = &caps[1];
        let domain = &caps[2];
        let first = local.chars().next().unwrap_or('*');
        format!("{}***@{}", first, domain)
    });
    PHONE_RE
        .replace_all(&masked_emails, |caps: &Captures| {
            let digits: String = caps[0].chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() <= 4 {
                "***".to_string()
            } else {
                format!("+***{}", &digits[digits.len() - 4..])
            }
        })
        .into_owned()
}

/// Recursively redact a JSON value: strings are masked, maps and lists are
/// redacted element-wise, everything else passes through unchanged.
pub fn redact_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(redact_text(s)),
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_value(v)))
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(redact_value).collect())
        }
        other => other.clone(),
    }
}

/// One immutable audit line. `details` is stored already redacted.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub event: String,
    pub details: serde_json::Value,
}

impl AuditEvent {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339(),
            "level": self.level,
            "event": self.event,
            "details": self.details,
        })
    }
}

/// Collect audit events for one ingestion run and persist them to JSONL.
pub struct AuditTrail {
    path: PathBuf,
    file: std::fs::File,
    events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new(log_dir: &Path) -> Result<AuditTrail> {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log dir: {}", log_dir.display()))?;
        let path = log_dir.join(format!("{}.jsonl", timestamped_stem("ingest")));
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open audit log: {}", path.display()))?;
        Ok(AuditTrail {
            path,
            file,
            events: Vec::new(),
        })
    }

    /// Redact `details`, append the event in memory, and durably append one
    /// JSON line to the run's log file before returning.
    pub fn record(
        &mut self,
        level: &str,
        event: &str,
        details: serde_json::Value,
    ) -> Result<&AuditEvent> {
        let audit_event = AuditEvent {
            timestamp: Utc::now(),
            level: level.to_string(),
            event: event.to_string(),
            details: redact_value(&details),
        };
        let line = serde_json::to_string(&audit_event.to_json())?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;
        self.file.sync_all()?;
        self.events.push(audit_event);
        Ok(self.events.last().expect("event just pushed"))
    }

    /// Ordered snapshot of everything recorded so far in this run.
    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    /// Path of the per-run JSONL log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
