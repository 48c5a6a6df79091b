//! # tracecase
//!
//! A local-first artifact ingestion and evidence packaging toolkit for
//! forensic and OSINT analysts.
//!
//! tracecase ingests heterogeneous artifacts (images, videos, PDFs, plain
//! text, or remote URLs), extracts their content and metadata, detects
//! structured entities (emails, domains, phone numbers, monetary amounts,
//! payslip hints), and packages the results — together with a redacted,
//! append-only audit trail — into a portable, hash-verifiable proof bundle.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌───────────┐
//! │ Sources      │──▶│  Pipeline       │──▶│  SQLite    │
//! │ file/bytes/  │   │ detect+extract  │   │ jobs +     │
//! │ URL          │   │ +entities       │   │ children   │
//! └──────────────┘   └───────┬────────┘   └────┬──────┘
//!                            │                 │
//!                     ┌──────▼──────┐    ┌─────▼──────┐
//!                     │ Audit trail │    │ Proof      │
//!                     │ (JSONL)     │    │ bundle     │
//!                     └─────────────┘    │ (zip)      │
//!                                        └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tracecase init                        # create database
//! tracecase ingest ./payslip.pdf        # ingest a local file
//! tracecase fetch https://example.org/a # ingest a remote artifact
//! tracecase show <job-id>               # inspect a job
//! tracecase export <job-id> --out ./    # copy the proof bundle
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`detect`] | Artifact kind detection |
//! | [`extract`] | Per-kind extraction strategies |
//! | [`entities`] | Structured entity recognition |
//! | [`audit`] | Redacted per-run audit trail |
//! | [`ingest`] | Ingestion pipeline orchestration |
//! | [`proof`] | Proof bundle assembly |
//! | [`tools`] | External tool capabilities (OCR, ffprobe, ffmpeg) |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod audit;
pub mod config;
pub mod db;
pub mod detect;
pub mod entities;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod files;
pub mod hash;
pub mod ingest;
pub mod jobs;
pub mod migrate;
pub mod models;
pub mod proof;
pub mod show;
pub mod tools;
