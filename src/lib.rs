//! Budget CSV Import Library
//! # Overview
//!
//! This library turns bank statement CSV files into transactions for a
//! personal finance backend, with an offline preview strategy and an async
//! remote import strategy.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (raw rows, candidates, accounts, errors)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Pipeline components:
//!   - [`core::field_mapper`] - Regex extraction and trimming of raw fields
//!   - [`core::synthesizer`] - Mapping profile to candidate transactions
//!   - [`core::account_resolver`] - Account resolution cache
//!   - [`core::issues`] - Issue classification
//!   - [`core::importer`] - Sequential batched submission
//!   - [`core::session`] - Per-import state
//! - [`api`] - Remote API clients (HTTP and in-memory)
//! - [`io`] - CSV readers and report writers
//! - [`strategy`] - Pluggable end-to-end pipelines
//!
//! # Pipeline
//!
//! ```text
//! CSV file → RawTable → CandidateTransaction[] → IssueReport → NewTransaction batches
//!                ↑               ↑                    ↑
//!          MappingOptions   FieldMapper         AccountResolutionCache
//! ```
//!
//! Row-level problems never abort a run: unparseable dates or amounts,
//! unknown accounts and duplicates are classified as issues and the row is
//! held back from submission.

// Module declarations
pub mod api;
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{
    AccountResolutionCache, BatchImporter, FieldMapper, ImportSession, IssueKind, IssueReport,
    MappingOptions,
};
pub use io::{write_candidate_report, write_import_summary};
pub use types::{
    Account, AccountReference, BatchResult, CandidateTransaction, IdentifierKind, ImportError,
    NewTransaction, RawRow, RawTable,
};
