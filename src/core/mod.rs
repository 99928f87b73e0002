//! Core pipeline module
//!
//! This module contains the import pipeline components:
//! - `traits` - Seams to account lookups and the remote API
//! - `field_mapper` - Regex/trim transform applied to raw fields
//! - `synthesizer` - Rows + mapping profile to candidate transactions
//! - `account_resolver` - Account resolution cache and local directory
//! - `issues` - Issue classification into filterable buckets
//! - `importer` - Sequential batched submission and its state machine
//! - `session` - One import session tying the stages together

pub mod account_resolver;
pub mod field_mapper;
pub mod importer;
pub mod issues;
pub mod session;
pub mod synthesizer;
pub mod traits;

pub use account_resolver::{AccountDirectory, AccountResolutionCache, Resolution};
pub use field_mapper::{FieldMapper, ParseOptions};
pub use importer::{
    BatchErrorPolicy, BatchImporter, ImportConfig, ImportProgress, ImportState,
};
pub use issues::{classify, IssueKind, IssueReport};
pub use session::ImportSession;
pub use synthesizer::{
    parse_amount, parse_date, AccountColumnMapping, ColumnMapping, CompiledMapping,
    DuplicateHandling, MappingOptions,
};
pub use traits::{AccountLookup, TransactionApi};
