//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Accounts and deferred account references
//! - `transaction`: Raw rows, candidate transactions and API payloads
//! - `error`: Error types for the import pipeline

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountId, AccountReference, IdentifierKind};
pub use error::ImportError;
pub use transaction::{
    BatchResult, CandidateTransaction, NewTransaction, ParsedAmount, ParsedDate, RawRow, RawTable,
};
