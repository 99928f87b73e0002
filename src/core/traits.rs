//! Core traits for account lookup and the remote finance API
//!
//! This module defines the seams between the pipeline and its collaborators,
//! so the offline preview and the remote import can share the same
//! resolution and classification code.

use crate::types::{Account, BatchResult, IdentifierKind, ImportError, NewTransaction};
use async_trait::async_trait;

/// Synchronous account lookup
///
/// Implemented by local account directories. Given a batch of values for one
/// identifier kind, returns every account matching any of them.
pub trait AccountLookup {
    fn find_accounts(&self, kind: IdentifierKind, values: &[String]) -> Vec<Account>;
}

/// Remote finance API as seen by the import pipeline
///
/// Implementations can talk HTTP ([`crate::api::HttpApi`]) or keep state in
/// memory ([`crate::api::InMemoryApi`]).
#[async_trait]
pub trait TransactionApi: Send + Sync {
    /// Batched account lookup for one identifier kind
    async fn find_accounts(
        &self,
        kind: IdentifierKind,
        values: &[String],
    ) -> Result<Vec<Account>, ImportError>;

    /// Return the subset of `identifiers` already persisted remotely
    async fn find_existing_identifiers(
        &self,
        identifiers: &[String],
    ) -> Result<Vec<String>, ImportError>;

    /// Create a batch of transactions
    async fn create_transactions(
        &self,
        transactions: &[NewTransaction],
    ) -> Result<BatchResult, ImportError>;
}
