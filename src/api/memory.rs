//! In-memory finance API
//!
//! Holds an account directory and the set of identifiers already persisted.
//! Created transactions are kept in submission order and every create call
//! is counted, which makes the type useful for dry runs and tests alike.

use crate::core::account_resolver::AccountDirectory;
use crate::core::traits::{AccountLookup, TransactionApi};
use crate::types::{Account, BatchResult, IdentifierKind, ImportError, NewTransaction};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct InMemoryApi {
    directory: AccountDirectory,
    existing: DashSet<String>,
    created: DashMap<usize, NewTransaction>,
    create_calls: AtomicUsize,
}

impl InMemoryApi {
    pub fn new(directory: AccountDirectory) -> Self {
        Self {
            directory,
            ..Default::default()
        }
    }

    /// Seed identifiers that count as already imported
    pub fn with_existing_identifiers<I, S>(self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for identifier in identifiers {
            self.existing.insert(identifier.into());
        }
        self
    }

    /// Transactions created so far, in submission order
    pub fn created(&self) -> Vec<NewTransaction> {
        let mut entries: Vec<(usize, NewTransaction)> = self
            .created
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, tx)| tx).collect()
    }

    /// Number of create calls received
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionApi for InMemoryApi {
    async fn find_accounts(
        &self,
        kind: IdentifierKind,
        values: &[String],
    ) -> Result<Vec<Account>, ImportError> {
        Ok(self.directory.find_accounts(kind, values))
    }

    async fn find_existing_identifiers(
        &self,
        identifiers: &[String],
    ) -> Result<Vec<String>, ImportError> {
        Ok(identifiers
            .iter()
            .filter(|id| self.existing.contains(id.as_str()))
            .cloned()
            .collect())
    }

    /// Duplicates are identifiers already present; transactions with neither
    /// account fail; everything else is stored.
    async fn create_transactions(
        &self,
        transactions: &[NewTransaction],
    ) -> Result<BatchResult, ImportError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut result = BatchResult::default();

        for tx in transactions {
            let is_duplicate = tx
                .identifier
                .as_ref()
                .is_some_and(|id| self.existing.contains(id.as_str()));

            if is_duplicate {
                result.duplicate.push(tx.clone());
            } else if tx.source_id.is_none() && tx.destination_id.is_none() {
                result.failed.push(tx.clone());
            } else {
                if let Some(id) = &tx.identifier {
                    self.existing.insert(id.clone());
                }
                self.created.insert(self.created.len(), tx.clone());
                result.succeeded.push(tx.clone());
            }
        }

        Ok(result)
    }
}
