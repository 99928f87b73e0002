//! Account resolution cache
//!
//! Maps `(identifier kind, value)` pairs to their resolution state. Entries are
//! populated by batched lookups, either against a local [`AccountLookup`] or
//! the remote [`TransactionApi`].
//!
//! # Design
//!
//! The cache uses `DashMap` so the per-kind remote lookups, which run
//! concurrently, can record their results without a global lock. Values are
//! only ever looked up once per cache: anything already `Resolved`,
//! `Fetching` or `NotFound` is skipped by [`AccountResolutionCache::pending`].

use crate::core::traits::{AccountLookup, TransactionApi};
use crate::types::{
    Account, AccountReference, CandidateTransaction, IdentifierKind, ImportError,
};
use dashmap::DashMap;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Maximum number of values sent in one lookup call
pub const DEFAULT_LOOKUP_BATCH_SIZE: usize = 50;

/// Resolution state of one account reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Account),
    Fetching,
    NotFound,
}

type CacheKey = (IdentifierKind, String);

/// Thread-safe cache of account resolutions
#[derive(Debug, Default)]
pub struct AccountResolutionCache {
    entries: DashMap<CacheKey, Resolution>,
}

impl AccountResolutionCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Current state of `reference`, or `None` when never requested
    pub fn get(&self, reference: &AccountReference) -> Option<Resolution> {
        self.entries
            .get(&(reference.identifier_kind, reference.value.clone()))
            .map(|entry| entry.value().clone())
    }

    /// The resolved account, if `reference` resolved
    pub fn account(&self, reference: &AccountReference) -> Option<Account> {
        match self.get(reference) {
            Some(Resolution::Resolved(account)) => Some(account),
            _ => None,
        }
    }

    /// Whether a lookup for `reference` completed without a match
    pub fn is_not_found(&self, reference: &AccountReference) -> bool {
        matches!(self.get(reference), Some(Resolution::NotFound))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values referenced by `candidates` that have no cache entry yet
    ///
    /// Grouped by identifier kind, deduplicated, in first-seen order.
    pub fn pending(
        &self,
        candidates: &[CandidateTransaction],
    ) -> HashMap<IdentifierKind, Vec<String>> {
        let mut pending: HashMap<IdentifierKind, Vec<String>> = HashMap::new();
        let mut seen: HashSet<CacheKey> = HashSet::new();

        let references = candidates
            .iter()
            .flat_map(|c| c.source.iter().chain(c.destination.iter()));

        for reference in references {
            let key = (reference.identifier_kind, reference.value.clone());
            if self.entries.contains_key(&key) || !seen.insert(key) {
                continue;
            }
            pending
                .entry(reference.identifier_kind)
                .or_default()
                .push(reference.value.clone());
        }

        pending
    }

    /// Mark `values` as being fetched
    pub fn mark_fetching(&self, kind: IdentifierKind, values: &[String]) {
        for value in values {
            self.entries
                .insert((kind, value.clone()), Resolution::Fetching);
        }
    }

    /// Record the outcome of a lookup
    ///
    /// Every requested value becomes `Resolved` with the first matching
    /// account, or `NotFound` when nothing in `found` matches.
    pub fn record(&self, kind: IdentifierKind, requested: &[String], found: &[Account]) {
        for value in requested {
            let reference = AccountReference::new(kind, value.clone());
            let resolution = found
                .iter()
                .find(|account| reference.matches(account))
                .map(|account| Resolution::Resolved(account.clone()))
                .unwrap_or(Resolution::NotFound);
            self.entries.insert((kind, value.clone()), resolution);
        }
    }

    /// Drop `Fetching` markers for `values` so a later call can retry them
    fn forget_fetching(&self, kind: IdentifierKind, values: &[String]) {
        for value in values {
            self.entries
                .remove_if(&(kind, value.clone()), |_, r| *r == Resolution::Fetching);
        }
    }

    /// Resolve every pending reference against a local lookup
    pub fn populate_from<L: AccountLookup + ?Sized>(
        &self,
        lookup: &L,
        candidates: &[CandidateTransaction],
    ) {
        for (kind, values) in self.pending(candidates) {
            self.mark_fetching(kind, &values);
            let found = lookup.find_accounts(kind, &values);
            self.record(kind, &values, &found);
        }
    }

    /// Resolve every pending reference through the remote API
    ///
    /// Identifier kinds are looked up concurrently; within a kind, values are
    /// sent in sequential chunks of `batch_size`.
    ///
    /// # Errors
    ///
    /// Returns the first API error. Values whose lookup failed lose their
    /// `Fetching` marker so a later call requests them again.
    pub async fn populate_remote<A: TransactionApi + ?Sized>(
        &self,
        api: &A,
        candidates: &[CandidateTransaction],
        batch_size: usize,
    ) -> Result<(), ImportError> {
        let batch_size = batch_size.max(1);
        let pending = self.pending(candidates);

        let lookups = pending.into_iter().map(|(kind, values)| async move {
            for chunk in values.chunks(batch_size) {
                self.mark_fetching(kind, chunk);
                debug!(kind = %kind, count = chunk.len(), "Looking up accounts");
                match api.find_accounts(kind, chunk).await {
                    Ok(found) => self.record(kind, chunk, &found),
                    Err(e) => {
                        self.forget_fetching(kind, chunk);
                        return Err(e);
                    }
                }
            }
            Ok(())
        });

        join_all(lookups).await.into_iter().collect()
    }
}

/// In-memory list of accounts searchable by any identifier kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDirectory {
    accounts: Vec<Account>,
}

impl AccountDirectory {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountLookup for AccountDirectory {
    fn find_accounts(&self, kind: IdentifierKind, values: &[String]) -> Vec<Account> {
        let wanted: HashSet<&str> = values.iter().map(String::as_str).collect();
        self.accounts
            .iter()
            .filter(|account| {
                kind.value_of(account)
                    .is_some_and(|value| wanted.contains(value))
            })
            .cloned()
            .collect()
    }
}
