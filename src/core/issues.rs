//! Issue classification for candidate transactions
//!
//! Partitions candidates into filterable buckets. A candidate may land in
//! several buckets; within each bucket rows keep their input order. The
//! classification is a pure function of its inputs, so re-running it on the
//! same candidates, cache and duplicate set gives the same report.

use crate::core::account_resolver::AccountResolutionCache;
use crate::types::{AccountReference, CandidateTransaction};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Kind of problem detected on a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueKind {
    /// A source or destination reference was looked up and not found
    MissingAccount,
    /// Neither source nor destination is referenced
    NoAccount,
    /// Source and destination resolve to the same account
    SameSourceDestination,
    /// The dedupe identifier already exists remotely
    DuplicateIdentifier,
    /// Date or amount could not be parsed
    ParseError,
}

impl IssueKind {
    pub const ALL: [IssueKind; 5] = [
        IssueKind::MissingAccount,
        IssueKind::NoAccount,
        IssueKind::SameSourceDestination,
        IssueKind::DuplicateIdentifier,
        IssueKind::ParseError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingAccount => "missing_account",
            IssueKind::NoAccount => "no_account",
            IssueKind::SameSourceDestination => "same_source_destination",
            IssueKind::DuplicateIdentifier => "duplicate_identifier",
            IssueKind::ParseError => "parse_error",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partitions of a candidate set, by row index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueReport {
    partitions: BTreeMap<IssueKind, Vec<usize>>,
    total: usize,
}

impl IssueReport {
    /// Row indices in the `kind` bucket, in input order
    pub fn filter(&self, kind: IssueKind) -> &[usize] {
        self.partitions
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Size of every bucket, including empty ones
    pub fn counts(&self) -> BTreeMap<IssueKind, usize> {
        IssueKind::ALL
            .iter()
            .map(|kind| (*kind, self.filter(*kind).len()))
            .collect()
    }

    /// Every issue recorded for `row_index`
    pub fn issues_for(&self, row_index: usize) -> Vec<IssueKind> {
        IssueKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.filter(*kind).binary_search(&row_index).is_ok())
            .collect()
    }

    /// Rows with no issue at all, in input order
    pub fn importable(&self) -> Vec<usize> {
        let flagged: HashSet<usize> = self.partitions.values().flatten().copied().collect();
        (0..self.total).filter(|i| !flagged.contains(i)).collect()
    }

    /// Number of candidates classified
    pub fn total(&self) -> usize {
        self.total
    }

    fn push(&mut self, kind: IssueKind, row_index: usize) {
        self.partitions.entry(kind).or_default().push(row_index);
    }
}

/// Classify `candidates` against resolved accounts and known duplicates
pub fn classify(
    candidates: &[CandidateTransaction],
    cache: &AccountResolutionCache,
    known_duplicates: &HashSet<String>,
) -> IssueReport {
    let mut report = IssueReport {
        partitions: BTreeMap::new(),
        total: candidates.len(),
    };

    for (index, candidate) in candidates.iter().enumerate() {
        let references: Vec<&AccountReference> = candidate
            .source
            .iter()
            .chain(candidate.destination.iter())
            .collect();

        if references.is_empty() {
            report.push(IssueKind::NoAccount, index);
        } else if references.iter().any(|r| cache.is_not_found(r)) {
            report.push(IssueKind::MissingAccount, index);
        }

        if let (Some(source), Some(destination)) = (&candidate.source, &candidate.destination) {
            if let (Some(a), Some(b)) = (cache.account(source), cache.account(destination)) {
                if a.id == b.id {
                    report.push(IssueKind::SameSourceDestination, index);
                }
            }
        }

        if candidate
            .dedupe_identifier
            .as_ref()
            .is_some_and(|id| known_duplicates.contains(id))
        {
            report.push(IssueKind::DuplicateIdentifier, index);
        }

        if candidate.has_parse_error() {
            report.push(IssueKind::ParseError, index);
        }
    }

    report
}
