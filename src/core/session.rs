//! Import session state
//!
//! One `ImportSession` owns everything a single import needs: the raw table,
//! the mapping profile, the candidates derived from them, account
//! resolutions, known duplicates, the issue report and the importer state.
//! Any change to the mapping regenerates the candidates and the report from
//! scratch. Resolution is not rerun by a mapping change: references the new
//! mapping introduces stay unresolved, and keep their rows out of
//! [`ImportSession::importable`], until `resolve_local` or `resolve_remote`
//! runs again.

use crate::core::account_resolver::{AccountResolutionCache, Resolution};
use crate::core::importer::{
    prepare_transactions, BatchImporter, ImportConfig, ImportProgress, ImportState,
};
use crate::core::issues::{classify, IssueReport};
use crate::core::synthesizer::{CompiledMapping, MappingOptions};
use crate::core::traits::{AccountLookup, TransactionApi};
use crate::types::{BatchResult, CandidateTransaction, ImportError, NewTransaction, RawTable};
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub struct ImportSession {
    table: RawTable,
    mapping: MappingOptions,
    compiled: CompiledMapping,
    candidates: Vec<CandidateTransaction>,
    cache: AccountResolutionCache,
    known_duplicates: HashSet<String>,
    report: IssueReport,
    importer: BatchImporter,
}

impl ImportSession {
    /// Create a session and synthesize the initial candidates
    ///
    /// # Errors
    ///
    /// Returns the mapping's compile error (bad regex, bad separator, etc.).
    pub fn new(
        table: RawTable,
        mapping: MappingOptions,
        config: ImportConfig,
    ) -> Result<Self, ImportError> {
        let compiled = mapping.compile()?;
        let mut session = Self {
            table,
            mapping,
            compiled,
            candidates: Vec::new(),
            cache: AccountResolutionCache::new(),
            known_duplicates: HashSet::new(),
            report: IssueReport::default(),
            importer: BatchImporter::new(config),
        };
        session.regenerate();
        Ok(session)
    }

    /// Replace the mapping profile and regenerate candidates
    ///
    /// On error the previous mapping and candidates are kept. Account
    /// references that were not looked up before need another resolve call.
    pub fn set_mapping(&mut self, mapping: MappingOptions) -> Result<(), ImportError> {
        self.compiled = mapping.compile()?;
        self.mapping = mapping;
        self.regenerate();
        Ok(())
    }

    fn regenerate(&mut self) {
        self.candidates = self.compiled.synthesize(&self.table);
        debug!(rows = self.candidates.len(), "Candidates regenerated");
        self.reclassify();
    }

    fn reclassify(&mut self) {
        self.report = classify(&self.candidates, &self.cache, &self.known_duplicates);
    }

    pub fn table(&self) -> &RawTable {
        &self.table
    }

    pub fn mapping(&self) -> &MappingOptions {
        &self.mapping
    }

    pub fn candidates(&self) -> &[CandidateTransaction] {
        &self.candidates
    }

    pub fn report(&self) -> &IssueReport {
        &self.report
    }

    pub fn cache(&self) -> &AccountResolutionCache {
        &self.cache
    }

    pub fn state(&self) -> ImportState {
        self.importer.state()
    }

    /// Resolve account references against a local lookup
    pub fn resolve_local<L: AccountLookup + ?Sized>(&mut self, lookup: &L) {
        self.cache.populate_from(lookup, &self.candidates);
        self.reclassify();
    }

    /// Resolve account references and duplicate identifiers remotely
    pub async fn resolve_remote<A: TransactionApi + ?Sized>(
        &mut self,
        api: &A,
    ) -> Result<(), ImportError> {
        let lookup_batch_size = self.importer.config().lookup_batch_size.max(1);

        self.cache
            .populate_remote(api, &self.candidates, lookup_batch_size)
            .await?;

        let identifiers: Vec<String> = self
            .candidates
            .iter()
            .filter_map(|c| c.dedupe_identifier.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        for chunk in identifiers.chunks(lookup_batch_size) {
            let existing = api.find_existing_identifiers(chunk).await?;
            self.known_duplicates.extend(existing);
        }

        info!(
            accounts = self.cache.len(),
            duplicates = self.known_duplicates.len(),
            "Remote resolution complete"
        );
        self.reclassify();
        Ok(())
    }

    /// Mark identifiers as already present remotely
    pub fn add_known_duplicates<I: IntoIterator<Item = String>>(&mut self, identifiers: I) {
        self.known_duplicates.extend(identifiers);
        self.reclassify();
    }

    /// Rows carrying a reference that no lookup has answered yet
    pub fn unresolved_rows(&self) -> Vec<usize> {
        self.candidates
            .iter()
            .enumerate()
            .filter(|(_, candidate)| {
                candidate
                    .source
                    .iter()
                    .chain(candidate.destination.iter())
                    .any(|reference| {
                        !matches!(
                            self.cache.get(reference),
                            Some(Resolution::Resolved(_) | Resolution::NotFound)
                        )
                    })
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Rows free of issues whose references have all resolved, in row order
    pub fn importable(&self) -> Vec<usize> {
        let unresolved: HashSet<usize> = self.unresolved_rows().into_iter().collect();
        self.report
            .importable()
            .into_iter()
            .filter(|index| !unresolved.contains(index))
            .collect()
    }

    /// Payloads for every candidate free of issues, in row order
    pub fn pending_transactions(&self) -> Vec<NewTransaction> {
        prepare_transactions(&self.candidates, &self.report, &self.cache)
    }

    /// Submit the pending transactions in batches
    ///
    /// # Errors
    ///
    /// Returns `ImportError::InvalidState` without calling the API when a row
    /// with no issue still has unresolved references, e.g. after a mapping
    /// change that was not followed by a resolve call.
    pub async fn import<A, F>(&mut self, api: &A, on_progress: F) -> Result<BatchResult, ImportError>
    where
        A: TransactionApi + ?Sized,
        F: FnMut(&ImportProgress),
    {
        let held_back = self.report.importable().len() - self.importable().len();
        if held_back > 0 {
            warn!(rows = held_back, "Rows have unresolved account references");
            return Err(ImportError::invalid_state("resolved", "unresolved"));
        }

        let transactions = self.pending_transactions();
        self.importer.run(api, &transactions, on_progress).await
    }
}
