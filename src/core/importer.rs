//! Batched submission of validated transactions
//!
//! The importer sends transactions to the remote "create many" endpoint in
//! fixed-size batches, strictly one after another: a batch is not dispatched
//! until the previous call has returned. Results from every batch are folded
//! into one succeeded / failed / duplicate triple.
//!
//! # State Machine
//!
//! ```text
//! Waiting ──run()──> Importing ──all batches done──> Imported
//! ```
//!
//! The machine is linear. There is no cancellation and no resume: a session
//! that aborted on a batch error stays in `Importing`.

use crate::core::account_resolver::AccountResolutionCache;
use crate::core::issues::IssueReport;
use crate::core::traits::TransactionApi;
use crate::types::{BatchResult, CandidateTransaction, ImportError, NewTransaction};
use std::fmt;
use tracing::{debug, info, warn};

/// Default number of transactions per batch
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// What to do when a batch call fails after all retries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchErrorPolicy {
    /// Stop and return the error
    #[default]
    Abort,
    /// Count the whole batch as failed and move on
    MarkFailed,
}

/// Configuration for batched submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportConfig {
    /// Number of transactions per batch
    pub batch_size: usize,
    /// Extra attempts per batch after the first failure
    pub retry_attempts: u32,
    /// Behavior once a batch has exhausted its attempts
    pub on_batch_error: BatchErrorPolicy,
    /// Number of values per account or identifier lookup call
    pub lookup_batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            retry_attempts: 0,
            on_batch_error: BatchErrorPolicy::Abort,
            lookup_batch_size: crate::core::account_resolver::DEFAULT_LOOKUP_BATCH_SIZE,
        }
    }
}

impl ImportConfig {
    /// Create an ImportConfig with custom values
    ///
    /// A zero batch size falls back to the default with a warning.
    pub fn new(batch_size: usize, retry_attempts: u32, on_batch_error: BatchErrorPolicy) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "Invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        Self {
            batch_size,
            retry_attempts,
            on_batch_error,
            ..default
        }
    }
}

/// Import session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Waiting,
    Importing,
    Imported,
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportState::Waiting => "waiting",
            ImportState::Importing => "importing",
            ImportState::Imported => "imported",
        };
        f.write_str(name)
    }
}

/// Snapshot reported after each batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportProgress {
    /// Zero-based index of the batch just completed
    pub batch_index: usize,
    pub batches_total: usize,
    /// Offset of the batch's first transaction
    pub offset: usize,
    /// Transactions dispatched so far
    pub dispatched: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duplicate: usize,
}

/// Sequential batch submitter
#[derive(Debug, Clone)]
pub struct BatchImporter {
    config: ImportConfig,
    state: ImportState,
}

impl BatchImporter {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            state: ImportState::Waiting,
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Number of create calls needed for `count` transactions
    pub fn batch_count(&self, count: usize) -> usize {
        count.div_ceil(self.config.batch_size.max(1))
    }

    /// Submit `transactions` in sequential batches
    ///
    /// `on_progress` is called once after every batch, in offset order.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the importer is not `Waiting`
    /// - The batch's API error under [`BatchErrorPolicy::Abort`]; the importer
    ///   then stays in `Importing`
    pub async fn run<A, F>(
        &mut self,
        api: &A,
        transactions: &[NewTransaction],
        mut on_progress: F,
    ) -> Result<BatchResult, ImportError>
    where
        A: TransactionApi + ?Sized,
        F: FnMut(&ImportProgress),
    {
        if self.state != ImportState::Waiting {
            return Err(ImportError::invalid_state(
                &ImportState::Waiting.to_string(),
                &self.state.to_string(),
            ));
        }
        self.state = ImportState::Importing;

        let batch_size = self.config.batch_size.max(1);
        let batches_total = self.batch_count(transactions.len());
        let mut outcome = BatchResult::default();
        let mut dispatched = 0;

        info!(
            transactions = transactions.len(),
            batches = batches_total,
            "Starting import"
        );

        for (batch_index, batch) in transactions.chunks(batch_size).enumerate() {
            let offset = batch_index * batch_size;
            debug!(batch_index, offset, size = batch.len(), "Dispatching batch");

            match self.submit_with_retry(api, batch).await {
                Ok(result) => outcome.absorb(result),
                Err(e) => match self.config.on_batch_error {
                    BatchErrorPolicy::Abort => return Err(e),
                    BatchErrorPolicy::MarkFailed => {
                        warn!(batch_index, offset, error = %e, "Batch failed, marking as failed");
                        outcome.failed.extend(batch.iter().cloned());
                    }
                },
            }

            dispatched += batch.len();
            on_progress(&ImportProgress {
                batch_index,
                batches_total,
                offset,
                dispatched,
                total: transactions.len(),
                succeeded: outcome.succeeded.len(),
                failed: outcome.failed.len(),
                duplicate: outcome.duplicate.len(),
            });
        }

        self.state = ImportState::Imported;
        info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            duplicate = outcome.duplicate.len(),
            "Import finished"
        );

        Ok(outcome)
    }

    async fn submit_with_retry<A>(
        &self,
        api: &A,
        batch: &[NewTransaction],
    ) -> Result<BatchResult, ImportError>
    where
        A: TransactionApi + ?Sized,
    {
        let mut attempt = 0;
        loop {
            match api.create_transactions(batch).await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < self.config.retry_attempts => {
                    attempt += 1;
                    warn!(attempt, error = %e, "Batch call failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Build the API payload for a candidate
///
/// Returns `None` unless date and amount are valid and every reference the
/// candidate carries has resolved to an account.
pub fn to_new_transaction(
    candidate: &CandidateTransaction,
    cache: &AccountResolutionCache,
) -> Option<NewTransaction> {
    let date_time = candidate.parsed_date.value()?;
    let amount = candidate.amount.value()?;

    let source_id = match &candidate.source {
        Some(reference) => Some(cache.account(reference)?.id),
        None => None,
    };
    let destination_id = match &candidate.destination {
        Some(reference) => Some(cache.account(reference)?.id),
        None => None,
    };

    Some(NewTransaction {
        date_time,
        description: candidate.description.clone(),
        source_id,
        destination_id,
        identifier: candidate.dedupe_identifier.clone(),
        amount,
    })
}

/// Payloads for every importable candidate, in input order
pub fn prepare_transactions(
    candidates: &[CandidateTransaction],
    report: &IssueReport,
    cache: &AccountResolutionCache,
) -> Vec<NewTransaction> {
    report
        .importable()
        .into_iter()
        .filter_map(|index| candidates.get(index))
        .filter_map(|candidate| to_new_transaction(candidate, cache))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryApi;
    use crate::types::{
        Account, AccountReference, IdentifierKind, ParsedAmount, ParsedDate,
    };
    use chrono::NaiveDate;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transactions(count: usize) -> Vec<NewTransaction> {
        (0..count)
            .map(|i| NewTransaction {
                date_time: NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                description: format!("row {}", i),
                source_id: Some("1".to_string()),
                destination_id: None,
                identifier: Some(format!("id-{}", i)),
                amount: Decimal::from(i as i64 + 1),
            })
            .collect()
    }

    #[rstest]
    #[case::exact_multiple(10, 5, 2)]
    #[case::remainder(11, 5, 3)]
    #[case::single_partial(3, 100, 1)]
    #[case::batch_of_one(4, 1, 4)]
    #[case::nothing(0, 5, 0)]
    #[tokio::test]
    async fn test_dispatches_ceil_batches_in_order(
        #[case] count: usize,
        #[case] batch_size: usize,
        #[case] expected_calls: usize,
    ) {
        let api = InMemoryApi::default();
        let mut importer =
            BatchImporter::new(ImportConfig::new(batch_size, 0, BatchErrorPolicy::Abort));
        let mut offsets = Vec::new();

        let outcome = importer
            .run(&api, &transactions(count), |p| offsets.push(p.offset))
            .await
            .unwrap();

        assert_eq!(api.create_calls(), expected_calls);
        assert_eq!(offsets.len(), expected_calls);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(outcome.succeeded.len(), count);
        assert_eq!(importer.state(), ImportState::Imported);
    }

    #[tokio::test]
    async fn test_records_created_in_submission_order() {
        let api = InMemoryApi::default();
        let mut importer = BatchImporter::new(ImportConfig::new(2, 0, BatchErrorPolicy::Abort));
        importer.run(&api, &transactions(5), |_| {}).await.unwrap();

        let descriptions: Vec<String> = api
            .created()
            .into_iter()
            .map(|tx| tx.description)
            .collect();
        assert_eq!(
            descriptions,
            vec!["row 0", "row 1", "row 2", "row 3", "row 4"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_bucket_from_remote() {
        let api = InMemoryApi::default().with_existing_identifiers(["id-1"]);
        let mut importer = BatchImporter::new(ImportConfig::default());
        let outcome = importer.run(&api, &transactions(3), |_| {}).await.unwrap();
        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(outcome.duplicate.len(), 1);
        assert_eq!(outcome.duplicate[0].identifier.as_deref(), Some("id-1"));
    }

    #[tokio::test]
    async fn test_progress_reports_running_totals() {
        let api = InMemoryApi::default();
        let mut importer = BatchImporter::new(ImportConfig::new(2, 0, BatchErrorPolicy::Abort));
        let mut reports = Vec::new();
        importer
            .run(&api, &transactions(3), |p| reports.push(p.clone()))
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].dispatched, 2);
        assert_eq!(reports[1].dispatched, 3);
        assert_eq!(reports[1].succeeded, 3);
        assert_eq!(reports[1].batches_total, 2);
    }

    #[tokio::test]
    async fn test_second_run_is_rejected() {
        let api = InMemoryApi::default();
        let mut importer = BatchImporter::new(ImportConfig::default());
        importer.run(&api, &transactions(1), |_| {}).await.unwrap();

        let result = importer.run(&api, &transactions(1), |_| {}).await;
        assert!(matches!(result, Err(ImportError::InvalidState { .. })));
        assert_eq!(api.create_calls(), 1);
    }

    /// API whose create call fails a fixed number of times
    struct FlakyApi {
        inner: InMemoryApi,
        failures_left: AtomicU32,
    }

    #[async_trait::async_trait]
    impl TransactionApi for FlakyApi {
        async fn find_accounts(
            &self,
            kind: IdentifierKind,
            values: &[String],
        ) -> Result<Vec<Account>, ImportError> {
            self.inner.find_accounts(kind, values).await
        }

        async fn find_existing_identifiers(
            &self,
            identifiers: &[String],
        ) -> Result<Vec<String>, ImportError> {
            self.inner.find_existing_identifiers(identifiers).await
        }

        async fn create_transactions(
            &self,
            transactions: &[NewTransaction],
        ) -> Result<BatchResult, ImportError> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(ImportError::api("create_transactions", "503"));
            }
            self.inner.create_transactions(transactions).await
        }
    }

    fn flaky(failures: u32) -> FlakyApi {
        FlakyApi {
            inner: InMemoryApi::default(),
            failures_left: AtomicU32::new(failures),
        }
    }

    #[tokio::test]
    async fn test_no_retry_by_default_and_abort_leaves_importing() {
        let api = flaky(1);
        let mut importer = BatchImporter::new(ImportConfig::default());
        let result = importer.run(&api, &transactions(3), |_| {}).await;

        assert!(matches!(result, Err(ImportError::Api { .. })));
        assert_eq!(importer.state(), ImportState::Importing);
        assert!(api.inner.created().is_empty());
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let api = flaky(2);
        let mut importer = BatchImporter::new(ImportConfig::new(10, 2, BatchErrorPolicy::Abort));
        let outcome = importer.run(&api, &transactions(3), |_| {}).await.unwrap();
        assert_eq!(outcome.succeeded.len(), 3);
    }

    #[tokio::test]
    async fn test_mark_failed_continues_forward() {
        let api = flaky(1);
        let mut importer =
            BatchImporter::new(ImportConfig::new(2, 0, BatchErrorPolicy::MarkFailed));
        let outcome = importer.run(&api, &transactions(4), |_| {}).await.unwrap();

        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(outcome.succeeded[0].description, "row 2");
        assert_eq!(importer.state(), ImportState::Imported);
    }

    #[test]
    fn test_zero_batch_size_falls_back() {
        let config = ImportConfig::new(0, 0, BatchErrorPolicy::Abort);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_to_new_transaction_requires_resolved_accounts() {
        let cache = AccountResolutionCache::new();
        cache.record(
            IdentifierKind::Name,
            &["Checking".to_string(), "Ghost".to_string()],
            &[Account::new("1", "Checking")],
        );
        let date = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut candidate = CandidateTransaction {
            row_number: 1,
            date_text: "2024-05-06".to_string(),
            parsed_date: ParsedDate::Valid(date),
            description: "Rent".to_string(),
            source: Some(AccountReference::new(IdentifierKind::Name, "Checking")),
            destination: None,
            dedupe_identifier: Some("r1".to_string()),
            amount: ParsedAmount::Valid(Decimal::new(-90000, 2)),
        };

        let tx = to_new_transaction(&candidate, &cache).unwrap();
        assert_eq!(tx.source_id.as_deref(), Some("1"));
        assert_eq!(tx.destination_id, None);
        assert_eq!(tx.identifier.as_deref(), Some("r1"));

        candidate.destination = Some(AccountReference::new(IdentifierKind::Name, "Ghost"));
        assert!(to_new_transaction(&candidate, &cache).is_none());

        candidate.destination = None;
        candidate.amount = ParsedAmount::Invalid;
        assert!(to_new_transaction(&candidate, &cache).is_none());
    }
}
