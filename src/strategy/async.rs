//! Asynchronous remote import strategy
//!
//! # Architecture
//!
//! ```text
//! RemoteImportStrategy<A: TransactionApi>
//!     ├── AsyncReader (csv-async over tokio::fs::File)
//!     ├── ImportSession
//!     │     ├── AccountResolutionCache (concurrent lookups per identifier kind)
//!     │     └── IssueReport
//!     └── BatchImporter (sequential batches, retry + error policy)
//! ```
//!
//! The strategy owns a tokio multi-threaded runtime for the duration of one
//! run. Account lookups for different identifier kinds run concurrently;
//! transaction batches are always submitted one after another.

use crate::core::session::ImportSession;
use crate::core::traits::TransactionApi;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_import_summary;
use crate::strategy::{log_issue_counts, ImportStrategy, StrategyOptions};
use crate::types::ImportError;
use std::io::Write;
use std::path::Path;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::info;

/// Resolve and submit candidates against a [`TransactionApi`]
#[derive(Debug, Clone)]
pub struct RemoteImportStrategy<A: TransactionApi> {
    api: A,
    options: StrategyOptions,
}

impl<A: TransactionApi> RemoteImportStrategy<A> {
    /// Create a new strategy talking to `api`
    ///
    /// # Arguments
    ///
    /// * `api` - Remote finance API (HTTP in production, in-memory in tests)
    /// * `options` - Mapping, tokenizer and batching settings
    pub fn new(api: A, options: StrategyOptions) -> Self {
        Self { api, options }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    async fn run_async(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), ImportError> {
        let file = tokio::fs::File::open(input_path)
            .await
            .map_err(|e| ImportError::from_open(input_path, e))?;

        let table = AsyncReader::new(file.compat(), self.options.csv)
            .read_table()
            .await?;
        info!(rows = table.len(), columns = table.headers.len(), "File decoded");

        let mut session = ImportSession::new(
            table,
            self.options.mapping.clone(),
            self.options.config.clone(),
        )?;

        session.resolve_remote(&self.api).await?;
        log_issue_counts(session.report());

        let skipped = session.candidates().len() - session.pending_transactions().len();
        info!(skipped, "Rows held back by issues");

        let outcome = session
            .import(&self.api, |progress| {
                info!(
                    batch = progress.batch_index + 1,
                    of = progress.batches_total,
                    dispatched = progress.dispatched,
                    total = progress.total,
                    succeeded = progress.succeeded,
                    failed = progress.failed,
                    duplicate = progress.duplicate,
                    "Batch submitted"
                );
            })
            .await?;

        write_import_summary(&outcome, skipped, output)
    }
}

impl<A: TransactionApi> ImportStrategy for RemoteImportStrategy<A> {
    /// Run the full remote pipeline
    ///
    /// 1. Creates a tokio multi-threaded runtime
    /// 2. Decodes the file with `AsyncReader`
    /// 3. Synthesizes candidates and resolves accounts and duplicates remotely
    /// 4. Submits issue-free candidates in sequential batches
    /// 5. Writes the `status,count` summary
    fn run(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), ImportError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ImportError::Runtime {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(self.run_async(input_path, output))
    }
}
