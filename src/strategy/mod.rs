//! Import strategy module
//!
//! This module defines the Strategy pattern for complete import pipelines,
//! covering CSV decoding, candidate synthesis, account resolution and the
//! final output. Strategies are selected at runtime from the CLI:
//!
//! - `preview` - synchronous, offline; writes a per-row report
//! - `import` - asynchronous; resolves and submits against a remote API

use crate::api::HttpApi;
use crate::cli::StrategyType;
use crate::core::account_resolver::AccountDirectory;
use crate::core::importer::ImportConfig;
use crate::core::issues::IssueReport;
use crate::core::synthesizer::MappingOptions;
use crate::io::csv_format::CsvOptions;
use crate::types::ImportError;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub mod r#async;
pub mod sync;

pub use self::r#async::RemoteImportStrategy;
pub use sync::PreviewStrategy;

/// Import strategy trait for complete import pipelines
pub trait ImportStrategy: Send + Sync {
    /// Run the pipeline over `input_path`, writing the result to `output`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened or its header row is unreadable
    /// - The mapping profile does not compile
    /// - A remote call fails and the batch error policy is `Abort`
    /// - Output cannot be written
    ///
    /// Row-level problems are never errors; they show up as issues.
    fn run(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), ImportError>;
}

/// Everything a strategy needs besides the input file
#[derive(Debug, Clone, Default)]
pub struct StrategyOptions {
    pub mapping: MappingOptions,
    pub csv: CsvOptions,
    pub config: ImportConfig,
    /// Local accounts for offline resolution (preview only)
    pub accounts: Option<AccountDirectory>,
    /// Base URL of the remote API (import only)
    pub api_url: Option<String>,
    pub api_token: Option<String>,
}

/// Create an import strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - Which pipeline to build
/// * `options` - Mapping, tokenizer and import settings
///
/// # Returns
///
/// A boxed strategy, or an error when `import` is requested without an API
/// URL or the HTTP client cannot be built.
pub fn create_strategy(
    strategy_type: StrategyType,
    options: StrategyOptions,
) -> Result<Box<dyn ImportStrategy>, ImportError> {
    match strategy_type {
        StrategyType::Preview => Ok(Box::new(PreviewStrategy::new(options))),
        StrategyType::Import => {
            let url = options
                .api_url
                .clone()
                .ok_or_else(|| ImportError::invalid_config("--api-url is required for import"))?;
            let api = HttpApi::new(url, options.api_token.clone())?;
            Ok(Box::new(RemoteImportStrategy::new(api, options)))
        }
    }
}

/// Log one line per non-empty issue bucket
pub(crate) fn log_issue_counts(report: &IssueReport) {
    for (kind, count) in report.counts() {
        if count > 0 {
            info!(issue = %kind, count, "Rows with issue");
        }
    }
    info!(
        total = report.total(),
        importable = report.importable().len(),
        "Classification complete"
    );
}
