//! Synchronous preview strategy
//!
//! Runs the pipeline without touching the network: the file is decoded with
//! `SyncReader`, candidates are synthesized and classified, accounts are
//! resolved against an optional local directory, and one report line per
//! row is written.
//!
//! Without a directory every account reference classifies as
//! `missing_account`, which is still useful to check a mapping profile.

use crate::core::account_resolver::AccountDirectory;
use crate::core::session::ImportSession;
use crate::io::csv_format::write_candidate_report;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{log_issue_counts, ImportStrategy, StrategyOptions};
use crate::types::ImportError;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Synchronous, offline preview
///
/// # Examples
///
/// ```no_run
/// use budget_csv_import::strategy::{ImportStrategy, PreviewStrategy, StrategyOptions};
/// use std::path::Path;
///
/// let strategy = PreviewStrategy::new(StrategyOptions::default());
/// let mut output = std::io::stdout();
/// strategy.run(Path::new("statement.csv"), &mut output).expect("Preview failed");
/// ```
#[derive(Debug, Clone)]
pub struct PreviewStrategy {
    options: StrategyOptions,
}

impl PreviewStrategy {
    pub fn new(options: StrategyOptions) -> Self {
        Self { options }
    }
}

impl ImportStrategy for PreviewStrategy {
    fn run(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), ImportError> {
        let table = SyncReader::new(input_path, self.options.csv)?.into_table();
        info!(rows = table.len(), columns = table.headers.len(), "File decoded");

        let mut session = ImportSession::new(
            table,
            self.options.mapping.clone(),
            self.options.config.clone(),
        )?;

        match &self.options.accounts {
            Some(directory) => {
                debug!(accounts = directory.len(), "Resolving against local accounts");
                session.resolve_local(directory);
            }
            None => {
                debug!("No accounts file, every reference is missing");
                session.resolve_local(&AccountDirectory::default());
            }
        }

        log_issue_counts(session.report());

        write_candidate_report(
            session.candidates(),
            session.report(),
            session.cache(),
            output,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synthesizer::{AccountColumnMapping, ColumnMapping, MappingOptions};
    use crate::types::{Account, IdentifierKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn options() -> StrategyOptions {
        StrategyOptions {
            mapping: MappingOptions {
                date: Some(ColumnMapping::new("Date")),
                description: Some(ColumnMapping::new("Memo")),
                amount: Some(ColumnMapping::new("Amount")),
                source: Some(AccountColumnMapping::new("Account", IdentifierKind::Name)),
                ..MappingOptions::default()
            },
            ..StrategyOptions::default()
        }
    }

    #[test]
    fn test_preview_without_accounts() {
        let file = create_temp_csv("Date,Memo,Amount,Account\n2024-01-02,Coffee,-3.50,Checking\n");

        let mut output = Vec::new();
        PreviewStrategy::new(options())
            .run(file.path(), &mut output)
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output.lines().nth(1),
            Some("1,2024-01-02 00:00:00,Coffee,-3.50,,,,missing_account")
        );
    }

    #[test]
    fn test_preview_with_accounts() {
        let file = create_temp_csv(
            "Date,Memo,Amount,Account\n2024-01-02,Coffee,-3.50,Checking\n2024-01-03,Tea,abc,Checking\n",
        );
        let mut options = options();
        options.accounts = Some(AccountDirectory::new(vec![Account::new("7", "Checking")]));

        let mut output = Vec::new();
        PreviewStrategy::new(options)
            .run(file.path(), &mut output)
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "1,2024-01-02 00:00:00,Coffee,-3.50,7,,,");
        assert_eq!(lines[2], "2,2024-01-03 00:00:00,Tea,invalid,7,,,parse_error");
    }

    #[test]
    fn test_preview_handles_missing_file() {
        let mut output = Vec::new();
        let result = PreviewStrategy::new(options()).run(Path::new("nonexistent.csv"), &mut output);
        assert!(matches!(result, Err(ImportError::FileNotFound { .. })));
    }

    #[test]
    fn test_preview_rejects_bad_regex() {
        let file = create_temp_csv("Date,Memo,Amount,Account\n");
        let mut options = options();
        options.mapping.description = Some(
            ColumnMapping::new("Memo")
                .with_parse(crate::core::field_mapper::ParseOptions::with_regex("[", "$0")),
        );

        let mut output = Vec::new();
        let result = PreviewStrategy::new(options).run(file.path(), &mut output);
        assert!(matches!(result, Err(ImportError::InvalidRegex { .. })));
    }

    #[test]
    fn test_preview_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PreviewStrategy>();
    }
}
