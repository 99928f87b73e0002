use crate::core::importer::{BatchErrorPolicy, ImportConfig, DEFAULT_BATCH_SIZE};
use crate::io::csv_format::CsvOptions;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Import bank statement CSV files into a budgeting backend
#[derive(Parser, Debug)]
#[command(name = "budget-import")]
#[command(about = "Map, classify and import bank statement CSV files", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path
    #[arg(value_name = "INPUT", help = "Path to the bank statement CSV file")]
    pub input_file: PathBuf,

    /// Pipeline to run
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "preview",
        help = "'preview' writes a per-row report offline, 'import' submits to the API"
    )]
    pub strategy: StrategyType,

    /// Mapping profile (JSON)
    #[arg(long = "mapping", value_name = "FILE", help = "Path to the JSON mapping profile")]
    pub mapping: PathBuf,

    /// Local accounts file (preview only)
    #[arg(
        long = "accounts",
        value_name = "FILE",
        help = "CSV with id,name,account_number used to resolve accounts offline"
    )]
    pub accounts: Option<PathBuf>,

    #[arg(
        long = "delimiter",
        value_name = "CHAR",
        default_value = ",",
        help = "Field delimiter (single ASCII character)"
    )]
    pub delimiter: char,

    #[arg(long = "no-headers", help = "The file has no header row; columns become 'Column N'")]
    pub no_headers: bool,

    #[arg(long = "api-url", value_name = "URL", help = "Base URL of the finance API (import only)")]
    pub api_url: Option<String>,

    #[arg(
        long = "api-token",
        value_name = "TOKEN",
        env = "BUDGET_API_TOKEN",
        help = "Bearer token for the finance API"
    )]
    pub api_token: Option<String>,

    /// Number of transactions per create call (import only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of transactions per create call (default: 100)"
    )]
    pub batch_size: Option<usize>,

    #[arg(
        long = "retry-attempts",
        value_name = "COUNT",
        default_value_t = 0,
        help = "Extra attempts for a failed create call"
    )]
    pub retry_attempts: u32,

    #[arg(
        long = "continue-on-error",
        help = "Mark a batch that keeps failing as failed and carry on"
    )]
    pub continue_on_error: bool,

    #[arg(short = 'v', long = "verbose", help = "Enable debug logging")]
    pub verbose: bool,
}

/// Available import pipelines
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Preview,
    Import,
}

impl CliArgs {
    /// Create an ImportConfig from CLI arguments
    ///
    /// Zero batch sizes fall back to the default with a warning (see
    /// [`ImportConfig::new`]).
    pub fn to_import_config(&self) -> ImportConfig {
        let policy = if self.continue_on_error {
            BatchErrorPolicy::MarkFailed
        } else {
            BatchErrorPolicy::Abort
        };

        ImportConfig::new(
            self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            self.retry_attempts,
            policy,
        )
    }

    /// Tokenizer settings from CLI arguments
    ///
    /// # Returns
    ///
    /// `None` when the delimiter is not a single-byte character.
    pub fn to_csv_options(&self) -> Option<CsvOptions> {
        let delimiter = u8::try_from(self.delimiter).ok().filter(u8::is_ascii)?;

        Some(CsvOptions {
            delimiter,
            has_headers: !self.no_headers,
            ..CsvOptions::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // Strategy parsing tests
    #[rstest]
    #[case::default_strategy(&["program", "--mapping", "m.json", "input.csv"], StrategyType::Preview)]
    #[case::explicit_preview(&["program", "--strategy", "preview", "--mapping", "m.json", "input.csv"], StrategyType::Preview)]
    #[case::explicit_import(&["program", "--strategy", "import", "--mapping", "m.json", "input.csv"], StrategyType::Import)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    // ImportConfig conversion tests
    #[rstest]
    #[case::defaults(&["program", "--mapping", "m.json", "input.csv"], 100, 0, BatchErrorPolicy::Abort)]
    #[case::custom_batch(&["program", "--mapping", "m.json", "--batch-size", "25", "input.csv"], 25, 0, BatchErrorPolicy::Abort)]
    #[case::zero_batch_falls_back(&["program", "--mapping", "m.json", "--batch-size", "0", "input.csv"], 100, 0, BatchErrorPolicy::Abort)]
    #[case::retry_and_continue(
        &["program", "--mapping", "m.json", "--retry-attempts", "3", "--continue-on-error", "input.csv"],
        100,
        3,
        BatchErrorPolicy::MarkFailed
    )]
    fn test_import_config_conversion(
        #[case] args: &[&str],
        #[case] batch_size: usize,
        #[case] retry_attempts: u32,
        #[case] policy: BatchErrorPolicy,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_import_config();

        assert_eq!(config.batch_size, batch_size);
        assert_eq!(config.retry_attempts, retry_attempts);
        assert_eq!(config.on_batch_error, policy);
    }

    #[rstest]
    #[case::comma(&["program", "--mapping", "m.json", "input.csv"], Some((b',', true)))]
    #[case::semicolon_no_headers(
        &["program", "--mapping", "m.json", "--delimiter", ";", "--no-headers", "input.csv"],
        Some((b';', false))
    )]
    #[case::tab(&["program", "--mapping", "m.json", "--delimiter", "\t", "input.csv"], Some((b'\t', true)))]
    #[case::non_ascii(&["program", "--mapping", "m.json", "--delimiter", "§", "input.csv"], None)]
    fn test_csv_options_conversion(#[case] args: &[&str], #[case] expected: Option<(u8, bool)>) {
        let options = CliArgs::try_parse_from(args).unwrap().to_csv_options();
        assert_eq!(options.map(|o| (o.delimiter, o.has_headers)), expected);
    }

    // Error handling tests
    #[rstest]
    #[case::missing_input(&["program", "--mapping", "m.json"])]
    #[case::missing_mapping(&["program", "input.csv"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "--mapping", "m.json", "input.csv"])]
    #[case::multi_char_delimiter(&["program", "--mapping", "m.json", "--delimiter", ";;", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
