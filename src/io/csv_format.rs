//! CSV format handling for raw rows, account directories and reports
//!
//! This module centralizes all CSV format concerns, providing:
//! - `CsvOptions`, the tokenizer settings shared by both readers
//! - Column naming for files with and without a header row
//! - Account directory parsing for offline previews
//! - Candidate report and import summary serialization
//!
//! Apart from the account file loader, all functions are pure (no I/O).

use crate::core::account_resolver::{AccountDirectory, AccountResolutionCache};
use crate::core::issues::IssueReport;
use crate::types::{
    Account, AccountReference, BatchResult, CandidateTransaction, ImportError, ParsedDate,
};
use serde::Deserialize;
use std::borrow::Cow;
use std::io::{Read, Write};
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';
const UTF8_BOM_BYTES: &[u8] = b"\xef\xbb\xbf";

/// Tokenizer settings passed through to `csv` / `csv-async`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub has_headers: bool,
    pub quote: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            quote: b'"',
        }
    }
}

/// Name used for the column at `index` when the file has no header row
pub fn generated_column_name(index: usize) -> String {
    format!("Column {}", index + 1)
}

/// Strip a leading UTF-8 byte order mark
pub fn strip_bom(value: &str) -> &str {
    value.strip_prefix(UTF8_BOM).unwrap_or(value)
}

/// Normalize a header record into column names
///
/// The BOM is removed from the first header and blank headers fall back to
/// generated names.
pub fn header_names<I>(headers: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let h = h.as_ref();
            let h = if i == 0 { strip_bom(h) } else { h };
            if h.trim().is_empty() {
                generated_column_name(i)
            } else {
                h.to_string()
            }
        })
        .collect()
}

/// Decode raw record fields as text
///
/// Bank exports are often Latin-1 or Windows-1252; bytes that are not valid
/// UTF-8 become U+FFFD and the field is kept. With `strip_leading_bom` the
/// first field loses its byte order mark.
pub fn decode_fields<'a, I>(fields: I, strip_leading_bom: bool) -> Vec<Cow<'a, str>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    fields
        .into_iter()
        .enumerate()
        .map(|(i, field)| {
            let field = if i == 0 && strip_leading_bom {
                field.strip_prefix(UTF8_BOM_BYTES).unwrap_or(field)
            } else {
                field
            };
            String::from_utf8_lossy(field)
        })
        .collect()
}

/// Grow generated headers so a record of `width` fields has a name for each
pub fn extend_generated_headers(headers: &mut Vec<String>, width: usize) {
    while headers.len() < width {
        headers.push(generated_column_name(headers.len()));
    }
}

/// Account record in a local accounts file
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvAccount {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub account_number: Option<String>,
}

impl From<CsvAccount> for Account {
    fn from(record: CsvAccount) -> Self {
        Account {
            id: record.id,
            name: record.name,
            account_number: record.account_number.filter(|n| !n.is_empty()),
        }
    }
}

/// Parse an accounts CSV (`id,name,account_number`) from any reader
pub fn parse_accounts<R: Read>(reader: R) -> Result<AccountDirectory, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut accounts = Vec::new();
    for record in csv_reader.deserialize::<CsvAccount>() {
        accounts.push(record?.into());
    }

    Ok(AccountDirectory::new(accounts))
}

/// Load an accounts CSV from disk
pub fn read_accounts_csv(path: &Path) -> Result<AccountDirectory, ImportError> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::from_open(path, e))?;
    parse_accounts(file)
}

fn format_date(date: &ParsedDate) -> String {
    match date {
        ParsedDate::Valid(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
        ParsedDate::Invalid => "invalid".to_string(),
    }
}

fn resolved_id(reference: &Option<AccountReference>, cache: &AccountResolutionCache) -> String {
    reference
        .as_ref()
        .and_then(|r| cache.account(r))
        .map(|a| a.id)
        .unwrap_or_default()
}

/// Write the per-row preview report
///
/// Columns: row, date, description, amount, source, destination, identifier,
/// issues. Source and destination hold the resolved account id (empty when
/// unresolved); issues are `;`-separated.
pub fn write_candidate_report(
    candidates: &[CandidateTransaction],
    report: &IssueReport,
    cache: &AccountResolutionCache,
    output: &mut dyn Write,
) -> Result<(), ImportError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record([
        "row",
        "date",
        "description",
        "amount",
        "source",
        "destination",
        "identifier",
        "issues",
    ])?;

    for (index, candidate) in candidates.iter().enumerate() {
        let issues: Vec<&str> = report
            .issues_for(index)
            .iter()
            .map(|kind| kind.as_str())
            .collect();

        writer.write_record(&[
            candidate.row_number.to_string(),
            format_date(&candidate.parsed_date),
            candidate.description.clone(),
            candidate.amount.to_string(),
            resolved_id(&candidate.source, cache),
            resolved_id(&candidate.destination, cache),
            candidate.dedupe_identifier.clone().unwrap_or_default(),
            issues.join(";"),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the import outcome as `status,count` lines
///
/// `skipped` counts candidates that were never submitted.
pub fn write_import_summary(
    outcome: &BatchResult,
    skipped: usize,
    output: &mut dyn Write,
) -> Result<(), ImportError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["status", "count"])?;
    for (status, count) in [
        ("succeeded", outcome.succeeded.len()),
        ("failed", outcome.failed.len()),
        ("duplicate", outcome.duplicate.len()),
        ("skipped", skipped),
    ] {
        writer.write_record(&[status.to_string(), count.to_string()])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::issues::classify;
    use crate::types::{IdentifierKind, NewTransaction, ParsedAmount};
    use chrono::NaiveDate;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    #[rstest]
    #[case::plain(&["Date", "Amount"], &["Date", "Amount"])]
    #[case::bom(&["\u{feff}Date", "Amount"], &["Date", "Amount"])]
    #[case::blank_header(&["Date", " ", "Memo"], &["Date", "Column 2", "Memo"])]
    fn test_header_names(#[case] input: &[&str], #[case] expected: &[&str]) {
        assert_eq!(header_names(input.iter().copied()), expected);
    }

    #[test]
    fn test_decode_fields_is_lossy() {
        let fields: [&[u8]; 3] = [b"2024-01-01", b"Caf\xe9", b"-3.50"];
        let decoded = decode_fields(fields, false);
        assert_eq!(decoded, vec!["2024-01-01", "Caf\u{fffd}", "-3.50"]);
    }

    #[rstest]
    #[case::stripped(true, "Date")]
    #[case::kept(false, "\u{feff}Date")]
    fn test_decode_fields_leading_bom(#[case] strip: bool, #[case] expected: &str) {
        let fields: [&[u8]; 2] = [b"\xef\xbb\xbfDate", b"\xef\xbb\xbfMemo"];
        let decoded = decode_fields(fields, strip);
        assert_eq!(decoded[0], expected);
        assert_eq!(decoded[1], "\u{feff}Memo");
    }

    #[test]
    fn test_extend_generated_headers() {
        let mut headers = Vec::new();
        extend_generated_headers(&mut headers, 2);
        extend_generated_headers(&mut headers, 1);
        extend_generated_headers(&mut headers, 3);
        assert_eq!(headers, vec!["Column 1", "Column 2", "Column 3"]);
    }

    #[test]
    fn test_parse_accounts() {
        let content = "id,name,account_number\n1,Checking,NL01\n2, Groceries ,\n";
        let directory = parse_accounts(content.as_bytes()).unwrap();

        assert_eq!(
            directory.accounts(),
            &[
                Account::new("1", "Checking").with_account_number("NL01"),
                Account::new("2", "Groceries"),
            ]
        );
    }

    #[test]
    fn test_parse_accounts_without_number_column() {
        let content = "id,name\n5,Cash\n";
        let directory = parse_accounts(content.as_bytes()).unwrap();
        assert_eq!(directory.accounts(), &[Account::new("5", "Cash")]);
    }

    #[test]
    fn test_read_accounts_missing_file() {
        let result = read_accounts_csv(Path::new("no-such-accounts.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound { .. })));
    }

    #[test]
    fn test_write_candidate_report() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let candidates = vec![
            CandidateTransaction {
                row_number: 1,
                date_text: "2024-01-02".to_string(),
                parsed_date: ParsedDate::Valid(date),
                description: "Coffee, large".to_string(),
                source: Some(AccountReference::new(IdentifierKind::Name, "Checking")),
                destination: None,
                dedupe_identifier: Some("0".to_string()),
                amount: ParsedAmount::Valid(Decimal::new(-350, 2)),
            },
            CandidateTransaction {
                row_number: 2,
                date_text: "x".to_string(),
                parsed_date: ParsedDate::Invalid,
                description: String::new(),
                source: None,
                destination: None,
                dedupe_identifier: None,
                amount: ParsedAmount::Invalid,
            },
        ];
        let cache = AccountResolutionCache::new();
        cache.populate_from(
            &AccountDirectory::new(vec![Account::new("1", "Checking")]),
            &candidates,
        );
        let report = classify(&candidates, &cache, &HashSet::new());

        let mut output = Vec::new();
        write_candidate_report(&candidates, &report, &cache, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            "row,date,description,amount,source,destination,identifier,issues\n\
             1,2024-01-02 00:00:00,\"Coffee, large\",-3.50,1,,0,\n\
             2,invalid,,invalid,,,,no_account;parse_error\n"
        );
    }

    #[test]
    fn test_write_import_summary() {
        let tx = NewTransaction {
            date_time: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            description: String::new(),
            source_id: Some("1".to_string()),
            destination_id: None,
            identifier: None,
            amount: Decimal::ONE,
        };
        let outcome = BatchResult {
            succeeded: vec![tx.clone(), tx.clone()],
            failed: vec![],
            duplicate: vec![tx],
        };

        let mut output = Vec::new();
        write_import_summary(&outcome, 4, &mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "status,count\nsucceeded,2\nfailed,0\nduplicate,1\nskipped,4\n"
        );
    }
}
