//! Transaction-related types for the import pipeline
//!
//! This module defines the raw rows read from the file, the candidate
//! transactions synthesized from them, and the payloads exchanged with the
//! remote API during submission.

use super::account::{AccountId, AccountReference};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of the input file
///
/// Ordered mapping from column name to raw string. Column order follows the
/// file's header (or `Column N` naming when the file has none).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    /// Build a row by pairing headers with values
    ///
    /// Missing trailing values become empty strings; surplus values are dropped.
    pub fn from_parts<H, V>(headers: &[H], values: &[V]) -> Self
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = values.get(i).map(|v| v.as_ref()).unwrap_or_default();
                (header.as_ref().to_string(), value.to_string())
            })
            .collect();

        Self { fields }
    }

    /// Raw value of `column`, if the column exists
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over `(column, value)` pairs in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Whole decoded file: headers plus rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row built from raw values against this table's headers
    pub fn push_values<V: AsRef<str>>(&mut self, values: &[V]) {
        let row = RawRow::from_parts(&self.headers, values);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Result of amount parsing
///
/// Either a valid decimal or the invalid sentinel. There is no third state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedAmount {
    Valid(Decimal),
    Invalid,
}

impl ParsedAmount {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedAmount::Valid(_))
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            ParsedAmount::Valid(amount) => Some(*amount),
            ParsedAmount::Invalid => None,
        }
    }
}

impl fmt::Display for ParsedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedAmount::Valid(amount) => write!(f, "{}", amount),
            ParsedAmount::Invalid => f.write_str("invalid"),
        }
    }
}

/// Result of date parsing, kept even when invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    Valid(NaiveDateTime),
    Invalid,
}

impl ParsedDate {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedDate::Valid(_))
    }

    pub fn value(&self) -> Option<NaiveDateTime> {
        match self {
            ParsedDate::Valid(date) => Some(*date),
            ParsedDate::Invalid => None,
        }
    }
}

/// Unconfirmed transaction derived from one row of the file
///
/// Pending validation and account resolution. Candidates are regenerated
/// from scratch whenever the raw data or the mapping changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTransaction {
    /// 1-based position of the row in the data (header excluded)
    pub row_number: usize,

    /// Mapped date text before parsing
    pub date_text: String,

    pub parsed_date: ParsedDate,

    pub description: String,

    pub source: Option<AccountReference>,

    pub destination: Option<AccountReference>,

    /// Derived string used to detect already-imported records
    pub dedupe_identifier: Option<String>,

    pub amount: ParsedAmount,
}

impl CandidateTransaction {
    /// Zero-based index of the originating row
    pub fn row_index(&self) -> usize {
        self.row_number - 1
    }

    /// Whether date or amount failed to parse
    pub fn has_parse_error(&self) -> bool {
        !self.parsed_date.is_valid() || !self.amount.is_valid()
    }
}

/// Payload for the remote "create many" endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub date_time: NaiveDateTime,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub amount: Decimal,
}

/// Per-batch answer from the remote API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(default)]
    pub succeeded: Vec<NewTransaction>,
    #[serde(default)]
    pub failed: Vec<NewTransaction>,
    #[serde(default)]
    pub duplicate: Vec<NewTransaction>,
}

impl BatchResult {
    /// Number of transactions accounted for in this result
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.duplicate.len()
    }

    /// Fold another batch's results into this one
    pub fn absorb(&mut self, other: BatchResult) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
        self.duplicate.extend(other.duplicate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    #[rstest]
    #[case::exact(&["a", "b"], &["1", "2"], Some("2"))]
    #[case::short_row(&["a", "b"], &["1"], Some(""))]
    #[case::long_row(&["a", "b"], &["1", "2", "3"], Some("2"))]
    fn test_raw_row_from_parts(
        #[case] headers: &[&str],
        #[case] values: &[&str],
        #[case] expected_b: Option<&str>,
    ) {
        let row = RawRow::from_parts(headers, values);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("b"), expected_b);
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_raw_row_keeps_column_order() {
        let row = RawRow::from_parts(&["z", "a", "m"], &["1", "2", "3"]);
        let columns: Vec<&str> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(columns, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_new_transaction_json_shape() {
        let tx = NewTransaction {
            date_time: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            description: "Groceries".to_string(),
            source_id: Some("1".to_string()),
            destination_id: None,
            identifier: Some("abc".to_string()),
            amount: Decimal::new(1250, 2),
        };

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["dateTime"], "2024-03-01T00:00:00");
        assert_eq!(json["sourceId"], "1");
        assert_eq!(json["amount"], "12.50");
        assert!(json.get("destinationId").is_none());
    }

    #[test]
    fn test_batch_result_absorb() {
        let mut total = BatchResult::default();
        let tx = NewTransaction {
            date_time: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            description: String::new(),
            source_id: None,
            destination_id: None,
            identifier: None,
            amount: Decimal::ONE,
        };
        total.absorb(BatchResult {
            succeeded: vec![tx.clone()],
            failed: vec![],
            duplicate: vec![tx.clone()],
        });
        total.absorb(BatchResult {
            succeeded: vec![tx],
            ..Default::default()
        });
        assert_eq!(total.succeeded.len(), 2);
        assert_eq!(total.duplicate.len(), 1);
        assert_eq!(total.total(), 3);
    }
}
