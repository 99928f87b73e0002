//! Transaction synthesis from mapped rows
//!
//! Turns the raw table plus a [`MappingOptions`] profile into one
//! [`CandidateTransaction`] per row. Every output field is recomputed from
//! scratch on each call; nothing is patched incrementally.
//!
//! # Sub-algorithms
//!
//! - **Date parsing**: mapped text parsed with a chrono format string. A
//!   format without time fields yields midnight on that date.
//! - **Amount parsing**: everything except digits, `-` and the decimal
//!   separator is stripped, the separator becomes `.`, and the result is
//!   parsed as a `Decimal`.
//! - **Dedupe identifier**: see [`DuplicateHandling`].

use crate::core::field_mapper::{FieldMapper, ParseOptions};
use crate::types::{
    AccountReference, CandidateTransaction, IdentifierKind, ImportError, ParsedAmount, ParsedDate,
    RawRow, RawTable,
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Default chrono format for the date column
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// How the dedupe identifier of each row is derived
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateHandling {
    /// No identifier, no deduplication
    #[default]
    None,
    /// Zero-based row index
    RowNumber,
    /// Mapped value of the identifier column
    IdentifierColumn,
    /// Mapped value plus `.N`, where N counts that value in rows up to and
    /// including the current one
    IdentifierColumnCount,
}

/// A column assignment and the parse rule applied to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub column: String,
    #[serde(default)]
    pub parse: ParseOptions,
}

impl ColumnMapping {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            parse: ParseOptions::default(),
        }
    }

    pub fn with_parse(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }
}

/// Column assignment for an account reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountColumnMapping {
    pub column: String,
    pub identifier_kind: IdentifierKind,
    #[serde(default)]
    pub parse: ParseOptions,
}

impl AccountColumnMapping {
    pub fn new(column: impl Into<String>, identifier_kind: IdentifierKind) -> Self {
        Self {
            column: column.into(),
            identifier_kind,
            parse: ParseOptions::default(),
        }
    }
}

/// Full mapping profile
///
/// Loaded from JSON by the CLI; every field has a default so partial
/// profiles are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOptions {
    pub date: Option<ColumnMapping>,
    pub description: Option<ColumnMapping>,
    pub amount: Option<ColumnMapping>,
    pub source: Option<AccountColumnMapping>,
    pub destination: Option<AccountColumnMapping>,
    pub identifier: Option<ColumnMapping>,
    pub duplicate_handling: DuplicateHandling,
    pub date_format: String,
    pub decimal_separator: char,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            date: None,
            description: None,
            amount: None,
            source: None,
            destination: None,
            identifier: None,
            duplicate_handling: DuplicateHandling::None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            decimal_separator: '.',
        }
    }
}

impl MappingOptions {
    /// Load a mapping profile from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, ImportError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ImportError::from_open(path, e))?;
        let options: MappingOptions = serde_json::from_str(&content)?;
        Ok(options)
    }

    /// Compile regexes and validate the profile
    pub fn compile(&self) -> Result<CompiledMapping, ImportError> {
        CompiledMapping::new(self)
    }
}

#[derive(Debug, Clone)]
struct CompiledColumn {
    column: String,
    mapper: FieldMapper,
}

impl CompiledColumn {
    fn compile(field: &str, mapping: &ColumnMapping) -> Result<Self, ImportError> {
        Ok(Self {
            column: mapping.column.clone(),
            mapper: FieldMapper::compile(field, &mapping.parse)?,
        })
    }

    fn map(&self, row: &RawRow) -> String {
        self.mapper.map_field(row, &self.column)
    }
}

#[derive(Debug, Clone)]
struct CompiledAccount {
    column: CompiledColumn,
    kind: IdentifierKind,
}

impl CompiledAccount {
    fn compile(field: &str, mapping: &AccountColumnMapping) -> Result<Self, ImportError> {
        Ok(Self {
            column: CompiledColumn {
                column: mapping.column.clone(),
                mapper: FieldMapper::compile(field, &mapping.parse)?,
            },
            kind: mapping.identifier_kind,
        })
    }

    fn reference(&self, row: &RawRow) -> Option<AccountReference> {
        let value = self.column.map(row);
        if value.is_empty() {
            None
        } else {
            Some(AccountReference::new(self.kind, value))
        }
    }
}

/// Mapping profile with all regexes compiled, ready to synthesize
#[derive(Debug, Clone)]
pub struct CompiledMapping {
    date: Option<CompiledColumn>,
    description: Option<CompiledColumn>,
    amount: Option<CompiledColumn>,
    source: Option<CompiledAccount>,
    destination: Option<CompiledAccount>,
    identifier: Option<CompiledColumn>,
    duplicate_handling: DuplicateHandling,
    date_format: String,
    decimal_separator: char,
}

impl CompiledMapping {
    /// Validate and compile `options`
    ///
    /// # Errors
    ///
    /// - `InvalidRegex` when any parse rule's regex fails to compile
    /// - `InvalidMapping` when the decimal separator is a digit or `-`, or
    ///   when an identifier-based duplicate mode has no identifier column
    pub fn new(options: &MappingOptions) -> Result<Self, ImportError> {
        let sep = options.decimal_separator;
        if sep.is_ascii_digit() || sep == '-' {
            return Err(ImportError::invalid_mapping(format!(
                "decimal separator '{}' is not allowed",
                sep
            )));
        }

        let needs_identifier = matches!(
            options.duplicate_handling,
            DuplicateHandling::IdentifierColumn | DuplicateHandling::IdentifierColumnCount
        );
        if needs_identifier && options.identifier.is_none() {
            return Err(ImportError::invalid_mapping(
                "duplicate handling by identifier column requires an identifier column",
            ));
        }

        Ok(Self {
            date: options
                .date
                .as_ref()
                .map(|m| CompiledColumn::compile("date", m))
                .transpose()?,
            description: options
                .description
                .as_ref()
                .map(|m| CompiledColumn::compile("description", m))
                .transpose()?,
            amount: options
                .amount
                .as_ref()
                .map(|m| CompiledColumn::compile("amount", m))
                .transpose()?,
            source: options
                .source
                .as_ref()
                .map(|m| CompiledAccount::compile("source", m))
                .transpose()?,
            destination: options
                .destination
                .as_ref()
                .map(|m| CompiledAccount::compile("destination", m))
                .transpose()?,
            identifier: options
                .identifier
                .as_ref()
                .map(|m| CompiledColumn::compile("identifier", m))
                .transpose()?,
            duplicate_handling: options.duplicate_handling,
            date_format: options.date_format.clone(),
            decimal_separator: sep,
        })
    }

    /// Synthesize one candidate per row of `table`
    pub fn synthesize(&self, table: &RawTable) -> Vec<CandidateTransaction> {
        self.synthesize_rows(&table.rows)
    }

    /// Synthesize one candidate per row, in input order
    pub fn synthesize_rows(&self, rows: &[RawRow]) -> Vec<CandidateTransaction> {
        let identifiers = self.dedupe_identifiers(rows);

        rows.iter()
            .zip(identifiers)
            .enumerate()
            .map(|(index, (row, dedupe_identifier))| {
                let date_text = map_or_empty(&self.date, row);
                let amount_text = map_or_empty(&self.amount, row);

                CandidateTransaction {
                    row_number: index + 1,
                    parsed_date: parse_date(&date_text, &self.date_format),
                    date_text,
                    description: map_or_empty(&self.description, row),
                    source: self.source.as_ref().and_then(|a| a.reference(row)),
                    destination: self.destination.as_ref().and_then(|a| a.reference(row)),
                    dedupe_identifier,
                    amount: parse_amount(&amount_text, self.decimal_separator),
                }
            })
            .collect()
    }

    /// Derive the dedupe identifier of every row
    ///
    /// For `IdentifierColumnCount` a running counter per value reproduces the
    /// positional count (occurrences in rows `0..=index`) in a single pass.
    pub fn dedupe_identifiers(&self, rows: &[RawRow]) -> Vec<Option<String>> {
        match (self.duplicate_handling, &self.identifier) {
            (DuplicateHandling::RowNumber, _) => {
                (0..rows.len()).map(|i| Some(i.to_string())).collect()
            }
            (DuplicateHandling::IdentifierColumn, Some(identifier)) => {
                rows.iter().map(|row| Some(identifier.map(row))).collect()
            }
            (DuplicateHandling::IdentifierColumnCount, Some(identifier)) => {
                let mut seen: HashMap<String, usize> = HashMap::new();
                rows.iter()
                    .map(|row| {
                        let value = identifier.map(row);
                        let count = seen.entry(value.clone()).or_insert(0);
                        *count += 1;
                        Some(format!("{}.{}", value, count))
                    })
                    .collect()
            }
            _ => vec![None; rows.len()],
        }
    }
}

fn map_or_empty(column: &Option<CompiledColumn>, row: &RawRow) -> String {
    column.as_ref().map(|c| c.map(row)).unwrap_or_default()
}

/// Parse an amount string with the given decimal separator
///
/// Never fails: anything that does not yield a decimal is
/// [`ParsedAmount::Invalid`].
pub fn parse_amount(text: &str, decimal_separator: char) -> ParsedAmount {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == decimal_separator)
        .map(|c| if c == decimal_separator { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return ParsedAmount::Invalid;
    }

    match Decimal::from_str(&cleaned) {
        Ok(amount) => ParsedAmount::Valid(amount),
        Err(_) => ParsedAmount::Invalid,
    }
}

/// Parse a date (or date-time) string with a chrono format
pub fn parse_date(text: &str, format: &str) -> ParsedDate {
    if let Ok(date_time) = NaiveDateTime::parse_from_str(text, format) {
        return ParsedDate::Valid(date_time);
    }

    NaiveDate::parse_from_str(text, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(ParsedDate::Valid)
        .unwrap_or(ParsedDate::Invalid)
}
