//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over raw rows of a CSV file. Column naming
//! and BOM handling are delegated to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<RawRow, ImportError>` for each CSV row:
//!
//! ```no_run
//! use budget_csv_import::io::csv_format::CsvOptions;
//! use budget_csv_import::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("statement.csv"), CsvOptions::default()).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(row) => println!("Row with {} fields", row.len()),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, unreadable header) are returned from `new()`
//! - Individual record errors are yielded as Err variants in the iterator
//!
//! Fields are never trimmed here; whitespace handling belongs to the field
//! mappers. Records are read as bytes and decoded lossily, so a row with a
//! Latin-1 byte is kept rather than rejected.

use crate::io::csv_format::{decode_fields, extend_generated_headers, header_names, CsvOptions};
use crate::types::{ImportError, RawRow, RawTable};
use csv::{ByteRecord, ReaderBuilder};
use std::fs::File;
use std::path::Path;
use tracing::warn;

/// Synchronous CSV reader
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    generated_headers: bool,
    record: ByteRecord,
    first_record: bool,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader is configured to:
    /// - Use the delimiter, quote and header settings from `options`
    /// - Allow flexible field counts (short and long rows are kept)
    /// - Use an 8KB buffer for efficient I/O
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the CSV file
    /// * `options` - Tokenizer settings
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if the file opened and its header row was readable
    /// * `Err(ImportError)` otherwise
    pub fn new(path: &Path, options: CsvOptions) -> Result<Self, ImportError> {
        let file = File::open(path).map_err(|e| ImportError::from_open(path, e))?;

        let mut reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(options.has_headers)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        let headers = if options.has_headers {
            header_names(decode_fields(reader.byte_headers()?.iter(), false))
        } else {
            Vec::new()
        };

        Ok(Self {
            reader,
            headers,
            generated_headers: !options.has_headers,
            record: ByteRecord::new(),
            first_record: true,
        })
    }

    /// Column names seen so far
    ///
    /// Without a header row this grows as wider records are read.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Drain the reader into a table, skipping unreadable records
    pub fn into_table(mut self) -> RawTable {
        let mut rows = Vec::new();
        for result in self.by_ref() {
            match result {
                Ok(row) => rows.push(row),
                Err(e) => warn!(error = %e, "Skipping unreadable record"),
            }
        }
        RawTable {
            headers: self.headers,
            rows,
        }
    }
}

impl Iterator for SyncReader {
    type Item = Result<RawRow, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                if self.generated_headers {
                    extend_generated_headers(&mut self.headers, self.record.len());
                }

                let strip_bom = self.first_record && self.generated_headers;
                let values = decode_fields(self.record.iter(), strip_bom);
                self.first_record = false;

                Some(Ok(RawRow::from_parts(&self.headers, &values)))
            }
            Err(e) => {
                self.first_record = false;
                Some(Err(e.into()))
            }
        }
    }
}
