//! Asynchronous CSV reader with batch interface
//!
//! Reads raw rows from any `futures::io::AsyncRead` source in batches.
//! Records are read as bytes and decoded lossily, like the sync reader.
//!
//! # Architecture
//!
//! ```text
//! AsyncRead → csv-async → AsyncReader → Batches of RawRows
//!                              ↓
//!                      csv_format module
//!            (decoding, header naming, BOM handling)
//! ```

use crate::io::csv_format::{decode_fields, extend_generated_headers, header_names, CsvOptions};
use crate::types::{ImportError, RawRow, RawTable};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Default number of rows pulled per batch by `read_table`
pub const DEFAULT_READ_BATCH: usize = 1024;

/// Asynchronous CSV reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncReader<R>,
    headers: Option<Vec<String>>,
    generated_headers: bool,
    first_record: bool,
}

impl<R: AsyncRead + Unpin + Send> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    ///
    /// # Arguments
    ///
    /// * `reader` - Async reader providing CSV data
    /// * `options` - Tokenizer settings
    pub fn new(reader: R, options: CsvOptions) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(options.has_headers)
            .flexible(true)
            .create_reader(reader);

        Self {
            csv_reader,
            headers: None,
            generated_headers: !options.has_headers,
            first_record: true,
        }
    }

    /// Column names, reading the header row on first use
    pub async fn headers(&mut self) -> Result<Vec<String>, ImportError> {
        if self.headers.is_none() {
            let headers = if self.generated_headers {
                Vec::new()
            } else {
                let record = self.csv_reader.byte_headers().await?;
                header_names(decode_fields(record.iter(), false))
            };
            self.headers = Some(headers);
        }
        Ok(self.headers.clone().unwrap_or_default())
    }

    /// Read a batch of raw rows
    ///
    /// Reads up to `batch_size` records. Unreadable records are logged and
    /// skipped.
    ///
    /// # Returns
    ///
    /// The rows read, or an empty vector once the end of input is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Result<Vec<RawRow>, ImportError> {
        let mut headers = self.headers().await?;
        let mut batch = Vec::with_capacity(batch_size);

        {
            let mut records = self.csv_reader.byte_records();
            while batch.len() < batch_size {
                match records.next().await {
                    Some(Ok(record)) => {
                        if self.generated_headers {
                            extend_generated_headers(&mut headers, record.len());
                        }
                        let strip_bom = self.first_record && self.generated_headers;
                        let values = decode_fields(record.iter(), strip_bom);
                        self.first_record = false;
                        batch.push(RawRow::from_parts(&headers, &values));
                    }
                    Some(Err(e)) => {
                        self.first_record = false;
                        warn!(error = %e, "Skipping unreadable record");
                    }
                    None => break,
                }
            }
        }

        self.headers = Some(headers);
        Ok(batch)
    }

    /// Drain the reader into a table
    pub async fn read_table(mut self) -> Result<RawTable, ImportError> {
        let mut rows = Vec::new();
        loop {
            let batch = self.read_batch(DEFAULT_READ_BATCH).await?;
            if batch.is_empty() {
                break;
            }
            rows.extend(batch);
        }

        Ok(RawTable {
            headers: self.headers.unwrap_or_default(),
            rows,
        })
    }
}
