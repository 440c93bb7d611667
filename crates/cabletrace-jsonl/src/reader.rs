//! Line-numbered JSONL reading.

use crate::Result;
use crate::warning::Warning;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Async reader for JSONL data that tracks physical line numbers.
///
/// # Examples
///
/// ```no_run
/// use cabletrace_jsonl::JsonlReader;
/// use tokio::fs::File;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let file = File::open("topology.jsonl").await?;
/// let mut reader = JsonlReader::new(file);
/// let (records, warnings) = reader.read_resilient::<serde_json::Value>().await?;
/// println!("{} records, {} warnings", records.len(), warnings.len());
/// # Ok(())
/// # }
/// ```
pub struct JsonlReader<R> {
    reader: BufReader<R>,
    /// Number of physical lines consumed so far.
    line_number: usize,
    buf: String,
}

impl<R: AsyncRead + Unpin> JsonlReader<R> {
    /// Creates a new `JsonlReader` wrapping the given async reader.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buf: String::new(),
        }
    }

    /// Returns the 1-based number of the last line read, or 0 before any read.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Reads the next non-blank line.
    ///
    /// Returns the line's number and its trimmed contents, or `None` at end
    /// of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reader fails or the line is not
    /// valid UTF-8.
    pub async fn next_line(&mut self) -> Result<Option<(usize, &str)>> {
        loop {
            self.buf.clear();
            let read = self.reader.read_line(&mut self.buf).await?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            if !self.buf.trim().is_empty() {
                return Ok(Some((self.line_number, self.buf.trim())));
            }
        }
    }

    /// Deserializes every remaining line, collecting malformed lines as
    /// warnings instead of failing.
    ///
    /// # Errors
    ///
    /// Only I/O failures are returned as errors.
    pub async fn read_resilient<T: DeserializeOwned>(&mut self) -> Result<(Vec<T>, Vec<Warning>)> {
        let mut records = Vec::new();
        let mut warnings = Vec::new();

        while let Some((line_number, line)) = self.next_line().await? {
            match serde_json::from_str::<T>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::debug!(line_number, error = %e, "Skipping malformed JSONL line");
                    warnings.push(Warning::MalformedJson {
                        line_number,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok((records, warnings))
    }
}

/// Reads a whole JSONL file, skipping malformed lines.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read. Parse failures of
/// individual lines are reported in the returned warnings.
pub async fn read_jsonl_resilient<T, P>(path: P) -> Result<(Vec<T>, Vec<Warning>)>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref()).await?;
    JsonlReader::new(file).read_resilient().await
}
