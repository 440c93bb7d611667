//! JSONL writing.

use crate::Result;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Buffered async writer producing one JSON value per line.
pub struct JsonlWriter<W> {
    writer: BufWriter<W>,
    written: usize,
}

impl<W: AsyncWrite + Unpin> JsonlWriter<W> {
    /// Creates a new `JsonlWriter` wrapping the given async writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    /// Number of records written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Serializes `value` and writes it followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        // serde_json escapes control characters, so compact output is one line.
        let json = serde_json::to_string(value)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.written += 1;
        Ok(())
    }

    /// Writes every value from the iterator.
    ///
    /// # Errors
    ///
    /// Stops at the first serialization or I/O failure.
    pub async fn write_all<T, I>(&mut self, values: I) -> Result<()>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        for value in values {
            self.write(&value).await?;
        }
        Ok(())
    }

    /// Flushes buffered output to the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    /// Consumes the writer, returning the underlying writer.
    ///
    /// Call [`flush`](Self::flush) first; unflushed data is discarded.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row<'a> {
        id: u32,
        note: &'a str,
    }

    #[tokio::test]
    async fn writes_one_line_per_value() {
        let mut writer = JsonlWriter::new(Vec::new());
        writer
            .write_all([
                Row { id: 1, note: "a" },
                Row {
                    id: 2,
                    note: "line\nbreak",
                },
            ])
            .await
            .unwrap();
        writer.flush().await.unwrap();

        assert_eq!(writer.written(), 2);
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("line\\nbreak"));
    }
}
