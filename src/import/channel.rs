//! Buffered COPY channel.
//!
//! Rows are encoded into PostgreSQL's COPY text format and held in memory
//! until the buffer passes its flush threshold. Each flush runs one
//! `COPY ... FROM STDIN` on the owning transaction's connection, so every
//! round trip lands in the same transaction.

use sqlx::PgConnection;
use thiserror::Error;

use super::ddl;
use crate::error::{ImportError, ImportResult};

const NULL_MARKER: &[u8] = b"\\N";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closed,
}

#[derive(Debug, Error)]
#[error("COPY channel into {0} is already closed")]
pub struct AlreadyClosed(String);

#[derive(Debug)]
pub struct CopyChannel {
    statement: String,
    target: String,
    width: usize,
    buffer: Vec<u8>,
    buffered_rows: usize,
    flush_threshold: usize,
    state: ChannelState,
}

impl CopyChannel {
    /// Bind a channel to `schema.table (columns)`.
    ///
    /// The COPY statement is run once with no data so that unknown columns or
    /// missing privileges fail here rather than on the first flush.
    pub async fn prepare(
        conn: &mut PgConnection,
        schema: &str,
        table: &str,
        columns: &[String],
        flush_threshold: usize,
    ) -> ImportResult<Self> {
        let statement = ddl::copy_from_stdin_sql(schema, table, columns)?;
        let target = ddl::qualified_table(schema, table)?;
        let prepare_err = |source| ImportError::Prepare {
            target: target.clone(),
            source,
        };

        log::debug!("preparing COPY channel: {}", statement);
        let copy = conn.copy_in_raw(&statement).await.map_err(prepare_err)?;
        log::trace!(
            "COPY into {} accepts {} columns",
            target,
            copy.num_columns()
        );
        copy.finish().await.map_err(prepare_err)?;

        Ok(Self {
            statement,
            target,
            width: columns.len(),
            buffer: Vec::with_capacity(flush_threshold.min(1 << 20)),
            buffered_rows: 0,
            flush_threshold: flush_threshold.max(1),
            state: ChannelState::Open,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn buffered_rows(&self) -> usize {
        self.buffered_rows
    }

    /// Encode one row into the buffer. `None` values are sent as NULL.
    ///
    /// A row of the wrong width is rejected before any byte is buffered.
    pub fn push_row(&mut self, values: &[Option<&str>]) -> ImportResult<()> {
        if values.len() != self.width {
            return Err(ImportError::Binding {
                expected: self.width,
                actual: values.len(),
            });
        }
        encode_row(&mut self.buffer, values);
        self.buffered_rows += 1;
        Ok(())
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    pub fn should_flush(&self) -> bool {
        self.buffer.len() >= self.flush_threshold
    }

    /// Ship buffered rows, returning the row count the server reported.
    pub async fn flush(&mut self, conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        self.round_trip(conn).await
    }

    /// End-of-data: ship whatever is left, even nothing, and close the channel.
    pub async fn finish(&mut self, conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
        let copied = self.round_trip(conn).await?;
        self.state = ChannelState::Closed;
        Ok(copied)
    }

    /// Release the channel. Fails if it was already closed by [`finish`](Self::finish).
    pub fn close(&mut self) -> Result<(), AlreadyClosed> {
        if self.state == ChannelState::Closed {
            return Err(AlreadyClosed(self.target.clone()));
        }
        if self.buffered_rows > 0 {
            log::warn!(
                "discarding {} unflushed rows for {}",
                self.buffered_rows,
                self.target
            );
        }
        self.buffer.clear();
        self.buffered_rows = 0;
        self.state = ChannelState::Closed;
        Ok(())
    }

    async fn round_trip(&mut self, conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
        let rows = self.buffered_rows;
        let bytes = self.buffer.len();

        let shipped = self.ship(conn).await;
        self.buffer.clear();
        self.buffered_rows = 0;
        let copied = shipped?;

        log::trace!(
            "flushed {} rows ({} bytes) into {}, server copied {}",
            rows,
            bytes,
            self.target,
            copied
        );
        Ok(copied)
    }

    async fn ship(&self, conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
        let mut copy = conn.copy_in_raw(&self.statement).await?;
        if !self.buffer.is_empty() {
            copy.send(self.buffer.as_slice()).await?;
        }
        copy.finish().await
    }
}

/// Append one row in COPY text format: tab separated, newline terminated.
pub fn encode_row(buffer: &mut Vec<u8>, values: &[Option<&str>]) {
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            buffer.push(b'\t');
        }
        match value {
            Some(text) => encode_text(buffer, text),
            None => buffer.extend_from_slice(NULL_MARKER),
        }
    }
    buffer.push(b'\n');
}

fn encode_text(buffer: &mut Vec<u8>, text: &str) {
    for byte in text.bytes() {
        match byte {
            b'\\' => buffer.extend_from_slice(b"\\\\"),
            b'\t' => buffer.extend_from_slice(b"\\t"),
            b'\n' => buffer.extend_from_slice(b"\\n"),
            b'\r' => buffer.extend_from_slice(b"\\r"),
            other => buffer.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(values: &[Option<&str>]) -> String {
        let mut buffer = Vec::new();
        encode_row(&mut buffer, values);
        String::from_utf8(buffer).expect("utf8")
    }

    fn detached_channel(width: usize, flush_threshold: usize) -> CopyChannel {
        CopyChannel {
            statement: "COPY \"s\".\"t\" (\"a\") FROM STDIN".to_string(),
            target: "\"s\".\"t\"".to_string(),
            width,
            buffer: Vec::new(),
            buffered_rows: 0,
            flush_threshold,
            state: ChannelState::Open,
        }
    }

    #[test]
    fn encodes_tab_separated_rows() {
        assert_eq!(encoded(&[Some("1"), Some("alice")]), "1\talice\n");
    }

    #[test]
    fn encodes_null_as_marker() {
        assert_eq!(encoded(&[Some("2"), None]), "2\t\\N\n");
    }

    #[test]
    fn escapes_control_characters_and_backslashes() {
        assert_eq!(
            encoded(&[Some("a\tb"), Some("line1\nline2\r"), Some("\\N")]),
            "a\\tb\tline1\\nline2\\r\t\\\\N\n"
        );
    }

    #[test]
    fn empty_string_is_not_null() {
        assert_eq!(encoded(&[Some(""), Some("x")]), "\tx\n");
    }

    #[test]
    fn rejects_rows_of_wrong_width_without_buffering() {
        let mut channel = detached_channel(2, 1024);
        let err = channel.push_row(&[Some("only")]).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Binding {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(channel.buffered_rows(), 0);
        assert_eq!(channel.buffered_bytes(), 0);

        channel.push_row(&[Some("1"), Some("2")]).unwrap();
        assert_eq!(channel.buffered_rows(), 1);
    }

    #[test]
    fn flush_threshold_is_measured_in_bytes() {
        let mut channel = detached_channel(1, 8);
        channel.push_row(&[Some("abc")]).unwrap();
        assert!(!channel.should_flush());
        channel.push_row(&[Some("defg")]).unwrap();
        assert!(channel.should_flush());
    }

    #[test]
    fn second_close_reports_already_closed() {
        let mut channel = detached_channel(1, 8);
        channel.close().unwrap();
        assert_eq!(channel.state(), ChannelState::Closed);
        assert!(channel.close().is_err());
    }
}
