//! Import sessions: one transaction plus one COPY channel.

use std::fmt::Display;

use sqlx::{PgPool, Postgres, Transaction};

use super::channel::CopyChannel;
use super::ddl::JsonColumnType;
use super::provision;
use super::stats::ImportStats;
use crate::config::DEFAULT_FLUSH_BYTES;
use crate::error::{ImportError, ImportResult};

/// Tuning for an import session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Buffered bytes that trigger a COPY round trip.
    pub flush_threshold: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_BYTES,
        }
    }
}

/// Replace every value exactly equal to `null_sentinel` with `None`.
///
/// Values that only contain the sentinel are kept as they are.
pub fn substitute_nulls<'a, S: AsRef<str>>(
    null_sentinel: &str,
    values: &'a [S],
) -> Vec<Option<&'a str>> {
    values
        .iter()
        .map(|value| {
            let value = value.as_ref();
            if value == null_sentinel {
                None
            } else {
                Some(value)
            }
        })
        .collect()
}

/// Log and discard the outcome of releasing a resource whose failure is
/// expected to be spurious, such as closing a channel twice.
fn release_best_effort<E: Display>(resource: &str, result: Result<(), E>) {
    if let Err(err) = result {
        log::debug!("ignoring release error for {}: {}", resource, err);
    }
}

/// (Re)create `schema.table` with TEXT columns and open a session on it.
pub async fn new_csv_import(
    pool: &PgPool,
    schema: &str,
    table: &str,
    columns: &[String],
    drop: bool,
) -> ImportResult<ImportSession> {
    new_csv_import_with_options(pool, schema, table, columns, drop, SessionOptions::default())
        .await
}

pub async fn new_csv_import_with_options(
    pool: &PgPool,
    schema: &str,
    table: &str,
    columns: &[String],
    drop: bool,
    options: SessionOptions,
) -> ImportResult<ImportSession> {
    if drop {
        provision::drop_table(pool, schema, table).await?;
    }
    provision::create_table(pool, schema, table, columns).await?;

    ImportSession::open(pool, schema, table, columns.to_vec(), options).await
}

/// Create `schema.table` with a single JSON column and open a session on it.
pub async fn new_json_import(
    pool: &PgPool,
    schema: &str,
    table: &str,
    column: &str,
    data_type: JsonColumnType,
) -> ImportResult<ImportSession> {
    new_json_import_with_options(
        pool,
        schema,
        table,
        column,
        data_type,
        SessionOptions::default(),
    )
    .await
}

pub async fn new_json_import_with_options(
    pool: &PgPool,
    schema: &str,
    table: &str,
    column: &str,
    data_type: JsonColumnType,
    options: SessionOptions,
) -> ImportResult<ImportSession> {
    provision::create_json_table(pool, schema, table, column, data_type).await?;

    ImportSession::open(pool, schema, table, vec![column.to_string()], options).await
}

/// An open bulk import into one table.
///
/// Rows are only visible to other connections once [`commit`](Self::commit)
/// succeeds. Both `commit` and [`abort`](Self::abort) consume the session, so
/// it cannot be finalized twice:
///
/// ```compile_fail
/// # async fn twice(session: pgcopy_import::import::ImportSession) {
/// session.commit().await.ok();
/// session.commit().await.ok();
/// # }
/// ```
///
/// Dropping a session without finalizing it rolls the transaction back.
pub struct ImportSession {
    tx: Transaction<'static, Postgres>,
    channel: CopyChannel,
    columns: Vec<String>,
    stats: ImportStats,
}

impl ImportSession {
    async fn open(
        pool: &PgPool,
        schema: &str,
        table: &str,
        columns: Vec<String>,
        options: SessionOptions,
    ) -> ImportResult<Self> {
        let mut tx = pool.begin().await.map_err(ImportError::Transaction)?;
        let channel =
            CopyChannel::prepare(&mut tx, schema, table, &columns, options.flush_threshold)
                .await?;

        log::info!(
            "opened import session into {} ({} columns)",
            channel.target(),
            columns.len()
        );

        Ok(Self {
            tx,
            channel,
            columns,
            stats: ImportStats::default(),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn stats(&self) -> &ImportStats {
        &self.stats
    }

    /// Submit one row, with values equal to `null_sentinel` sent as NULL.
    ///
    /// A row of the wrong width fails with [`ImportError::Binding`] and
    /// leaves the session usable. Any other error means the transaction is
    /// aborted server side and the session should be dropped or aborted.
    pub async fn add_row<S: AsRef<str>>(
        &mut self,
        null_sentinel: &str,
        values: &[S],
    ) -> ImportResult<()> {
        let row = substitute_nulls(null_sentinel, values);
        self.channel.push_row(&row)?;

        self.stats.rows_submitted += 1;
        self.stats.null_values += row.iter().filter(|value| value.is_none()).count() as u64;

        if self.channel.should_flush() {
            let copied = self
                .channel
                .flush(&mut self.tx)
                .await
                .map_err(ImportError::RowSubmission)?;
            self.stats.record_flush(copied);
        }
        Ok(())
    }

    /// Flush remaining rows, release the channel and commit.
    pub async fn commit(self) -> ImportResult<ImportStats> {
        let ImportSession {
            mut tx,
            mut channel,
            mut stats,
            ..
        } = self;

        let copied = channel
            .finish(&mut tx)
            .await
            .map_err(ImportError::Flush)?;
        stats.record_flush(copied);

        let closed = channel.close();
        release_best_effort(channel.target(), closed);

        tx.commit().await.map_err(ImportError::Commit)?;

        log::info!(
            "committed {} rows into {} ({} COPY round trips)",
            stats.rows_copied,
            channel.target(),
            stats.flushes
        );
        Ok(stats)
    }

    /// Roll back everything submitted so far.
    pub async fn abort(self) -> ImportResult<()> {
        log::warn!(
            "aborting import into {} after {} rows",
            self.channel.target(),
            self.stats.rows_submitted
        );
        self.tx.rollback().await.map_err(ImportError::Rollback)
    }
}
