//! Drive import sessions from row sources.
//!
//! On any error that is not skipped, the session is rolled back explicitly
//! before the error is returned.

use std::io::{BufRead, Read};

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::import::{
    ImportSession, ImportStats, JsonColumnType, SessionOptions, new_csv_import_with_options,
    new_json_import_with_options, provision,
};
use crate::source::{CsvSource, JsonLines, SourceError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Where rows go.
#[derive(Debug, Clone)]
pub struct LoadTarget {
    pub schema: String,
    pub table: String,
    pub drop: bool,
}

#[derive(Debug, Clone)]
pub struct LoadSettings {
    pub null_sentinel: String,
    pub ignore_errors: bool,
    pub progress_every: usize,
    pub session: SessionOptions,
}

impl LoadSettings {
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            null_sentinel: config.null_sentinel.clone(),
            ignore_errors: false,
            progress_every: config.progress_every,
            session: config.session_options(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub schema: String,
    pub table: String,
    #[serde(flatten)]
    pub stats: ImportStats,
    pub skipped_rows: u64,
}

struct Progress {
    every: usize,
    rows: usize,
    skipped: u64,
}

impl Progress {
    fn new(every: usize) -> Self {
        Self {
            every,
            rows: 0,
            skipped: 0,
        }
    }

    fn row(&mut self, table: &str) {
        self.rows += 1;
        if self.every > 0 && self.rows % self.every == 0 {
            log::info!("{}: {} rows submitted", table, self.rows);
        }
    }

    fn skip(&mut self, line: u64, reason: &dyn std::fmt::Display) {
        self.skipped += 1;
        log::warn!("skipping line {}: {}", line, reason);
    }
}

async fn fail(session: ImportSession, err: impl Into<LoadError>) -> LoadError {
    if let Err(rollback_err) = session.abort().await {
        log::warn!("rollback after failed import also failed: {}", rollback_err);
    }
    err.into()
}

async fn finish(
    session: ImportSession,
    target: &LoadTarget,
    progress: Progress,
) -> Result<LoadReport, LoadError> {
    let stats = session.commit().await?;
    if progress.skipped > 0 {
        log::warn!(
            "{}.{}: skipped {} rows",
            target.schema,
            target.table,
            progress.skipped
        );
    }
    Ok(LoadReport {
        schema: target.schema.clone(),
        table: target.table.clone(),
        stats,
        skipped_rows: progress.skipped,
    })
}

/// Create the target table from the source's columns and copy every record.
pub async fn load_csv<R: Read>(
    pool: &PgPool,
    mut source: CsvSource<R>,
    target: &LoadTarget,
    settings: &LoadSettings,
) -> Result<LoadReport, LoadError> {
    provision::create_schema(pool, &target.schema).await?;

    let mut session = new_csv_import_with_options(
        pool,
        &target.schema,
        &target.table,
        source.columns(),
        target.drop,
        settings.session.clone(),
    )
    .await?;
    let mut progress = Progress::new(settings.progress_every);

    while let Some(record) = source.next_record() {
        let record = match record {
            Ok(record) => record,
            Err(err) if settings.ignore_errors && err.is_record_level() => {
                progress.skip(err.line().unwrap_or_default(), &err);
                continue;
            }
            Err(err) => return Err(fail(session, err).await),
        };

        let submitted = session
            .add_row(&settings.null_sentinel, &record.values())
            .await;
        match submitted {
            Ok(()) => progress.row(&target.table),
            Err(err @ ImportError::Binding { .. }) if settings.ignore_errors => {
                progress.skip(record.line, &err);
            }
            Err(err) => return Err(fail(session, err).await),
        }
    }

    finish(session, target, progress).await
}

/// Create a single-column JSON table and copy every document into it.
pub async fn load_json<R: BufRead>(
    pool: &PgPool,
    source: JsonLines<R>,
    target: &LoadTarget,
    column: &str,
    data_type: JsonColumnType,
    settings: &LoadSettings,
) -> Result<LoadReport, LoadError> {
    provision::create_schema(pool, &target.schema).await?;
    if target.drop {
        provision::drop_table(pool, &target.schema, &target.table).await?;
    }

    let mut session = new_json_import_with_options(
        pool,
        &target.schema,
        &target.table,
        column,
        data_type,
        settings.session.clone(),
    )
    .await?;
    let mut progress = Progress::new(settings.progress_every);

    for document in source {
        let document = match document {
            Ok(document) => document,
            Err(err) if settings.ignore_errors && err.is_record_level() => {
                progress.skip(err.line().unwrap_or_default(), &err);
                continue;
            }
            Err(err) => return Err(fail(session, err).await),
        };

        let submitted = session
            .add_row(&settings.null_sentinel, &[document.text.as_str()])
            .await;
        if let Err(err) = submitted {
            return Err(fail(session, err).await);
        }
        progress.row(&target.table);
    }

    finish(session, target, progress).await
}
