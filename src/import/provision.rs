//! Destination table provisioning.
//!
//! DDL runs directly on the pool, outside the import transaction, so the
//! table exists before the COPY channel is prepared against it.

use sqlx::PgPool;

use super::ddl::{self, JsonColumnType};
use crate::error::{ImportError, ImportResult};

async fn execute_ddl(pool: &PgPool, sql: &str) -> ImportResult<()> {
    log::debug!("executing DDL: {}", sql);
    sqlx::query(sql)
        .execute(pool)
        .await
        .map_err(ImportError::Provisioning)?;
    Ok(())
}

pub async fn create_schema(pool: &PgPool, schema: &str) -> ImportResult<()> {
    execute_ddl(pool, &ddl::create_schema_sql(schema)?).await
}

/// Drop the table if present. A missing table is not an error.
pub async fn drop_table(pool: &PgPool, schema: &str, table: &str) -> ImportResult<()> {
    log::info!("dropping table {}.{}", schema, table);
    execute_ddl(pool, &ddl::drop_table_sql(schema, table)?).await
}

pub async fn create_table(
    pool: &PgPool,
    schema: &str,
    table: &str,
    columns: &[String],
) -> ImportResult<()> {
    log::info!(
        "creating table {}.{} with {} columns",
        schema,
        table,
        columns.len()
    );
    execute_ddl(pool, &ddl::create_table_sql(schema, table, columns)?).await
}

pub async fn create_json_table(
    pool: &PgPool,
    schema: &str,
    table: &str,
    column: &str,
    data_type: JsonColumnType,
) -> ImportResult<()> {
    log::info!(
        "creating table {}.{} with {} column {}",
        schema,
        table,
        data_type,
        column
    );
    execute_ddl(
        pool,
        &ddl::create_json_table_sql(schema, table, column, data_type)?,
    )
    .await
}
