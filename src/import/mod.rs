//! Bulk table import over PostgreSQL COPY.
//!
//! An import runs in two phases:
//!
//! 1. **Provisioning** (`provision`, `ddl`) - optional `DROP TABLE IF EXISTS`,
//!    then `CREATE TABLE`, executed on the pool before any data moves
//! 2. **Session** (`session`, `channel`) - one transaction owning a buffered
//!    COPY channel; rows are streamed in and become visible on commit
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use pgcopy_import::import::new_csv_import;
//!
//! let columns = vec!["id".to_string(), "name".to_string()];
//! let mut session = new_csv_import(&pool, "import", "people", &columns, true).await?;
//! session.add_row("\\N", &["1", "alice"]).await?;
//! session.add_row("\\N", &["2", "\\N"]).await?;
//! let stats = session.commit().await?;
//!
//! println!("Imported {} rows", stats.rows_copied);
//! ```

pub mod channel;
pub mod ddl;
pub mod provision;
pub mod session;
pub mod stats;

pub use ddl::JsonColumnType;
pub use session::{
    ImportSession, SessionOptions, new_csv_import, new_csv_import_with_options, new_json_import,
    new_json_import_with_options, substitute_nulls,
};
pub use stats::ImportStats;
