use thiserror::Error;

pub type ImportResult<T> = Result<T, ImportError>;

/// Errors surfaced by table provisioning and import sessions.
///
/// Database errors are carried unchanged; nothing here is retried.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
    #[error("table provisioning failed: {0}")]
    Provisioning(#[source] sqlx::Error),
    #[error("could not begin import transaction: {0}")]
    Transaction(#[source] sqlx::Error),
    #[error("could not prepare COPY into {target}: {source}")]
    Prepare {
        target: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("row has {actual} values but the import expects {expected}")]
    Binding { expected: usize, actual: usize },
    #[error("row submission failed: {0}")]
    RowSubmission(#[source] sqlx::Error),
    #[error("final COPY flush failed: {0}")]
    Flush(#[source] sqlx::Error),
    #[error("import commit failed: {0}")]
    Commit(#[source] sqlx::Error),
    #[error("import rollback failed: {0}")]
    Rollback(#[source] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_error_message_names_both_widths() {
        let err = ImportError::Binding {
            expected: 2,
            actual: 3,
        };
        assert_eq!(err.to_string(), "row has 3 values but the import expects 2");
    }

    #[test]
    fn prepare_error_names_the_target() {
        let err = ImportError::Prepare {
            target: "\"import\".\"people\"".to_string(),
            source: sqlx::Error::PoolClosed,
        };
        let message = err.to_string();
        assert!(message.starts_with("could not prepare COPY into \"import\".\"people\": "));
    }
}
