use pgcopy_import::import::{JsonColumnType, new_json_import};
use pgcopy_import::test_support::{TestDatabase, TestDatabaseError};

async fn test_database() -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping import test: container runtime unavailable: {err}");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

#[tokio::test]
async fn jsonb_documents_are_loaded_into_one_column() {
    let Some(test_db) = test_database().await else {
        return;
    };
    let pool = test_db.pool();

    let mut session = new_json_import(pool, "public", "events", "payload", JsonColumnType::Jsonb)
        .await
        .expect("session opens");
    assert_eq!(session.columns(), &["payload".to_string()]);
    session
        .add_row("\\N", &["{\"a\":1}"])
        .await
        .expect("document accepted");
    let stats = session.commit().await.expect("commit");
    assert_eq!(stats.rows_copied, 1);

    let matches: Vec<bool> =
        sqlx::query_scalar(r#"SELECT payload = '{"a":1}'::jsonb FROM public.events"#)
            .fetch_all(pool)
            .await
            .expect("select payload");
    assert_eq!(matches, vec![true]);

    let data_type: String = sqlx::query_scalar(
        "SELECT data_type FROM information_schema.columns \
         WHERE table_schema = 'public' AND table_name = 'events' AND column_name = 'payload'",
    )
    .fetch_one(pool)
    .await
    .expect("column lookup");
    assert_eq!(data_type, "jsonb");

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn json_documents_keep_their_text_and_escapes() {
    let Some(test_db) = test_database().await else {
        return;
    };
    let pool = test_db.pool();

    let document = r#"{"path":"C:\\temp","note":"line\nbreak"}"#;
    let mut session = new_json_import(pool, "public", "raw_docs", "doc", JsonColumnType::Json)
        .await
        .expect("session opens");
    session.add_row("\\N", &[document]).await.expect("document");
    session.commit().await.expect("commit");

    let stored: String = sqlx::query_scalar("SELECT doc::text FROM public.raw_docs")
        .fetch_one(pool)
        .await
        .expect("select doc");
    assert_eq!(stored, document);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn malformed_json_fails_the_import() {
    let Some(test_db) = test_database().await else {
        return;
    };
    let pool = test_db.pool();

    let mut session = new_json_import(pool, "public", "broken", "doc", JsonColumnType::Jsonb)
        .await
        .expect("session opens");
    session.add_row("\\N", &["{\"ok\":true}"]).await.expect("buffered");
    session.add_row("\\N", &["{not json"]).await.expect("buffered");

    let err = match session.commit().await {
        Ok(_) => panic!("commit of malformed document should fail"),
        Err(err) => err,
    };
    assert!(
        matches!(err, pgcopy_import::ImportError::Flush(_)),
        "got {err:?}"
    );

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM public.broken")
        .fetch_one(pool)
        .await
        .expect("count");
    assert_eq!(count, 0);

    test_db.close().await.expect("failed to drop test database");
}
