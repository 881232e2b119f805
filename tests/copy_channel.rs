use pgcopy_import::ImportError;
use pgcopy_import::import::channel::CopyChannel;
use pgcopy_import::import::{new_csv_import, provision};
use pgcopy_import::test_support::{TestDatabase, TestDatabaseError};

async fn test_database() -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping channel test: container runtime unavailable: {err}");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[tokio::test]
async fn unknown_columns_fail_when_the_channel_is_prepared() {
    let Some(test_db) = test_database().await else {
        return;
    };
    let pool = test_db.pool();

    provision::create_table(pool, "public", "narrow", &columns(&["a"]))
        .await
        .expect("table created");

    let mut tx = pool.begin().await.expect("begin");
    let err = CopyChannel::prepare(&mut tx, "public", "narrow", &columns(&["b"]), 1024)
        .await
        .expect_err("column b does not exist");
    assert!(
        matches!(&err, ImportError::Prepare { target, .. } if target == "\"public\".\"narrow\""),
        "got {err:?}"
    );
    tx.rollback().await.expect("rollback");

    let mut tx = pool.begin().await.expect("begin");
    let channel = CopyChannel::prepare(&mut tx, "public", "narrow", &columns(&["a"]), 1024)
        .await
        .expect("matching columns bind");
    assert_eq!(channel.buffered_rows(), 0);
    tx.rollback().await.expect("rollback");

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn failed_flush_leaves_no_rows_buffered() {
    let Some(test_db) = test_database().await else {
        return;
    };
    let pool = test_db.pool();

    provision::create_table(pool, "public", "moving", &columns(&["v"]))
        .await
        .expect("table created");

    let mut tx = pool.begin().await.expect("begin");
    let mut channel = CopyChannel::prepare(&mut tx, "public", "moving", &columns(&["v"]), 1024)
        .await
        .expect("channel prepared");
    channel.push_row(&[Some("one")]).expect("row buffered");
    channel.push_row(&[None]).expect("row buffered");
    assert_eq!(channel.buffered_rows(), 2);

    sqlx::query(r#"ALTER TABLE public.moving RENAME TO moved"#)
        .execute(&mut *tx)
        .await
        .expect("rename inside the transaction");

    channel
        .flush(&mut tx)
        .await
        .expect_err("COPY target no longer exists");
    assert_eq!(channel.buffered_rows(), 0);
    assert_eq!(channel.buffered_bytes(), 0);

    drop(tx);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn closed_pool_fails_during_provisioning() {
    let Some(test_db) = test_database().await else {
        return;
    };
    let pool = test_db.pool().clone();
    pool.close().await;

    let err = match new_csv_import(&pool, "public", "never", &columns(&["v"]), true).await {
        Ok(_) => panic!("closed pool should not open a session"),
        Err(err) => err,
    };
    assert!(
        matches!(err, ImportError::Provisioning(sqlx::Error::PoolClosed)),
        "got {err:?}"
    );

    test_db.close().await.expect("failed to drop test database");
}
