//! Facade tests against a live database.
//!
//! Each test works on its own temporary table, which the server drops when
//! the test's connection closes, whether or not the test passed.
//! Skipped when `DATABASE_URL` is not set.

use pgtable::{
    CompareOp, Db, DbConfig, DbError, DbResult, MultiInsert, Record, Retrieve, Retrieved, Value,
    Where, record,
};
use std::time::{SystemTime, UNIX_EPOCH};

async fn setup(test: &str) -> DbResult<Option<(Db<tokio_postgres::Client>, String)>> {
    let config = match DbConfig::from_env() {
        Ok(config) => config,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return Ok(None);
        }
    };
    let db = Db::connect(&config.application_name("pgtable-tests")).await?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    let table = format!("pgtable_{test}_{}_{nanos}", std::process::id());

    db.client()
        .batch_execute(&format!(
            r#"CREATE TEMP TABLE "{table}" (
                id SERIAL PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                age INT CHECK (age >= 0)
            )"#
        ))
        .await?;

    Ok(Some((db, table)))
}

async fn all_rows(db: &mut Db<tokio_postgres::Client>, table: &str) -> DbResult<Vec<Record>> {
    Ok(db
        .table(table)
        .select("username, password, age", Where::new())
        .await
        .retrieve(Retrieve::All)?
        .into_all())
}

#[tokio::test]
async fn insert_then_select_by_unique_key() -> DbResult<()> {
    let Some((mut db, table)) = setup("roundtrip").await? else {
        return Ok(());
    };
    assert!(db.is_connected());

    let john = record! { "username" => "John", "password" => "secret", "age" => 30 };
    assert_eq!(db.table(&table).insert(&john).await?, 1);

    let found = db
        .table(&table)
        .select("username, password, age", Where::from([("username", "John")]))
        .await
        .retrieve(Retrieve::First)?;
    assert_eq!(found, Retrieved::First(Some(john)));

    let missing = db
        .table(&table)
        .select("*", Where::from([("username", "nobody")]))
        .await
        .retrieve(Retrieve::First)?;
    assert_eq!(missing, Retrieved::First(None));

    Ok(())
}

#[tokio::test]
async fn multi_insert_outcomes() -> DbResult<()> {
    let Some((mut db, table)) = setup("multi").await? else {
        return Ok(());
    };

    let valid = vec![
        record! { "username" => "a", "password" => "1" },
        record! { "username" => "b", "password" => "2" },
    ];
    let outcome = db.table(&table).multi_insert("username, password", &valid).await;
    assert!(matches!(outcome, MultiInsert::Complete { inserted: 2 }));

    let mixed = vec![
        record! { "username" => "c", "password" => "3" },
        record! { "username" => "a", "password" => "dup" },
    ];
    let outcome = db.table(&table).multi_insert("username, password", &mixed).await;
    assert!(outcome.is_partial());
    assert_eq!(outcome.inserted(), 1);
    assert_eq!(outcome.failures()[0].index, 1);
    assert!(outcome.failures()[0].error.is_unique_violation());

    let invalid = vec![
        record! { "username" => "d", "password" => "4", "age" => -1 },
        record! { "username" => "e", "password" => "5", "age" => -2 },
    ];
    let outcome = db
        .table(&table)
        .multi_insert("username, password, age", &invalid)
        .await;
    assert!(outcome.is_failed());
    assert!(
        outcome
            .failures()
            .iter()
            .all(|f| matches!(f.error, DbError::CheckViolation(_)))
    );

    let mut usernames: Vec<_> = all_rows(&mut db, &table)
        .await?
        .iter()
        .filter_map(|r| r.get("username").and_then(Value::as_str).map(str::to_string))
        .collect();
    usernames.sort();
    assert_eq!(usernames, ["a", "b", "c"]);

    Ok(())
}

#[tokio::test]
async fn update_and_delete_scope() -> DbResult<()> {
    let Some((mut db, table)) = setup("scope").await? else {
        return Ok(());
    };

    let rows: Vec<Record> = (0..4)
        .map(|i| record! { "username" => format!("user{i}"), "password" => "pw", "age" => i * 10 })
        .collect();
    assert!(db.table(&table).multi_insert("username, password, age", &rows).await.is_complete());

    let renamed = db
        .table(&table)
        .update(
            &record! { "username" => "renamed" },
            Where::from([("username", "user0")]),
        )
        .await?;
    assert_eq!(renamed, 1);

    let reset = db
        .table(&table)
        .update(&record! { "password" => "reset" }, Where::new())
        .await?;
    assert_eq!(reset, 4);

    let deleted = db
        .table(&table)
        .delete(Where::new().compare("age", CompareOp::Gte, 20))
        .await?;
    assert_eq!(deleted, 2);

    let remaining = all_rows(&mut db, &table).await?;
    assert_eq!(remaining.len(), 2);
    assert!(
        remaining
            .iter()
            .all(|r| r.get("password") == Some(&Value::from("reset")))
    );

    assert_eq!(db.table(&table).delete(Where::new()).await?, 2);
    assert_eq!(
        db.table(&table)
            .select("*", Where::new())
            .await
            .retrieve(Retrieve::All)?,
        Retrieved::All(vec![])
    );

    Ok(())
}

#[tokio::test]
async fn failed_select_reports_through_retrieve() -> DbResult<()> {
    let Some((mut db, table)) = setup("failed_select").await? else {
        return Ok(());
    };

    let result = db
        .table(format!("{table}_missing"))
        .select("*", Where::new())
        .await
        .retrieve(Retrieve::All);
    assert!(result.is_err_and(|e| e.is_driver_error()));

    Ok(())
}
