//! End-to-end runs against a real SQLite database file.
//!
//! The production target is MySQL; SQLite goes through the same sqlx `Any`
//! path and understands the same statements used here.

use std::fs;
use std::path::Path;

use sqlapply::{DatabaseConnector, Migrator, RunError, RunState, ScriptLocator};
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use tempfile::TempDir;

fn write(dir: &Path, rel: &str, body: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn database_url(dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("app.db").display())
}

/// Four scripts; the last statement of `03_procedures.sql` is replaced by
/// `last_statement`.
fn script_tree(last_statement: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let scripts = tmp.path().join("scripts");

    write(
        &scripts,
        "01_tables.sql",
        "\
# Core tables
CREATE TABLE users (
  id INTEGER PRIMARY KEY,
  name TEXT NOT NULL
);
/* audit trail */
CREATE TABLE audit (user_id INTEGER, note TEXT);
",
    );
    write(
        &scripts,
        "02_views.sql",
        "-- active users\nCREATE VIEW user_names AS SELECT name FROM users;\n",
    );
    write(
        &scripts,
        "03_procedures.sql",
        &format!(
            "\
DELIMITER $$
CREATE TRIGGER users_audit AFTER INSERT ON users
BEGIN
  INSERT INTO audit (user_id, note) VALUES (NEW.id, 'created; ok');
END$$
DELIMITER ;
{last_statement}
"
        ),
    );
    write(
        &scripts,
        "subfolder/01_data.sql",
        "INSERT INTO users (id, name) VALUES (1, 'alice');\nINSERT INTO users (id, name) VALUES (2, 'bob');\n",
    );

    tmp
}

async fn count(conn: &mut SqliteConnection, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(conn).await.unwrap()
}

#[tokio::test]
async fn test_full_run_applies_everything() {
    let tmp = script_tree("CREATE INDEX users_name ON users (name);");
    let url = database_url(tmp.path());

    let mut migrator = Migrator::new(
        ScriptLocator::new(tmp.path().join("scripts")),
        DatabaseConnector::new(url.clone()),
        Vec::new(),
    );
    let summary = migrator.run().await.unwrap();

    assert_eq!(migrator.state(), RunState::Done);
    assert_eq!(summary.files, 4);
    assert_eq!(summary.statements, 7);

    let mut conn = SqliteConnection::connect(&url).await.unwrap();
    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM users").await, 2);
    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM user_names").await, 2);
    assert_eq!(
        count(&mut conn, "SELECT COUNT(*) FROM audit WHERE note = 'created; ok'").await,
        2
    );
}

#[tokio::test]
async fn test_malformed_statement_aborts_before_later_files() {
    let tmp = script_tree("SELEC broken FROM users;");
    let url = database_url(tmp.path());

    let mut migrator = Migrator::new(
        ScriptLocator::new(tmp.path().join("scripts")),
        DatabaseConnector::new(url.clone()),
        Vec::new(),
    );
    let err = migrator.run().await.unwrap_err();

    assert_eq!(migrator.state(), RunState::Aborted);
    assert_eq!(err.statement(), Some("SELEC broken FROM users;"));
    match &err {
        RunError::Statement { file, failure, .. } => {
            assert!(file.ends_with("03_procedures.sql"));
            assert!(!failure.message.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }

    // Everything up to the failure is in place; the data script never ran.
    let mut conn = SqliteConnection::connect(&url).await.unwrap();
    assert_eq!(
        count(
            &mut conn,
            "SELECT COUNT(*) FROM sqlite_master WHERE name IN ('users', 'audit', 'user_names', 'users_audit')"
        )
        .await,
        4
    );
    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM users").await, 0);

    let out = String::from_utf8(migrator.into_output()).unwrap();
    assert!(out.contains("01_tables.sql .."));
    assert!(!out.contains("01_data.sql"));
}

#[tokio::test]
async fn test_missing_script_dir() {
    let tmp = TempDir::new().unwrap();
    let url = database_url(tmp.path());

    let mut migrator = Migrator::new(
        ScriptLocator::new(tmp.path().join("scripts")),
        DatabaseConnector::new(url),
        Vec::new(),
    );
    let err = migrator.run().await.unwrap_err();

    assert!(matches!(err, RunError::DirectoryNotFound(_)));
    // No connection was opened, so no database file was created.
    assert!(!tmp.path().join("app.db").exists());
}

#[tokio::test]
async fn test_bad_connection_url() {
    let tmp = script_tree("SELECT 1;");
    let mut migrator = Migrator::new(
        ScriptLocator::new(tmp.path().join("scripts")),
        DatabaseConnector::new("nosuchdb://localhost/app"),
        Vec::new(),
    );
    let err = migrator.run().await.unwrap_err();
    assert!(matches!(err, RunError::Connect(_)));
    assert_eq!(migrator.state(), RunState::Aborted);
}
