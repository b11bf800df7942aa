//! Statement execution against a live connection.
//!
//! The driver only sees two seams: a [`Connector`] that opens a session
//! and a [`StatementExecutor`] that runs one statement at a time.

use std::future::Future;
use std::io::Write;

use colored::*;
use sqlx::{AnyConnection, Connection};
use tracing::debug;
use url::Url;

use crate::error::StatementFailure;
use crate::splitter::Statement;

/// Progress marker written after every successful statement.
pub const PROGRESS_MARKER: &str = ".";

/// An open session that executes statements one by one.
pub trait StatementExecutor {
    /// Execute one statement.
    fn execute(&mut self, sql: &str) -> impl Future<Output = Result<(), sqlx::Error>>;

    /// Release the session.
    fn close(self) -> impl Future<Output = Result<(), sqlx::Error>>;

    /// Operator output for a statement that just ran. `None` means the
    /// plain progress marker.
    fn progress_line(&self, _statement: &Statement) -> Option<String> {
        None
    }
}

/// Opens sessions.
pub trait Connector {
    type Session: StatementExecutor;

    /// Open a new session.
    fn connect(&self) -> impl Future<Output = Result<Self::Session, sqlx::Error>>;

    /// Human-readable target, safe to print.
    fn describe(&self) -> String;
}

/// Run one statement, emitting a progress marker to `out` on success.
pub async fn apply_statement<E, W>(
    session: &mut E,
    statement: &Statement,
    out: Option<&mut W>,
) -> Result<(), StatementFailure>
where
    E: StatementExecutor,
    W: Write,
{
    debug!(line = statement.line, sql = %statement.sql, "executing statement");

    session
        .execute(&statement.sql)
        .await
        .map_err(|e| StatementFailure {
            statement: statement.sql.clone(),
            message: database_message(&e),
        })?;

    if let Some(out) = out {
        let progress = session
            .progress_line(statement)
            .unwrap_or_else(|| PROGRESS_MARKER.to_string());
        // Progress output is best effort; a closed stdout must not abort the run.
        if let Err(e) = write!(out, "{}", progress).and_then(|_| out.flush()) {
            debug!(error = %e, "progress output failed");
        }
    }
    Ok(())
}

/// Prefer the server's own message for database errors.
fn database_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => format!("{} ({})", db.message(), code),
            None => db.message().to_string(),
        },
        other => other.to_string(),
    }
}

/// Connects through the sqlx `Any` driver (`mysql://`, `sqlite:`).
#[derive(Debug, Clone)]
pub struct DatabaseConnector {
    url: String,
}

impl DatabaseConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Connector for DatabaseConnector {
    type Session = DatabaseSession;

    async fn connect(&self) -> Result<DatabaseSession, sqlx::Error> {
        sqlx::any::install_default_drivers();
        let conn = AnyConnection::connect(&self.url).await?;
        debug!(backend = conn.backend_name(), "connection opened");
        Ok(DatabaseSession { conn })
    }

    fn describe(&self) -> String {
        redact_url(&self.url)
    }
}

/// A live database connection.
pub struct DatabaseSession {
    conn: AnyConnection,
}

impl StatementExecutor for DatabaseSession {
    async fn execute(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        // Text protocol: stored routine bodies can't go through prepare.
        let result = sqlx::raw_sql(sql).execute(&mut self.conn).await?;
        debug!(rows = result.rows_affected(), "statement done");
        Ok(())
    }

    async fn close(self) -> Result<(), sqlx::Error> {
        self.conn.close().await
    }
}

/// Prints statements instead of executing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRun;

impl Connector for DryRun {
    type Session = PlanSession;

    async fn connect(&self) -> Result<PlanSession, sqlx::Error> {
        Ok(PlanSession::default())
    }

    fn describe(&self) -> String {
        "dry run (no database)".to_string()
    }
}

/// Session for [`DryRun`]; numbers every statement and echoes it to the
/// operator output in place of the progress marker.
#[derive(Debug, Default)]
pub struct PlanSession {
    executed: usize,
}

impl StatementExecutor for PlanSession {
    async fn execute(&mut self, _sql: &str) -> Result<(), sqlx::Error> {
        self.executed += 1;
        Ok(())
    }

    async fn close(self) -> Result<(), sqlx::Error> {
        Ok(())
    }

    fn progress_line(&self, statement: &Statement) -> Option<String> {
        Some(format!(
            "\n    {} {}",
            format!("[{}]", self.executed).cyan(),
            statement.sql
        ))
    }
}

/// Hide the password in a connection URL. Strings that are not URLs, or
/// carry no password, come back unchanged.
pub fn redact_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    if url.password().is_none() || url.set_password(Some("***")).is_err() {
        return raw.to_string();
    }
    url.to_string()
}
