//! Error types for a migration run.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The script root does not exist or is not a directory.
    #[error("script directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Listing the script tree failed for another reason.
    #[error("failed to list scripts under {}: {source}", .path.display())]
    DiscoveryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tree contains no matching script files.
    #[error("no *.{extension} scripts found under {}", .path.display())]
    NoScripts { path: PathBuf, extension: String },

    /// A located script could not be read.
    #[error("failed to read script {}: {source}", .path.display())]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Opening the database connection failed.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// A statement was rejected by the database.
    #[error("{} (line {line}): {failure}", .file.display())]
    Statement {
        file: PathBuf,
        line: usize,
        #[source]
        failure: StatementFailure,
    },
}

impl RunError {
    /// Failed statement text, if the run stopped on a statement.
    pub fn statement(&self) -> Option<&str> {
        match self {
            RunError::Statement { failure, .. } => Some(&failure.statement),
            _ => None,
        }
    }
}

/// A single statement that failed to execute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("statement failed: {message}")]
pub struct StatementFailure {
    /// The statement text as sent to the database.
    pub statement: String,
    /// The database-reported error message.
    pub message: String,
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid log level {level:?}: {source}")]
    LogLevel {
        level: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
}

/// Result type for a migration run.
pub type RunResult<T> = Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_error_display() {
        let err = RunError::Statement {
            file: PathBuf::from("scripts/03_procedures.sql"),
            line: 12,
            failure: StatementFailure {
                statement: "SELEC 1;".to_string(),
                message: "syntax error".to_string(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("03_procedures.sql"));
        assert!(msg.contains("line 12"));
        assert!(msg.contains("syntax error"));
        assert_eq!(err.statement(), Some("SELEC 1;"));
    }

    #[test]
    fn test_no_scripts_display() {
        let err = RunError::NoScripts {
            path: PathBuf::from("db"),
            extension: "sql".to_string(),
        };
        assert_eq!(err.to_string(), "no *.sql scripts found under db");
        assert!(err.statement().is_none());
    }
}
