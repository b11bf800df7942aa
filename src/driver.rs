//! Migration driver.
//!
//! Runs every located script, statement by statement, in order. The first
//! failing statement aborts the run: no further statements from that file
//! and no later files. Statements that already ran stay applied.

use std::fs;
use std::io::Write;

use colored::*;
use tracing::{debug, info, warn};

use crate::error::{RunError, RunResult};
use crate::executor::{apply_statement, Connector, StatementExecutor};
use crate::locator::{ScriptFile, ScriptLocator};
use crate::splitter;

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    /// At least one script was found.
    Located,
    /// Connection open, statements executing.
    Running,
    Done,
    Aborted,
}

/// Totals for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub statements: usize,
    /// Scripts whose trailing text never reached a delimiter.
    pub unterminated: usize,
}

/// Applies a script tree through a [`Connector`].
pub struct Migrator<C, W> {
    locator: ScriptLocator,
    connector: C,
    out: W,
    progress: bool,
    state: RunState,
}

impl<C, W> Migrator<C, W>
where
    C: Connector,
    W: Write,
{
    /// `out` receives operator-facing progress output.
    pub fn new(locator: ScriptLocator, connector: C, out: W) -> Self {
        Self {
            locator,
            connector,
            out,
            progress: true,
            state: RunState::Uninitialized,
        }
    }

    /// Toggle the per-statement progress markers.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run the migration once. Ends in [`RunState::Done`] or
    /// [`RunState::Aborted`].
    pub async fn run(&mut self) -> RunResult<RunSummary> {
        let result = self.locate_and_apply().await;
        self.transition(if result.is_ok() {
            RunState::Done
        } else {
            RunState::Aborted
        });
        result
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
    }

    async fn locate_and_apply(&mut self) -> RunResult<RunSummary> {
        self.say(format!(
            "{} Loading scripts from {}",
            "→".cyan(),
            self.locator.root().display().to_string().yellow()
        ));

        let mut scripts = self.locator.scripts()?;
        let first = match scripts.next() {
            Some(first) => first?,
            None => {
                return Err(RunError::NoScripts {
                    path: self.locator.root().to_path_buf(),
                    extension: self.locator.extension().to_string(),
                });
            }
        };
        let scripts = std::iter::once(Ok(first)).chain(scripts);
        self.transition(RunState::Located);

        self.say(format!(
            "{} Running scripts on {}",
            "→".cyan(),
            self.connector.describe().yellow()
        ));

        let mut session = self.connector.connect().await.map_err(RunError::Connect)?;
        self.transition(RunState::Running);

        let result = self.apply_scripts(&mut session, scripts).await;

        // Single release point for every outcome of the run body.
        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close connection");
            self.say(format!("{} failed to close connection: {}", "!".yellow(), e));
        }

        result
    }

    async fn apply_scripts<S, I>(&mut self, session: &mut S, scripts: I) -> RunResult<RunSummary>
    where
        S: StatementExecutor,
        I: Iterator<Item = RunResult<ScriptFile>>,
    {
        let mut summary = RunSummary::default();

        for script in scripts {
            let script = script?;
            info!(script = %script.path().display(), "applying script");

            let content = fs::read_to_string(script.path()).map_err(|source| RunError::ReadScript {
                path: script.path().to_path_buf(),
                source,
            })?;

            self.emit(format_args!("  {} {} ", "→".cyan(), script.name()));

            let mut statements = splitter::split(&content);
            for statement in statements.by_ref() {
                let out = self.progress.then_some(&mut self.out);
                if let Err(failure) = apply_statement(session, &statement, out).await {
                    self.say(format!(" {}", "✗".red()));
                    return Err(RunError::Statement {
                        file: script.path().to_path_buf(),
                        line: statement.line,
                        failure,
                    });
                }
                summary.statements += 1;
            }

            if let Some(rest) = statements.into_remainder() {
                warn!(
                    script = %script.path().display(),
                    line = rest.line,
                    "unterminated statement at end of script was not executed"
                );
                summary.unterminated += 1;
            }

            self.say(format!(" {}", "✓".green()));
            summary.files += 1;
        }

        info!(files = summary.files, statements = summary.statements, "all scripts applied");
        Ok(summary)
    }

    fn say(&mut self, line: String) {
        self.emit(format_args!("{}\n", line));
    }

    /// Operator output is best effort; failures are logged and the run goes on.
    fn emit(&mut self, args: std::fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(args).and_then(|_| self.out.flush()) {
            debug!(error = %e, "operator output failed");
        }
    }
}
