use std::fmt;
use std::time::Duration;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
        }
    }
}

/// One leveled message recorded while executing a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    /// Index of the row the message concerns, if any.
    pub row: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "{} (row {row}): {}", self.level, self.message),
            None => write!(f, "{}: {}", self.level, self.message),
        }
    }
}

/// Collects diagnostics and mirrors each one to `tracing`.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub(crate) fn warn(&mut self, row: Option<usize>, message: String) {
        tracing::warn!(row, "{message}");
        self.entries.push(Diagnostic {
            level: Level::Warning,
            row,
            message,
        });
    }

    pub(crate) fn error(&mut self, row: Option<usize>, message: String) {
        tracing::error!(row, "{message}");
        self.entries.push(Diagnostic {
            level: Level::Error,
            row,
            message,
        });
    }

    pub(crate) fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Rules contributed outputs. Holds their declaration indices (0-based)
    /// in the order they were applied.
    Matched { rules: Vec<usize> },
    /// No rule matched; the default results were applied.
    Defaulted,
    /// No rule matched and there are no defaults. Nothing was written.
    NoMatch,
    /// An extraction error under `stopOnError` stopped the row before any
    /// output was written.
    Aborted,
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowOutcome::Matched { rules } => {
                let numbers: Vec<String> = rules.iter().map(|r| format!("#{}", r + 1)).collect();
                write!(f, "matched [{}]", numbers.join(", "))
            }
            RowOutcome::Defaulted => write!(f, "defaulted"),
            RowOutcome::NoMatch => write!(f, "no match"),
            RowOutcome::Aborted => write!(f, "aborted"),
        }
    }
}

/// Per-row result inside a [`TableReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowReport {
    pub index: usize,
    /// JSON pointer of the row within the document.
    pub pointer: String,
    pub outcome: RowOutcome,
    /// Number of rules whose conditions were checked.
    pub evaluated: usize,
    /// Names of the outputs written, in output declaration order.
    pub written: Vec<String>,
    pub success: bool,
}

/// Result of [`DecisionTable::execute()`](crate::DecisionTable::execute).
///
/// The document is mutated row by row, so a failed report can still come
/// with outputs already written for earlier rows.
#[derive(Debug, Clone)]
#[must_use]
pub struct TableReport {
    success: bool,
    rows: Vec<RowReport>,
    diagnostics: Vec<Diagnostic>,
    duration: Duration,
}

impl TableReport {
    pub(crate) fn new(rows: Vec<RowReport>, diagnostics: Vec<Diagnostic>, duration: Duration) -> Self {
        Self {
            success: rows.iter().all(|r| r.success),
            rows,
            diagnostics,
            duration,
        }
    }

    /// `true` when every row succeeded. A table that selected no rows
    /// succeeds.
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub fn rows(&self) -> &[RowReport] {
        &self.rows
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.level == Level::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.level == Level::Error)
    }

    /// Wall-clock duration of the execution.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for TableReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} row(s), {} warning(s), {} error(s), duration: {:?}",
            if self.success { "success" } else { "failure" },
            self.rows.len(),
            self.warnings().count(),
            self.errors().count(),
            self.duration
        )?;
        for row in &self.rows {
            write!(f, "\n  row {} ({}): {}", row.index, row.pointer, row.outcome)?;
            if !row.written.is_empty() {
                write!(f, ", wrote [{}]", row.written.join(", "))?;
            }
        }
        Ok(())
    }
}
