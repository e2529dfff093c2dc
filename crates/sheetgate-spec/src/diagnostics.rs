use std::io::{self, Write};

use serde::Serialize;

/// Severity of a single finding.
///
/// Errors are fatal at the next [`DiagnosticSink::flush`]; warnings are
/// collected across the whole validation battery and reported together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Aggregate state of a sink. Transitions are monotone: once warnings have
/// been seen the sink never reports `Clean` again, and `HasErrors` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Clean,
    HasWarnings,
    HasErrors,
}

/// Result of flushing a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// No pending errors; the run may continue.
    Continue,
    /// Errors were flushed; the run must stop and nothing may be exported.
    Abort,
}

/// Accumulator for warnings and errors, flushed at every stage boundary.
///
/// The sink is an explicit value handed to each validation call rather than
/// process-global state, so tests can run isolated batteries and a single
/// process can validate several files. It never terminates the process; the
/// caller maps [`StageOutcome::Abort`] to whatever exit policy it wants.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    warnings: Vec<Diagnostic>,
    errors: Vec<Diagnostic>,
    warned: bool,
    errored: bool,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a recoverable finding.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
        });
        self.warned = true;
    }

    /// Record a fatal finding. The next flush aborts the run.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(Diagnostic {
            severity: Severity::Error,
            message: message.into(),
        });
        self.errored = true;
    }

    pub fn state(&self) -> SinkState {
        if self.errored {
            SinkState::HasErrors
        } else if self.warned {
            SinkState::HasWarnings
        } else {
            SinkState::Clean
        }
    }

    /// Whether any warning was recorded at any point, flushed or not.
    ///
    /// The export gate consults this after the full battery: a run that ever
    /// warned is blocked even though each warning was individually
    /// recoverable.
    pub fn warned(&self) -> bool {
        self.warned
    }

    /// Pending findings not yet flushed, warnings first.
    pub fn pending(&self) -> impl Iterator<Item = &Diagnostic> {
        self.warnings.iter().chain(self.errors.iter())
    }

    /// Print and clear pending warnings; if any error is pending, print and
    /// clear those too and tell the caller to abort.
    pub fn flush<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<StageOutcome> {
        for diag in self.warnings.drain(..) {
            writeln!(out, "warning: {}", diag.message)?;
        }
        if self.errors.is_empty() {
            return Ok(StageOutcome::Continue);
        }
        for diag in self.errors.drain(..) {
            writeln!(out, "error: {}", diag.message)?;
        }
        Ok(StageOutcome::Abort)
    }
}
