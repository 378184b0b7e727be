//! Probe outcomes and exit-code classification.
//!
//! Probe scripts report through their exit status:
//!
//! | Exit status | Outcome |
//! |-------------|---------|
//! | 0 | [`ProbeOutcome::Success`] |
//! | 132 | [`ProbeOutcome::DetectedUnsupported`] |
//! | any other | [`ProbeOutcome::Incompatible`] |
//! | launch failure, timeout, cancel, signal | [`ProbeOutcome::ExecutionError`] |
//!
//! [`classify`] is the only place that interprets exit codes; the rest of
//! the crate works with [`ProbeOutcome`].

use crate::status::Metadata;
use std::time::Duration;
use thiserror::Error;

/// Exit status a probe uses to say "the software is here, but this recipe
/// cannot support it".
pub const DETECTED_UNSUPPORTED_EXIT_CODE: i32 = 132;

/// How a pre-install execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    /// The script ran and exited with a non-zero status.
    Exited { code: i32 },

    /// The script was killed by a signal.
    Signalled,

    /// The script could not be started (interpreter or file missing).
    Launch,

    /// The script ran past its timeout and was killed.
    TimedOut,

    /// The run was cancelled while the script was running.
    Cancelled,
}

/// Error returned by a pre-install executor.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ExecutionError {
    /// What kind of failure this is
    pub kind: ExecutionErrorKind,

    /// Human-readable description
    pub message: String,

    /// Structured metadata the script emitted, if any
    pub metadata: Option<Metadata>,

    /// Captured standard error, if any
    pub stderr: Option<String>,
}

impl ExecutionError {
    fn new(kind: ExecutionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            metadata: None,
            stderr: None,
        }
    }

    /// The script exited with a non-zero status.
    pub fn exited(code: i32, message: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::Exited { code }, message)
    }

    /// The script was killed by a signal.
    pub fn signalled(message: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::Signalled, message)
    }

    /// The script could not be launched.
    pub fn launch(message: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::Launch, message)
    }

    /// The script exceeded its timeout.
    pub fn timed_out(after: Duration) -> Self {
        Self::new(
            ExecutionErrorKind::TimedOut,
            format!("pre-install script timed out after {}s", after.as_secs()),
        )
    }

    /// The run was cancelled while the script was running.
    pub fn cancelled() -> Self {
        Self::new(
            ExecutionErrorKind::Cancelled,
            "pre-install script cancelled",
        )
    }

    /// Attach structured metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attach captured standard error.
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }

    /// Exit status, if the script exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self.kind {
            ExecutionErrorKind::Exited { code } => Some(code),
            _ => None,
        }
    }

    /// Whether the script exited with exactly `code`.
    pub fn is_exit_status(&self, code: i32) -> bool {
        self.exit_code() == Some(code)
    }
}

/// Classified result of running a probe script.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The host is compatible with the recipe.
    Success,

    /// The script ran and reported the host as incompatible.
    Incompatible(ExecutionError),

    /// The target software is present but this recipe cannot support it.
    DetectedUnsupported(ExecutionError),

    /// The script could not be run to completion.
    ExecutionError(ExecutionError),
}

impl ProbeOutcome {
    /// Whether the recipe should be excluded. Every non-success outcome excludes.
    pub fn is_excluded(&self) -> bool {
        !matches!(self, ProbeOutcome::Success)
    }

    /// The underlying error, if any.
    pub fn error(&self) -> Option<&ExecutionError> {
        match self {
            ProbeOutcome::Success => None,
            ProbeOutcome::Incompatible(e)
            | ProbeOutcome::DetectedUnsupported(e)
            | ProbeOutcome::ExecutionError(e) => Some(e),
        }
    }

    /// Convert back to the executor's result, returning the original error.
    pub fn into_result(self) -> Result<(), ExecutionError> {
        match self {
            ProbeOutcome::Success => Ok(()),
            ProbeOutcome::Incompatible(e)
            | ProbeOutcome::DetectedUnsupported(e)
            | ProbeOutcome::ExecutionError(e) => Err(e),
        }
    }

    /// Short label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Success => "success",
            ProbeOutcome::Incompatible(_) => "incompatible",
            ProbeOutcome::DetectedUnsupported(_) => "detected-unsupported",
            ProbeOutcome::ExecutionError(_) => "execution-error",
        }
    }
}

/// Classify an executor result into a probe outcome.
pub fn classify(result: Result<(), ExecutionError>) -> ProbeOutcome {
    match result {
        Ok(()) => ProbeOutcome::Success,
        Err(e) if e.is_exit_status(DETECTED_UNSUPPORTED_EXIT_CODE) => {
            ProbeOutcome::DetectedUnsupported(e)
        }
        Err(e) if e.exit_code().is_some() => ProbeOutcome::Incompatible(e),
        Err(e) => ProbeOutcome::ExecutionError(e),
    }
}
