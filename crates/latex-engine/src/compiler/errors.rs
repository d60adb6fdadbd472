//! Structured compile failures

use serde::Serialize;
use thiserror::Error;

/// What went wrong during a compile attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Neither the primary nor the fallback binary could be found
    ToolchainUnavailable,
    /// The binary was found but could not be started
    SpawnFailed,
    /// The process exited with a non-zero status
    NonZeroExit,
    /// The process outlived the configured timeout and was killed
    TimedOut,
    /// The process succeeded but produced no output file
    MissingOutput,
    /// The output file is not a PDF
    InvalidOutput,
}

/// A failed compile attempt with everything needed to diagnose it
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct CompileFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Process exit code, when the process ran to completion
    pub exit_code: Option<i32>,
    /// Program and arguments of the attempted invocation
    pub command: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    /// Last characters of the toolchain log file
    pub log_tail: Option<String>,
    /// Entries of the workspace at the time of failure
    pub workspace_files: Vec<String>,
}

impl CompileFailure {
    /// Create a failure with no captured process output
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            exit_code: None,
            command: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
            log_tail: None,
            workspace_files: Vec::new(),
        }
    }

    /// Set the attempted command line
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    /// Set the captured streams
    pub fn with_output(mut self, stdout: String, stderr: String) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }

    /// Set the exit code
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::TimedOut
    }

    pub fn is_toolchain_unavailable(&self) -> bool {
        self.kind == FailureKind::ToolchainUnavailable
    }
}

/// Last `max_chars` characters of `text`, on a char boundary
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}
