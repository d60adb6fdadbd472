//! Compile strategy selection and execution
//!
//! `latexmk` is preferred. When it cannot be found, `pdflatex` runs twice
//! so cross-references and the table of contents resolve. There are no
//! automatic retries: each request gets exactly one attempt.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::errors::{tail_chars, CompileFailure, FailureKind};
use super::process::{run_bounded, ProcessError};
use super::toolchain::{probe, ToolchainConfig, ToolchainReport};
use super::{CompileLimits, CompiledPdf, MAIN_LOG, MAIN_OUTPUT, MAIN_SOURCE};
use crate::workspace::Workspace;

const LATEX_FLAGS: [&str; 3] = [
    "-interaction=nonstopmode",
    "-halt-on-error",
    "-file-line-error",
];

/// How a workspace gets compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One `latexmk -pdf` run
    Latexmk,
    /// Two consecutive `pdflatex` runs
    PdflatexTwice,
}

impl Strategy {
    fn args(self) -> Vec<&'static str> {
        let mut args = Vec::with_capacity(LATEX_FLAGS.len() + 2);
        if self == Strategy::Latexmk {
            args.push("-pdf");
        }
        args.extend(LATEX_FLAGS);
        args.push(MAIN_SOURCE);
        args
    }

    fn passes(self) -> usize {
        match self {
            Strategy::Latexmk => 1,
            Strategy::PdflatexTwice => 2,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Latexmk => write!(f, "latexmk"),
            Strategy::PdflatexTwice => write!(f, "pdflatex-twice"),
        }
    }
}

/// Lifecycle of one compile attempt; both terminal states are final
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStage {
    Pending,
    Rendering,
    Compiling,
    Succeeded,
    Failed,
}

impl std::fmt::Display for CompileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CompileStage::Pending => "PENDING",
            CompileStage::Rendering => "RENDERING",
            CompileStage::Compiling => "COMPILING",
            CompileStage::Succeeded => "SUCCEEDED",
            CompileStage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Drives the external toolchain against a populated workspace
#[derive(Debug, Clone)]
pub struct CompilerOrchestrator {
    toolchain: ToolchainConfig,
    limits: CompileLimits,
}

impl CompilerOrchestrator {
    pub fn new(toolchain: ToolchainConfig, limits: CompileLimits) -> Self {
        Self { toolchain, limits }
    }

    pub fn toolchain(&self) -> &ToolchainConfig {
        &self.toolchain
    }

    pub fn limits(&self) -> &CompileLimits {
        &self.limits
    }

    /// Pick the strategy from which binaries are present right now
    pub fn select_strategy(&self) -> Result<(Strategy, PathBuf), CompileFailure> {
        if let Some(path) = self.toolchain.resolve_primary() {
            return Ok((Strategy::Latexmk, path));
        }
        if let Some(path) = self.toolchain.resolve_fallback() {
            tracing::info!(
                primary = %self.toolchain.primary,
                fallback = %path.display(),
                "Primary toolchain not found, using fallback"
            );
            return Ok((Strategy::PdflatexTwice, path));
        }

        Err(CompileFailure::new(
            FailureKind::ToolchainUnavailable,
            format!(
                "No LaTeX toolchain found: neither '{}' nor '{}' is installed or on the search path",
                self.toolchain.primary, self.toolchain.fallback
            ),
        ))
    }

    /// Compile `main.tex` in `workspace` and read back `main.pdf`
    pub async fn compile(&self, workspace: &Workspace) -> Result<CompiledPdf, CompileFailure> {
        let (strategy, program) = self
            .select_strategy()
            .map_err(|failure| self.diagnose(workspace, failure))?;

        tracing::info!(
            workspace = %workspace.id(),
            strategy = %strategy,
            stage = %CompileStage::Compiling,
            "Compiling"
        );

        let result = self.run_strategy(workspace, strategy, &program).await;

        match &result {
            Ok(pdf) => tracing::info!(
                workspace = %workspace.id(),
                bytes = pdf.pdf.len(),
                stage = %CompileStage::Succeeded,
                "Compile finished"
            ),
            Err(failure) => tracing::warn!(
                workspace = %workspace.id(),
                kind = ?failure.kind,
                exit_code = ?failure.exit_code,
                stage = %CompileStage::Failed,
                "Compile failed: {}",
                failure.message
            ),
        }

        result
    }

    async fn run_strategy(
        &self,
        workspace: &Workspace,
        strategy: Strategy,
        program: &Path,
    ) -> Result<CompiledPdf, CompileFailure> {
        let args = strategy.args();
        let command: Vec<String> = std::iter::once(program.display().to_string())
            .chain(args.iter().map(|a| a.to_string()))
            .collect();

        let mut stdout = String::new();
        let mut stderr = String::new();

        for pass in 1..=strategy.passes() {
            tracing::debug!(workspace = %workspace.id(), pass, "Toolchain pass");

            let output = match run_bounded(
                program,
                &args,
                workspace.path(),
                self.limits.timeout,
                self.limits.max_output_bytes,
            )
            .await
            {
                Ok(output) => output,
                Err(e) => {
                    let kind = match e {
                        ProcessError::TimedOut(_) => FailureKind::TimedOut,
                        ProcessError::Spawn(_) | ProcessError::Io(_) => FailureKind::SpawnFailed,
                    };
                    let failure = CompileFailure::new(kind, format!("{} {}", strategy, e))
                        .with_command(command)
                        .with_output(stdout, stderr);
                    return Err(self.diagnose(workspace, failure));
                }
            };

            stdout.push_str(&output.stdout);
            stderr.push_str(&output.stderr);

            if !output.status.success() {
                let code = output.status.code();
                let message = match code {
                    Some(code) => format!("{} exited with code {} (pass {})", strategy, code, pass),
                    None => format!("{} was terminated by a signal (pass {})", strategy, pass),
                };
                let failure = CompileFailure::new(FailureKind::NonZeroExit, message)
                    .with_command(command)
                    .with_exit_code(code)
                    .with_output(stdout, stderr);
                return Err(self.diagnose(workspace, failure));
            }
        }

        let pdf = match workspace.read_file(MAIN_OUTPUT) {
            Ok(pdf) => pdf,
            Err(e) => {
                let failure = CompileFailure::new(
                    FailureKind::MissingOutput,
                    format!("{} finished but {} could not be read: {}", strategy, MAIN_OUTPUT, e),
                )
                .with_command(command)
                .with_exit_code(Some(0))
                .with_output(stdout, stderr);
                return Err(self.diagnose(workspace, failure));
            }
        };

        if !pdf.starts_with(b"%PDF-") {
            let failure = CompileFailure::new(
                FailureKind::InvalidOutput,
                format!("{} produced a {} that is not a PDF", strategy, MAIN_OUTPUT),
            )
            .with_command(command)
            .with_exit_code(Some(0))
            .with_output(stdout, stderr);
            return Err(self.diagnose(workspace, failure));
        }

        Ok(CompiledPdf {
            pdf,
            stdout,
            stderr,
            strategy,
            workspace_id: workspace.id(),
        })
    }

    /// Attach the log tail and workspace listing to a failure
    fn diagnose(&self, workspace: &Workspace, mut failure: CompileFailure) -> CompileFailure {
        if let Ok(log) = workspace.read_file(MAIN_LOG) {
            let log = String::from_utf8_lossy(&log);
            failure.log_tail = Some(tail_chars(&log, self.limits.log_tail_chars).to_string());
        }
        failure.workspace_files = workspace.list_files().unwrap_or_default();
        failure
    }

    /// Report which binaries are present and their versions
    pub async fn health(&self) -> ToolchainReport {
        let primary = probe(
            "primary",
            &self.toolchain.primary,
            self.toolchain.resolve_primary(),
        )
        .await;
        let fallback = probe(
            "fallback",
            &self.toolchain.fallback,
            self.toolchain.resolve_fallback(),
        )
        .await;

        ToolchainReport {
            ready: primary.available || fallback.available,
            binaries: vec![primary, fallback],
        }
    }
}
