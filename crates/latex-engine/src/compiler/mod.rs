//! External LaTeX toolchain driver with timeout and diagnostics

pub mod errors;
pub mod orchestrator;
pub mod process;
pub mod toolchain;

pub use errors::{CompileFailure, FailureKind};
pub use orchestrator::{CompileStage, CompilerOrchestrator, Strategy};
pub use toolchain::{BinaryStatus, ToolchainConfig, ToolchainReport};

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

/// Entry document name inside every workspace
pub const MAIN_SOURCE: &str = "main.tex";
/// Output produced by the toolchain for [`MAIN_SOURCE`]
pub const MAIN_OUTPUT: &str = "main.pdf";
/// Log written by the toolchain for [`MAIN_SOURCE`]
pub const MAIN_LOG: &str = "main.log";

/// Resource bounds applied to every toolchain invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileLimits {
    /// Wall-clock bound for one invocation
    pub timeout: Duration,
    /// Bytes kept from each of stdout and stderr
    pub max_output_bytes: usize,
    /// Characters of `main.log` attached to a failure
    pub log_tail_chars: usize,
}

impl Default for CompileLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_output_bytes: 10 * 1024 * 1024,
            log_tail_chars: 4000,
        }
    }
}

/// A successfully compiled document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPdf {
    #[serde(skip)]
    pub pdf: Vec<u8>,
    pub stdout: String,
    pub stderr: String,
    pub strategy: Strategy,
    pub workspace_id: Uuid,
}
