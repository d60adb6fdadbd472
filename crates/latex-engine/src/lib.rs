//! LaTeX document compilation engine
//!
//! This crate turns JSON data into finished PDFs by driving an external
//! LaTeX toolchain, including:
//! - Recursive escaping of untrusted string leaves
//! - Handlebars template rendering to LaTeX source
//! - Isolated, self-cleaning per-request workspaces
//! - Primary (`latexmk`) / fallback (`pdflatex` x2) compilation with timeout
//! - Multi-file bundle submissions
//! - Startup sweeping of orphaned workspaces

pub mod bundle;
pub mod compiler;
pub mod engine;
pub mod sanitize;
pub mod sweep;
pub mod templates;
pub mod workspace;

#[cfg(all(test, unix))]
pub(crate) mod testing;

pub use bundle::{BundleSubmission, UploadedFile, MAX_BUNDLE_ASSETS};
pub use compiler::{
    CompileFailure, CompileLimits, CompileStage, CompiledPdf, CompilerOrchestrator, FailureKind,
    Strategy, ToolchainConfig, ToolchainReport,
};
pub use engine::{EngineConfig, EngineError, LatexEngine};
pub use sanitize::{escape_latex, sanitize};
pub use sweep::{sweep, SweepReport};
pub use templates::{is_minimal_request, TemplateRenderer, MINIMAL_DOCUMENT};
pub use workspace::{Workspace, WorkspaceManager};
