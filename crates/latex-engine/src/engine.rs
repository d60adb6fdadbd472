//! The engine facade: sanitize, render, materialize, compile, clean up

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::bundle::{BundleSubmission, UploadedFile};
use crate::compiler::{
    CompileFailure, CompileLimits, CompileStage, CompiledPdf, CompilerOrchestrator,
    ToolchainConfig, ToolchainReport, MAIN_SOURCE,
};
use crate::sanitize::sanitize;
use crate::templates::TemplateRenderer;
use crate::workspace::WorkspaceManager;

/// Everything the engine needs, resolved up front
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory under which workspaces are created
    pub temp_root: PathBuf,
    pub toolchain: ToolchainConfig,
    pub limits: CompileLimits,
    /// Optional directory of `*.tex` templates overriding the embedded ones
    pub template_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir().join("pdfgen-workspaces"),
            toolchain: ToolchainConfig::default(),
            limits: CompileLimits::default(),
            template_dir: None,
        }
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Workspace I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Compilation failed: {0}")]
    Compile(Box<CompileFailure>),
}

impl From<CompileFailure> for EngineError {
    fn from(failure: CompileFailure) -> Self {
        EngineError::Compile(Box::new(failure))
    }
}

/// Shared, immutable compilation pipeline
#[derive(Debug)]
pub struct LatexEngine {
    renderer: TemplateRenderer,
    workspaces: WorkspaceManager,
    compiler: CompilerOrchestrator,
}

impl LatexEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let renderer = TemplateRenderer::new(config.template_dir.as_deref())?;
        Ok(Self {
            renderer,
            workspaces: WorkspaceManager::new(config.temp_root),
            compiler: CompilerOrchestrator::new(config.toolchain, config.limits),
        })
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    pub fn compiler(&self) -> &CompilerOrchestrator {
        &self.compiler
    }

    /// Escape `data` and render it with `template` into LaTeX source
    pub fn render(&self, template: &str, data: &Value) -> Result<String, EngineError> {
        tracing::debug!(template, stage = %CompileStage::Rendering, "Rendering");
        self.renderer.render(template, &sanitize(data))
    }

    /// Render `data` with `template` and compile the result
    pub async fn compile_data(
        &self,
        owner: &str,
        template: &str,
        data: &Value,
    ) -> Result<CompiledPdf, EngineError> {
        tracing::debug!(owner, template, stage = %CompileStage::Pending, "Compile requested");
        let source = self.render(template, data)?;
        self.compile_source(owner, source).await
    }

    /// Compile ready-made LaTeX source
    pub async fn compile_source(
        &self,
        owner: &str,
        source: impl Into<Vec<u8>>,
    ) -> Result<CompiledPdf, EngineError> {
        let bundle = BundleSubmission::single(UploadedFile::new(MAIN_SOURCE, source));
        self.compile_bundle(owner, &bundle).await
    }

    /// Materialize a bundle into a fresh workspace and compile it.
    ///
    /// The workspace is released before this returns, whatever the outcome;
    /// if this future is dropped mid-compile the guard's `Drop` does it.
    pub async fn compile_bundle(
        &self,
        owner: &str,
        bundle: &BundleSubmission,
    ) -> Result<CompiledPdf, EngineError> {
        let workspace = self.workspaces.acquire(owner)?;

        let result: Result<CompiledPdf, EngineError> = async {
            bundle.assemble(&workspace)?;
            Ok(self.compiler.compile(&workspace).await?)
        }
        .await;

        let id = workspace.id();
        if let Err(e) = workspace.release() {
            tracing::warn!(workspace = %id, error = %e, "Failed to release workspace");
        }

        result
    }

    /// Toolchain availability, without compiling anything
    pub async fn health(&self) -> ToolchainReport {
        self.compiler.health().await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::compiler::{FailureKind, Strategy};
    use crate::testing;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_minimal_document_round_trip() {
        let stubs = testing::stubs();
        let (_root, engine) =
            testing::engine(testing::toolchain(&stubs.latexmk, &stubs.pdflatex), testing::limits());

        let compiled = engine
            .compile_data("compile", "proposal", &json!({"_minimal": true}))
            .await
            .unwrap();

        assert!(compiled.pdf.starts_with(b"%PDF"));
        assert!(String::from_utf8_lossy(&compiled.pdf).contains("Hello, PDF."));
        assert_eq!(testing::leftover_workspaces(&engine), 0);
    }

    #[tokio::test]
    async fn test_rendered_data_is_escaped() {
        let stubs = testing::stubs();
        let (_root, engine) =
            testing::engine(testing::toolchain(&stubs.latexmk, &stubs.pdflatex), testing::limits());

        let compiled = engine
            .compile_data(
                "compile",
                "customer_header",
                &json!({"customer": {"name": r"Evil \input{x} & Co"}}),
            )
            .await
            .unwrap();

        let body = String::from_utf8_lossy(&compiled.pdf);
        assert!(body.contains(r"Evil \textbackslash{}input\{x\} \& Co"));
    }

    #[tokio::test]
    async fn test_workspace_removed_after_failure() {
        let stubs = testing::stubs();
        let (_root, engine) =
            testing::engine(testing::toolchain(&stubs.failing, &stubs.pdflatex), testing::limits());

        let err = engine.compile_source("compile", r"\foo").await.unwrap_err();

        assert!(matches!(err, EngineError::Compile(ref f) if f.kind == FailureKind::NonZeroExit));
        assert_eq!(testing::leftover_workspaces(&engine), 0);
    }

    #[tokio::test]
    async fn test_workspace_removed_after_timeout() {
        let stubs = testing::stubs();
        let limits = CompileLimits {
            timeout: Duration::from_millis(200),
            ..CompileLimits::default()
        };
        let (_root, engine) = testing::engine(testing::toolchain(&stubs.slow, &stubs.pdflatex), limits);

        let err = engine.compile_source("compile", "x").await.unwrap_err();

        assert!(matches!(err, EngineError::Compile(ref f) if f.is_timeout()));
        assert_eq!(testing::leftover_workspaces(&engine), 0);
    }

    #[tokio::test]
    async fn test_workspace_removed_when_cancelled() {
        let stubs = testing::stubs();
        let (_root, engine) =
            testing::engine(testing::toolchain(&stubs.slow, &stubs.pdflatex), testing::limits());

        let cancelled =
            tokio::time::timeout(Duration::from_millis(200), engine.compile_source("compile", "x")).await;

        assert!(cancelled.is_err());
        assert_eq!(testing::leftover_workspaces(&engine), 0);
    }

    #[tokio::test]
    async fn test_fallback_produces_equivalent_artifact() {
        let stubs = testing::stubs();
        let (_root, engine) = testing::engine(
            testing::toolchain(&testing::missing(), &stubs.pdflatex),
            testing::limits(),
        );

        let compiled = engine.compile_source("compile", "same source").await.unwrap();

        assert_eq!(compiled.strategy, Strategy::PdflatexTwice);
        assert!(compiled.pdf.starts_with(b"%PDF-"));
        assert!(String::from_utf8_lossy(&compiled.pdf).contains("same source"));
    }

    #[tokio::test]
    async fn test_concurrent_compiles_are_isolated() {
        let stubs = testing::stubs();
        let (_root, engine) =
            testing::engine(testing::toolchain(&stubs.latexmk, &stubs.pdflatex), testing::limits());

        let (a, b) = tokio::join!(
            engine.compile_source("a", "document alpha"),
            engine.compile_source("b", "document beta"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.workspace_id, b.workspace_id);
        let (a_body, b_body) = (String::from_utf8_lossy(&a.pdf), String::from_utf8_lossy(&b.pdf));
        assert!(a_body.contains("alpha") && !a_body.contains("beta"));
        assert!(b_body.contains("beta") && !b_body.contains("alpha"));
        // Each workspace held only its own source when the toolchain ran
        assert_eq!(a.stdout, "latexmk stub\nmain.tex\n");
        assert_eq!(b.stdout, "latexmk stub\nmain.tex\n");
        assert_eq!(testing::leftover_workspaces(&engine), 0);
    }

    #[tokio::test]
    async fn test_bundle_materializes_assets_by_name() {
        let stubs = testing::stubs();
        let (_root, engine) =
            testing::engine(testing::toolchain(&stubs.latexmk, &stubs.pdflatex), testing::limits());

        let assets: Vec<UploadedFile> = (0..3)
            .map(|i| UploadedFile::new(format!("logo-{}.png", i), vec![0u8; 4]))
            .collect();
        let bundle =
            BundleSubmission::new(Some(UploadedFile::new("doc.tex", "main body")), assets).unwrap();

        let compiled = engine.compile_bundle("bundle", &bundle).await.unwrap();

        let listed: Vec<&str> = compiled.stdout.lines().skip(1).collect();
        assert_eq!(listed, vec!["logo-0.png", "logo-1.png", "logo-2.png", "main.tex"]);
        assert_eq!(testing::leftover_workspaces(&engine), 0);
    }

    #[tokio::test]
    async fn test_unknown_template_touches_no_workspace() {
        let stubs = testing::stubs();
        let (_root, engine) =
            testing::engine(testing::toolchain(&stubs.latexmk, &stubs.pdflatex), testing::limits());

        let err = engine.compile_data("compile", "missing", &json!({})).await.unwrap_err();

        assert!(matches!(err, EngineError::TemplateNotFound(_)));
        assert!(!engine.workspaces().root().exists());
    }
}
