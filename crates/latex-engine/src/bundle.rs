//! Multi-file submissions: one main document plus auxiliary assets
//!
//! Everything is validated before a workspace is allocated. Assets keep
//! their original file names so relative `\includegraphics`/`\input`
//! references inside the main document resolve.

use std::collections::HashSet;
use std::io;

use crate::compiler::{MAIN_LOG, MAIN_OUTPUT, MAIN_SOURCE};
use crate::engine::EngineError;
use crate::workspace::Workspace;

/// Upper bound on auxiliary files in one bundle
pub const MAX_BUNDLE_ASSETS: usize = 63;

/// An uploaded file and the name it was uploaded under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// A validated bundle, ready to be materialized
#[derive(Debug, Clone)]
pub struct BundleSubmission {
    main: UploadedFile,
    assets: Vec<UploadedFile>,
}

impl BundleSubmission {
    /// Validate a submission.
    ///
    /// Rejects a missing main file, more than [`MAX_BUNDLE_ASSETS`] assets,
    /// unsafe or reserved asset names and duplicate asset names.
    pub fn new(main: Option<UploadedFile>, assets: Vec<UploadedFile>) -> Result<Self, EngineError> {
        let main = main.ok_or_else(|| EngineError::Invalid("missing main file".to_string()))?;

        if assets.len() > MAX_BUNDLE_ASSETS {
            return Err(EngineError::Invalid(format!(
                "too many assets: {} (maximum {})",
                assets.len(),
                MAX_BUNDLE_ASSETS
            )));
        }

        let mut seen = HashSet::with_capacity(assets.len());
        for asset in &assets {
            validate_asset_name(&asset.filename)?;
            if !seen.insert(asset.filename.as_str()) {
                return Err(EngineError::Invalid(format!(
                    "duplicate asset name '{}'",
                    asset.filename
                )));
            }
        }

        Ok(Self { main, assets })
    }

    /// A bundle of just a main document
    pub fn single(main: UploadedFile) -> Self {
        Self {
            main,
            assets: Vec::new(),
        }
    }

    pub fn main(&self) -> &UploadedFile {
        &self.main
    }

    pub fn assets(&self) -> &[UploadedFile] {
        &self.assets
    }

    /// Write the main document as `main.tex` and every asset by its name
    pub fn assemble(&self, workspace: &Workspace) -> io::Result<()> {
        workspace.write_file(MAIN_SOURCE, &self.main.content)?;
        for asset in &self.assets {
            workspace.write_file(&asset.filename, &asset.content)?;
        }

        tracing::debug!(
            workspace = %workspace.id(),
            main = %self.main.filename,
            assets = self.assets.len(),
            "Bundle materialized"
        );
        Ok(())
    }
}

/// Files the toolchain reads from its working directory as configuration.
/// `latexmkrc` is executed as Perl.
const TOOLCHAIN_CONFIG_FILES: [&str; 3] = ["latexmkrc", ".latexmkrc", "texmf.cnf"];

fn validate_asset_name(name: &str) -> Result<(), EngineError> {
    let invalid = |reason: &str| Err(EngineError::Invalid(format!("asset '{}' {}", name, reason)));

    if name.is_empty() || name == "." {
        return invalid("has an empty name");
    }
    // Reject path traversal and anything that is not a plain file name
    if name.contains("..") || name.contains('/') || name.contains('\\') || name.contains('\0') {
        return invalid("must be a plain file name");
    }
    // Hidden files are never legitimate document assets
    if name.starts_with('.') {
        return invalid("must not be a hidden file");
    }
    let lowered = name.to_ascii_lowercase();
    if [MAIN_SOURCE, MAIN_OUTPUT, MAIN_LOG]
        .iter()
        .chain(TOOLCHAIN_CONFIG_FILES.iter())
        .any(|reserved| *reserved == lowered)
    {
        return invalid("uses a reserved name");
    }
    Ok(())
}
