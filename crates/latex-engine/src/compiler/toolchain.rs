//! Toolchain binary configuration, lookup and health reporting
//!
//! Binaries are resolved against an explicit list of search directories
//! followed by the entries of `PATH`. The process environment is only ever
//! read, never modified.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use super::process::run_bounded;

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Which binaries to drive and where to look for them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
    /// Primary driver (`latexmk`), a bare name or a path
    pub primary: String,
    /// Lower-level compiler run twice when the primary is absent (`pdflatex`)
    pub fallback: String,
    /// Directories searched before `PATH`
    pub search_dirs: Vec<PathBuf>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            primary: "latexmk".to_string(),
            fallback: "pdflatex".to_string(),
            search_dirs: default_search_dirs(),
        }
    }
}

impl ToolchainConfig {
    /// Resolve `program` to an executable file.
    ///
    /// Anything with a directory component is taken literally; a bare name
    /// is looked up in `search_dirs`, then `PATH`.
    pub fn resolve(&self, program: &str) -> Option<PathBuf> {
        let candidate = Path::new(program);
        if candidate.is_absolute() || candidate.components().count() > 1 {
            return is_executable(candidate).then(|| candidate.to_path_buf());
        }

        let path_dirs: Vec<PathBuf> = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();

        self.search_dirs
            .iter()
            .chain(path_dirs.iter())
            .flat_map(|dir| executable_names(program).map(move |name| dir.join(name)))
            .find(|path| is_executable(path))
    }

    pub fn resolve_primary(&self) -> Option<PathBuf> {
        self.resolve(&self.primary)
    }

    pub fn resolve_fallback(&self) -> Option<PathBuf> {
        self.resolve(&self.fallback)
    }
}

/// Availability of one toolchain binary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryStatus {
    /// `primary` or `fallback`
    pub role: &'static str,
    pub program: String,
    pub resolved_path: Option<String>,
    pub available: bool,
    /// First line of `--version`, when the binary answered
    pub version: Option<String>,
}

/// Availability of the whole toolchain
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolchainReport {
    /// True if at least one compile strategy can run
    pub ready: bool,
    pub binaries: Vec<BinaryStatus>,
}

/// Probe a binary without compiling anything
pub(crate) async fn probe(role: &'static str, program: &str, resolved: Option<PathBuf>) -> BinaryStatus {
    let version = match &resolved {
        Some(path) => query_version(path).await,
        None => None,
    };

    BinaryStatus {
        role,
        program: program.to_string(),
        resolved_path: resolved.as_ref().map(|p| p.display().to_string()),
        available: resolved.is_some(),
        version,
    }
}

async fn query_version(path: &Path) -> Option<String> {
    let cwd = std::env::temp_dir();
    match run_bounded(path, &["--version"], &cwd, VERSION_TIMEOUT, 64 * 1024).await {
        Ok(output) => output
            .stdout
            .lines()
            .chain(output.stderr.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string),
        Err(e) => {
            tracing::warn!(binary = %path.display(), error = %e, "Version query failed");
            None
        }
    }
}

fn executable_names(program: &str) -> impl Iterator<Item = String> {
    let mut names = vec![program.to_string()];
    if cfg!(windows) && Path::new(program).extension().is_none() {
        names.push(format!("{}.exe", program));
    }
    names.into_iter()
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Platform-specific TeX distribution binary directories
fn default_search_dirs() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Library/TeX/texbin"),
            PathBuf::from("/usr/local/texlive/bin/universal-darwin"),
        ]
    }
    #[cfg(target_os = "linux")]
    {
        vec![
            PathBuf::from("/usr/local/texlive/bin/x86_64-linux"),
            PathBuf::from("/usr/local/texlive/bin/aarch64-linux"),
        ]
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        Vec::new()
    }
}
