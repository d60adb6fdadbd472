//! Command-line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use latex_engine::{CompileLimits, EngineConfig, ToolchainConfig};

/// Command-line arguments for the pdfgen server
///
/// Every option can also be set through the environment (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(name = "pdfgen-api")]
#[command(about = "Compiles JSON data into PDFs through a LaTeX toolchain")]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001")]
    pub port: u16,

    /// SQLite connection string for stored customer headers
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Directory under which per-request workspaces are created
    #[arg(long, env = "PDFGEN_TEMP_ROOT")]
    pub temp_root: Option<PathBuf>,

    /// Remove every entry under the temp root at startup, not just workspaces
    #[arg(long, env = "PDFGEN_PURGE_ALL")]
    pub purge_temp_on_start: bool,

    /// Primary toolchain binary
    #[arg(long, env = "PDFGEN_LATEXMK", default_value = "latexmk")]
    pub latexmk: String,

    /// Fallback compiler, run twice when the primary is missing
    #[arg(long, env = "PDFGEN_PDFLATEX", default_value = "pdflatex")]
    pub pdflatex: String,

    /// Extra directories searched for the toolchain before PATH
    #[arg(long = "tex-search-dir", env = "PDFGEN_TEX_SEARCH_DIRS", value_delimiter = ':')]
    pub tex_search_dirs: Vec<PathBuf>,

    /// Directory of `*.tex` templates overriding the embedded ones
    #[arg(long, env = "PDFGEN_TEMPLATE_DIR")]
    pub template_dir: Option<PathBuf>,

    /// Template used by POST /compile when none is given
    #[arg(long, env = "PDFGEN_DEFAULT_TEMPLATE", default_value = "proposal")]
    pub default_template: String,

    /// Toolchain timeout per invocation in milliseconds
    #[arg(long, env = "PDFGEN_COMPILE_TIMEOUT_MS", default_value = "60000")]
    pub compile_timeout_ms: u64,

    /// Bytes of stdout/stderr kept per invocation
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub max_output_bytes: usize,

    /// Maximum JSON request body
    #[arg(long, env = "PDFGEN_JSON_LIMIT_BYTES", default_value_t = 1024 * 1024)]
    pub json_limit_bytes: usize,

    /// Maximum multipart upload body
    #[arg(long, env = "PDFGEN_UPLOAD_LIMIT_BYTES", default_value_t = 25 * 1024 * 1024)]
    pub upload_limit_bytes: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Request body ceilings enforced before any handler runs
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    pub json_bytes: usize,
    pub upload_bytes: usize,
}

impl Args {
    pub fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();

        let search_dirs = if self.tex_search_dirs.is_empty() {
            defaults.toolchain.search_dirs
        } else {
            self.tex_search_dirs.clone()
        };

        EngineConfig {
            temp_root: self.temp_root.clone().unwrap_or(defaults.temp_root),
            toolchain: ToolchainConfig {
                primary: self.latexmk.clone(),
                fallback: self.pdflatex.clone(),
                search_dirs,
            },
            limits: CompileLimits {
                timeout: Duration::from_millis(self.compile_timeout_ms),
                max_output_bytes: self.max_output_bytes,
                ..defaults.limits
            },
            template_dir: self.template_dir.clone(),
        }
    }

    pub fn body_limits(&self) -> BodyLimits {
        BodyLimits {
            json_bytes: self.json_limit_bytes,
            upload_bytes: self.upload_limit_bytes,
        }
    }

    /// Configured database URL, or a SQLite file in the platform data dir
    pub fn database_url(&self) -> String {
        self.database_url.clone().unwrap_or_else(|| {
            let data_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pdfgen-api");
            std::fs::create_dir_all(&data_dir).ok();
            format!("sqlite:{}/pdfgen.db?mode=rwc", data_dir.display())
        })
    }
}

/// Get platform-specific data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}
