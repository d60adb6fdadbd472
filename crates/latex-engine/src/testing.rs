//! Stub toolchain binaries shared by the unit tests
//!
//! The scripts mimic just enough of `latexmk`/`pdflatex` to exercise the
//! orchestrator: they answer `--version`, print what the workspace holds and
//! write a `main.pdf` that embeds the source so tests can tell outputs apart.

use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use tempfile::TempDir;

use crate::compiler::{CompileLimits, ToolchainConfig};
use crate::engine::{EngineConfig, LatexEngine};

const LATEXMK_OK: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo "Latexmk, stub 4.83"; exit 0; fi
echo "latexmk stub"
ls -1
{ printf '%%PDF-1.5\n'; cat main.tex; printf '\n%%%%EOF\n'; } > main.pdf
echo "Output written on main.pdf" > main.log
"#;

const PDFLATEX_OK: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo "pdfTeX 3.141592653-2.6-1.40.25 (stub)"; exit 0; fi
echo "pdflatex pass"
{ printf '%%PDF-1.5\n'; cat main.tex; } > main.pdf
echo "Output written on main.pdf" > main.log
"#;

const LATEXMK_FAIL: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo "Latexmk, stub 4.83"; exit 0; fi
echo "Running pdflatex"
printf '! Undefined control sequence.\nl.3 \\foo\n' > main.log
echo "Latexmk: Errors, so I did not complete making targets" >&2
exit 12
"#;

const LATEXMK_SLOW: &str = r#"#!/bin/sh
sleep 10
"#;

const LATEXMK_NO_OUTPUT: &str = r#"#!/bin/sh
echo "nothing to do"
"#;

const LATEXMK_GARBAGE: &str = r#"#!/bin/sh
echo "not a pdf" > main.pdf
"#;

/// Paths of the stub binaries
pub struct Stubs {
    dir: TempDir,
    pub latexmk: PathBuf,
    pub pdflatex: PathBuf,
    pub failing: PathBuf,
    pub slow: PathBuf,
    pub no_output: PathBuf,
    pub garbage: PathBuf,
}

impl Stubs {
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

static STUBS: Lazy<Stubs> = Lazy::new(|| {
    let dir = tempfile::tempdir().expect("stub dir");
    let write = |name: &str, body: &str| -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join(name);
        std::fs::write(&path, body).expect("write stub");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod stub");
        path
    };

    let latexmk = write("latexmk", LATEXMK_OK);
    let pdflatex = write("pdflatex", PDFLATEX_OK);
    let failing = write("latexmk-failing", LATEXMK_FAIL);
    let slow = write("latexmk-slow", LATEXMK_SLOW);
    let no_output = write("latexmk-no-output", LATEXMK_NO_OUTPUT);
    let garbage = write("latexmk-garbage", LATEXMK_GARBAGE);

    Stubs {
        dir,
        latexmk,
        pdflatex,
        failing,
        slow,
        no_output,
        garbage,
    }
});

pub fn stubs() -> &'static Stubs {
    &STUBS
}

/// Toolchain with an explicit primary and fallback and no search dirs
pub fn toolchain(primary: &Path, fallback: &Path) -> ToolchainConfig {
    ToolchainConfig {
        primary: primary.display().to_string(),
        fallback: fallback.display().to_string(),
        search_dirs: vec![],
    }
}

/// A path that never resolves
pub fn missing() -> PathBuf {
    PathBuf::from("/nonexistent/toolchain/binary")
}

pub fn limits() -> CompileLimits {
    CompileLimits {
        timeout: Duration::from_secs(10),
        ..CompileLimits::default()
    }
}

/// Engine over a fresh temp root; the root lives as long as the `TempDir`
pub fn engine(toolchain: ToolchainConfig, limits: CompileLimits) -> (TempDir, LatexEngine) {
    let root = tempfile::tempdir().expect("temp root");
    let config = EngineConfig {
        temp_root: root.path().join("workspaces"),
        toolchain,
        limits,
        template_dir: None,
    };
    let engine = LatexEngine::new(config).expect("engine");
    (root, engine)
}

/// Number of entries left under the engine's workspace root
pub fn leftover_workspaces(engine: &LatexEngine) -> usize {
    match std::fs::read_dir(engine.workspaces().root()) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}
