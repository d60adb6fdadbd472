//! Startup cleanup of workspaces leaked by a previous process

use std::io;
use std::path::Path;

use crate::workspace::WORKSPACE_PREFIX;

/// Outcome of a sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

/// Remove leftover entries under `root`.
///
/// With `purge_all` every entry goes; otherwise only workspace directories.
/// A missing root is not an error and individual failures are only logged.
pub fn sweep(root: &Path, purge_all: bool) -> SweepReport {
    let mut report = SweepReport::default();

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "Cannot read temp root, skipping sweep");
            return report;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable entry in temp root");
                report.failed += 1;
                continue;
            }
        };

        let name = entry.file_name();
        if !purge_all && !name.to_string_lossy().starts_with(WORKSPACE_PREFIX) {
            continue;
        }

        let path = entry.path();
        let result = match entry.file_type() {
            Ok(ft) if ft.is_dir() => std::fs::remove_dir_all(&path),
            Ok(_) => std::fs::remove_file(&path),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => report.removed += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale entry");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        root = %root.display(),
        removed = report.removed,
        failed = report.failed,
        "Startup sweep finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceManager;

    #[test]
    fn test_sweeps_leaked_workspaces_only() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        for _ in 0..3 {
            let ws = manager.acquire("crashed").unwrap();
            ws.write_file("main.tex", "x").unwrap();
            std::mem::forget(ws);
        }
        std::fs::write(root.path().join("keep.txt"), "x").unwrap();

        let report = sweep(root.path(), false);

        assert_eq!(report, SweepReport { removed: 3, failed: 0 });
        let left: Vec<_> = std::fs::read_dir(root.path()).unwrap().collect();
        assert_eq!(left.len(), 1);
    }

    #[test]
    fn test_purge_all_removes_everything() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("other")).unwrap();
        std::fs::write(root.path().join("keep.txt"), "x").unwrap();
        std::mem::forget(WorkspaceManager::new(root.path()).acquire("crashed").unwrap());

        let report = sweep(root.path(), true);

        assert_eq!(report.removed, 3);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_root_is_fine() {
        let root = tempfile::tempdir().unwrap();
        let report = sweep(&root.path().join("never-created"), true);
        assert_eq!(report, SweepReport::default());
    }
}
