//! Isolated per-request working directories
//!
//! Every compile gets its own directory under a shared temporary root,
//! named with a random UUID. The [`Workspace`] guard removes the directory
//! when it is released or dropped, whichever happens first, so no exit path
//! (error, panic, cancelled future) leaves it behind.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Prefix of every workspace directory name under the temporary root
pub const WORKSPACE_PREFIX: &str = "job-";

/// Allocates workspaces under a fixed temporary root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, uniquely named workspace directory.
    ///
    /// `create_dir` (not `create_dir_all`) is used for the leaf so an
    /// existing directory is an error rather than a shared workspace.
    pub fn acquire(&self, owner: impl Into<String>) -> io::Result<Workspace> {
        std::fs::create_dir_all(&self.root)?;

        let id = Uuid::new_v4();
        let path = self.root.join(format!("{}{}", WORKSPACE_PREFIX, id));
        std::fs::create_dir(&path)?;

        let owner = owner.into();
        tracing::debug!(workspace = %id, owner = %owner, path = %path.display(), "Workspace acquired");

        Ok(Workspace {
            id,
            path,
            owner,
            released: false,
        })
    }
}

/// A directory owned by exactly one compile operation
pub struct Workspace {
    id: Uuid,
    path: PathBuf,
    owner: String,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Write `content` to `name` inside the workspace
    pub fn write_file(&self, name: &str, content: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        let target = self.path.join(name);
        std::fs::write(&target, content)?;
        Ok(target)
    }

    /// Read `name` from the workspace
    pub fn read_file(&self, name: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.path.join(name))
    }

    /// Sorted names of the entries directly inside the workspace
    pub fn list_files(&self) -> io::Result<Vec<String>> {
        let mut names = std::fs::read_dir(&self.path)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    /// Remove the workspace directory and everything in it.
    ///
    /// A directory that is already gone counts as released.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        remove_tree(&self.path)
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("owner", &self.owner)
            .finish()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = remove_tree(&self.path) {
            tracing::warn!(workspace = %self.id, error = %e, "Failed to remove workspace");
        } else {
            tracing::debug!(workspace = %self.id, "Workspace removed");
        }
    }
}

fn remove_tree(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_acquire_creates_unique_directories() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().join("nested/root"));

        let workspaces: Vec<Workspace> = (0..16)
            .map(|_| manager.acquire("test").unwrap())
            .collect();

        let paths: HashSet<&Path> = workspaces.iter().map(|w| w.path()).collect();
        assert_eq!(paths.len(), 16);
        for ws in &workspaces {
            assert!(ws.path().is_dir());
            assert!(ws.path().starts_with(manager.root()));
            let name = ws.path().file_name().unwrap().to_str().unwrap();
            assert!(name.starts_with(WORKSPACE_PREFIX));
        }
    }

    #[test]
    fn test_release_removes_contents() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let ws = manager.acquire("test").unwrap();
        ws.write_file("main.tex", "hello").unwrap();
        std::fs::create_dir(ws.path().join("sub")).unwrap();
        let path = ws.path().to_path_buf();

        ws.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_release_tolerates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let ws = manager.acquire("test").unwrap();
        std::fs::remove_dir_all(ws.path()).unwrap();

        assert!(ws.release().is_ok());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let path = {
            let ws = manager.acquire("test").unwrap();
            ws.write_file("main.tex", "x").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_on_panic_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let result = std::panic::catch_unwind(|| {
            let ws = manager.acquire("test").unwrap();
            ws.write_file("main.tex", "x").unwrap();
            panic!("compile blew up");
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_list_and_read_files() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let ws = manager.acquire("test").unwrap();
        ws.write_file("b.png", [1u8, 2, 3]).unwrap();
        ws.write_file("a.tex", "x").unwrap();

        assert_eq!(ws.list_files().unwrap(), vec!["a.tex", "b.png"]);
        assert_eq!(ws.read_file("b.png").unwrap(), vec![1, 2, 3]);
        assert_eq!(ws.owner(), "test");
    }
}
