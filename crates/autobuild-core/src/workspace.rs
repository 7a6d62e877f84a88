//! Workspace directory lifecycle.
//!
//! A workspace is a directory that holds one fetched source tree for the
//! duration of a run. [`setup`] writes a marker file into it recording what
//! setup itself created, so that [`cleanup`] can put the filesystem back the
//! way it found it: a directory that already existed is only emptied, and
//! parent directories created along the way are removed again. A later
//! `setup` on a marked directory may clear it; any other non-empty directory
//! is left alone.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::WorkspaceError;

/// File written into every workspace root created by [`setup`].
pub const WORKSPACE_MARKER: &str = ".autobuild-workspace";

type Result<T> = std::result::Result<T, WorkspaceError>;

/// Contents of the marker file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
struct MarkerRecord {
    /// `setup` created the workspace directory itself.
    created: bool,

    /// Missing ancestors `setup` created above the workspace directory.
    created_parents: u32,
}

impl MarkerRecord {
    /// Record assumed for a marker that cannot be parsed.
    fn owned() -> Self {
        Self {
            created: true,
            created_parents: 0,
        }
    }
}

/// Join a base directory and a repository name into a workspace path.
pub fn form_path(base: impl AsRef<Path>, name: impl AsRef<Path>) -> PathBuf {
    base.as_ref().join(name)
}

/// Make `path` an empty, usable workspace.
///
/// On failure nothing that `setup` created is left behind.
pub fn setup(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    let record = match fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => {
            return Err(WorkspaceError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {
            if is_empty_dir(path)? {
                MarkerRecord {
                    created: false,
                    created_parents: 0,
                }
            } else {
                let Some(previous) = read_marker(path) else {
                    return Err(WorkspaceError::Occupied {
                        path: path.to_path_buf(),
                    });
                };
                debug!(path = %path.display(), "Clearing previous workspace");
                clear_dir(path)?;
                previous
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let created_parents = missing_ancestors(path);
            if let Err(e) = fs::create_dir_all(path) {
                remove_created_parents(path, created_parents);
                return Err(WorkspaceError::io(path, e));
            }
            MarkerRecord {
                created: true,
                created_parents,
            }
        }
        Err(e) => return Err(WorkspaceError::io(path, e)),
    };

    if let Err(e) = write_marker(path, &record) {
        if record.created {
            if let Err(undo) = fs::remove_dir_all(path) {
                warn!(path = %path.display(), error = %undo, "Removing half-created workspace failed");
            }
            remove_created_parents(path, record.created_parents);
        }
        return Err(e);
    }
    debug!(path = %path.display(), created = record.created, "Workspace ready");
    Ok(())
}

/// Undo [`setup`] on `path`. A missing path is not an error.
///
/// A marked workspace that existed before `setup` is emptied and kept; one
/// that `setup` created is removed together with the parents it created.
/// Anything else at `path` is removed recursively.
pub fn cleanup(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(WorkspaceError::io(path, e)),
    };
    if !meta.is_dir() {
        return remove_path(path);
    }

    match read_marker(path) {
        Some(record) if !record.created => {
            clear_dir(path)?;
            remove_path(&path.join(WORKSPACE_MARKER))?;
            debug!(path = %path.display(), "Workspace emptied");
        }
        record => {
            remove_path(path)?;
            if let Some(record) = record {
                remove_created_parents(path, record.created_parents);
            }
            debug!(path = %path.display(), "Workspace removed");
        }
    }
    Ok(())
}

fn read_marker(path: &Path) -> Option<MarkerRecord> {
    let marker = path.join(WORKSPACE_MARKER);
    if !marker.is_file() {
        return None;
    }
    let record = fs::read_to_string(&marker)
        .ok()
        .and_then(|raw| toml::from_str(&raw).ok())
        .unwrap_or_else(MarkerRecord::owned);
    Some(record)
}

fn write_marker(path: &Path, record: &MarkerRecord) -> Result<()> {
    let marker = path.join(WORKSPACE_MARKER);
    let raw = toml::to_string(record).map_err(|e| {
        WorkspaceError::io(&marker, std::io::Error::new(ErrorKind::InvalidData, e))
    })?;
    fs::write(&marker, raw).map_err(|e| WorkspaceError::io(&marker, e))
}

fn missing_ancestors(path: &Path) -> u32 {
    path.ancestors()
        .skip(1)
        .take_while(|a| !a.as_os_str().is_empty() && !a.exists())
        .count() as u32
}

/// Remove up to `count` now-empty ancestors of `path`, innermost first.
fn remove_created_parents(path: &Path, count: u32) {
    for ancestor in path.ancestors().skip(1).take(count as usize) {
        match fs::remove_dir(ancestor) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                debug!(path = %ancestor.display(), error = %e, "Keeping parent directory");
                break;
            }
        }
    }
}

/// Plain removal of a file or directory tree; a missing path is fine.
fn remove_path(path: &Path) -> Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(WorkspaceError::io(path, e)),
    }
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path).map_err(|e| WorkspaceError::io(path, e))?;
    Ok(entries.next().is_none())
}

/// Remove everything in `path` except the marker.
fn clear_dir(path: &Path) -> Result<()> {
    for entry in fs::read_dir(path).map_err(|e| WorkspaceError::io(path, e))? {
        let entry = entry.map_err(|e| WorkspaceError::io(path, e))?;
        if entry.file_name() == WORKSPACE_MARKER {
            continue;
        }
        remove_path(&entry.path())?;
    }
    Ok(())
}

/// Scoped workspace: cleaned up when the guard goes out of scope.
///
/// Cleanup on drop is best effort; call [`WorkspaceGuard::release`] to observe
/// the cleanup error instead.
#[derive(Debug)]
pub struct WorkspaceGuard {
    path: PathBuf,
    armed: bool,
}

impl WorkspaceGuard {
    /// Set up `path` and return a guard that cleans it up.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        setup(&path)?;
        Ok(Self { path, armed: true })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clean up now and report the result.
    pub fn release(mut self) -> Result<()> {
        self.armed = false;
        cleanup(&self.path)
    }

    /// Leave the workspace on disk.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = cleanup(&self.path) {
                warn!(path = %self.path.display(), error = %e, "Workspace cleanup failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_path_starts_with_base_and_ends_with_name() {
        let path = form_path("repo", "Dynamo");
        assert!(path.starts_with("repo"));
        assert!(path.ends_with("Dynamo"));
        assert_eq!(path, PathBuf::from("repo").join("Dynamo"));
    }

    #[test]
    fn setup_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        setup(&ws).unwrap();
        assert!(ws.is_dir());
        assert!(ws.join(WORKSPACE_MARKER).is_file());
    }

    #[test]
    fn setup_reuses_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path()).unwrap();
        assert!(dir.path().join(WORKSPACE_MARKER).is_file());
    }

    #[test]
    fn setup_clears_previous_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        setup(&ws).unwrap();
        fs::create_dir_all(ws.join("Dynamo/src")).unwrap();
        fs::write(ws.join("Dynamo/src/main.cs"), "class A {}").unwrap();

        setup(&ws).unwrap();
        let names: Vec<_> = fs::read_dir(&ws)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(WORKSPACE_MARKER)]);
    }

    #[test]
    fn setup_refuses_unrelated_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let err = setup(dir.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::Occupied { .. }));
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn setup_refuses_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            setup(&file).unwrap_err(),
            WorkspaceError::NotADirectory { .. }
        ));
    }

    #[test]
    fn double_cleanup_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ko");
        setup(&ws).unwrap();
        cleanup(&ws).unwrap();
        cleanup(&ws).unwrap();
        assert!(!ws.exists());
    }

    #[test]
    fn setup_then_cleanup_restores_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let before: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(before.is_empty());

        let ws = dir.path().join("ko");
        setup(&ws).unwrap();
        cleanup(&ws).unwrap();

        let after: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(after.is_empty());
    }

    fn entries(path: &Path) -> Vec<std::ffi::OsString> {
        let mut names: Vec<_> = fs::read_dir(path)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn setup_then_cleanup_keeps_existing_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("autobuild");
        fs::create_dir(&ws).unwrap();

        setup(&ws).unwrap();
        fs::create_dir_all(ws.join("Dynamo/src")).unwrap();
        cleanup(&ws).unwrap();

        assert!(ws.is_dir());
        assert!(entries(&ws).is_empty());
    }

    #[test]
    fn setup_then_cleanup_removes_created_parents() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("a/b/ws");

        setup(&ws).unwrap();
        assert!(ws.is_dir());
        cleanup(&ws).unwrap();

        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn cleanup_keeps_parents_that_already_existed() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        let ws = dir.path().join("a/b/ws");

        setup(&ws).unwrap();
        cleanup(&ws).unwrap();

        assert!(dir.path().join("a").is_dir());
        assert!(entries(&dir.path().join("a")).is_empty());
    }

    #[test]
    fn cleanup_keeps_parent_that_gained_other_content() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("a/ws");

        setup(&ws).unwrap();
        fs::write(dir.path().join("a/other.txt"), "x").unwrap();
        cleanup(&ws).unwrap();

        assert!(!ws.exists());
        assert!(dir.path().join("a/other.txt").is_file());
    }

    #[test]
    fn resetup_remembers_directory_existed() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        fs::create_dir(&ws).unwrap();

        setup(&ws).unwrap();
        fs::write(ws.join("leftover.txt"), "x").unwrap();
        setup(&ws).unwrap();
        assert_eq!(entries(&ws), vec![std::ffi::OsString::from(WORKSPACE_MARKER)]);

        cleanup(&ws).unwrap();
        assert!(ws.is_dir());
        assert!(entries(&ws).is_empty());
    }

    #[test]
    fn unreadable_marker_is_treated_as_created() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        fs::create_dir(&ws).unwrap();
        fs::write(ws.join(WORKSPACE_MARKER), "not toml [").unwrap();

        cleanup(&ws).unwrap();
        assert!(!ws.exists());
    }

    #[test]
    fn guard_on_existing_directory_empties_it() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        fs::create_dir(&ws).unwrap();
        {
            let guard = WorkspaceGuard::acquire(&ws).unwrap();
            fs::write(guard.path().join("build.log"), "x").unwrap();
        }
        assert!(ws.is_dir());
        assert!(entries(&ws).is_empty());
    }

    #[test]
    fn guard_cleans_up_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        {
            let guard = WorkspaceGuard::acquire(&ws).unwrap();
            assert!(guard.path().is_dir());
        }
        assert!(!ws.exists());
    }

    #[test]
    fn guard_keep_leaves_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        let kept = WorkspaceGuard::acquire(&ws).unwrap().keep();
        assert_eq!(kept, ws);
        assert!(ws.is_dir());
    }

    #[test]
    fn guard_release_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        let guard = WorkspaceGuard::acquire(&ws).unwrap();
        guard.release().unwrap();
        assert!(!ws.exists());
    }
}
