//! Transactional file mutation: unlink / symlink / hardlink with rollback.
//!
//! Every destructive substitution follows the same shape: rename the live
//! file to a sibling temp name, perform the operation that recreates the
//! file at its original path, then either discard the temp (success) or
//! rename it back (failure). The temp never coexists with the live path
//! after a successful run. Built on explicit pre/post steps around a
//! closure rather than a destructor-based guard — Rust's `TempPath`
//! (`tempfile` crate) already gives us "delete on drop unless persisted,"
//! which is the one piece of scope-exit behavior the contract actually
//! needs.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{DupefindError, Result};

/// Executes destructive substitutions with rename-to-temp rollback.
pub struct TransactionalMutator;

impl TransactionalMutator {
    /// Replaces `path` with a symlink pointing at `target`.
    ///
    /// `target` is made absolute (relative to the current working
    /// directory) and has `/./` and repeated `/` sequences collapsed.
    /// `..` components are never collapsed — see `DESIGN.md` for why this
    /// known limitation is kept rather than "fixed".
    pub fn replace_with_symlink(path: &Path, target: &Path, dry_run: bool) -> Result<()> {
        let target = normalize_symlink_target(target).map_err(|source| DupefindError::Mutation {
            path: path.to_path_buf(),
            source,
        })?;
        if dry_run {
            tracing::info!(path = %path.display(), target = %target.display(), "dry-run: would symlink");
            return Ok(());
        }
        Self::replace(path, |dest| symlink(&target, dest))
    }

    /// Replaces `path` with a hard link to `target`.
    pub fn replace_with_hardlink(path: &Path, target: &Path, dry_run: bool) -> Result<()> {
        if dry_run {
            tracing::info!(path = %path.display(), target = %target.display(), "dry-run: would hardlink");
            return Ok(());
        }
        let target = target.to_path_buf();
        Self::replace(path, |dest| fs::hard_link(&target, dest))
    }

    /// Deletes `path` outright. Dry-run mode only logs the action.
    pub fn delete(path: &Path, dry_run: bool) -> Result<()> {
        if dry_run {
            tracing::info!(path = %path.display(), "dry-run: would delete");
            return Ok(());
        }
        fs::remove_file(path).map_err(|source| DupefindError::Mutation {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Core rename-to-temp / invoke / commit-or-rollback sequence shared by
    /// the symlink and hardlink paths.
    fn replace<F>(path: &Path, op: F) -> Result<()>
    where
        F: FnOnce(&Path) -> io::Result<()>,
    {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dupefind-target");

        let placeholder = tempfile::Builder::new()
            .prefix(&format!("{file_name}.tmp-"))
            .rand_bytes(10)
            .tempfile_in(parent)
            .map_err(|source| DupefindError::Mutation {
                path: path.to_path_buf(),
                source,
            })?;
        let temp_path = placeholder.into_temp_path();

        fs::rename(path, &temp_path).map_err(|source| DupefindError::Mutation {
            path: path.to_path_buf(),
            source,
        })?;

        match op(path) {
            Ok(()) => match temp_path.close() {
                Ok(()) => Ok(()),
                Err(source) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %source,
                        "substitution succeeded but the stray temp file could not be removed"
                    );
                    Err(DupefindError::Mutation {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            },
            Err(op_err) => match temp_path.persist(path) {
                Ok(()) => Err(DupefindError::Mutation {
                    path: path.to_path_buf(),
                    source: op_err,
                }),
                Err(persist_err) => {
                    tracing::error!(
                        path = %path.display(),
                        temp = %persist_err.path.display(),
                        error = %persist_err.error,
                        "rollback failed: original file could not be restored from its temp copy; manual recovery needed"
                    );
                    Err(DupefindError::Rollback {
                        path: path.to_path_buf(),
                        temp: persist_err.path.to_path_buf(),
                        source: persist_err.error,
                    })
                }
            },
        }
    }
}

#[cfg(unix)]
fn symlink(target: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(windows)]
fn symlink(target: &Path, dest: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, dest)
}

/// Makes `target` absolute (relative to the current working directory) and
/// collapses `/./` and repeated `/` sequences. `..` components are left
/// untouched: resolving them would require knowing whether intermediate
/// components are themselves symlinks, which this implementation
/// deliberately does not attempt (see `DESIGN.md`, Open Question).
fn normalize_symlink_target(target: &Path) -> io::Result<PathBuf> {
    let absolute = if target.is_absolute() {
        target.to_path_buf()
    } else {
        std::env::current_dir()?.join(target)
    };

    let mut collapsed = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            other => collapsed.push(other.as_os_str()),
        }
    }
    Ok(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(path: &Path, contents: &[u8]) {
        let mut f = File::create(path).unwrap();
        f.write_all(contents).unwrap();
    }

    #[test]
    fn symlink_target_is_absolutized_and_collapsed() {
        let cwd = std::env::current_dir().unwrap();
        let normalized = normalize_symlink_target(Path::new("./a/./b//c")).unwrap();
        assert_eq!(normalized, cwd.join("a/b/c"));
    }

    #[test]
    fn symlink_target_never_collapses_dotdot() {
        let normalized = normalize_symlink_target(Path::new("/a/../b")).unwrap();
        assert_eq!(normalized, PathBuf::from("/a/../b"));
    }

    #[test]
    fn replace_with_hardlink_preserves_content() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("dup.txt");
        let keeper = dir.path().join("keeper.txt");
        write_file(&original, b"same bytes");
        write_file(&keeper, b"same bytes");

        TransactionalMutator::replace_with_hardlink(&original, &keeper, false).unwrap();

        assert_eq!(fs::read(&original).unwrap(), b"same bytes");
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            assert_eq!(
                fs::metadata(&original).unwrap().ino(),
                fs::metadata(&keeper).unwrap().ino()
            );
        }
    }

    #[test]
    fn replace_rolls_back_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("dup.txt");
        write_file(&original, b"original content");
        let before = fs::read(&original).unwrap();

        let result = TransactionalMutator::replace(&original, |_dest| {
            Err(io::Error::other("simulated failure"))
        });

        assert!(result.is_err());
        let after = fs::read(&original).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn delete_removes_file_unless_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        write_file(&path, b"x");

        TransactionalMutator::delete(&path, true).unwrap();
        assert!(path.exists());

        TransactionalMutator::delete(&path, false).unwrap();
        assert!(!path.exists());
    }
}
