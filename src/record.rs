//! `FileRecord`: the sole persistent entity threaded through the pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use crate::digest::{DigestKind, MAX_DIGEST_LEN};
use crate::error::{DupefindError, Result};
use crate::mutator::TransactionalMutator;

/// Which fingerprinting stage last wrote into [`FileRecord::fingerprint`].
///
/// Distinguishes first-bytes/last-bytes fingerprints (necessary but not
/// sufficient for content equality) from whole-file checksums (sufficient,
/// barring hash collisions). Carries the digest kind used so the skip
/// optimization in the stage reader can compare "was this the same
/// algorithm as the one chosen for first/last bytes" without reinventing
/// that heuristic at each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// No stage has produced a fingerprint yet; `fingerprint` is all zero.
    Unset,
    /// First N bytes, hashed with the given algorithm.
    FirstBytes(DigestKind),
    /// Last N bytes, hashed with the given algorithm.
    LastBytes(DigestKind),
    /// The entire file, hashed with the given algorithm.
    Whole(DigestKind),
}

impl StageKind {
    /// The digest kind this stage used, if any.
    #[must_use]
    pub fn digest_kind(self) -> Option<DigestKind> {
        match self {
            Self::Unset => None,
            Self::FirstBytes(k) | Self::LastBytes(k) | Self::Whole(k) => Some(k),
        }
    }
}

/// Terminal classification assigned by [`crate::pipeline::Pipeline::mark_duplicates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DupType {
    /// Not yet classified.
    #[default]
    Unknown,
    /// The one record in its equivalence class that is kept.
    FirstOccurrence,
    /// A duplicate sharing `cmdline_index` with its class's first occurrence.
    WithinSameTree,
    /// A duplicate from a different command-line root than its class's
    /// first occurrence.
    OutsideTree,
}

impl std::fmt::Display for DupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "UNKNOWN",
            Self::FirstOccurrence => "FIRST_OCCURRENCE",
            Self::WithinSameTree => "WITHIN_SAME_TREE",
            Self::OutsideTree => "OUTSIDE_TREE",
        };
        f.write_str(s)
    }
}

/// One candidate file flowing through the pipeline.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Pathname exactly as received; never normalized for `..`.
    pub path: PathBuf,
    /// Rank of the command-line root that introduced this file. Lower wins.
    pub cmdline_index: usize,
    /// Traversal depth from that root.
    pub depth: usize,
    /// File size in bytes.
    pub size: u64,
    /// Filesystem device id.
    pub device: u64,
    /// Filesystem inode number.
    pub inode: u64,
    /// Stable tiebreaker assigned once by `mark_items`.
    pub identity_number: u64,
    /// Latest stage's digest output, zero-padded.
    pub fingerprint: [u8; MAX_DIGEST_LEN],
    /// Which stage produced `fingerprint`.
    pub last_stage: StageKind,
    /// Duplicate classification, set exactly once by `mark_duplicates`.
    pub duptype: DupType,
}

impl FileRecord {
    /// Constructs a record for `path` discovered at `depth` under the
    /// command-line root indexed by `cmdline_index`. Metadata fields are
    /// left at zero until [`Self::load_stat`] is called.
    #[must_use]
    pub fn new(path: PathBuf, cmdline_index: usize, depth: usize) -> Self {
        Self {
            path,
            cmdline_index,
            depth,
            size: 0,
            device: 0,
            inode: 0,
            identity_number: 0,
            fingerprint: [0u8; MAX_DIGEST_LEN],
            last_stage: StageKind::Unset,
            duptype: DupType::Unknown,
        }
    }

    /// Populates size/device/inode via `stat` and reports whether the path
    /// is a regular file. Non-regular files (directories, sockets, fifos,
    /// device nodes) and stat failures both return `Ok(false)`; the ingest
    /// step is responsible for dropping such records rather than treating
    /// them as an error, mirroring `Fileinfo::readfileinfo` in the original
    /// implementation.
    pub fn load_stat(&mut self) -> Result<bool> {
        let metadata = match fs::symlink_metadata(&self.path) {
            Ok(m) => m,
            Err(source) => {
                return Err(DupefindError::Stat {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if !metadata.is_file() {
            return Ok(false);
        }
        self.size = metadata.len();
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            self.device = metadata.dev();
            self.inode = metadata.ino();
        }
        Ok(true)
    }

    /// Replaces this file with a symlink pointing at `target`, deferring to
    /// [`TransactionalMutator::replace_with_symlink`].
    pub fn symlink_to(&self, target: &Path, dry_run: bool) -> Result<()> {
        TransactionalMutator::replace_with_symlink(&self.path, target, dry_run)
    }

    /// Replaces this file with a hard link to `target`, deferring to
    /// [`TransactionalMutator::replace_with_hardlink`].
    pub fn hardlink_to(&self, target: &Path, dry_run: bool) -> Result<()> {
        TransactionalMutator::replace_with_hardlink(&self.path, target, dry_run)
    }

    /// Deletes this file, deferring to [`TransactionalMutator::delete`].
    pub fn delete_self(&self, dry_run: bool) -> Result<()> {
        TransactionalMutator::delete(&self.path, dry_run)
    }

    /// Rank tuple used wherever "pick one to keep" arises: inode dedup,
    /// class marking, and safe-substitution source selection.
    #[must_use]
    pub fn rank(&self) -> (usize, usize, u64) {
        (self.cmdline_index, self.depth, self.identity_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn load_stat_marks_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"hello").unwrap();
        drop(f);

        let mut record = FileRecord::new(path, 0, 0);
        assert!(record.load_stat().unwrap());
        assert_eq!(record.size, 5);
    }

    #[test]
    fn load_stat_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = FileRecord::new(dir.path().to_path_buf(), 0, 0);
        assert!(!record.load_stat().unwrap());
    }

    #[test]
    fn load_stat_reports_missing_path_as_error() {
        let mut record = FileRecord::new(PathBuf::from("/nonexistent/dupefind-test"), 0, 0);
        assert!(record.load_stat().is_err());
    }

    #[test]
    fn rank_orders_by_cmdline_index_then_depth_then_identity() {
        let mut r = FileRecord::new(PathBuf::from("x"), 2, 5);
        r.identity_number = 9;
        assert_eq!(r.rank(), (2, 5, 9));
    }
}
