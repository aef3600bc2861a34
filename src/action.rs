//! Turns classified duplicate pairs into filesystem mutations.
//!
//! Consumes the `(duplicate, first_occurrence)` pairs produced by
//! [`crate::pipeline::Pipeline::duplicate_pairs`] and invokes the matching
//! [`crate::record::FileRecord`] mutator method on each duplicate. Kept as
//! a thin dispatcher: all the substitution mechanics already live in
//! `mutator`, so this module's only job is "which op, in which order,
//! counted how."

use crate::record::FileRecord;

/// What to do with each duplicate once found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Find and report duplicates; never touch the filesystem.
    Report,
    /// Replace each duplicate with a symlink to its class's first occurrence.
    MakeSymlinks,
    /// Replace each duplicate with a hard link to its class's first occurrence.
    MakeHardlinks,
    /// Delete each duplicate outright.
    DeleteDuplicates,
}

/// Outcome counters from one [`ActionDriver::apply`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ActionSummary {
    /// Duplicates the driver attempted to act on.
    pub attempted: usize,
    /// Duplicates successfully replaced or deleted.
    pub succeeded: usize,
    /// Duplicates whose mutation failed (and were left untouched, or rolled
    /// back, by the mutator).
    pub failed: usize,
}

/// Applies a single [`Mode`] across a batch of duplicate pairs.
pub struct ActionDriver {
    mode: Mode,
    dry_run: bool,
}

impl ActionDriver {
    /// Creates a driver for `mode`. `dry_run` is forwarded to every mutator
    /// call; under `Mode::Report` it has no effect since nothing is called.
    #[must_use]
    pub fn new(mode: Mode, dry_run: bool) -> Self {
        Self { mode, dry_run }
    }

    /// Applies this driver's mode to every `(duplicate, first_occurrence)`
    /// pair. Under `Mode::Report`, returns an all-zero summary without
    /// touching the filesystem.
    pub fn apply(&self, pairs: &[(&FileRecord, &FileRecord)]) -> ActionSummary {
        let mut summary = ActionSummary::default();
        if self.mode == Mode::Report {
            return summary;
        }

        for (duplicate, keeper) in pairs {
            summary.attempted += 1;
            let outcome = match self.mode {
                Mode::MakeSymlinks => duplicate.symlink_to(&keeper.path, self.dry_run),
                Mode::MakeHardlinks => duplicate.hardlink_to(&keeper.path, self.dry_run),
                Mode::DeleteDuplicates => duplicate.delete_self(self.dry_run),
                Mode::Report => unreachable!("returned above"),
            };
            match outcome {
                Ok(()) => summary.succeeded += 1,
                Err(error) => {
                    tracing::error!(
                        path = %duplicate.path.display(),
                        %error,
                        "failed to apply action to duplicate"
                    );
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn file_at(dir: &std::path::Path, name: &str, contents: &[u8]) -> FileRecord {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        let mut record = FileRecord::new(path, 0, 0);
        record.load_stat().unwrap();
        record
    }

    #[test]
    fn report_mode_never_touches_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let keeper = file_at(dir.path(), "keeper.txt", b"same");
        let duplicate = file_at(dir.path(), "dup.txt", b"same");

        let driver = ActionDriver::new(Mode::Report, false);
        let summary = driver.apply(&[(&duplicate, &keeper)]);

        assert_eq!(summary, ActionSummary::default());
        assert!(duplicate.path.exists());
        assert!(fs::read(&duplicate.path).unwrap() == b"same");
    }

    #[test]
    fn make_symlinks_replaces_duplicate_and_counts_success() {
        let dir = tempfile::tempdir().unwrap();
        let keeper = file_at(dir.path(), "keeper.txt", b"same");
        let duplicate = file_at(dir.path(), "dup.txt", b"same");

        let driver = ActionDriver::new(Mode::MakeSymlinks, false);
        let summary = driver.apply(&[(&duplicate, &keeper)]);

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
        let link_metadata = fs::symlink_metadata(&duplicate.path).unwrap();
        assert!(link_metadata.file_type().is_symlink());
    }

    #[test]
    fn delete_duplicates_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let keeper = file_at(dir.path(), "keeper.txt", b"same");
        let duplicate = file_at(dir.path(), "dup.txt", b"same");

        let driver = ActionDriver::new(Mode::DeleteDuplicates, false);
        let summary = driver.apply(&[(&duplicate, &keeper)]);

        assert_eq!(summary.succeeded, 1);
        assert!(!duplicate.path.exists());
    }

    #[test]
    fn failed_mutation_is_counted_and_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let keeper = FileRecord::new(PathBuf::from("/nonexistent/keeper"), 0, 0);
        let duplicate = file_at(dir.path(), "dup.txt", b"same");

        let driver = ActionDriver::new(Mode::MakeHardlinks, false);
        let summary = driver.apply(&[(&duplicate, &keeper)]);

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.failed, 1);
        assert!(fs::read(&duplicate.path).unwrap() == b"same");
    }
}
