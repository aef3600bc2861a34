//! Directory traversal collaborator.
//!
//! Recurses one command-line root via `ignore::WalkBuilder`, with
//! `.standard_filters(false)`: duplicate search has no notion of
//! `.gitignore` or hidden-file skipping, so none of the `ignore` crate's
//! git/hidden filters should apply. Carries an explicit [`WalkContext`]
//! rather than reaching into process-wide state.

use std::path::Path;

use ignore::WalkBuilder;

use crate::cli::Options;
use crate::record::FileRecord;

/// Context threaded through one root's traversal: which options govern it,
/// which command-line root it belongs to, and the records collected so far.
pub struct WalkContext<'a> {
    options: &'a Options,
    cmdline_index: usize,
    records: Vec<FileRecord>,
}

impl<'a> WalkContext<'a> {
    /// Starts a fresh, empty context for command-line root `cmdline_index`.
    #[must_use]
    pub fn new(options: &'a Options, cmdline_index: usize) -> Self {
        Self {
            options,
            cmdline_index,
            records: Vec::new(),
        }
    }

    /// Stats `path` at `depth` and, if it is a regular file within the
    /// configured size bounds, appends a record. Non-regular entries and
    /// stat failures are dropped (the latter logged), never fatal.
    fn consider(&mut self, path: std::path::PathBuf, depth: usize) {
        let mut record = FileRecord::new(path, self.cmdline_index, depth);
        match record.load_stat() {
            Ok(true) => {
                if record.size >= self.options.minimum_file_size
                    && record.size <= self.options.maximum_file_size
                {
                    self.records.push(record);
                }
            }
            Ok(false) => {}
            Err(error) => {
                tracing::warn!(path = %record.path.display(), %error, "failed to stat candidate");
            }
        }
    }
}

/// Walks `root`, returning every regular-file candidate discovered under
/// it that satisfies the configured size bounds.
pub fn walk_root(root: &Path, options: &Options, cmdline_index: usize) -> Vec<FileRecord> {
    let mut context = WalkContext::new(options, cmdline_index);

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(options.follow_symlinks)
        .build();

    for entry in walker {
        match entry {
            Ok(entry) => context.consider(entry.path().to_path_buf(), entry.depth()),
            Err(error) => tracing::warn!(%error, "failed to read a directory entry"),
        }
    }

    context.records
}
