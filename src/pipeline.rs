//! The central algorithm: a straight-line sequence of sort/group/prune
//! passes that reduces a flat list of candidate files into equivalence
//! classes of byte-identical files.

use crate::digest::DigestKind;
use crate::progress::ProgressReporter;
use crate::record::{DupType, FileRecord};
use crate::stage::{self, ReadOptions, SliceKind};

/// Parameters the pipeline needs that are independent of any single record.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Digest kind used for the `FIRST_BYTES` and `LAST_BYTES` stages.
    pub checksum_for_firstlast_bytes: DigestKind,
    /// The user-selected primary checksum. `None` means `-checksum none`
    /// was given: the whole-file stage is skipped entirely (unsafe mode).
    pub primary_checksum: Option<DigestKind>,
    /// Bytes read by the `FIRST_BYTES` stage.
    pub first_bytes_size: u64,
    /// Bytes read by the `LAST_BYTES` stage.
    pub last_bytes_size: u64,
    /// Chunk size used when streaming file contents.
    pub buffer_size: usize,
    /// Nanoseconds to sleep between files during a reading stage.
    pub nsec_sleep: u64,
}

impl PipelineConfig {
    fn read_options(&self) -> ReadOptions {
        ReadOptions {
            buffer_size: self.buffer_size,
            nsec_sleep: self.nsec_sleep,
            first_bytes_size: self.first_bytes_size,
            last_bytes_size: self.last_bytes_size,
        }
    }

    /// The ordered list of fingerprint stages this run will execute.
    fn stages(&self) -> Vec<(SliceKind, DigestKind)> {
        let mut stages = vec![
            (
                SliceKind::FirstBytes(self.first_bytes_size),
                self.checksum_for_firstlast_bytes,
            ),
            (
                SliceKind::LastBytes(self.last_bytes_size),
                self.checksum_for_firstlast_bytes,
            ),
        ];
        if let Some(checksum) = self.primary_checksum {
            stages.push((SliceKind::Whole, checksum));
        }
        stages
    }
}

/// A report of one fingerprint stage's outcome, useful for progress output.
#[derive(Debug, Clone, Copy)]
pub struct StageReport {
    /// Records dropped because their read failed.
    pub read_failures: usize,
    /// Records dropped because their (size, fingerprint) pair was unique.
    pub pruned: usize,
}

/// Owns the candidate list and runs the duplicate-finding passes over it.
#[derive(Debug, Default)]
pub struct Pipeline {
    records: Vec<FileRecord>,
}

impl Pipeline {
    /// Wraps an existing candidate list (typically produced by the
    /// traversal collaborator).
    #[must_use]
    pub fn new(records: Vec<FileRecord>) -> Self {
        Self { records }
    }

    /// Current candidate list.
    #[must_use]
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Consumes the pipeline, returning the final candidate list.
    #[must_use]
    pub fn into_records(self) -> Vec<FileRecord> {
        self.records
    }

    /// Appends freshly-discovered records (one command-line root's worth),
    /// optionally sorting just the new suffix by `(depth, path)` for
    /// deterministic, filesystem-order-independent output.
    pub fn extend_from_root(&mut self, mut new_records: Vec<FileRecord>, deterministic: bool) {
        let start = self.records.len();
        self.records.append(&mut new_records);
        if deterministic {
            self.sort_on_depth_and_name(start);
        }
    }

    /// Sorts the suffix starting at `from_index` by `(depth, path)`. Exposed
    /// separately from [`Self::extend_from_root`] so callers that already
    /// hold records in the list (e.g. tests) can apply the same ordering.
    pub fn sort_on_depth_and_name(&mut self, from_index: usize) {
        self.records[from_index..].sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.path.cmp(&b.path)));
    }

    /// Drops every record whose size matches neither its predecessor's nor
    /// its successor's, after sorting by size. Idempotent.
    pub fn remove_unique_sizes(&mut self) -> usize {
        self.records.sort_by_key(|r| r.size);
        let before = self.records.len();
        let sizes: Vec<u64> = self.records.iter().map(|r| r.size).collect();
        let mut kept = Vec::with_capacity(before);
        for (i, record) in self.records.drain(..).enumerate() {
            let matches_prev = i > 0 && sizes[i - 1] == sizes[i];
            let matches_next = i + 1 < sizes.len() && sizes[i + 1] == sizes[i];
            if matches_prev || matches_next {
                kept.push(record);
            }
        }
        self.records = kept;
        before - self.records.len()
    }

    /// Sorts by `(device, inode, rank)` and keeps only the lowest-ranked
    /// record in each run of identical `(device, inode)` keys.
    pub fn remove_identical_inodes(&mut self) -> usize {
        self.records
            .sort_by_key(|r| (r.device, r.inode, r.rank(), r.path.clone()));
        let before = self.records.len();
        let mut kept: Vec<FileRecord> = Vec::with_capacity(before);
        for record in self.records.drain(..) {
            match kept.last() {
                Some(prev) if prev.device == record.device && prev.inode == record.inode => {}
                _ => kept.push(record),
            }
        }
        self.records = kept;
        before - self.records.len()
    }

    /// Assigns `identity_number` in current list order.
    pub fn mark_items(&mut self) {
        for (i, record) in self.records.iter_mut().enumerate() {
            record.identity_number = i as u64;
        }
    }

    /// Runs every fingerprint stage in order (`FIRST_BYTES`, `LAST_BYTES`,
    /// then the selected checksum unless `-checksum none`), pruning unique
    /// `(size, fingerprint)` pairs after each one.
    pub fn run_fingerprint_stages(
        &mut self,
        config: &PipelineConfig,
        progress: &dyn ProgressReporter,
    ) -> Vec<StageReport> {
        let mut reports = Vec::new();
        let mut scratch = Vec::new();
        for (slice, kind) in config.stages() {
            let read_options = config.read_options();

            // Sort for locality before the read pass.
            self.records
                .sort_by(|a, b| {
                    a.size
                        .cmp(&b.size)
                        .then_with(|| a.fingerprint.cmp(&b.fingerprint))
                        .then_with(|| a.identity_number.cmp(&b.identity_number))
                });

            progress.start_stage(&format!("{kind} ({slice_label})", slice_label = slice_label(slice)), self.records.len() as u64);

            let mut read_failures = 0usize;
            let mut survivors = Vec::with_capacity(self.records.len());
            for mut record in self.records.drain(..) {
                match stage::read_stage(&mut record, slice, kind, &mut scratch, &read_options) {
                    Ok(()) => survivors.push(record),
                    Err(err) => {
                        tracing::warn!(error = %err, "dropping record after stage read failure");
                        read_failures += 1;
                    }
                }
                progress.file_done();
            }
            progress.finish_stage();
            self.records = survivors;

            let pruned = self.remove_unique_size_and_buffer();
            reports.push(StageReport {
                read_failures,
                pruned,
            });
        }
        reports
    }

    /// Sorts by `(size, fingerprint)` and drops records whose pair is
    /// unique in the list.
    fn remove_unique_size_and_buffer(&mut self) -> usize {
        self.records
            .sort_by(|a, b| a.size.cmp(&b.size).then_with(|| a.fingerprint.cmp(&b.fingerprint)));
        let before = self.records.len();
        let keys: Vec<(u64, [u8; crate::digest::MAX_DIGEST_LEN])> =
            self.records.iter().map(|r| (r.size, r.fingerprint)).collect();
        let mut kept = Vec::with_capacity(before);
        for (i, record) in self.records.drain(..).enumerate() {
            let matches_prev = i > 0 && keys[i - 1] == keys[i];
            let matches_next = i + 1 < keys.len() && keys[i + 1] == keys[i];
            if matches_prev || matches_next {
                kept.push(record);
            }
        }
        self.records = kept;
        before - self.records.len()
    }

    /// Sorts by `(size, fingerprint)` into contiguous equivalence classes
    /// and tags each record's [`DupType`].
    pub fn mark_duplicates(&mut self) {
        self.records
            .sort_by(|a, b| a.size.cmp(&b.size).then_with(|| a.fingerprint.cmp(&b.fingerprint)));

        let mut start = 0;
        while start < self.records.len() {
            let mut end = start + 1;
            while end < self.records.len()
                && self.records[end].size == self.records[start].size
                && self.records[end].fingerprint == self.records[start].fingerprint
            {
                end += 1;
            }
            self.mark_class(start, end);
            start = end;
        }
    }

    fn mark_class(&mut self, start: usize, end: usize) {
        let first_index = (start..end)
            .min_by_key(|&i| self.records[i].rank())
            .expect("a non-empty class always has a minimum-rank record");
        let first_cmdline_index = self.records[first_index].cmdline_index;

        for i in start..end {
            self.records[i].duptype = if i == first_index {
                DupType::FirstOccurrence
            } else if self.records[i].cmdline_index == first_cmdline_index {
                DupType::WithinSameTree
            } else {
                DupType::OutsideTree
            };
        }
    }

    /// Total size, in bytes, of every record currently in the list.
    #[must_use]
    pub fn total_size_in_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }

    /// Bytes that would be reclaimed by acting on every non-first-occurrence
    /// record (i.e. every record not tagged [`DupType::FirstOccurrence`]).
    #[must_use]
    pub fn saveable_space(&self) -> u64 {
        self.records
            .iter()
            .filter(|r| r.duptype != DupType::FirstOccurrence)
            .map(|r| r.size)
            .sum()
    }

    /// Returns, for each non-first-occurrence record, the record and its
    /// class's first occurrence, as used by the action driver. Requires
    /// the list to currently be sorted into classes by `(size,
    /// fingerprint)`, as it is immediately after [`Self::mark_duplicates`].
    ///
    /// Walks each contiguous `(size, fingerprint)` class the same way
    /// [`Self::mark_class`] does, rather than assuming the `FirstOccurrence`
    /// record leads the class in list order — it doesn't in general, since
    /// classes are ordered by `(size, fingerprint)` while `FirstOccurrence`
    /// is chosen by `rank()`.
    #[must_use]
    pub fn duplicate_pairs(&self) -> Vec<(&FileRecord, &FileRecord)> {
        let mut pairs = Vec::new();
        let mut start = 0;
        while start < self.records.len() {
            let mut end = start + 1;
            while end < self.records.len()
                && self.records[end].size == self.records[start].size
                && self.records[end].fingerprint == self.records[start].fingerprint
            {
                end += 1;
            }

            if let Some(first) =
                self.records[start..end].iter().find(|r| r.duptype == DupType::FirstOccurrence)
            {
                for record in &self.records[start..end] {
                    if record.duptype != DupType::FirstOccurrence {
                        pairs.push((record, first));
                    }
                }
            }

            start = end;
        }
        pairs
    }
}

fn slice_label(slice: SliceKind) -> &'static str {
    match slice {
        SliceKind::FirstBytes(_) => "first bytes",
        SliceKind::LastBytes(_) => "last bytes",
        SliceKind::Whole => "checksum",
    }
}

/// Remaps `maximumfilesize == 0` to "no upper bound". Exposed standalone
/// so `cli` can apply it during
/// option finalization without depending on `Pipeline`.
#[must_use]
pub fn finalize_maximum_file_size(maximum_file_size: u64) -> u64 {
    if maximum_file_size == 0 {
        u64::MAX
    } else {
        maximum_file_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(path: &str, cmdline_index: usize, depth: usize, size: u64) -> FileRecord {
        let mut r = FileRecord::new(PathBuf::from(path), cmdline_index, depth);
        r.size = size;
        r
    }

    #[test]
    fn remove_unique_sizes_drops_singletons() {
        let mut pipeline = Pipeline::new(vec![
            record("a", 0, 0, 10),
            record("b", 0, 0, 20),
            record("c", 0, 0, 30),
        ]);
        let removed = pipeline.remove_unique_sizes();
        assert_eq!(removed, 3);
        assert!(pipeline.records().is_empty());
    }

    #[test]
    fn remove_unique_sizes_keeps_matching_pairs() {
        let mut pipeline = Pipeline::new(vec![
            record("a", 0, 0, 10),
            record("b", 0, 0, 10),
            record("c", 0, 0, 99),
        ]);
        pipeline.remove_unique_sizes();
        assert_eq!(pipeline.records().len(), 2);
        assert!(pipeline.records().iter().all(|r| r.size == 10));
    }

    #[test]
    fn remove_unique_sizes_is_idempotent() {
        let mut pipeline = Pipeline::new(vec![
            record("a", 0, 0, 10),
            record("b", 0, 0, 10),
            record("c", 0, 0, 30),
        ]);
        pipeline.remove_unique_sizes();
        let once = pipeline.records().to_vec();
        pipeline.remove_unique_sizes();
        let twice = pipeline.records().to_vec();
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn remove_identical_inodes_keeps_lowest_rank() {
        let mut a = record("a", 0, 0, 10);
        a.device = 1;
        a.inode = 1;
        let mut b = record("b", 1, 0, 10);
        b.device = 1;
        b.inode = 1;
        let mut c = record("c", 0, 0, 10);
        c.device = 1;
        c.inode = 2;

        let mut pipeline = Pipeline::new(vec![a, b, c]);
        let removed = pipeline.remove_identical_inodes();
        assert_eq!(removed, 1);
        assert_eq!(pipeline.records().len(), 2);
        assert!(
            pipeline
                .records()
                .iter()
                .filter(|r| r.inode == 1)
                .all(|r| r.cmdline_index == 0)
        );
    }

    #[test]
    fn mark_items_assigns_permutation() {
        let mut pipeline = Pipeline::new(vec![
            record("a", 0, 0, 10),
            record("b", 0, 0, 10),
            record("c", 0, 0, 10),
        ]);
        pipeline.mark_items();
        let mut ids: Vec<u64> = pipeline.records().iter().map(|r| r.identity_number).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn mark_duplicates_picks_lowest_rank_as_first_occurrence() {
        let mut low = record("low", 0, 0, 10);
        low.fingerprint[0] = 42;
        low.identity_number = 5;
        let mut high = record("high", 1, 0, 10);
        high.fingerprint[0] = 42;
        high.identity_number = 1;

        let mut pipeline = Pipeline::new(vec![high, low]);
        pipeline.mark_duplicates();

        let first = pipeline
            .records()
            .iter()
            .find(|r| r.duptype == DupType::FirstOccurrence)
            .unwrap();
        assert_eq!(first.path, PathBuf::from("low"));

        let other = pipeline
            .records()
            .iter()
            .find(|r| r.path == PathBuf::from("high"))
            .unwrap();
        assert_eq!(other.duptype, DupType::OutsideTree);
    }

    #[test]
    fn mark_duplicates_tags_within_same_tree_when_cmdline_index_matches() {
        let mut a = record("a", 0, 0, 5);
        a.fingerprint[0] = 1;
        a.identity_number = 0;
        let mut b = record("b", 0, 1, 5);
        b.fingerprint[0] = 1;
        b.identity_number = 1;

        let mut pipeline = Pipeline::new(vec![a, b]);
        pipeline.mark_duplicates();
        let dup = pipeline
            .records()
            .iter()
            .find(|r| r.path == PathBuf::from("b"))
            .unwrap();
        assert_eq!(dup.duptype, DupType::WithinSameTree);
    }

    #[test]
    fn duplicate_pairs_finds_first_occurrence_even_when_it_sorts_after_its_duplicate() {
        // Same (size, fingerprint), same cmdline_index, but the deeper file is
        // discovered (and thus appended) first, so the stable (size,
        // fingerprint) sort leaves it ahead of the shallower file in list
        // order even though the shallower file has the lower rank and is
        // tagged FirstOccurrence.
        let mut deep = record("root/dir/a.txt", 0, 2, 10);
        deep.fingerprint[0] = 7;
        let mut shallow = record("root/shallow.txt", 0, 1, 10);
        shallow.fingerprint[0] = 7;

        let mut pipeline = Pipeline::new(vec![deep, shallow]);
        pipeline.mark_items();
        pipeline.mark_duplicates();

        let first = pipeline
            .records()
            .iter()
            .find(|r| r.duptype == DupType::FirstOccurrence)
            .unwrap();
        assert_eq!(first.path, PathBuf::from("root/shallow.txt"));

        let pairs = pipeline.duplicate_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.path, PathBuf::from("root/dir/a.txt"));
        assert_eq!(pairs[0].1.path, PathBuf::from("root/shallow.txt"));
    }

    #[test]
    fn finalize_maximum_file_size_zero_means_unlimited() {
        assert_eq!(finalize_maximum_file_size(0), u64::MAX);
        assert_eq!(finalize_maximum_file_size(100), 100);
    }
}
