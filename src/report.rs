//! Writes the human-readable results file.
//!
//! Groups duplicates by class (first occurrence first), one path per line,
//! with a trailing summary of total reclaimable bytes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{DupefindError, Result};
use crate::record::{DupType, FileRecord};

/// Writes a results file summarizing a finished pipeline run.
pub struct Reporter;

impl Reporter {
    /// Writes `records` (in their final, `mark_duplicates`-sorted order) to
    /// `path`. `saveable_space` is the total bytes reclaimable by acting on
    /// every non-first-occurrence record.
    pub fn write_results_file(path: &Path, records: &[FileRecord], saveable_space: u64) -> Result<()> {
        let file = File::create(path).map_err(|source| DupefindError::Report {
            path: path.to_path_buf(),
            source,
        })?;
        let mut out = BufWriter::new(file);

        let map_err = |source: std::io::Error| DupefindError::Report {
            path: path.to_path_buf(),
            source,
        };

        writeln!(out, "# dupefind results").map_err(map_err)?;
        writeln!(out, "# duptype size path").map_err(map_err)?;

        for record in records {
            if record.duptype == DupType::Unknown {
                continue;
            }
            writeln!(out, "{} {} {}", record.duptype, record.size, record.path.display())
                .map_err(map_err)?;
        }

        writeln!(out).map_err(map_err)?;
        writeln!(out, "# {saveable_space} bytes could be saved").map_err(map_err)?;

        out.flush().map_err(map_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(path: &str, duptype: DupType, size: u64) -> FileRecord {
        let mut r = FileRecord::new(PathBuf::from(path), 0, 0);
        r.duptype = duptype;
        r.size = size;
        r
    }

    #[test]
    fn write_results_file_lists_classified_records_and_totals() {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("results.txt");

        let records = vec![
            record("/a/keeper.txt", DupType::FirstOccurrence, 10),
            record("/a/dup.txt", DupType::WithinSameTree, 10),
            record("/b/unclassified.txt", DupType::Unknown, 5),
        ];

        Reporter::write_results_file(&out_path, &records, 10).unwrap();

        let contents = std::fs::read_to_string(&out_path).unwrap();
        assert!(contents.contains("FIRST_OCCURRENCE 10 /a/keeper.txt"));
        assert!(contents.contains("WITHIN_SAME_TREE 10 /a/dup.txt"));
        assert!(!contents.contains("unclassified.txt"));
        assert!(contents.contains("10 bytes could be saved"));
    }
}
