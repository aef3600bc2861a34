//! Reads a designated slice of a file (first-N, last-N, or whole) through a
//! digest, writing the result into a [`FileRecord`]'s fingerprint buffer.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::thread;
use std::time::Duration;

use crate::digest::{Digest, DigestKind};
use crate::error::{DupefindError, Result};
use crate::record::{FileRecord, StageKind};

/// Which slice of the file a stage reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceKind {
    /// The first `n` bytes (or the whole file, if smaller).
    FirstBytes(u64),
    /// The last `n` bytes (or the whole file, if smaller).
    LastBytes(u64),
    /// The entire file.
    Whole,
}

/// Options controlling how [`read_stage`] streams a file.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Size of each streamed read, in bytes.
    pub buffer_size: usize,
    /// Nanoseconds to sleep after finishing a file's reads, to limit I/O
    /// pressure. Observed once per file, not per buffer read.
    pub nsec_sleep: u64,
    /// Window size used by the `FIRST_BYTES` stage; needed to tell whether
    /// that stage already covered the whole file.
    pub first_bytes_size: u64,
    /// Window size used by the `LAST_BYTES` stage; needed to tell whether
    /// that stage already covered the whole file.
    pub last_bytes_size: u64,
}

/// Reads `slice` of `record`'s file through a digest of kind `kind`, writing
/// the result into `record.fingerprint` and advancing `record.last_stage`.
/// `scratch` is reused across calls and resized to `options.buffer_size` as
/// needed.
///
/// If the previous stage used the same digest kind now requested for a
/// whole-file read and the file fit entirely inside that earlier window, no
/// read occurs and the existing fingerprint is kept — this is the sole
/// cross-stage state dependency in the pipeline.
pub fn read_stage(
    record: &mut FileRecord,
    slice: SliceKind,
    kind: DigestKind,
    scratch: &mut Vec<u8>,
    options: &ReadOptions,
) -> Result<()> {
    if skip_applies(record, slice, kind, options) {
        return Ok(());
    }

    let buffer_size = options.buffer_size.max(1);
    if scratch.len() != buffer_size {
        scratch.resize(buffer_size, 0);
    }

    let mut digest = Digest::new(kind);
    digest.reset();

    let mut file = File::open(&record.path).map_err(|source| DupefindError::Read {
        path: record.path.clone(),
        source,
    })?;

    let to_read = match slice {
        SliceKind::FirstBytes(n) => n.min(record.size),
        SliceKind::LastBytes(n) => {
            let n = n.min(record.size);
            if record.size > n {
                let offset = i64::try_from(n).unwrap_or(i64::MAX);
                file.seek(SeekFrom::End(-offset))
                    .map_err(|source| DupefindError::Read {
                        path: record.path.clone(),
                        source,
                    })?;
            }
            n
        }
        SliceKind::Whole => record.size,
    };

    stream_digest(&mut file, &mut digest, to_read, scratch, &record.path)?;

    let len = digest.digest_length();
    record.fingerprint = [0u8; crate::digest::MAX_DIGEST_LEN];
    digest.finalize_into(&mut record.fingerprint[..len]);
    record.last_stage = match slice {
        SliceKind::FirstBytes(_) => StageKind::FirstBytes(kind),
        SliceKind::LastBytes(_) => StageKind::LastBytes(kind),
        SliceKind::Whole => StageKind::Whole(kind),
    };

    if options.nsec_sleep > 0 {
        thread::sleep(Duration::from_nanos(options.nsec_sleep));
    }

    Ok(())
}

fn stream_digest(
    file: &mut File,
    digest: &mut Digest,
    mut remaining: u64,
    scratch: &mut [u8],
    path: &std::path::Path,
) -> Result<()> {
    while remaining > 0 {
        let chunk = (scratch.len() as u64).min(remaining) as usize;
        let read = file
            .read(&mut scratch[..chunk])
            .map_err(|source| DupefindError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        if read == 0 {
            break;
        }
        digest.update(&scratch[..read]);
        remaining -= read as u64;
    }
    Ok(())
}

/// Whether the skip optimization applies: the previous stage used the same
/// digest kind now requested for the whole-file stage, and the file was
/// small enough that the previous stage already read all of it.
fn skip_applies(record: &FileRecord, slice: SliceKind, kind: DigestKind, options: &ReadOptions) -> bool {
    let SliceKind::Whole = slice else {
        return false;
    };
    match record.last_stage {
        StageKind::FirstBytes(prev_kind) => {
            prev_kind == kind && record.size <= options.first_bytes_size
        }
        StageKind::LastBytes(prev_kind) => {
            prev_kind == kind && record.size <= options.last_bytes_size
        }
        _ => false,
    }
}
