//! Uniform streaming interface over the five supported hash algorithms.
//!
//! `Digest` is a proper sum type over the concrete hasher state, so the
//! active algorithm can never be separated from its data. Each variant
//! wraps a streaming hasher from `md-5`, `sha1`, `sha2`, or `xxhash-rust`.

use digest::Digest as _;
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use xxhash_rust::xxh3::Xxh3;

/// Largest digest a [`Digest`] can ever produce; sized for SHA-512.
pub const MAX_DIGEST_LEN: usize = 64;

/// Which checksum algorithm a [`Digest`] instance computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestKind {
    /// MD5, 16-byte digest.
    Md5,
    /// SHA-1, 20-byte digest.
    Sha1,
    /// SHA-256, 32-byte digest.
    Sha256,
    /// SHA-512, 64-byte digest.
    Sha512,
    /// XXH3/128, 16-byte digest. Fast, non-cryptographic.
    Xxh128,
}

impl DigestKind {
    /// Number of bytes [`Digest::finalize_into`] writes for this kind.
    #[must_use]
    pub const fn digest_length(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
            Self::Xxh128 => 16,
        }
    }
}

impl std::fmt::Display for DigestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Xxh128 => "xxh128",
        };
        f.write_str(name)
    }
}

/// A streaming checksum calculation.
///
/// `Clone` preserves in-progress state: finalizing a clone and the
/// original separately (without an intervening `update`) yields identical
/// digests.
#[derive(Clone)]
pub enum Digest {
    /// MD5 state.
    Md5(Md5),
    /// SHA-1 state.
    Sha1(Sha1),
    /// SHA-256 state.
    Sha256(Sha256),
    /// SHA-512 state.
    Sha512(Sha512),
    /// XXH3/128 state.
    Xxh128(Box<Xxh3>),
}

impl Digest {
    /// Creates a fresh hasher of the given kind.
    #[must_use]
    pub fn new(kind: DigestKind) -> Self {
        match kind {
            DigestKind::Md5 => Self::Md5(Md5::new()),
            DigestKind::Sha1 => Self::Sha1(Sha1::new()),
            DigestKind::Sha256 => Self::Sha256(Sha256::new()),
            DigestKind::Sha512 => Self::Sha512(Sha512::new()),
            DigestKind::Xxh128 => Self::Xxh128(Box::new(Xxh3::new())),
        }
    }

    /// Which algorithm this instance computes.
    #[must_use]
    pub fn kind(&self) -> DigestKind {
        match self {
            Self::Md5(_) => DigestKind::Md5,
            Self::Sha1(_) => DigestKind::Sha1,
            Self::Sha256(_) => DigestKind::Sha256,
            Self::Sha512(_) => DigestKind::Sha512,
            Self::Xxh128(_) => DigestKind::Xxh128,
        }
    }

    /// Number of bytes [`Self::finalize_into`] writes.
    #[must_use]
    pub fn digest_length(&self) -> usize {
        self.kind().digest_length()
    }

    /// Resets the hasher to its freshly-constructed state.
    pub fn reset(&mut self) {
        match self {
            Self::Md5(h) => h.reset(),
            Self::Sha1(h) => h.reset(),
            Self::Sha256(h) => h.reset(),
            Self::Sha512(h) => h.reset(),
            Self::Xxh128(h) => h.reset(),
        }
    }

    /// Streams additional bytes into the digest. A zero-length slice is a
    /// no-op.
    pub fn update(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        match self {
            Self::Md5(h) => digest::Digest::update(h, bytes),
            Self::Sha1(h) => digest::Digest::update(h, bytes),
            Self::Sha256(h) => digest::Digest::update(h, bytes),
            Self::Sha512(h) => digest::Digest::update(h, bytes),
            Self::Xxh128(h) => h.update(bytes),
        }
    }

    /// Writes exactly [`Self::digest_length`] bytes into `buffer`, without
    /// reinitializing the hasher's state (call [`Self::reset`] first if the
    /// instance is to be reused for a different computation).
    ///
    /// # Panics
    ///
    /// Panics if `buffer` is shorter than [`Self::digest_length`]; this is a
    /// caller contract violation, not a recoverable condition.
    pub fn finalize_into(&self, buffer: &mut [u8]) {
        let len = self.digest_length();
        assert!(
            buffer.len() >= len,
            "finalize_into buffer too small: need {len}, have {}",
            buffer.len()
        );
        match self {
            Self::Md5(h) => buffer[..len].copy_from_slice(&h.clone().finalize()),
            Self::Sha1(h) => buffer[..len].copy_from_slice(&h.clone().finalize()),
            Self::Sha256(h) => buffer[..len].copy_from_slice(&h.clone().finalize()),
            Self::Sha512(h) => buffer[..len].copy_from_slice(&h.clone().finalize()),
            Self::Xxh128(h) => buffer[..len].copy_from_slice(&h.digest128().to_le_bytes()),
        }
    }
}
