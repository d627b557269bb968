//! Content fingerprinting for change detection.
//!
//! # Responsibility
//! - Produce a reproducible fingerprint of a file's content prefix.
//!
//! # Invariants
//! - At most `prefix_cap` bytes are read and hashed; two files that differ
//!   only beyond the cap produce identical fingerprints.
//! - The digest is a lowercase hex string suitable for equality comparison,
//!   not for security-sensitive use.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Default bound on how much of a file is read for fingerprinting.
pub const DEFAULT_PREFIX_CAP_BYTES: u64 = 1024 * 1024;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Computes capped-prefix content fingerprints.
#[derive(Debug, Clone, Copy)]
pub struct ContentHasher {
    prefix_cap: u64,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self {
            prefix_cap: DEFAULT_PREFIX_CAP_BYTES,
        }
    }
}

impl ContentHasher {
    /// Creates a hasher with a custom prefix cap. Mainly for tests; the
    /// production cap is [`DEFAULT_PREFIX_CAP_BYTES`].
    pub fn with_prefix_cap(prefix_cap: u64) -> Self {
        Self { prefix_cap }
    }

    /// Hashes up to `prefix_cap` bytes of the file at `path`.
    ///
    /// # Errors
    /// - Propagates open/read failures (permission, file disappeared between
    ///   stat and read). Callers treat this as fatal for the single entry
    ///   only, never for sibling entries or other locations.
    pub fn fingerprint(&self, path: &Path) -> io::Result<String> {
        let file = File::open(path)?;
        let mut reader = file.take(self.prefix_cap);
        let mut hasher = Sha256::new();
        let mut chunk = [0u8; READ_CHUNK_BYTES];
        loop {
            let read = reader.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            hasher.update(&chunk[..read]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}
