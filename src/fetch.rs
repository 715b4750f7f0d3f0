//! Minimal byte-retrieval collaborator (`spec.md` §6's file/HTTP
//! collaborator contract). No HTTP client is included — Non-goals (§1)
//! say no fetch strategy is prescribed — but `Metadata::for_input`'s
//! discovery order needs *some* concrete fetcher to call, so this module
//! supplies a `Fetcher` trait plus one disk-backed implementation,
//! mirroring the teacher's `io_utils::open_csv_reader_from_path`
//! stdin-or-file convention.

use std::fs;
use std::path::{Path, PathBuf};

/// Retrieves bytes for a resource named relative to some base location.
/// A caller wanting HTTP-based linked-metadata discovery implements this
/// trait against a real client; the core only depends on the trait.
pub trait Fetcher {
    /// Fetches `name` resolved against this fetcher's base. Returns
    /// `None` if the resource does not exist (a miss, not an error) —
    /// `Metadata::for_input`'s discovery order swallows misses and tries
    /// the next candidate.
    fn fetch(&self, name: &str) -> std::io::Result<Option<Vec<u8>>>;
}

/// Reads sibling files off local disk. `base_dir` is the directory a
/// relative `name` is resolved against (typically the directory holding
/// the CSV file being processed).
pub struct FileFetcher {
    base_dir: PathBuf,
}

impl FileFetcher {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        let candidate = Path::new(name);
        if candidate.is_absolute() { candidate.to_path_buf() } else { self.base_dir.join(candidate) }
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, name: &str) -> std::io::Result<Option<Vec<u8>>> {
        let path = self.resolve(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}
