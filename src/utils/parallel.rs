//! # Parallel Hashing
//!
//! Digests many files at once on the rayon thread pool.

use rayon::prelude::*;
use std::path::{Path, PathBuf};

use super::hashing::{hash_file, HashAlgorithm, HashError};

/// Result of hashing one file in a batch.
#[derive(Debug)]
pub struct FileDigest {
    pub path: PathBuf,
    pub digest: Result<String, HashError>,
}

/// Hashes every path in parallel. Results keep the input order, and a file
/// that fails to hash only fails its own entry.
pub fn hash_files<P>(paths: &[P], algorithm: HashAlgorithm) -> Vec<FileDigest>
where
    P: AsRef<Path> + Sync,
{
    let results: Vec<FileDigest> = paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            FileDigest {
                path: path.to_path_buf(),
                digest: hash_file(path, algorithm),
            }
        })
        .collect();

    let failed = results.iter().filter(|r| r.digest.is_err()).count();
    tracing::debug!(
        files = results.len(),
        failed,
        %algorithm,
        "Hashed file batch"
    );
    results
}
