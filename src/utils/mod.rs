//! # Utility Functions (`utils`)
//!
//! Helpers for file hashing, parallel batches, model persistence and number formatting.

pub mod format;
pub mod hashing;
pub mod parallel;
pub mod serialization;

pub use hashing::{compute_hash, hash_file, read_file_chunks, HashAlgorithm, HashError};
pub use parallel::hash_files;
pub use serialization::{load_pca, save_pca, SerializationError};
