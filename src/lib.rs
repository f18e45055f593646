//! # dsutils
//!
//! Data-science utilities: a small row-oriented [`frame::DataFrame`],
//! frequency encoding, PCA with Plotly figures, YAML configuration, file
//! hashing, a SQLite table handler and Google Drive/Sheets helpers.
//! Usable directly from Rust and, with the `python` feature, as a Python module.

pub mod config;
pub mod database;
pub mod decomposition;
pub mod frame;
pub mod gdrive;
pub mod logging;
pub mod plotting;
pub mod utils;

#[cfg(feature = "python")]
pub mod bindings; // Module specifically for PyO3 bindings setup

pub use config::YamlConfigManager;
pub use database::DatabaseHandler;
pub use decomposition::PcaTransformer;
pub use frame::{DataFrame, Value};
