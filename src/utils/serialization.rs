//! # Model Serialization Utilities
//!
//! Saves and loads fitted [`PcaTransformer`]s.
//! Uses `serde` for serialization and `bincode` as the binary format.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::decomposition::PcaTransformer;

// --- Error Type ---
#[derive(thiserror::Error, Debug)]
pub enum SerializationError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization Error (Bincode): {0}")]
    Bincode(#[from] bincode::Error),
    #[error("Only fitted models can be saved")]
    NotFitted,
}

/// Writes a fitted transformer to `path`.
pub fn save_pca<P: AsRef<Path>>(pca: &PcaTransformer, path: P) -> Result<(), SerializationError> {
    if !pca.is_fitted() {
        return Err(SerializationError::NotFitted);
    }
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    bincode::serialize_into(&mut writer, pca)?;
    writer.flush()?;
    tracing::debug!(path = %path.as_ref().display(), "Saved {pca}");
    Ok(())
}

/// Reads a transformer written by [`save_pca`].
pub fn load_pca<P: AsRef<Path>>(path: P) -> Result<PcaTransformer, SerializationError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let pca: PcaTransformer = bincode::deserialize_from(reader)?;
    Ok(pca)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{DataFrame, Value};

    #[test]
    fn fitted_model_survives_a_round_trip() {
        let rows = (0..6)
            .map(|i| {
                let t = i as f64;
                vec![Value::Float(t), Value::Float(t * t), Value::Float(-t)]
            })
            .collect();
        let frame = DataFrame::from_rows(["a", "b", "c"], rows).unwrap();
        let mut pca = PcaTransformer::new(2);
        pca.fit(&frame).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pca.bin");
        save_pca(&pca, &path).unwrap();
        let loaded = load_pca(&path).unwrap();

        assert_eq!(loaded, pca);
        assert_eq!(loaded.transform(&frame).unwrap(), pca.transform(&frame).unwrap());
    }

    #[test]
    fn unfitted_model_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pca.bin");
        let err = save_pca(&PcaTransformer::default(), &path).unwrap_err();
        assert!(matches!(err, SerializationError::NotFitted));
        assert!(!path.exists());
    }

    #[test]
    fn garbage_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pca.bin");
        std::fs::write(&path, b"\x01").unwrap();
        assert!(matches!(
            load_pca(&path).unwrap_err(),
            SerializationError::Bincode(_)
        ));
    }
}
