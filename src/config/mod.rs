//! # YAML Configuration (`config`)
//!
//! Loads a YAML file once and hands out nested properties by key path.
//! Projects that keep their settings under `conf/base/` can resolve files
//! with [`YamlConfigManager::from_project_root`].

use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error while loading config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Key {0} not found in config file.")]
    KeyNotFound(String),
    #[error("Property at '{path}' has an unexpected shape: {source}")]
    Deserialize {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Handles loading and accessing properties from a YAML config file.
#[derive(Debug, Clone)]
pub struct YamlConfigManager {
    config_file: PathBuf,
    config: Value,
}

impl YamlConfigManager {
    /// Reads and parses `file_path`.
    pub fn new(file_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_file = file_path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&config_file).map_err(|source| ConfigError::Io {
            path: config_file.clone(),
            source,
        })?;
        let config = serde_yaml::from_str(&contents)?;
        tracing::debug!(path = %config_file.display(), "Loaded config file");
        Ok(YamlConfigManager {
            config_file,
            config,
        })
    }

    /// Loads `<root>/conf/base/<file_name>`.
    pub fn from_project_root(root: impl AsRef<Path>, file_name: &str) -> Result<Self, ConfigError> {
        Self::new(root.as_ref().join("conf").join("base").join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.config_file
    }

    /// The whole parsed document.
    pub fn root(&self) -> &Value {
        &self.config
    }

    /// Walks the nested mappings along `keys`.
    ///
    /// Numeric keys index into sequences. The first key that cannot be
    /// followed is reported in the error.
    pub fn get_property(&self, keys: &[&str]) -> Result<&Value, ConfigError> {
        let mut value = &self.config;
        for key in keys {
            let next = match value {
                Value::Mapping(map) => map.get(*key),
                Value::Sequence(seq) => key.parse::<usize>().ok().and_then(|i| seq.get(i)),
                _ => None,
            };
            value = next.ok_or_else(|| ConfigError::KeyNotFound((*key).to_string()))?;
        }
        Ok(value)
    }

    /// Deserializes the property at `keys` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, keys: &[&str]) -> Result<T, ConfigError> {
        let value = self.get_property(keys)?;
        serde_yaml::from_value(value.clone()).map_err(|source| ConfigError::Deserialize {
            path: keys.join("."),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    const SAMPLE: &str = r#"
database:
  schema: analytics
  port: 5432
  replicas:
    - host: db-1
    - host: db-2
features: [age, income]
"#;

    fn write_config(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_nested_properties() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "settings.yml", SAMPLE);
        let config = YamlConfigManager::new(&path).unwrap();

        assert_eq!(
            config.get_property(&["database", "schema"]).unwrap().as_str(),
            Some("analytics")
        );
        assert_eq!(
            config.get_property(&["database", "replicas", "1", "host"]).unwrap().as_str(),
            Some("db-2")
        );
        assert_eq!(config.get_as::<u16>(&["database", "port"]).unwrap(), 5432);
        assert_eq!(
            config.get_as::<Vec<String>>(&["features"]).unwrap(),
            vec!["age".to_string(), "income".to_string()]
        );
    }

    #[test]
    fn missing_key_names_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "settings.yml", SAMPLE);
        let config = YamlConfigManager::new(&path).unwrap();

        let err = config.get_property(&["database", "password"]).unwrap_err();
        assert_eq!(err.to_string(), "Key password not found in config file.");
        assert!(matches!(
            config.get_property(&["database", "replicas", "9"]),
            Err(ConfigError::KeyNotFound(k)) if k == "9"
        ));
    }

    #[test]
    fn typed_extraction_reports_shape_errors() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Database {
            schema: String,
            port: u16,
        }

        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "settings.yml", SAMPLE);
        let config = YamlConfigManager::new(&path).unwrap();

        let db: Database = config.get_as(&["database"]).unwrap();
        assert_eq!(db.schema, "analytics");
        let err = config.get_as::<u16>(&["database", "schema"]).unwrap_err();
        assert!(matches!(err, ConfigError::Deserialize { ref path, .. } if path == "database.schema"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "broken.yml", "key: [unclosed");
        let err = YamlConfigManager::new(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("Error while loading config file:"));
    }

    #[test]
    fn resolves_project_conf_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("conf").join("base");
        fs::create_dir_all(&base).unwrap();
        write_config(&base, "catalog.yml", "raw: data/01_raw\n");

        let config = YamlConfigManager::from_project_root(dir.path(), "catalog.yml").unwrap();
        assert_eq!(config.get_property(&["raw"]).unwrap().as_str(), Some("data/01_raw"));
        assert!(matches!(
            YamlConfigManager::from_project_root(dir.path(), "missing.yml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
