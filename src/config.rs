use std::path::Path;

use crate::error::ConfigError;
use crate::retention::RetentionConfig;
use crate::storage::FsStoreConfig;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub retention: RetentionConfig,
    pub storage: FsStoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            retention: RetentionConfig::default(),
            storage: FsStoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retention.validate()?;
        if self.storage.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.root_dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::ScoreOrder;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[retention]
num_to_keep = 3
score_attribute = "eval/win_rate"
score_order = "min"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.retention.num_to_keep, Some(3));
        assert_eq!(
            config.retention.score_attribute.as_deref(),
            Some("eval/win_rate")
        );
        assert_eq!(config.retention.score_order, ScoreOrder::Min);
        // Other fields should be defaults
        assert!(!config.retention.persist_ephemeral);
        assert_eq!(config.storage.root_dir, Path::new("checkpoints"));
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.retention.num_to_keep, None);
        assert_eq!(config.retention.score_order, ScoreOrder::Max);
    }

    #[test]
    fn test_validation_rejects_zero_budget() {
        let mut config = AppConfig::default();
        config.retention.num_to_keep = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_root_dir() {
        let mut config = AppConfig::default();
        config.storage.root_dir = Path::new("").to_path_buf();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[retention]
num_to_keep = 2
persist_ephemeral = true
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.retention.num_to_keep, Some(2));
        assert!(config.retention.persist_ephemeral);
        // Others are defaults
        assert!(config.retention.score_attribute.is_none());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[retention]\nnum_to_keep = 0\n").unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.retention.num_to_keep, None);
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
    }
}
