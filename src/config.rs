use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "SVIDGET_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read svidget config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Transport settings shared by page and widget roots.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SvidgetConfig {
    /// Origin passed along with every cross-site message. `*` accepts any.
    pub target_origin: String,
    /// Use cross-site messaging even when the peer is same-domain.
    pub force_xsm: bool,
    /// Query parameter in a widget's URL that carries its id.
    pub widget_query_key: String,
}

impl Default for SvidgetConfig {
    fn default() -> Self {
        Self {
            target_origin: "*".to_string(),
            force_xsm: false,
            widget_query_key: "svidget".to_string(),
        }
    }
}

impl SvidgetConfig {
    /// Load from a YAML file, falling back to defaults when no path is given
    /// or the file does not exist.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                Ok(serde_yaml::from_str(&contents)?)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Load from the file named by `SVIDGET_CONFIG`, if set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
    }

    pub fn with_force_xsm(mut self, force_xsm: bool) -> Self {
        self.force_xsm = force_xsm;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_default() {
        let config = SvidgetConfig::load(None).unwrap();
        assert_eq!(config, SvidgetConfig::default());
        assert_eq!(config.target_origin, "*");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = SvidgetConfig::load(Some(PathBuf::from("/nonexistent/svidget.yaml"))).unwrap();
        assert!(!config.force_xsm);
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(file, "force_xsm: true\ntarget_origin: https://host.example").unwrap();
        let config = SvidgetConfig::load(Some(file.path().to_path_buf())).unwrap();
        assert!(config.force_xsm);
        assert_eq!(config.target_origin, "https://host.example");
        assert_eq!(config.widget_query_key, "svidget");
    }

    #[test]
    fn rejects_malformed_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(file, "force_xsm: [not, a, bool").unwrap();
        assert!(matches!(
            SvidgetConfig::load(Some(file.path().to_path_buf())),
            Err(ConfigError::Yaml(_))
        ));
    }
}
