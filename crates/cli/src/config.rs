//! Configuration loading from rulecheck.toml.

use identity::ResolverConfig;
use predicate::EvaluatorConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Path to the directory file with accounts and groups.
    pub directory: Option<PathBuf>,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub evaluation: EvaluatorConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// The directory file, with `flag` taking precedence over the config.
    pub fn directory_path(&self, flag: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        flag.or_else(|| self.directory.clone())
            .ok_or(ConfigError::MissingDirectory)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("no directory configured: set `directory` in rulecheck.toml or pass --directory")]
    MissingDirectory,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
directory = "directory.toml"

[resolver]
timeout_ms = 2000

[evaluation]
memoize = true
"#,
        )
        .unwrap();
        assert_eq!(config.directory, Some(PathBuf::from("directory.toml")));
        assert_eq!(config.resolver.timeout(), Some(Duration::from_millis(2000)));
        assert!(config.evaluation.memoize);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.directory.is_none());
        assert!(config.resolver.timeout().is_none());
        assert!(!config.evaluation.memoize);
    }

    #[test]
    fn test_flag_overrides_directory() {
        let config = Config::parse(r#"directory = "a.toml""#).unwrap();
        assert_eq!(
            config.directory_path(Some("b.toml".into())).unwrap(),
            PathBuf::from("b.toml")
        );
        assert_eq!(config.directory_path(None).unwrap(), PathBuf::from("a.toml"));
        assert!(matches!(
            Config::default().directory_path(None),
            Err(ConfigError::MissingDirectory)
        ));
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load_or_default("/nonexistent/rulecheck.toml").unwrap();
        assert!(config.directory.is_none());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::parse("[resolver]\ntimeout_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
