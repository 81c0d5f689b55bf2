//! Core configuration model and loader.
//!
//! # Responsibility
//! - Describe every tunable of the core (store path, logging, tokenizer
//!   dictionary, cache TTLs and bounds) with working defaults.
//! - Load TOML files and apply `SKILLBASE_*` environment overrides.
//!
//! # Invariants
//! - A missing section or key falls back to its default.
//! - `validate` rejects values the core cannot run with; callers validate
//!   once at startup.

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_DB_PATH: &str = "SKILLBASE_DB_PATH";
const ENV_LOG_LEVEL: &str = "SKILLBASE_LOG_LEVEL";
const ENV_LOG_DIR: &str = "SKILLBASE_LOG_DIR";
const ENV_DICTIONARY: &str = "SKILLBASE_DICTIONARY";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "read config {}: {source}", path.display()),
            Self::Parse {
                path: Some(path),
                source,
            } => write!(f, "parse config {}: {source}", path.display()),
            Self::Parse { path: None, source } => write!(f, "parse config: {source}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Root configuration of the skill knowledge base core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db: DbConfig,
    pub log: LogConfig,
    pub tokenizer: TokenizerConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./db/skillbase.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute log directory. File logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Replacement segmentation dictionary; the embedded one when unset.
    pub dictionary: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub tag_ttl_secs: u64,
    /// `0` means unbounded.
    pub tag_max_entries: usize,
    pub project_ttl_secs: u64,
    pub project_max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tag_ttl_secs: 300,
            tag_max_entries: 1000,
            project_ttl_secs: 300,
            project_max_entries: 100,
        }
    }
}

impl CacheConfig {
    pub fn tag_ttl(&self) -> Duration {
        Duration::from_secs(self.tag_ttl_secs)
    }

    pub fn project_ttl(&self) -> Duration {
        Duration::from_secs(self.project_ttl_secs)
    }
}

impl CoreConfig {
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse { path: None, source })
    }

    /// Reads and parses one TOML file. Does not validate.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })
    }

    /// Loads `path` when given (defaults otherwise), then applies process
    /// environment overrides and validates.
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies `SKILLBASE_*` overrides resolved through `lookup`.
    ///
    /// Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = lookup(ENV_DB_PATH) {
            self.db.path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log.level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.log.dir = Some(PathBuf::from(dir));
        }
        if let Some(dictionary) = lookup(ENV_DICTIONARY) {
            self.tokenizer.dictionary = Some(PathBuf::from(dictionary));
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.db.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db.path cannot be empty".to_string()));
        }
        normalize_level(&self.log.level).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if let Some(dir) = &self.log.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log.dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        if self.cache.tag_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.tag_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.cache.project_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.project_ttl_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.db.path, PathBuf::from("./db/skillbase.db"));
        assert_eq!(config.cache.tag_max_entries, 1000);
        assert_eq!(config.cache.project_max_entries, 100);
        assert_eq!(config.cache.tag_ttl().as_secs(), 300);
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
            [cache]
            tag_ttl_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.tag_ttl_secs, 5);
        assert_eq!(config.cache.project_ttl_secs, 300);
    }

    #[test]
    fn overrides_replace_values_and_skip_blanks() {
        let env = HashMap::from([
            ("SKILLBASE_DB_PATH", "/tmp/other.db"),
            ("SKILLBASE_LOG_LEVEL", "  "),
        ]);
        let mut config = CoreConfig::default();
        config.apply_overrides(|key| env.get(key).map(|value| value.to_string()));
        assert_eq!(config.db.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.log.level, CoreConfig::default().log.level);
    }

    #[test]
    fn validate_rejects_unusable_values() {
        let mut config = CoreConfig::default();
        config.log.level = "loud".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = CoreConfig::default();
        config.log.dir = Some(PathBuf::from("logs"));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = CoreConfig::default();
        config.cache.project_ttl_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = CoreConfig::from_toml_str("[cache\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: None, .. }));
    }
}
