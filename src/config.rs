//! Application configuration
//!
//! Layered with figment: defaults, then an optional JSON file, then
//! `KANBAN_`-prefixed environment variables (`KANBAN_DB_PATH`, `KANBAN_LOG_DIR`,
//! `KANBAN_APP_NAME`). Every field has a default, so an empty object (or no
//! file) is valid.

use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "KANBAN_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {path} not found")]
    Missing { path: PathBuf },
    #[error("invalid config: {0}")]
    Figment(#[from] figment::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file; `":memory:"` for a throwaway database
    pub db_path: PathBuf,
    /// Rolling log directory. No file logging when unset or empty.
    pub log_dir: Option<PathBuf>,
    /// Log file stem
    pub app_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("kanban.db"),
            log_dir: None,
            app_name: "KanbanBoard".to_string(),
        }
    }
}

impl AppConfig {
    /// Sources in precedence order, lowest first
    pub fn figment(path: Option<&Path>, env_prefix: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Json::file(path));
        }
        figment.merge(Env::prefixed(env_prefix).map(|key| key.as_str().to_lowercase().into()))
    }

    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        if let Some(path) = path.filter(|p| !p.exists()) {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }

        let config: AppConfig = Self::figment(path, env_prefix).extract()?;
        tracing::debug!(db_path = %config.db_path.display(), "configuration loaded");
        Ok(config)
    }

    /// Defaults, then `path` if given, then `KANBAN_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Log directory, treating an empty value as unset
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref().filter(|p| !p.as_os_str().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "db_path": "/data/boards.db" }"#).unwrap();

        let config = AppConfig::load_with_prefix(Some(&path), "KANBAN_CFGTEST_PARTIAL_").unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/boards.db"));
        assert_eq!(config.log_dir, None);
        assert_eq!(config.app_name, "KanbanBoard");
    }

    #[test]
    fn test_bad_files() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            AppConfig::load_with_prefix(Some(&missing), "KANBAN_CFGTEST_BAD_"),
            Err(ConfigError::Missing { .. })
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ db_path: ").unwrap();
        assert!(matches!(
            AppConfig::load_with_prefix(Some(&broken), "KANBAN_CFGTEST_BAD_"),
            Err(ConfigError::Figment(_))
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "db_path": "/data/boards.db", "app_name": "FromFile" }"#).unwrap();

        std::env::set_var("KANBAN_CFGTEST_ENV_LOG_DIR", "/var/log/kanban");
        std::env::set_var("KANBAN_CFGTEST_ENV_APP_NAME", "FromEnv");
        let config = AppConfig::load_with_prefix(Some(&path), "KANBAN_CFGTEST_ENV_").unwrap();
        std::env::remove_var("KANBAN_CFGTEST_ENV_LOG_DIR");
        std::env::remove_var("KANBAN_CFGTEST_ENV_APP_NAME");

        assert_eq!(config.log_dir(), Some(Path::new("/var/log/kanban")));
        assert_eq!(config.app_name, "FromEnv");
        assert_eq!(config.db_path, PathBuf::from("/data/boards.db"));
    }

    #[test]
    fn test_empty_log_dir_is_unset() {
        let config = AppConfig {
            log_dir: Some(PathBuf::new()),
            ..AppConfig::default()
        };
        assert_eq!(config.log_dir(), None);
    }
}
