//! Configuration parser for loading tool configuration.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, TreeplayError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::{StoreBackend, ToolConfig};

/// Environment variable overriding `store.path`.
pub const ENV_STORE_PATH: &str = "TREEPLAY_STORE_PATH";
/// Environment variable overriding `store.backend`.
pub const ENV_STORE_BACKEND: &str = "TREEPLAY_STORE_BACKEND";
/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "TREEPLAY_LOG_LEVEL";

/// Configuration parser for loading tool configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving `.env`.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path used to locate `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ToolConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(TreeplayError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            TreeplayError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        let mut config = self.parse_yaml(&content, Some(path))?;
        if let (Some(base), Some(store_path)) = (path.parent(), &config.store.path) {
            if store_path.is_relative() {
                config.store.path = Some(base.join(store_path));
            }
        }
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<ToolConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(ToolConfig::default());
        }

        let config: ToolConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            TreeplayError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed configuration with {} store backend", config.store.backend);
        Ok(config)
    }

    /// Resolves the configuration for a CLI run.
    ///
    /// An explicit path must exist. Without one, the file is searched for
    /// with [`find_config_file`] and the defaults are used if none is found.
    /// Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if a file is found but cannot be parsed, or an
    /// environment override is invalid.
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<ToolConfig> {
        let mut config = match explicit {
            Some(path) => self.load_file(path)?,
            None => {
                let start = self.base_path.clone().unwrap_or_else(|| PathBuf::from("."));
                match find_config_file(&start) {
                    Ok(path) => self.load_file(path)?,
                    Err(_) => {
                        debug!("No configuration file found; using defaults");
                        ToolConfig::default()
                    }
                }
            }
        };

        Self::apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies environment overrides using `lookup` to read variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `TREEPLAY_STORE_BACKEND` is not a known backend.
    pub fn apply_overrides(
        config: &mut ToolConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(path) = lookup(ENV_STORE_PATH) {
            debug!("Overriding store.path from environment");
            config.store.path = Some(PathBuf::from(path));
        }

        if let Some(backend) = lookup(ENV_STORE_BACKEND) {
            debug!("Overriding store.backend from environment");
            config.store.backend = backend
                .parse::<StoreBackend>()
                .map_err(|e| ConfigError::validation(e, "store.backend"))?;
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            debug!("Overriding logging.level from environment");
            config.logging.level = level;
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                TreeplayError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["treeplay.yaml", "treeplay.yml", ".treeplay.yaml"];

/// Finds the configuration file in `start_dir` or its parents, then in the
/// user configuration directory.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        if let Some(found) = find_in(&current) {
            return Ok(found);
        }
        if !current.pop() {
            break;
        }
    }

    if let Some(found) = dirs::config_dir().and_then(|dir| find_in(&dir.join("treeplay"))) {
        return Ok(found);
    }

    Err(TreeplayError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_FILES.iter().map(|name| dir.join(name)).find(|path| {
        let exists = path.exists();
        if exists {
            info!("Found configuration file: {}", path.display());
        }
        exists
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::PlayMode;
    use std::collections::HashMap;

    #[test]
    fn test_parse_empty_config() {
        let config = ConfigParser::new().parse_yaml("", None).expect("parse failed");
        assert_eq!(config, ToolConfig::default());
        assert_eq!(config.logging.level, "info");
        assert!(config.recording.confirm_actions);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r"
store:
  backend: memory
recording:
  play_mode: loop
  confirm_actions: false
  auto_sleep_ms: 0
  timeout_seconds: 120
logging:
  level: debug
";
        let config = ConfigParser::new().parse_yaml(yaml, None).expect("parse failed");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.recording.play_mode, PlayMode::Loop);
        assert!(!config.recording.confirm_actions);
        assert_eq!(config.recording.header().timeout_seconds, 120);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = ConfigParser::new()
            .parse_yaml("store: [unclosed", None)
            .expect_err("should fail");
        assert!(matches!(err, TreeplayError::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_STORE_PATH, "/tmp/tree.json"),
            (ENV_STORE_BACKEND, "FILE"),
            (ENV_LOG_LEVEL, "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = ToolConfig::default();
        config.store.backend = StoreBackend::Memory;
        ConfigParser::apply_overrides(&mut config, |name| vars.get(name).map(ToString::to_string))
            .expect("overrides failed");

        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/tree.json")));
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_invalid_backend_override() {
        let mut config = ToolConfig::default();
        let result = ConfigParser::apply_overrides(&mut config, |name| {
            (name == ENV_STORE_BACKEND).then(|| String::from("redis"))
        });
        assert!(matches!(
            result,
            Err(TreeplayError::Config(ConfigError::ValidationError { .. }))
        ));
    }

    #[test]
    fn test_find_config_in_parent_and_relative_store_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(dir.path().join("treeplay.yaml"), "store:\n  path: data/tree.json\n")
            .expect("write");

        let found = find_config_file(&nested).expect("should find config");
        assert_eq!(found, dir.path().join("treeplay.yaml"));

        let config = ConfigParser::new().load_file(&found).expect("load failed");
        assert_eq!(config.store.path, Some(dir.path().join("data/tree.json")));
    }

    #[test]
    fn test_explicit_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ConfigParser::new()
            .resolve(Some(&dir.path().join("nope.yaml")))
            .expect_err("should fail");
        assert!(matches!(err, TreeplayError::Config(ConfigError::FileNotFound { .. })));
    }
}
