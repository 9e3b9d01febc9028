//! Configuration module for the treeplay tool.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `treeplay.yaml`
//! - `.env` loading and `TREEPLAY_*` environment overrides
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{
    ConfigParser, DEFAULT_CONFIG_FILES, ENV_LOG_LEVEL, ENV_STORE_BACKEND, ENV_STORE_PATH,
    find_config_file,
};
pub use spec::{
    DEFAULT_STORE_FILE, LoggingConfig, RecordingDefaults, StoreBackend, StoreConfig, ToolConfig,
};
pub use validator::{ConfigValidator, ValidationResult};
