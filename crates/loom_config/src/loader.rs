//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{LoomConfig, MAX_TRACE_DEPTH};
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "loom.toml";

/// Loads and validates a `loom.toml` configuration from a project directory.
///
/// A missing file is not an error: the defaults are returned instead.
pub fn load_config(project_dir: &Path) -> Result<LoomConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(LoomConfig::default());
    }
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `loom.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<LoomConfig, ConfigError> {
    let config: LoomConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &LoomConfig) -> Result<(), ConfigError> {
    if config.arena.capacity_hint == 0 {
        return Err(ConfigError::ValidationError(
            "arena.capacity_hint must be positive".to_string(),
        ));
    }
    if config.trace.depth > MAX_TRACE_DEPTH {
        return Err(ConfigError::ValidationError(format!(
            "trace.depth must not exceed {MAX_TRACE_DEPTH}"
        )));
    }
    if config.library.extension.is_empty() || config.library.extension.contains('.') {
        return Err(ConfigError::ValidationError(format!(
            "library.extension '{}' must be a non-empty name without dots",
            config.library.extension
        )));
    }
    if config.library.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "library.path must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, LoomConfig::default());
        assert_eq!(config.arena.capacity_hint, 256);
        assert!(config.gc.sweep_on_freeze);
        assert_eq!(config.trace.depth, 16);
        assert!(config.codec.verify_checksums);
        assert_eq!(config.library.path, "work");
        assert_eq!(config.library.extension, "unit");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[arena]
capacity_hint = 4096

[gc]
sweep_on_freeze = false

[trace]
depth = 64

[codec]
verify_checksums = false

[library]
path = "build/units"
extension = "lum"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.arena.capacity_hint, 4096);
        assert!(!config.gc.sweep_on_freeze);
        assert_eq!(config.trace.depth, 64);
        assert!(!config.codec.verify_checksums);
        assert_eq!(config.library.path, "build/units");
        assert_eq!(config.library.extension, "lum");
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = load_config_from_str("[arena]\ncapacity_hint = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn oversized_trace_rejected() {
        let err = load_config_from_str("[trace]\ndepth = 100000\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn dotted_extension_rejected() {
        let err = load_config_from_str("[library]\nextension = \"a.b\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn unknown_field_rejected() {
        let err = load_config_from_str("[arena]\nsize = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config, LoomConfig::default());
    }

    #[test]
    fn load_from_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[trace]\ndepth = 3\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.trace.depth, 3);
    }
}
