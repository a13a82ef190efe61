use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;

pub use crate::domain::models::config::ConfigError;
use crate::domain::models::config::Config;

/// Project config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "basin-watch.yaml";

/// Optional local overrides next to [`CONFIG_FILE`].
pub const LOCAL_CONFIG_FILE: &str = "basin-watch.local.yaml";

pub const ENV_PREFIX: &str = "BASIN_WATCH_";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. basin-watch.yaml
    /// 3. basin-watch.local.yaml (optional)
    /// 4. Environment variables (BASIN_WATCH_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`ConfigLoader::load`], resolving the config files under `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join(CONFIG_FILE)))
            .merge(Yaml::file(dir.join(LOCAL_CONFIG_FILE)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file. Environment variables still win.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        config.detector.validate()?;

        let persistence = &config.persistence;
        if persistence.database_path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if persistence.initial_backoff_ms >= persistence.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                persistence.initial_backoff_ms,
                persistence.max_backoff_ms,
            ));
        }

        // snapshot_every and snapshot_interval_secs may be 0 to disable that trigger
        let counts = [
            ("queue_capacity", persistence.queue_capacity as u64),
            ("write_timeout_ms", persistence.write_timeout_ms),
            ("snapshot_tail", persistence.snapshot_tail as u64),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(ConfigError::NonPositive { name, value: 0.0 });
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        for rule in &config.inference.rules {
            if rule.flag.is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Inference rule flag cannot be empty".to_string(),
                ));
            }
            if !rule.delta.is_finite() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Inference rule '{}' has a non-finite delta",
                    rule.flag
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.detector.window_size, 16);
        assert_eq!(config.persistence.database_path, ".basin-watch/basin-watch.db");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
detector:
  dimensions: [alpha, beta]
  window_size: 12
  min_observations: 6
persistence:
  database_path: /custom/path.db
  snapshot_every: 10
logging:
  level: debug
  format: pretty
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.detector.dimensions.names(), ["alpha", "beta"]);
        assert_eq!(config.detector.window_size, 12);
        assert_eq!(config.persistence.database_path, "/custom/path.db");
        assert_eq!(config.persistence.snapshot_every, 10);
        assert_eq!(config.persistence.queue_capacity, 256);
        assert_eq!(config.logging.format, "pretty");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.persistence.database_path = String::new();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyDatabasePath
        ));
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.persistence.initial_backoff_ms = 30_000;
        config.persistence.max_backoff_ms = 10_000;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidBackoff(30_000, 10_000)
        ));
    }

    #[test]
    fn test_validate_zero_queue_capacity() {
        let mut config = Config::default();
        config.persistence.queue_capacity = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::NonPositive { name: "queue_capacity", .. }
        ));
    }

    #[test]
    fn test_validate_accepts_interval_only_snapshots() {
        let mut config = Config::default();
        config.persistence.snapshot_every = 0;
        config.persistence.snapshot_interval_secs = 30;

        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_detector_errors_surface() {
        let mut config = Config::default();
        config.detector.stability_threshold = 1.5;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidFraction { name: "stability_threshold", .. }
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "detector:\n  window_size: 20\nlogging:\n  level: info\n  format: json\n",
        )
        .unwrap();
        std::fs::write(dir.path().join(LOCAL_CONFIG_FILE), "logging:\n  level: debug\n").unwrap();

        let config = temp_env::with_vars_unset(
            ["BASIN_WATCH_LOGGING__LEVEL", "BASIN_WATCH_DETECTOR__WINDOW_SIZE"],
            || ConfigLoader::load_from_dir(dir.path()).unwrap(),
        );

        assert_eq!(config.detector.window_size, 20);
        assert_eq!(config.logging.level, "debug", "Local file should win");
        assert_eq!(config.logging.format, "json", "Base value should persist");
    }

    #[test]
    fn test_env_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "detector:\n  window_size: 20\n").unwrap();

        let config = temp_env::with_vars(
            [
                ("BASIN_WATCH_DETECTOR__WINDOW_SIZE", Some("24")),
                ("BASIN_WATCH_PERSISTENCE__SNAPSHOT_EVERY", Some("7")),
            ],
            || ConfigLoader::load_from_dir(dir.path()).unwrap(),
        );

        assert_eq!(config.detector.window_size, 24);
        assert_eq!(config.persistence.snapshot_every, 7);
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "detector:\n  window_size: 4\n  min_observations: 8").unwrap();
        file.flush().unwrap();

        let err = temp_env::with_vars_unset(["BASIN_WATCH_DETECTOR__WINDOW_SIZE"], || {
            ConfigLoader::load_from_file(file.path()).unwrap_err()
        });
        assert!(err.to_string().contains("Invalid window"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = ConfigLoader::load_from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
