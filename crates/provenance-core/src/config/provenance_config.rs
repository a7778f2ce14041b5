//! Top-level configuration with layered resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::scoring_config::KNOWN_REGULATIONS;
use super::{AnalysisConfig, BuildConfig, ScoringConfig};
use crate::errors::ConfigError;
use crate::types::call_graph::SensitivityType;

/// Project config file name, looked up in the project root.
pub const PROJECT_CONFIG_FILE: &str = "provenance.toml";

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`PROVENANCE_*`)
/// 3. Project config (`provenance.toml` in project root)
/// 4. User config (`~/.provenance/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvenanceConfig {
    pub build: BuildConfig,
    pub analysis: AnalysisConfig,
    pub scoring: ScoringConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub resolution_batch_size: Option<usize>,
    pub threads: Option<usize>,
    pub max_depth: Option<u32>,
    pub storage_dir: Option<String>,
}

impl ProvenanceConfig {
    /// Load configuration with layered resolution.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Lowest priority: user config. Only a parse error is fatal here.
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(e @ ConfigError::ParseError { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        let project_config_path = root.join(PROJECT_CONFIG_FILE);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);

        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &ProvenanceConfig) -> Result<(), ConfigError> {
        if config.build.resolution_batch_size == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "build.resolution_batch_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.build.cache_capacity == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "build.cache_capacity".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.analysis.top_n == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "analysis.top_n".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        for (keyword, sensitivity) in &config.scoring.sensitivity_overrides {
            if SensitivityType::from_name(sensitivity).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: format!("scoring.sensitivity_overrides.{}", keyword),
                    message: format!("unknown sensitivity '{}'", sensitivity),
                });
            }
        }
        for (sensitivity, regulations) in &config.scoring.regulation_overrides {
            if SensitivityType::from_name(sensitivity).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "scoring.regulation_overrides".to_string(),
                    message: format!("unknown sensitivity '{}'", sensitivity),
                });
            }
            if let Some(bad) = regulations
                .iter()
                .find(|r| !KNOWN_REGULATIONS.contains(&r.to_ascii_lowercase().as_str()))
            {
                return Err(ConfigError::InvalidValue {
                    field: format!("scoring.regulation_overrides.{}", sensitivity),
                    message: format!("unknown regulation '{}'", bad),
                });
            }
        }
        Ok(())
    }

    /// Shard directory for a project root.
    pub fn storage_path(&self, root: &Path) -> PathBuf {
        root.join(self.build.effective_storage_dir())
    }

    /// Returns the user config path: `~/.provenance/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        home_dir().map(|h| h.join(".provenance").join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored.
    fn merge_toml_file(config: &mut ProvenanceConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: ProvenanceConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins only where it has a value.
    fn merge(base: &mut ProvenanceConfig, other: &ProvenanceConfig) {
        if other.build.resolution_batch_size.is_some() {
            base.build.resolution_batch_size = other.build.resolution_batch_size;
        }
        if other.build.threads.is_some() {
            base.build.threads = other.build.threads;
        }
        if other.build.cache_capacity.is_some() {
            base.build.cache_capacity = other.build.cache_capacity;
        }
        if other.build.storage_dir.is_some() {
            base.build.storage_dir = other.build.storage_dir.clone();
        }

        if other.analysis.max_depth.is_some() {
            base.analysis.max_depth = other.analysis.max_depth;
        }
        if other.analysis.top_n.is_some() {
            base.analysis.top_n = other.analysis.top_n;
        }

        // Override tables merge key by key.
        for (k, v) in &other.scoring.sensitivity_overrides {
            base.scoring.sensitivity_overrides.insert(k.clone(), v.clone());
        }
        for (k, v) in &other.scoring.regulation_overrides {
            base.scoring.regulation_overrides.insert(k.clone(), v.clone());
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `PROVENANCE_BUILD_BATCH_SIZE`, `PROVENANCE_ANALYSIS_MAX_DEPTH`, etc.
    fn apply_env_overrides(config: &mut ProvenanceConfig) {
        if let Some(v) = env_parse::<usize>("PROVENANCE_BUILD_BATCH_SIZE") {
            config.build.resolution_batch_size = Some(v);
        }
        if let Some(v) = env_parse::<usize>("PROVENANCE_BUILD_THREADS") {
            config.build.threads = Some(v);
        }
        if let Some(v) = env_parse::<u64>("PROVENANCE_BUILD_CACHE_CAPACITY") {
            config.build.cache_capacity = Some(v);
        }
        if let Ok(v) = std::env::var("PROVENANCE_STORAGE_DIR") {
            config.build.storage_dir = Some(v);
        }
        if let Some(v) = env_parse::<u32>("PROVENANCE_ANALYSIS_MAX_DEPTH") {
            config.analysis.max_depth = Some(v);
        }
        if let Some(v) = env_parse::<usize>("PROVENANCE_ANALYSIS_TOP_N") {
            config.analysis.top_n = Some(v);
        }
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut ProvenanceConfig, cli: &CliOverrides) {
        if let Some(v) = cli.resolution_batch_size {
            config.build.resolution_batch_size = Some(v);
        }
        if let Some(v) = cli.threads {
            config.build.threads = Some(v);
        }
        if let Some(v) = cli.max_depth {
            config.analysis.max_depth = Some(v);
        }
        if let Some(ref v) = cli.storage_dir {
            config.build.storage_dir = Some(v.clone());
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
