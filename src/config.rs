// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{CompileError, Result};
use crate::normalize::DuplicateStrategy;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Where the active configuration was read from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    BuiltIn,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub columns: ColumnsConfig,
    pub compile: CompileConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    pub expected_tests: u32,
    pub extension: String,
    /// Filename templates; `{n}` is replaced by the slot number.
    pub slot_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColumnsConfig {
    #[serde(default)]
    pub extra_name_variants: Vec<String>,
    #[serde(default)]
    pub extra_email_variants: Vec<String>,
    #[serde(default)]
    pub extra_score_variants: Vec<String>,
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompileConfig {
    pub duplicate_strategy: DuplicateStrategy,
    pub min_retention_ratio: f64,
    pub parallel_workers: usize,
    pub file_timeout_secs: u64,
    pub allow_partial: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub filename: String,
    pub sheet_name: String,
    pub compilation_report: String,
    pub deduplication_report: String,
    pub execution_log: String,
    pub pretty_reports: bool,
    pub show_progress: bool,
}

fn default_match_threshold() -> f64 {
    0.5
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            extra_name_variants: vec![],
            extra_email_variants: vec![],
            extra_score_variants: vec![],
            match_threshold: default_match_threshold(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new(DEFAULT_CONFIG_PATH)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("COLLATOR")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| CompileError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| CompileError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// A file named explicitly must exist. Otherwise `config/default.toml` is
    /// read when present and the built-in defaults are used when it is not.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(CompileError::Config(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            return Ok((Self::load(Some(path))?, ConfigSource::File(path.to_path_buf())));
        }

        let default = Path::new(DEFAULT_CONFIG_PATH);
        if default.is_file() {
            return Ok((Self::load(Some(default))?, ConfigSource::File(default.to_path_buf())));
        }

        Ok((Self::default_config(), ConfigSource::BuiltIn))
    }

    pub fn default_config() -> Self {
        Self {
            discovery: DiscoveryConfig {
                expected_tests: 5,
                extension: "xlsx".to_string(),
                slot_patterns: vec![
                    "test_{n}".to_string(),
                    "test {n}".to_string(),
                    "test-{n}".to_string(),
                    "test{n}".to_string(),
                ],
            },
            columns: ColumnsConfig::default(),
            compile: CompileConfig {
                duplicate_strategy: DuplicateStrategy::KeepFirst,
                min_retention_ratio: 0.95,
                parallel_workers: 4,
                file_timeout_secs: 30,
                allow_partial: false,
            },
            output: OutputConfig {
                filename: "compiled_results.xlsx".to_string(),
                sheet_name: "Results".to_string(),
                compilation_report: "compilation_report.json".to_string(),
                deduplication_report: "deduplication_report.json".to_string(),
                execution_log: "execution.log".to_string(),
                pretty_reports: true,
                show_progress: true,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.discovery.expected_tests == 0 {
            return Err(CompileError::Config(
                "expected_tests must be greater than 0".to_string(),
            ));
        }

        if self.discovery.slot_patterns.is_empty() {
            return Err(CompileError::Config(
                "at least one slot pattern is required".to_string(),
            ));
        }

        if self.compile.parallel_workers == 0 {
            return Err(CompileError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if self.compile.file_timeout_secs == 0 {
            return Err(CompileError::Config(
                "file_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let ratio = self.compile.min_retention_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(CompileError::Config(format!(
                "min_retention_ratio must be in (0, 1], got {}",
                ratio
            )));
        }

        if !(0.0..1.0).contains(&self.columns.match_threshold) {
            return Err(CompileError::Config(format!(
                "match_threshold must be in [0, 1), got {}",
                self.columns.match_threshold
            )));
        }

        if self.output.filename.trim().is_empty() || self.output.sheet_name.trim().is_empty() {
            return Err(CompileError::Config(
                "output filename and sheet_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.discovery.expected_tests, 5);
        assert_eq!(config.compile.duplicate_strategy, DuplicateStrategy::KeepFirst);
    }

    #[test]
    fn test_rejects_out_of_range_retention() {
        let mut config = Config::default_config();
        config.compile.min_retention_ratio = 1.5;
        assert!(config.validate().is_err());

        config.compile.min_retention_ratio = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut config = Config::default_config();
        config.compile.parallel_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("collator.toml");
        fs::write(
            &path,
            r#"
[discovery]
expected_tests = 3
extension = "xlsx"
slot_patterns = ["exam_{n}"]

[columns]
extra_score_variants = ["mark obtained"]

[compile]
duplicate_strategy = "keep_last"
min_retention_ratio = 1.0
parallel_workers = 2
file_timeout_secs = 10
allow_partial = true

[output]
filename = "out.xlsx"
sheet_name = "Scores"
compilation_report = "c.json"
deduplication_report = "d.json"
execution_log = "run.log"
pretty_reports = false
show_progress = false
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.discovery.expected_tests, 3);
        assert_eq!(config.compile.duplicate_strategy, DuplicateStrategy::KeepLast);
        assert_eq!(config.columns.extra_score_variants, vec!["mark obtained"]);
        assert_eq!(config.columns.match_threshold, 0.5);
        assert!(config.compile.allow_partial);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent.toml");

        match Config::load_or_default(Some(&missing)) {
            Err(CompileError::Config(message)) => assert!(message.contains("not found")),
            other => panic!("expected a config error, got {:?}", other.map(|(_, s)| s)),
        }
    }

    #[test]
    fn test_explicit_config_is_reported_as_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("collator.toml");
        let shipped = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let toml = fs::read_to_string(shipped).unwrap();
        fs::write(&path, toml).unwrap();

        let (config, source) = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(source, ConfigSource::File(path));
        assert_eq!(config.discovery.expected_tests, 5);
    }
}
