//! `.nbhygiene.toml` configuration files
//!
//! Configuration files can be placed in:
//! - User home directory: ~/.nbhygiene.toml (user defaults)
//! - Project directory: ./.nbhygiene.toml (project defaults)
//! - Custom location via --config (replaces both)
//!
//! Precedence order (highest to lowest):
//! 1. Command-line arguments (--dry-run, --strict, --jobs)
//! 2. Project config (./.nbhygiene.toml) or the --config file
//! 3. User config (~/.nbhygiene.toml)
//! 4. Built-in defaults

use anyhow::{Context, Result};
use colored::Colorize;
use nbhygiene_notebook::{ValidatorConfig, WalkOptions, NOTEBOOK_EXTENSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the home and current directories
pub const CONFIG_FILE_NAME: &str = ".nbhygiene.toml";

/// Directory processed when no path argument is given
pub const DEFAULT_NOTEBOOKS_DIR: &str = "notebooks/";

/// Commented template written by `config init`
pub const CONFIG_TEMPLATE: &str = r#"# nbhygiene configuration file

[paths]
# Directory used when no path argument is given
# notebooks = "notebooks/"

# Notebook file extension (without the dot)
# extension = "ipynb"

# Glob patterns to skip, matched against relative paths and path components
# exclude = [".ipynb_checkpoints"]

[clean]
# Report what would change without rewriting files
# dry_run = false

[validate]
# Exit with status 1 when any issue is found
# strict = false

# Code cells with more lines than this are reported
# max_code_cell_lines = 50

# Quoted alphanumeric literals at least this long are reported as possible secrets
# secret_min_length = 20

[walk]
# Worker threads for directory walks (1 = sequential)
# jobs = 4
"#;

/// Merged configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Where to look for notebooks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<PathsConfig>,

    /// Default settings for the clean command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean: Option<CleanConfig>,

    /// Default settings for the validate command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate: Option<ValidateConfig>,

    /// Directory walk settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub walk: Option<WalkConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Default notebooks directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notebooks: Option<PathBuf>,

    /// Notebook file extension
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// Exclude patterns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    /// Dry run by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateConfig {
    /// Strict mode by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,

    /// Line limit for code cells
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_code_cell_lines: Option<usize>,

    /// Minimum secret literal length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_min_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Worker threads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

/// Field-wise precedence: values set in `higher` win
trait Overlay: Sized {
    fn overlay(self, higher: Self) -> Self;
}

impl Overlay for PathsConfig {
    fn overlay(self, higher: Self) -> Self {
        Self {
            notebooks: higher.notebooks.or(self.notebooks),
            extension: higher.extension.or(self.extension),
            exclude: higher.exclude.or(self.exclude),
        }
    }
}

impl Overlay for CleanConfig {
    fn overlay(self, higher: Self) -> Self {
        Self {
            dry_run: higher.dry_run.or(self.dry_run),
        }
    }
}

impl Overlay for ValidateConfig {
    fn overlay(self, higher: Self) -> Self {
        Self {
            strict: higher.strict.or(self.strict),
            max_code_cell_lines: higher.max_code_cell_lines.or(self.max_code_cell_lines),
            secret_min_length: higher.secret_min_length.or(self.secret_min_length),
        }
    }
}

impl Overlay for WalkConfig {
    fn overlay(self, higher: Self) -> Self {
        Self {
            jobs: higher.jobs.or(self.jobs),
        }
    }
}

fn merge_section<T: Overlay>(lower: Option<T>, higher: Option<T>) -> Option<T> {
    match (lower, higher) {
        (Some(lower), Some(higher)) => Some(lower.overlay(higher)),
        (lower, higher) => higher.or(lower),
    }
}

impl Config {
    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            // TOML errors include line/column information, preserve it
            anyhow::anyhow!("Failed to parse config file {}: {e}", path.display())
        })
    }

    /// Find and load configuration files
    /// Returns (`user_config`, `project_config`)
    #[must_use]
    pub fn discover_configs() -> (Option<Self>, Option<Self>) {
        let user_config = user_config_path().and_then(|p| Self::load_optional(&p));
        let project_config = Self::load_optional(Path::new(CONFIG_FILE_NAME));
        (user_config, project_config)
    }

    fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => {
                log::debug!("Loaded config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                eprintln!("{} {e:#}", "Warning:".yellow().bold());
                None
            }
        }
    }

    /// Resolve the effective configuration: an explicit file replaces discovery
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly requested file cannot be loaded.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        let (user_config, project_config) = Self::discover_configs();
        Ok(Self::merge(user_config, project_config))
    }

    /// Merge multiple configs with precedence
    /// CLI args > project config > user config > defaults
    #[must_use]
    pub fn merge(user_config: Option<Self>, project_config: Option<Self>) -> Self {
        let user = user_config.unwrap_or_default();
        let project = project_config.unwrap_or_default();
        Self {
            paths: merge_section(user.paths, project.paths),
            clean: merge_section(user.clean, project.clean),
            validate: merge_section(user.validate, project.validate),
            walk: merge_section(user.walk, project.walk),
        }
    }

    /// Path used when the command line gives none
    #[must_use]
    pub fn notebooks_dir(&self) -> PathBuf {
        self.paths
            .as_ref()
            .and_then(|p| p.notebooks.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_NOTEBOOKS_DIR))
    }

    /// Notebook file extension
    #[must_use]
    pub fn extension(&self) -> String {
        self.paths
            .as_ref()
            .and_then(|p| p.extension.clone())
            .map(|e| e.trim_start_matches('.').to_string())
            .unwrap_or_else(|| NOTEBOOK_EXTENSION.to_string())
    }

    /// Walk options with the CLI job count taking precedence
    #[must_use]
    pub fn walk_options(&self, cli_jobs: Option<usize>) -> WalkOptions {
        WalkOptions {
            extension: self.extension(),
            exclude: self
                .paths
                .as_ref()
                .and_then(|p| p.exclude.clone())
                .unwrap_or_default(),
            jobs: cli_jobs.or_else(|| self.walk.as_ref().and_then(|w| w.jobs)),
        }
    }

    /// Validator thresholds
    #[must_use]
    pub fn validator_config(&self) -> ValidatorConfig {
        let defaults = ValidatorConfig::default();
        let validate = self.validate.clone().unwrap_or_default();
        ValidatorConfig {
            max_code_cell_lines: validate
                .max_code_cell_lines
                .unwrap_or(defaults.max_code_cell_lines),
            secret_min_length: validate
                .secret_min_length
                .unwrap_or(defaults.secret_min_length),
        }
    }

    /// Dry-run flag: CLI flag or config default
    #[must_use]
    pub fn dry_run(&self, cli_flag: bool) -> bool {
        cli_flag || self.clean.as_ref().and_then(|c| c.dry_run).unwrap_or(false)
    }

    /// Strict flag: CLI flag or config default
    #[must_use]
    pub fn strict(&self, cli_flag: bool) -> bool {
        cli_flag || self.validate.as_ref().and_then(|v| v.strict).unwrap_or(false)
    }
}

/// ~/.nbhygiene.toml, if a home directory is known
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}
