//! Configuration for forksync.
//!
//! Every value has a default, so the file is optional; command-line flags
//! are layered on top by the binary before [`SyncConfig::validate`] runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bump::PackageManager;
use crate::errors::ConfigError;
use crate::history::ExcludePattern;
use crate::orchestrator::{SyncOptions, DEFAULT_REMOTE_PREFIX};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "forksync.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Where updates come from.
    #[serde(default)]
    pub template: TemplateConfig,

    /// How updates are replayed.
    #[serde(default)]
    pub apply: ApplyConfig,

    /// Console behaviour.
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// The upstream template repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Clone URL of the template. May be left empty and given on the
    /// command line instead.
    #[serde(default)]
    pub url: String,

    /// Branch of the template to follow (default `master`).
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Regular expression over commit subjects; matching commits are never
    /// offered. Empty excludes nothing.
    #[serde(default)]
    pub exclude: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            branch: default_branch(),
            exclude: String::new(),
        }
    }
}

fn default_branch() -> String {
    "master".into()
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyConfig {
    /// Tool that replays dependency bumps: yarn, npm or pnpm.
    #[serde(default)]
    pub package_manager: PackageManager,

    /// Name prefix for the temporary template remote.
    #[serde(default = "default_remote_prefix")]
    pub remote_prefix: String,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            package_manager: PackageManager::default(),
            remote_prefix: default_remote_prefix(),
        }
    }
}

fn default_remote_prefix() -> String {
    DEFAULT_REMOTE_PREFIX.into()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Echo stash, package-manager and commit output while it runs.
    #[serde(default = "default_true")]
    pub stream_commands: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            stream_commands: true,
        }
    }
}

fn default_log_level() -> String {
    "warn".into()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl SyncConfig {
    /// Load a [`SyncConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: SyncConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Locate and load the configuration.
    ///
    /// An explicit path must exist. Otherwise `./forksync.toml` is tried,
    /// then `<config dir>/forksync/config.toml`; when neither exists the
    /// defaults are returned with no path.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load_from_file(path)?, Some(path.to_path_buf())));
        }

        for candidate in search_paths() {
            if candidate.is_file() {
                let config = Self::load_from_file(&candidate)?;
                return Ok((config, Some(candidate)));
            }
        }

        debug!("no configuration file found; using defaults");
        Ok((Self::default(), None))
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.template.url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "template.url".into(),
                detail: "template URL must not be empty".into(),
            });
        }
        if self.template.branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "template.branch".into(),
                detail: "template branch must not be empty".into(),
            });
        }
        self.exclude_pattern()?;
        if !is_valid_remote_prefix(&self.apply.remote_prefix) {
            return Err(ConfigError::InvalidValue {
                field: "apply.remote_prefix".into(),
                detail: format!(
                    "'{}' is not a usable remote name; use letters, digits, '-', '_' or '.'",
                    self.apply.remote_prefix
                ),
            });
        }
        Ok(())
    }

    fn exclude_pattern(&self) -> Result<ExcludePattern, ConfigError> {
        ExcludePattern::parse(&self.template.exclude).map_err(|e| ConfigError::InvalidValue {
            field: "template.exclude".into(),
            detail: e.to_string(),
        })
    }

    /// Validate and convert into the options a sync run takes.
    pub fn sync_options(&self) -> Result<SyncOptions, ConfigError> {
        self.validate()?;
        Ok(SyncOptions {
            template_url: self.template.url.trim().to_string(),
            branch: self.template.branch.trim().to_string(),
            exclude: self.exclude_pattern()?,
            package_manager: self.apply.package_manager,
            remote_prefix: self.apply.remote_prefix.clone(),
        })
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# forksync configuration

[template]
url = "https://github.com/your-org/your-template.git"
branch = "master"
# exclude = "^(WIP|Release)"

[apply]
package_manager = "yarn"  # yarn | npm | pnpm
remote_prefix = "upstream-template"

[output]
log_level = "warn"
stream_commands = true
"#
    }
}

/// Implicit config locations, most specific first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("forksync").join("config.toml"));
    }
    paths
}

fn is_valid_remote_prefix(prefix: &str) -> bool {
    !prefix.is_empty()
        && !prefix.starts_with(['-', '.'])
        && !prefix.ends_with('.')
        && !prefix.contains("..")
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
