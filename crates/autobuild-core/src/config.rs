//! `autobuild.toml` configuration.
//!
//! ```toml
//! [repository]
//! url = "https://github.com/ikeough/Dynamo.git"
//! name = "Dynamo"
//! local_base = "repo"
//!
//! [build]
//! program = "msbuild"
//! args = ["src/Dynamo.sln", "/p:Configuration={configuration}"]
//! configurations = ["Release", "Debug"]
//!
//! [installer]
//! program = "iscc"
//! args = ["scripts/DynamoInstaller.iss"]
//!
//! [report]
//! log_prefix = "logs/autobuild_"
//! notify = "on_failure"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::interpret::ParserConfig;
use crate::report::NotifyPolicy;

/// Placeholder substituted with the configuration name in build arguments.
pub const CONFIGURATION_PLACEHOLDER: &str = "{configuration}";

/// Default per-build timeout in seconds (1 hour).
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 3_600;
/// Default timeout for each git invocation in seconds (10 minutes).
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 600;
/// Default number of commits listed in reports.
pub const DEFAULT_COMMIT_LIMIT: usize = 20;

fn default_local_base() -> PathBuf {
    PathBuf::from("repo")
}

fn default_commit_limit() -> usize {
    DEFAULT_COMMIT_LIMIT
}

fn default_git_timeout() -> u64 {
    DEFAULT_GIT_TIMEOUT_SECS
}

fn default_build_timeout() -> u64 {
    DEFAULT_BUILD_TIMEOUT_SECS
}

fn default_configurations() -> Vec<String> {
    vec!["Release".to_string(), "Debug".to_string()]
}

fn default_log_prefix() -> String {
    "autobuild_".to_string()
}

fn default_true() -> bool {
    true
}

/// Where the source comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryConfig {
    /// Remote URL passed to `git clone`.
    pub url: String,

    /// Directory name of the working copy under `local_base`.
    pub name: String,

    #[serde(default = "default_local_base")]
    pub local_base: PathBuf,

    #[serde(default = "default_commit_limit")]
    pub commit_limit: usize,

    #[serde(default = "default_git_timeout")]
    pub timeout_secs: u64,
}

/// How each configuration is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildConfig {
    pub program: String,

    /// Arguments; `{configuration}` is replaced by the configuration name.
    #[serde(default)]
    pub args: Vec<String>,

    /// Configurations in build order.
    #[serde(default = "default_configurations")]
    pub configurations: Vec<String>,

    #[serde(default = "default_build_timeout")]
    pub timeout_secs: u64,

    /// Output grammar; inferred from `program` when omitted.
    #[serde(default)]
    pub parser: Option<ParserConfig>,
}

impl BuildConfig {
    pub fn parser_config(&self) -> ParserConfig {
        self.parser
            .clone()
            .unwrap_or_else(|| ParserConfig::infer(&self.program))
    }
}

/// Optional packaging step run after the builds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallerConfig {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_build_timeout")]
    pub timeout_secs: u64,

    /// Run the installer even when a configuration failed.
    #[serde(default)]
    pub run_on_failure: bool,
}

/// Where reports go and when to notify.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,

    #[serde(default)]
    pub notify: NotifyPolicy,

    /// Write the rendered email here when the notify policy fires.
    #[serde(default)]
    pub email_out: Option<PathBuf>,

    /// Save each configuration's raw build output next to the log.
    #[serde(default = "default_true")]
    pub save_build_output: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            log_prefix: default_log_prefix(),
            notify: NotifyPolicy::default(),
            email_out: None,
            save_build_output: true,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutobuildConfig {
    pub repository: RepositoryConfig,
    pub build: BuildConfig,

    #[serde(default)]
    pub installer: Option<InstallerConfig>,

    #[serde(default)]
    pub report: ReportConfig,
}

impl AutobuildConfig {
    /// Read and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.url.trim().is_empty() {
            return Err(ConfigError::Invalid("repository.url must not be empty".into()));
        }
        if self.repository.name.trim().is_empty() {
            return Err(ConfigError::Invalid("repository.name must not be empty".into()));
        }
        if self.build.program.trim().is_empty() {
            return Err(ConfigError::Invalid("build.program must not be empty".into()));
        }
        if self.build.configurations.is_empty() {
            return Err(ConfigError::Invalid(
                "build.configurations must list at least one configuration".into(),
            ));
        }
        if let Some(installer) = &self.installer {
            if installer.program.trim().is_empty() {
                return Err(ConfigError::Invalid("installer.program must not be empty".into()));
            }
        }
        self.build.parser_config().build()?;
        Ok(())
    }

    /// Path of the working copy: `local_base/name`.
    pub fn repo_path(&self) -> PathBuf {
        crate::workspace::form_path(&self.repository.local_base, &self.repository.name)
    }
}
