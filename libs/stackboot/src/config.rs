//! Layered application configuration.
//!
//! Precedence (lowest to highest): built-in defaults, an optional YAML file,
//! then `STACKBOOT__`-prefixed environment variables with `__` as the nesting
//! separator (e.g. `STACKBOOT__SERVER__BIND_ADDR=0.0.0.0:8080`).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::provision::{Collaborators, RepoRef};

/// Prefix of environment variables that override configuration keys.
pub const CONFIG_ENV_PREFIX: &str = "STACKBOOT__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    /// Stack inputs; the binary falls back to its built-in table when absent.
    #[serde(default)]
    pub stacks: Option<StacksConfig>,
    /// Per-module sections, deserialized on demand by [`AppConfig::module_config`].
    #[serde(default)]
    pub modules: BTreeMap<String, serde_json::Value>,
}

impl AppConfig {
    /// Load defaults, then `path` (if given), then environment overrides.
    ///
    /// # Errors
    /// Returns an error if the file cannot be parsed or a value has the wrong shape.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = path {
            anyhow::ensure!(
                path.exists(),
                "config file {} does not exist",
                path.display()
            );
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(CONFIG_ENV_PREFIX).split("__"))
            .extract()
            .context("failed to load configuration")
    }

    /// Typed view of `modules.<name>`, or the type's default when the section is absent.
    ///
    /// # Errors
    /// Returns an error if the section exists but does not match `T`.
    pub fn module_config<T>(&self, name: &str) -> anyhow::Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.modules.get(name) {
            Some(raw) => serde_json::from_value(raw.clone())
                .with_context(|| format!("invalid configuration for module '{name}'")),
            None => Ok(T::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub console_format: ConsoleFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console_format: ConsoleFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Environment variable holding the runtime identity.
    #[serde(default = "default_identity_env")]
    pub identity_env: String,
    /// Deadline for each bootstrap action. `0` disables it.
    #[serde(default = "default_bootstrap_timeout_secs")]
    pub bootstrap_timeout_secs: u64,
    /// Deadline for the store factory. `0` disables it.
    #[serde(default = "default_store_connect_timeout_secs")]
    pub store_connect_timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            identity_env: default_identity_env(),
            bootstrap_timeout_secs: default_bootstrap_timeout_secs(),
            store_connect_timeout_secs: default_store_connect_timeout_secs(),
        }
    }
}

impl RunnerConfig {
    #[must_use]
    pub fn bootstrap_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.bootstrap_timeout_secs)
    }

    #[must_use]
    pub fn store_connect_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.store_connect_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn default_identity_env() -> String {
    "WHOAMI".to_owned()
}

fn default_bootstrap_timeout_secs() -> u64 {
    30 * 60
}

fn default_store_connect_timeout_secs() -> u64 {
    30
}

/// Settings for the concrete provisioner wired by the server binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisioningConfig {
    /// Log what would be provisioned instead of doing it.
    #[serde(default = "default_true")]
    pub dry_run: bool,
    /// Provisioning CLI executable.
    #[serde(default = "default_engine_binary")]
    pub engine_binary: String,
    /// Directory holding one program directory per program kind.
    #[serde(default = "default_programs_dir")]
    pub programs_dir: String,
    /// Directory receiving `{stack}-{n}.log` files.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
    /// Environment variable holding the GitHub token.
    #[serde(default = "default_github_token_env")]
    pub github_token_env: String,
    /// Environment variable holding a document-store connection string.
    #[serde(default = "default_store_url_env")]
    pub store_url_env: String,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            dry_run: default_true(),
            engine_binary: default_engine_binary(),
            programs_dir: default_programs_dir(),
            logs_dir: default_logs_dir(),
            github_api_url: default_github_api_url(),
            github_token_env: default_github_token_env(),
            store_url_env: default_store_url_env(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_engine_binary() -> String {
    "pulumi".to_owned()
}

fn default_programs_dir() -> String {
    "programs".to_owned()
}

fn default_logs_dir() -> String {
    "logs".to_owned()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_owned()
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_owned()
}

fn default_store_url_env() -> String {
    "STORE_URL".to_owned()
}

/// Static inputs the registry is composed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StacksConfig {
    #[serde(default)]
    pub repo_owner: String,
    #[serde(default)]
    pub repo_name: String,
    #[serde(default)]
    pub collaborators: Collaborators,
    /// Live environments; each gets its own CI identity.
    #[serde(default)]
    pub environments: Vec<String>,
    /// Suffix of developer identities (`{collaborator}-{suffix}`).
    #[serde(default = "default_local_suffix")]
    pub local_suffix: String,
    #[serde(default = "default_root_branch")]
    pub root_branch: String,
    /// Stack name of the CI-to-cloud trust relationship.
    #[serde(default = "default_trust_stack")]
    pub trust_stack: String,
}

impl Default for StacksConfig {
    fn default() -> Self {
        Self {
            repo_owner: String::new(),
            repo_name: String::new(),
            collaborators: Collaborators::new(),
            environments: Vec::new(),
            local_suffix: default_local_suffix(),
            root_branch: default_root_branch(),
            trust_stack: default_trust_stack(),
        }
    }
}

impl StacksConfig {
    #[must_use]
    pub fn repo(&self) -> RepoRef {
        RepoRef::new(&self.repo_owner, &self.repo_name)
    }
}

fn default_local_suffix() -> String {
    "local".to_owned()
}

fn default_root_branch() -> String {
    "main".to_owned()
}

fn default_trust_stack() -> String {
    "dev".to_owned()
}
