use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::migration::{WaitOptions, DEFAULT_POLL_INTERVAL};
use crate::plan::{StepOptions, DEFAULT_CLI_COMMAND};
use crate::providers::{ado, github};
use crate::resilience::{
    Backoff, RetryPolicy, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF,
};

/// Configuration file structure for repoferry.
///
/// Holds the defaults a team reuses across runs; command-line flags win over
/// anything set here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub ado: AdoConfig,

    #[serde(default)]
    pub script: ScriptConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub wait: WaitConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GithubConfig {
    /// Target API root, e.g. `https://api.github.com`
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Target organization
    pub target_org: Option<String>,

    /// Prefix of every command in generated scripts
    #[serde(default = "default_cli_command")]
    pub cli_command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AdoConfig {
    #[serde(default = "default_ado_server_url")]
    pub server_url: String,

    /// Only discover this organization
    pub org: Option<String>,

    /// Only migrate this team project
    pub team_project: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScriptConfig {
    /// Emit a script that migrates one repository at a time
    #[serde(default)]
    pub sequential: bool,

    /// Steps enabled on every run, on top of the ones passed as flags
    #[serde(default, flatten)]
    pub steps: StepOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base of the linear backoff between attempts
    #[serde(default = "default_retry_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WaitConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Give up waiting after this long; unset waits indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RateLimitConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,

    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            target_org: None,
            cli_command: default_cli_command(),
        }
    }
}

impl Default for AdoConfig {
    fn default() -> Self {
        Self {
            server_url: default_ado_server_url(),
            org: None,
            team_project: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_retry_interval_ms(),
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_secs: default_initial_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

fn default_github_api_url() -> String {
    github::DEFAULT_API_URL.to_string()
}

fn default_cli_command() -> String {
    DEFAULT_CLI_COMMAND.to_string()
}

fn default_ado_server_url() -> String {
    ado::DEFAULT_SERVER_URL.to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_interval_ms() -> u64 {
    1_000
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_initial_backoff_secs() -> u64 {
    DEFAULT_INITIAL_BACKOFF.as_secs()
}

fn default_max_backoff_secs() -> u64 {
    DEFAULT_MAX_BACKOFF.as_secs()
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Backoff::Linear(Duration::from_millis(self.interval_ms)),
        )
    }
}

impl WaitConfig {
    pub fn options(&self) -> WaitOptions {
        WaitOptions {
            interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

impl RateLimitConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_secs(self.initial_backoff_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./repoferry.toml
    /// 3. ./repoferry.json
    /// 4. ./repoferry.yaml
    /// 5. ./repoferry.yml
    /// 6. `<user config dir>/repoferry/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["repoferry.toml", "repoferry.json", "repoferry.yaml", "repoferry.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            return Self::load_from_path(&path);
        }

        Ok(Self::default())
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("repoferry").join("config.toml"))
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.cli_command, "gh ado2gh");
        assert_eq!(config.ado.server_url, "https://dev.azure.com");
        assert!(!config.script.sequential);
        assert_eq!(config.script.steps, StepOptions::default());
        assert_eq!(config.retry.policy(), RetryPolicy::http());
        assert_eq!(config.wait.options(), WaitOptions::default());
        assert_eq!(config.rate_limit.initial_backoff(), Duration::from_secs(15));
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[github]
target-org = "contoso-gh"
api-url = "https://ghes.contoso.com/api/v3"

[ado]
org = "contoso"
team-project = "Parts Unlimited"

[script]
sequential = true
lock-source = true
rewire-pipelines = true

[retry]
max-attempts = 3
interval-ms = 250

[wait]
poll-interval-secs = 30
timeout-secs = 3600

[rate-limit]
max-backoff-secs = 120
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.github.target_org.as_deref(), Some("contoso-gh"));
        assert_eq!(config.github.api_url, "https://ghes.contoso.com/api/v3");
        assert_eq!(config.github.cli_command, "gh ado2gh");
        assert_eq!(config.ado.team_project.as_deref(), Some("Parts Unlimited"));
        assert!(config.script.sequential);
        assert!(config.script.steps.lock_source);
        assert!(config.script.steps.rewire_pipelines);
        assert!(!config.script.steps.download_logs);
        assert_eq!(
            config.retry.policy(),
            RetryPolicy::new(3, Backoff::Linear(Duration::from_millis(250)))
        );
        assert_eq!(
            config.wait.options().timeout,
            Some(Duration::from_secs(3600))
        );
        assert_eq!(config.rate_limit.max_attempts, 6);
        assert_eq!(config.rate_limit.max_backoff(), Duration::from_secs(120));
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "github": { "cli-command": "gh gei" },
  "script": { "download-logs": true }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.github.cli_command, "gh gei");
        assert!(config.script.steps.download_logs);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        write!(temp_file, "wait:\n  poll-interval-secs: 5\n").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.wait.options().interval, Duration::from_secs(5));
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        tokio_test::assert_err!(Config::load(Some(Path::new("nonexistent.toml"))));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "[retry]\nmax-attempts = \"many\"\n").unwrap();

        let err = Config::load_from_path(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML config"));
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let wait = WaitConfig {
            poll_interval_secs: 0,
            timeout_secs: None,
        };
        assert_eq!(wait.options().interval, Duration::from_secs(1));
    }
}
