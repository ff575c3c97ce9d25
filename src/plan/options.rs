use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

pub const DEFAULT_CLI_COMMAND: &str = "gh ado2gh";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Every step blocks; the first failure stops the whole script.
    Sequential,
    /// All migrations are queued first, then awaited and finished unit by unit.
    #[default]
    Parallel,
}

/// Optional steps to plan around each repository migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StepOptions {
    pub create_teams: bool,
    pub link_idp_groups: bool,
    pub lock_source: bool,
    pub disable_source: bool,
    pub rewire_pipelines: bool,
    pub download_logs: bool,
}

impl StepOptions {
    pub fn all() -> Self {
        Self {
            create_teams: true,
            link_idp_groups: true,
            lock_source: true,
            disable_source: true,
            rewire_pipelines: true,
            download_logs: true,
        }
    }

    /// Linking IdP groups needs the teams it links to.
    pub fn normalized(mut self) -> Self {
        self.create_teams |= self.link_idp_groups;
        self
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            create_teams: self.create_teams || other.create_teams,
            link_idp_groups: self.link_idp_groups || other.link_idp_groups,
            lock_source: self.lock_source || other.lock_source,
            disable_source: self.disable_source || other.disable_source,
            rewire_pipelines: self.rewire_pipelines || other.rewire_pipelines,
            download_logs: self.download_logs || other.download_logs,
        }
    }
}

/// Where migration archives are uploaded on their way to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStorage {
    AzureBlob,
    AwsS3,
    /// Owned by the target; the script needs no storage credentials.
    GitHub,
}

/// Archive-based transfer from a self-hosted server through blob storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveTransfer {
    pub ghes_api_url: String,
    pub aws_bucket_name: Option<String>,
    pub aws_region: Option<String>,
    pub use_github_storage: bool,
    pub keep_archive: bool,
    pub no_ssl_verify: bool,
}

impl ArchiveTransfer {
    pub fn storage(&self) -> ArchiveStorage {
        if self.use_github_storage {
            ArchiveStorage::GitHub
        } else if self.aws_bucket_name.is_some() || self.aws_region.is_some() {
            ArchiveStorage::AwsS3
        } else {
            ArchiveStorage::AzureBlob
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ghes_api_url.trim().is_empty() {
            return Err(MigrateError::InvalidOptions(
                "--ghes-api-url must be set when archive transfer options are used".into(),
            ));
        }
        if self.aws_bucket_name.is_some() && self.use_github_storage {
            return Err(MigrateError::InvalidOptions(
                "The --use-github-storage flag was provided with an AWS S3 Bucket name. \
                 Archive cannot be uploaded to both locations."
                    .into(),
            ));
        }
        if self.aws_region.is_some() && self.aws_bucket_name.is_none() {
            return Err(MigrateError::InvalidOptions(
                "--aws-region can only be used together with --aws-bucket-name".into(),
            ));
        }
        Ok(())
    }
}

/// Where and how the rendered commands talk to the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOptions {
    pub github_org: String,
    pub target_api_url: Option<String>,
    pub ado_server_url: Option<String>,
    /// Prefix of every rendered command line.
    pub cli_command: String,
    pub verbose: bool,
    pub archive: Option<ArchiveTransfer>,
}

impl TargetOptions {
    pub fn new(github_org: impl Into<String>) -> Self {
        Self {
            github_org: github_org.into(),
            target_api_url: None,
            ado_server_url: None,
            cli_command: DEFAULT_CLI_COMMAND.to_string(),
            verbose: false,
            archive: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.github_org.trim().is_empty() {
            return Err(MigrateError::InvalidOptions("--github-org must not be empty".into()));
        }
        if self.cli_command.trim().is_empty() {
            return Err(MigrateError::InvalidOptions("CLI command prefix must not be empty".into()));
        }
        if let Some(archive) = &self.archive {
            archive.validate()?;
        }
        Ok(())
    }
}

/// Everything the planner needs besides the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    pub steps: StepOptions,
    pub target: TargetOptions,
    pub mode: ExecutionMode,
}
