use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::Token;
use crate::config::Config;
use crate::handlers::{self, DownloadLogsArgs, GenerateScriptArgs};
use crate::inventory::{FileInventory, InventoryFilter};
use crate::logging::ConsoleLog;
use crate::output::print_plan_summary;
use crate::plan::{ArchiveTransfer, ExecutionMode, PlanOptions, StepOptions, TargetOptions};
use crate::providers::ado::AdoInventory;
use crate::providers::github::GithubApi;
use crate::resilience::{ReqwestTransport, RetryPolicy, SecondaryRateLimit, TokioSleeper};

#[derive(Parser)]
#[command(name = "repoferry")]
#[command(author, version, about = "Plans and scripts repository migrations from Azure DevOps to GitHub", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a PowerShell script that migrates every discovered repository
    GenerateScript(GenerateScriptCommand),

    /// Wait for a repository (RM_) or organization (OM_) migration to finish
    WaitForMigration {
        #[arg(long)]
        migration_id: String,

        #[command(flatten)]
        target: TargetApi,
    },

    /// Download the log of the latest migration of a repository
    DownloadLogs {
        #[arg(long)]
        github_org: String,

        #[arg(long)]
        github_repo: String,

        /// Defaults to migration-log-<org>-<repo>-<migration id>.log
        #[arg(long)]
        migration_log_file: Option<PathBuf>,

        #[arg(long, default_value_t = false)]
        overwrite: bool,

        #[command(flatten)]
        target: TargetApi,
    },
}

#[derive(Args)]
struct TargetApi {
    #[arg(long, env = "GH_PAT", hide_env_values = true)]
    github_pat: String,

    /// Target API root; defaults to https://api.github.com
    #[arg(long)]
    target_api_url: Option<String>,
}

#[derive(Args)]
struct GenerateScriptCommand {
    #[arg(long)]
    github_org: Option<String>,

    /// Only migrate this Azure DevOps organization
    #[arg(long)]
    ado_org: Option<String>,

    /// Only migrate this team project
    #[arg(long)]
    ado_team_project: Option<String>,

    #[arg(long)]
    ado_server_url: Option<String>,

    #[arg(long, env = "ADO_PAT", hide_env_values = true)]
    ado_pat: Option<String>,

    /// Plan from a JSON or YAML inventory file instead of the Azure DevOps API
    #[arg(long)]
    inventory: Option<PathBuf>,

    #[arg(long)]
    target_api_url: Option<String>,

    #[arg(short, long, default_value = "migrate.ps1")]
    output: PathBuf,

    /// Migrate one repository at a time instead of queueing them all first
    #[arg(long, default_value_t = false)]
    sequential: bool,

    #[arg(long, default_value_t = false)]
    create_teams: bool,

    /// Also link the teams to IdP groups of the same name (implies --create-teams)
    #[arg(long, default_value_t = false)]
    link_idp_groups: bool,

    #[arg(long, default_value_t = false)]
    lock_ado_repos: bool,

    #[arg(long, default_value_t = false)]
    disable_ado_repos: bool,

    #[arg(long, default_value_t = false)]
    rewire_pipelines: bool,

    #[arg(long, default_value_t = false)]
    download_migration_logs: bool,

    /// Enable every optional step
    #[arg(long, default_value_t = false)]
    all: bool,

    #[command(flatten)]
    archive: ArchiveFlags,
}

#[derive(Args)]
struct ArchiveFlags {
    #[arg(long)]
    ghes_api_url: Option<String>,

    #[arg(long)]
    aws_bucket_name: Option<String>,

    #[arg(long)]
    aws_region: Option<String>,

    #[arg(long, default_value_t = false)]
    use_github_storage: bool,

    #[arg(long, default_value_t = false)]
    keep_archive: bool,

    #[arg(long, default_value_t = false)]
    no_ssl_verify: bool,
}

impl ArchiveFlags {
    fn transfer(&self) -> Option<ArchiveTransfer> {
        let requested = self.ghes_api_url.is_some()
            || self.aws_bucket_name.is_some()
            || self.aws_region.is_some()
            || self.use_github_storage
            || self.keep_archive
            || self.no_ssl_verify;

        requested.then(|| ArchiveTransfer {
            ghes_api_url: self.ghes_api_url.clone().unwrap_or_default(),
            aws_bucket_name: self.aws_bucket_name.clone(),
            aws_region: self.aws_region.clone(),
            use_github_storage: self.use_github_storage,
            keep_archive: self.keep_archive,
            no_ssl_verify: self.no_ssl_verify,
        })
    }
}

impl GenerateScriptCommand {
    fn steps(&self) -> StepOptions {
        if self.all {
            return StepOptions::all();
        }
        StepOptions {
            create_teams: self.create_teams,
            link_idp_groups: self.link_idp_groups,
            lock_source: self.lock_ado_repos,
            disable_source: self.disable_ado_repos,
            rewire_pipelines: self.rewire_pipelines,
            download_logs: self.download_migration_logs,
        }
    }

    fn to_args(&self, config: &Config, verbose: bool) -> Result<GenerateScriptArgs> {
        let github_org = self
            .github_org
            .clone()
            .or_else(|| config.github.target_org.clone())
            .context("--github-org is required (or set github.target-org in the config file)")?;

        let mode = if self.sequential || config.script.sequential {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Parallel
        };

        let target = TargetOptions {
            target_api_url: self.target_api_url.clone(),
            ado_server_url: self.ado_server_url.clone(),
            cli_command: config.github.cli_command.clone(),
            verbose,
            archive: self.archive.transfer(),
            ..TargetOptions::new(github_org)
        };

        Ok(GenerateScriptArgs {
            filter: InventoryFilter {
                org: self.ado_org.clone().or_else(|| config.ado.org.clone()),
                project: self
                    .ado_team_project
                    .clone()
                    .or_else(|| config.ado.team_project.clone()),
                ..Default::default()
            },
            options: PlanOptions {
                steps: self.steps().union(config.script.steps),
                target,
                mode,
            },
            output: self.output.clone(),
        })
    }
}

impl Cli {
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    fn github_api(
        &self,
        config: &Config,
        target: &TargetApi,
        log: &Arc<ConsoleLog>,
    ) -> Result<GithubApi<SecondaryRateLimit<ReqwestTransport, TokioSleeper>, TokioSleeper>> {
        log.register_secret(&target.github_pat);
        let token = Token::from(target.github_pat.as_str());
        let api_url = target
            .target_api_url
            .as_deref()
            .unwrap_or(&config.github.api_url);

        let transport = SecondaryRateLimit::new(
            ReqwestTransport::bearer(Some(&token))?,
            TokioSleeper,
            log.clone(),
        )
        .with_limits(
            config.rate_limit.max_attempts,
            config.rate_limit.initial_backoff(),
            config.rate_limit.max_backoff(),
        );

        Ok(GithubApi::new(transport, TokioSleeper, api_url, log.clone())?
            .with_retry(config.retry.policy()))
    }

    async fn execute_generate_script(
        &self,
        command: &GenerateScriptCommand,
        config: &Config,
        log: Arc<ConsoleLog>,
    ) -> Result<()> {
        let args = command.to_args(config, self.verbose)?;

        let plan = if let Some(path) = &command.inventory {
            info!("Reading inventory from {}", path.display());
            let provider = FileInventory::load(path)
                .with_context(|| format!("Failed to load inventory file: {}", path.display()))?;
            handlers::generate_script(&provider, &args, log.as_ref()).await?
        } else {
            let pat = command
                .ado_pat
                .as_deref()
                .context("ADO_PAT is required unless --inventory is given")?;
            log.register_secret(pat);

            let server_url = command
                .ado_server_url
                .as_deref()
                .unwrap_or(&config.ado.server_url);
            let transport = SecondaryRateLimit::new(
                ReqwestTransport::basic(&Token::from(pat))?,
                TokioSleeper,
                log.clone(),
            )
            .with_limits(
                config.rate_limit.max_attempts,
                config.rate_limit.initial_backoff(),
                config.rate_limit.max_backoff(),
            );
            let provider = AdoInventory::new(
                transport,
                TokioSleeper,
                server_url,
                &args.options.target.github_org,
                log.clone(),
            )?
            .with_retry(config.retry.policy());

            handlers::generate_script(&provider, &args, log.as_ref()).await?
        };

        print_plan_summary(&plan, &args.output);
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let log = Arc::new(ConsoleLog::new(self.verbose));

        match &self.command {
            Commands::GenerateScript(command) => {
                self.execute_generate_script(command, &config, log).await
            }
            Commands::WaitForMigration {
                migration_id,
                target,
            } => {
                let api = self.github_api(&config, target, &log)?;
                handlers::wait_for_migration(&api, migration_id, &config.wait.options(), log.as_ref())
                    .await?;
                Ok(())
            }
            Commands::DownloadLogs {
                github_org,
                github_repo,
                migration_log_file,
                overwrite,
                target,
            } => {
                let api = self.github_api(&config, target, &log)?;
                let args = DownloadLogsArgs {
                    github_org: github_org.clone(),
                    github_repo: github_repo.clone(),
                    migration_log_file: migration_log_file.clone(),
                    overwrite: *overwrite,
                };
                handlers::download_logs(&api, &args, &RetryPolicy::eventual(), log.as_ref()).await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ArchiveStorage;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("repoferry").chain(args.iter().copied())).unwrap()
    }

    fn generate(cli: &Cli) -> &GenerateScriptCommand {
        match &cli.command {
            Commands::GenerateScript(command) => command,
            _ => panic!("expected generate-script"),
        }
    }

    #[test]
    fn test_generate_script_flags() {
        let cli = parse(&[
            "generate-script",
            "--github-org",
            "contoso-gh",
            "--ado-org",
            "contoso",
            "--link-idp-groups",
            "--rewire-pipelines",
            "--sequential",
            "--verbose",
        ]);
        let args = generate(&cli).to_args(&Config::default(), cli.verbose()).unwrap();

        assert_eq!(args.options.target.github_org, "contoso-gh");
        assert_eq!(args.filter.org.as_deref(), Some("contoso"));
        assert_eq!(args.options.mode, ExecutionMode::Sequential);
        assert!(args.options.steps.link_idp_groups);
        assert!(args.options.steps.rewire_pipelines);
        assert!(!args.options.steps.lock_source);
        assert!(args.options.target.verbose);
        assert!(args.options.target.archive.is_none());
        assert_eq!(args.output, PathBuf::from("migrate.ps1"));
    }

    #[test]
    fn test_all_enables_every_step() {
        let cli = parse(&["generate-script", "--github-org", "gh", "--all"]);
        let args = generate(&cli).to_args(&Config::default(), false).unwrap();
        assert_eq!(args.options.steps, StepOptions::all());
        assert_eq!(args.options.mode, ExecutionMode::Parallel);
    }

    #[test]
    fn test_config_supplies_defaults() {
        let mut config = Config::default();
        config.github.target_org = Some("from-config".into());
        config.ado.team_project = Some("ops".into());
        config.script.steps.lock_source = true;
        config.script.sequential = true;

        let cli = parse(&["generate-script", "--disable-ado-repos"]);
        let args = generate(&cli).to_args(&config, false).unwrap();

        assert_eq!(args.options.target.github_org, "from-config");
        assert_eq!(args.filter.project.as_deref(), Some("ops"));
        assert!(args.options.steps.lock_source);
        assert!(args.options.steps.disable_source);
        assert_eq!(args.options.mode, ExecutionMode::Sequential);
    }

    #[test]
    fn test_missing_github_org_is_an_error() {
        let cli = parse(&["generate-script"]);
        assert!(generate(&cli).to_args(&Config::default(), false).is_err());
    }

    #[test]
    fn test_archive_flags_build_transfer() {
        let cli = parse(&[
            "generate-script",
            "--github-org",
            "gh",
            "--ghes-api-url",
            "https://ghes.contoso.com/api/v3",
            "--aws-bucket-name",
            "bucket",
            "--keep-archive",
        ]);
        let args = generate(&cli).to_args(&Config::default(), false).unwrap();
        let archive = args.options.target.archive.unwrap();

        assert_eq!(archive.ghes_api_url, "https://ghes.contoso.com/api/v3");
        assert_eq!(archive.aws_bucket_name.as_deref(), Some("bucket"));
        assert!(archive.keep_archive);
        assert_eq!(archive.storage(), ArchiveStorage::AwsS3);
    }

    #[test]
    fn test_wait_for_migration_takes_token_flag() {
        let cli = parse(&["wait-for-migration", "--migration-id", "RM_1", "--github-pat", "ghp_x"]);
        match &cli.command {
            Commands::WaitForMigration {
                migration_id,
                target,
            } => {
                assert_eq!(migration_id, "RM_1");
                assert_eq!(target.github_pat, "ghp_x");
            }
            _ => panic!("expected wait-for-migration"),
        }
    }
}
