use crate::plan::{ArchiveTransfer, MigrationUnit, Step, StepKind, TargetOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    /// `--name "value"`, quoted for PowerShell.
    Value(&'static str, String),
    /// `--name value`, written as-is (script variables).
    Raw(&'static str, String),
    Flag(&'static str),
}

/// A single invocation of the migration CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    subcommand: &'static str,
    args: Vec<Arg>,
}

impl CommandLine {
    pub fn new(subcommand: &'static str) -> Self {
        Self {
            subcommand,
            args: Vec::new(),
        }
    }

    fn arg(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.args.push(Arg::Value(name, value.into()));
        self
    }

    fn opt_arg(self, name: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => self.arg(name, v),
            _ => self,
        }
    }

    fn raw_arg(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.args.push(Arg::Raw(name, value.into()));
        self
    }

    fn flag_if(mut self, name: &'static str, enabled: bool) -> Self {
        if enabled {
            self.args.push(Arg::Flag(name));
        }
        self
    }

    pub fn to_cli_args(&self) -> Vec<String> {
        let mut out = vec![self.subcommand.to_string()];
        for arg in &self.args {
            match arg {
                Arg::Value(name, value) => {
                    out.push((*name).to_string());
                    out.push(quote(value));
                }
                Arg::Raw(name, value) => {
                    out.push((*name).to_string());
                    out.push(value.clone());
                }
                Arg::Flag(name) => out.push((*name).to_string()),
            }
        }
        out
    }

    /// The full line, prefixed with the configured CLI command.
    pub fn render(&self, cli_command: &str) -> String {
        format!("{} {}", cli_command.trim(), self.to_cli_args().join(" "))
    }
}

/// Double-quotes `value` for PowerShell, escaping what would otherwise be interpolated.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '`' | '"' | '$') {
            out.push('`');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// PowerShell expression reading a unit's job id from the migration table.
pub fn migration_id_ref(key: &str) -> String {
    format!("$RepoMigrations[{}]", quote(key))
}

/// Renders one planned step for `unit`.
///
/// With `queue_only` the migrate step returns as soon as the job is queued instead of
/// waiting for it to finish.
pub fn step_command(step: &Step, unit: &MigrationUnit, target: &TargetOptions, queue_only: bool) -> CommandLine {
    let ado_repo = |sub| {
        CommandLine::new(sub)
            .arg("--ado-org", &unit.org)
            .arg("--ado-team-project", &unit.project)
            .arg("--ado-repo", &unit.repo)
            .flag_if("--verbose", target.verbose)
    };

    match &step.kind {
        StepKind::CreateTeam { team, idp_group } => CommandLine::new("create-team")
            .opt_arg("--target-api-url", target.target_api_url.as_deref())
            .arg("--github-org", &target.github_org)
            .arg("--team-name", team)
            .flag_if("--verbose", target.verbose)
            .opt_arg("--idp-group", idp_group.as_deref()),
        StepKind::ShareServiceConnection { service_connection } => {
            CommandLine::new("share-service-connection")
                .arg("--ado-org", &unit.org)
                .arg("--ado-team-project", &unit.project)
                .arg("--service-connection-id", service_connection)
                .flag_if("--verbose", target.verbose)
        }
        StepKind::LockSource => ado_repo("lock-ado-repo"),
        StepKind::Migrate => {
            let cmd = CommandLine::new("migrate-repo")
                .opt_arg("--target-api-url", target.target_api_url.as_deref())
                .arg("--ado-org", &unit.org)
                .arg("--ado-team-project", &unit.project)
                .arg("--ado-repo", &unit.repo)
                .arg("--github-org", &target.github_org)
                .arg("--github-repo", &unit.target_repo);
            let cmd = match &target.archive {
                Some(archive) => with_archive(cmd, archive),
                None => cmd,
            };
            cmd.flag_if("--verbose", target.verbose)
                .flag_if("--queue-only", queue_only)
                .raw_arg("--target-repo-visibility", "private")
                .opt_arg("--ado-server-url", target.ado_server_url.as_deref())
        }
        StepKind::DisableSource => ado_repo("disable-ado-repo"),
        StepKind::GrantTeamRole { team, role } => CommandLine::new("add-team-to-repo")
            .opt_arg("--target-api-url", target.target_api_url.as_deref())
            .arg("--github-org", &target.github_org)
            .arg("--github-repo", &unit.target_repo)
            .arg("--team", team)
            .arg("--role", role.to_string())
            .flag_if("--verbose", target.verbose),
        StepKind::DownloadLogs => CommandLine::new("download-logs")
            .opt_arg("--target-api-url", target.target_api_url.as_deref())
            .arg("--github-org", &target.github_org)
            .arg("--github-repo", &unit.target_repo),
        StepKind::RewirePipeline {
            pipeline,
            service_connection,
        } => CommandLine::new("rewire-pipeline")
            .arg("--ado-org", &unit.org)
            .arg("--ado-team-project", &unit.project)
            .arg("--ado-pipeline", pipeline)
            .arg("--github-org", &target.github_org)
            .arg("--github-repo", &unit.target_repo)
            .arg("--service-connection-id", service_connection)
            .flag_if("--verbose", target.verbose),
    }
}

pub fn wait_command(unit: &MigrationUnit, target: &TargetOptions) -> CommandLine {
    CommandLine::new("wait-for-migration")
        .opt_arg("--target-api-url", target.target_api_url.as_deref())
        .raw_arg("--migration-id", migration_id_ref(&unit.key()))
}

fn with_archive(cmd: CommandLine, archive: &ArchiveTransfer) -> CommandLine {
    cmd.arg("--ghes-api-url", &archive.ghes_api_url)
        .opt_arg("--aws-bucket-name", archive.aws_bucket_name.as_deref())
        .opt_arg("--aws-region", archive.aws_region.as_deref())
        .flag_if("--no-ssl-verify", archive.no_ssl_verify)
        .flag_if("--keep-archive", archive.keep_archive)
        .flag_if("--use-github-storage", archive.use_github_storage)
}
