use std::path::{Path, PathBuf};

use crate::error::{MigrateError, Result};
use crate::logging::EventLog;
use crate::providers::github::GithubApi;
use crate::resilience::{Attempted, RetryPolicy, Sleeper, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLogsArgs {
    pub github_org: String,
    pub github_repo: String,
    /// Defaults to `migration-log-<org>-<repo>-<migration id>.log`.
    pub migration_log_file: Option<PathBuf>,
    pub overwrite: bool,
}

fn default_file_name(org: &str, repo: &str, migration_id: &str) -> PathBuf {
    PathBuf::from(format!("migration-log-{org}-{repo}-{migration_id}.log"))
}

fn ensure_writable(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(MigrateError::InvalidOptions(format!(
            "File {} already exists! Use --overwrite to overwrite this file.",
            path.display()
        )));
    }
    Ok(())
}

/// Downloads the log of the latest migration of `org/repo`.
///
/// The log URL is published some time after the migration ends, so it is polled with
/// `retry` until it is non-empty. The download itself runs at most once, and never if
/// the URL did not appear within the attempt budget.
///
/// # Errors
///
/// Returns [`MigrateError::InvalidOptions`] if the target file exists without
/// `overwrite`, [`MigrateError::NotFound`] if the repository has no migration or its
/// log never became available, or the download failure.
pub async fn download_logs<T: Transport, S: Sleeper>(
    api: &GithubApi<T, S>,
    args: &DownloadLogsArgs,
    retry: &RetryPolicy,
    log: &dyn EventLog,
) -> Result<PathBuf> {
    log.warning("Migration logs are only available for 24 hours after a migration finishes!");
    log.info("Downloading migration logs...");

    // Fail early on an explicit file name, before any remote call.
    if let Some(path) = &args.migration_log_file {
        ensure_writable(path, args.overwrite)?;
    }

    let org = args.github_org.as_str();
    let repo = args.github_repo.as_str();
    let attempted = retry
        .retry_on_result(
            || api.get_migration_log_url(org, repo),
            |found| {
                found
                    .as_ref()
                    .map_or(true, |l| !l.migration_log_url.trim().is_empty())
            },
            api.sleeper(),
            log,
            "Waiting for migration log to populate...",
        )
        .await?;

    let migration_log = match attempted {
        Attempted::Accepted {
            value: Some(found),
            attempts,
        } => {
            log.verbose(&format!("Migration log URL found after {attempts} attempts"));
            found
        }
        Attempted::Accepted { value: None, .. } => {
            return Err(MigrateError::NotFound(format!(
                "migration for repository {repo}"
            )));
        }
        Attempted::Rejected { attempts, .. } => {
            log.verbose(&format!(
                "Migration log URL still empty after {attempts} attempts"
            ));
            return Err(MigrateError::NotFound(format!(
                "migration log for repository {repo}"
            )));
        }
    };

    let path = args
        .migration_log_file
        .clone()
        .unwrap_or_else(|| default_file_name(org, repo, &migration_log.migration_id));

    ensure_writable(&path, args.overwrite)?;
    if path.exists() {
        log.warning(&format!(
            "Overwriting {} due to --overwrite option.",
            path.display()
        ));
    }

    log.info(&format!(
        "Downloading log for repository {repo} to {}...",
        path.display()
    ));
    api.download(&migration_log.migration_log_url, &path).await?;

    log.success(&format!("Downloaded {repo} log to {}.", path.display()));
    Ok(path)
}
