use std::sync::Mutex;

use crate::error::{MigrateError, Result};
use crate::logging::EventLog;
use crate::migration::{
    wait_for_terminal, MigrationId, MigrationState, TerminalOutcome, WaitOptions,
};
use crate::providers::github::{GithubApi, RepoMigration};
use crate::resilience::{Sleeper, Transport};

/// Blocks until the migration behind `migration_id` succeeds or fails.
///
/// The id is classified before the first poll: `RM_` ids are repository migrations and
/// `OM_` ids organization migrations. Anything else is rejected without a remote call.
///
/// # Errors
///
/// Returns [`crate::error::MigrateError::InvalidMigrationId`], the job failure, or the
/// poll error that ended the wait.
pub async fn wait_for_migration<T: Transport, S: Sleeper>(
    api: &GithubApi<T, S>,
    migration_id: &str,
    options: &WaitOptions,
    log: &dyn EventLog,
) -> Result<TerminalOutcome> {
    let id: MigrationId = migration_id.parse()?;

    match &id {
        MigrationId::Repository(raw) => {
            let last_seen: Mutex<Option<RepoMigration>> = Mutex::new(None);
            let last = &last_seen;

            let outcome = wait_for_terminal(
                &id,
                move || async move {
                    let migration = api.get_migration(raw).await?;
                    let snapshot = migration.snapshot();
                    if let Ok(mut slot) = last.lock() {
                        *slot = Some(migration);
                    }
                    Ok::<_, MigrateError>(snapshot)
                },
                options,
                api.sleeper(),
                log,
            )
            .await;

            if let Some(migration) = last_seen.into_inner().ok().flatten() {
                report_repo_details(&migration, log);
            }
            outcome
        }
        MigrationId::Organization(raw) => {
            wait_for_terminal(
                &id,
                move || async move { api.get_org_migration(raw).await.map(|m| m.snapshot()) },
                options,
                api.sleeper(),
                log,
            )
            .await
        }
    }
}

fn report_repo_details(migration: &RepoMigration, log: &dyn EventLog) {
    if migration.state.is_pending() {
        return;
    }

    match migration.warnings_count {
        0 => log.info("No warnings encountered during this migration"),
        1 => log.warning("1 warning encountered during this migration"),
        n => log.warning(&format!("{n} warnings encountered during this migration")),
    }

    if let Some(url) = migration.migration_log_url.as_deref().filter(|u| !u.is_empty()) {
        log.info(&format!(
            "Migration log available at {url} or by running the download-logs command"
        ));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::logging::testing::{Level, RecordingLog};
    use crate::resilience::testing::{response, InstantSleeper, ScriptedTransport};
    use crate::resilience::HttpResponse;

    fn api(responses: Vec<HttpResponse>) -> GithubApi<ScriptedTransport, InstantSleeper> {
        GithubApi::new(
            ScriptedTransport::new(responses),
            InstantSleeper::default(),
            "https://api.github.com",
            Arc::new(RecordingLog::default()),
        )
        .unwrap()
    }

    fn repo_node(state: &str, extra: &str) -> HttpResponse {
        response(
            200,
            &format!(
                r#"{{"data":{{"node":{{"id":"RM_1","state":"{state}","repositoryName":"web"{extra}}}}}}}"#
            ),
        )
    }

    fn options() -> WaitOptions {
        WaitOptions {
            interval: Duration::from_secs(10),
            timeout: None,
        }
    }

    #[tokio::test]
    async fn test_repo_migration_polls_until_success() {
        let api = api(vec![
            repo_node("QUEUED", ""),
            repo_node("IN_PROGRESS", ""),
            repo_node(
                "SUCCEEDED",
                r#","warningsCount":2,"migrationLogUrl":"https://logs/RM_1""#,
            ),
        ]);
        let log = RecordingLog::default();

        let outcome = wait_for_migration(&api, "RM_1", &options(), &log).await.unwrap();

        assert_eq!(outcome.polls, 3);
        assert_eq!(outcome.descriptor, "web");
        assert_eq!(api.sleeper().delays(), vec![Duration::from_secs(10); 2]);
        assert_eq!(log.count(Level::Success), 1);
        assert!(log
            .messages(Level::Warning)
            .contains(&"2 warnings encountered during this migration".to_string()));
        assert!(log
            .messages(Level::Info)
            .iter()
            .any(|m| m.contains("https://logs/RM_1")));
    }

    #[tokio::test]
    async fn test_failed_repo_migration_carries_reason() {
        let api = api(vec![repo_node(
            "FAILED_VALIDATION",
            r#","failureReason":"Repository too large""#,
        )]);
        let log = RecordingLog::default();

        let err = wait_for_migration(&api, "RM_1", &options(), &log)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MigrateError::MigrationFailed { ref id, ref reason }
                if id == "RM_1" && reason == "Repository too large"
        ));
        assert_eq!(log.count(Level::Error), 1);
        assert!(log
            .messages(Level::Info)
            .contains(&"No warnings encountered during this migration".to_string()));
    }

    #[tokio::test]
    async fn test_org_migration_reports_progress() {
        let org_node = |state: &str, remaining: u32| {
            response(
                200,
                &format!(
                    r#"{{"data":{{"node":{{"state":"{state}","sourceOrgUrl":"https://github.com/src",
                    "targetOrgName":"dst","remainingRepositoriesCount":{remaining},"totalRepositoriesCount":4}}}}}}"#
                ),
            )
        };
        let api = api(vec![org_node("REPO_MIGRATION", 3), org_node("SUCCEEDED", 0)]);
        let log = RecordingLog::default();

        let outcome = wait_for_migration(&api, "OM_1", &options(), &log).await.unwrap();

        assert_eq!(outcome.descriptor, "https://github.com/src -> dst");
        assert!(log
            .messages(Level::Info)
            .iter()
            .any(|m| m.contains("1/4 repositories completed")));
    }

    #[tokio::test]
    async fn test_malformed_id_is_rejected_before_polling() {
        let api = api(vec![]);
        let result = wait_for_migration(&api, "XX_1", &options(), &RecordingLog::default()).await;

        assert!(matches!(result, Err(MigrateError::InvalidMigrationId(_))));
        assert!(api.transport().sent().is_empty());
    }
}
