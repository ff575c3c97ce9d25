use std::fmt;

use serde::{Deserialize, Serialize};

/// Shared pending/terminal classification for repository and organization jobs.
pub trait MigrationState: Copy + fmt::Display {
    fn is_succeeded(self) -> bool;

    fn is_failed(self) -> bool;

    fn is_pending(self) -> bool {
        !self.is_terminal()
    }

    fn is_terminal(self) -> bool {
        self.is_succeeded() || self.is_failed()
    }

    /// Whether a "N/M repositories completed" count is meaningful in this state.
    fn reports_progress(self) -> bool {
        false
    }
}

/// State of a single repository migration as reported by the target platform.
///
/// Anything the platform sends that is not listed here deserialises to `Unknown`,
/// which is treated as a failure rather than something to wait on forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepoMigrationState {
    Queued,
    PendingValidation,
    InProgress,
    Succeeded,
    Failed,
    FailedValidation,
    #[serde(other)]
    Unknown,
}

impl MigrationState for RepoMigrationState {
    fn is_succeeded(self) -> bool {
        self == Self::Succeeded
    }

    fn is_failed(self) -> bool {
        matches!(self, Self::Failed | Self::FailedValidation | Self::Unknown)
    }
}

impl fmt::Display for RepoMigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Queued => "QUEUED",
            Self::PendingValidation => "PENDING_VALIDATION",
            Self::InProgress => "IN_PROGRESS",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::FailedValidation => "FAILED_VALIDATION",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// State of a whole-organization migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgMigrationState {
    Queued,
    InProgress,
    PendingValidation,
    PreRepoMigration,
    RepoMigration,
    PostRepoMigration,
    Succeeded,
    Failed,
    FailedValidation,
    #[serde(other)]
    Unknown,
}

impl MigrationState for OrgMigrationState {
    fn is_succeeded(self) -> bool {
        self == Self::Succeeded
    }

    fn is_failed(self) -> bool {
        matches!(self, Self::Failed | Self::FailedValidation | Self::Unknown)
    }

    fn reports_progress(self) -> bool {
        self == Self::RepoMigration
    }
}

impl fmt::Display for OrgMigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Queued => "QUEUED",
            Self::InProgress => "IN_PROGRESS",
            Self::PendingValidation => "PENDING_VALIDATION",
            Self::PreRepoMigration => "PRE_REPO_MIGRATION",
            Self::RepoMigration => "REPO_MIGRATION",
            Self::PostRepoMigration => "POST_REPO_MIGRATION",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::FailedValidation => "FAILED_VALIDATION",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// Repository sub-count of an organization job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoProgress {
    pub completed: u64,
    pub total: u64,
}

impl RepoProgress {
    pub fn from_remaining(remaining: u64, total: u64) -> Self {
        Self {
            completed: total.saturating_sub(remaining),
            total,
        }
    }
}

/// One poll of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot<S> {
    pub state: S,
    /// What is being migrated, e.g. the repository name or `source -> target` for orgs.
    pub descriptor: String,
    pub failure_reason: Option<String>,
    pub progress: Option<RepoProgress>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_state_classification() {
        use RepoMigrationState::*;

        for state in [Queued, PendingValidation, InProgress] {
            assert!(state.is_pending(), "{state} should be pending");
            assert!(!state.is_terminal());
        }
        assert!(Succeeded.is_succeeded());
        assert!(!Succeeded.is_failed());
        for state in [Failed, FailedValidation, Unknown] {
            assert!(state.is_failed(), "{state} should be failed");
            assert!(!state.is_pending());
        }
    }

    #[test]
    fn test_repo_state_parses_platform_strings() {
        let state: RepoMigrationState = serde_json::from_str(r#""FAILED_VALIDATION""#).unwrap();
        assert_eq!(state, RepoMigrationState::FailedValidation);

        let state: RepoMigrationState = serde_json::from_str(r#""NOT_A_REAL_STATUS""#).unwrap();
        assert_eq!(state, RepoMigrationState::Unknown);
        assert!(state.is_failed());
    }

    #[test]
    fn test_org_state_progress_only_during_repo_migration() {
        assert!(OrgMigrationState::RepoMigration.reports_progress());
        assert!(OrgMigrationState::RepoMigration.is_pending());
        assert!(!OrgMigrationState::PreRepoMigration.reports_progress());
        assert!(OrgMigrationState::PostRepoMigration.is_pending());

        let state: OrgMigrationState = serde_json::from_str(r#""POST_REPO_MIGRATION""#).unwrap();
        assert_eq!(state.to_string(), "POST_REPO_MIGRATION");
    }

    #[test]
    fn test_progress_from_remaining() {
        let progress = RepoProgress::from_remaining(3, 10);
        assert_eq!(progress.completed, 7);
        assert_eq!(progress.total, 10);
        assert_eq!(RepoProgress::from_remaining(12, 10).completed, 0);
    }
}
