use serde::Deserialize;

use crate::migration::{JobSnapshot, OrgMigrationState, RepoMigrationState, RepoProgress};

/// Standard GraphQL envelope.
#[derive(Debug, Deserialize)]
pub(super) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct NodeData<T> {
    pub node: Option<T>,
}

/// A repository migration as reported by the target platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoMigration {
    pub id: String,
    pub state: RepoMigrationState,
    #[serde(default)]
    pub repository_name: String,
    #[serde(default)]
    pub warnings_count: u32,
    pub failure_reason: Option<String>,
    pub migration_log_url: Option<String>,
}

impl RepoMigration {
    pub fn snapshot(&self) -> JobSnapshot<RepoMigrationState> {
        JobSnapshot {
            state: self.state,
            descriptor: self.repository_name.clone(),
            failure_reason: self.failure_reason.clone(),
            progress: None,
        }
    }
}

/// A whole-organization migration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgMigration {
    pub state: OrgMigrationState,
    #[serde(default)]
    pub source_org_url: String,
    #[serde(default)]
    pub target_org_name: String,
    pub failure_reason: Option<String>,
    pub remaining_repositories_count: Option<u64>,
    pub total_repositories_count: Option<u64>,
}

impl OrgMigration {
    pub fn snapshot(&self) -> JobSnapshot<OrgMigrationState> {
        let progress = match (self.remaining_repositories_count, self.total_repositories_count) {
            (Some(remaining), Some(total)) => Some(RepoProgress::from_remaining(remaining, total)),
            _ => None,
        };
        JobSnapshot {
            state: self.state,
            descriptor: format!("{} -> {}", self.source_org_url, self.target_org_name),
            failure_reason: self.failure_reason.clone(),
            progress,
        }
    }
}

/// Latest migration of a repository and where its log lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationLog {
    #[serde(rename = "id")]
    pub migration_id: String,
    /// Empty until the platform has published the log.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub migration_log_url: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MigrationLogData {
    pub organization: Option<OrganizationMigrations>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OrganizationMigrations {
    pub repository_migrations: Nodes<MigrationLog>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Nodes<T> {
    pub nodes: Vec<T>,
}
