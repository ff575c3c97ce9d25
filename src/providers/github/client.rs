use std::path::Path;
use std::sync::Arc;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use crate::error::{MigrateError, Result};
use crate::logging::EventLog;
use crate::resilience::{transient, HttpRequest, RetryPolicy, Sleeper, Transport};

use super::types::{
    GraphQlResponse, MigrationLog, MigrationLogData, NodeData, OrgMigration, RepoMigration,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const GET_MIGRATION_QUERY: &str = r"
query($id: ID!) {
    node(id: $id) {
        ... on Migration {
            id
            sourceUrl
            migrationLogUrl
            migrationSource { name }
            state
            warningsCount
            failureReason
            repositoryName
        }
    }
}";

const GET_ORG_MIGRATION_QUERY: &str = r"
query($id: ID!) {
    node(id: $id) {
        ... on OrganizationMigration {
            state
            sourceOrgUrl
            targetOrgName
            failureReason
            remainingRepositoriesCount
            totalRepositoriesCount
        }
    }
}";

const GET_MIGRATION_LOG_URL_QUERY: &str = r"
query($org: String!, $repo: String!) {
    organization(login: $org) {
        repositoryMigrations(last: 1, repositoryName: $repo) {
            nodes {
                id
                migrationLogUrl
            }
        }
    }
}";

/// Target-platform GraphQL client for migration status.
///
/// Every query is retried with [`RetryPolicy::http`] on transient failures; the transport
/// underneath is expected to absorb secondary rate limits.
pub struct GithubApi<T, S> {
    transport: T,
    sleeper: S,
    graphql_url: Url,
    retry: RetryPolicy,
    downloads: Client,
    log: Arc<dyn EventLog>,
}

impl<T: Transport, S: Sleeper> GithubApi<T, S> {
    /// Creates a client for the API rooted at `api_url` (e.g. `https://api.github.com`
    /// or `https://ghes.example.com/api/v3`).
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Config`] if `api_url` is not a valid URL.
    pub fn new(transport: T, sleeper: S, api_url: &str, log: Arc<dyn EventLog>) -> Result<Self> {
        let graphql_url = Url::parse(&format!("{}/graphql", api_url.trim_end_matches('/')))
            .map_err(|e| MigrateError::Config(format!("Invalid target API URL: {e}")))?;

        let downloads = Client::builder()
            .user_agent(concat!("repoferry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MigrateError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            transport,
            sleeper,
            graphql_url,
            retry: RetryPolicy::http(),
            downloads,
            log,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub async fn get_migration(&self, migration_id: &str) -> Result<RepoMigration> {
        let data: NodeData<RepoMigration> = self
            .graphql("getMigration", GET_MIGRATION_QUERY, json!({ "id": migration_id }))
            .await?;
        data.node
            .ok_or_else(|| MigrateError::NotFound(format!("migration {migration_id}")))
    }

    pub async fn get_org_migration(&self, migration_id: &str) -> Result<OrgMigration> {
        let data: NodeData<OrgMigration> = self
            .graphql(
                "getOrganizationMigration",
                GET_ORG_MIGRATION_QUERY,
                json!({ "id": migration_id }),
            )
            .await?;
        data.node
            .ok_or_else(|| MigrateError::NotFound(format!("organization migration {migration_id}")))
    }

    /// Latest migration of `org/repo`, or `None` if the repository was never migrated.
    ///
    /// The returned log URL is empty while the platform is still producing the log.
    pub async fn get_migration_log_url(&self, org: &str, repo: &str) -> Result<Option<MigrationLog>> {
        let data: MigrationLogData = self
            .graphql(
                "getMigrationLogUrl",
                GET_MIGRATION_LOG_URL_QUERY,
                json!({ "org": org, "repo": repo }),
            )
            .await?;

        let organization = data
            .organization
            .ok_or_else(|| MigrateError::NotFound(format!("organization {org}")))?;
        Ok(organization.repository_migrations.nodes.into_iter().next())
    }

    /// Downloads `url` to `path` without credentials, returning the number of bytes written.
    ///
    /// Log URLs are pre-signed, so the download does not go through the authenticated
    /// transport.
    pub async fn download(&self, url: &str, path: &Path) -> Result<u64> {
        let response = self.downloads.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MigrateError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to download {url}"),
            });
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(path, &bytes).await?;
        Ok(bytes.len() as u64)
    }

    async fn graphql<D: DeserializeOwned>(&self, query_type: &str, query: &str, variables: Value) -> Result<D> {
        let request = HttpRequest::post_json(
            self.graphql_url.clone(),
            &json!({ "query": query, "variables": variables }),
        )?;

        self.retry
            .retry(
                || self.execute(&request, query_type),
                transient,
                &self.sleeper,
                self.log.as_ref(),
            )
            .await
    }

    async fn execute<D: DeserializeOwned>(&self, request: &HttpRequest, query_type: &str) -> Result<D> {
        let response = self.transport.send(request).await?.error_for_status()?;
        let body: GraphQlResponse<D> = response.json()?;

        if !body.errors.is_empty() {
            let errors: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(MigrateError::GraphQLError {
                query_type: query_type.to_string(),
                errors: errors.join(", "),
            });
        }

        body.data.ok_or(MigrateError::NoResponseData)
    }
}
