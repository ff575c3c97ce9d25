use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::{MigrateError, Result};
use crate::inventory::{InventoryProvider, Repository};
use crate::logging::EventLog;
use crate::resilience::{transient, HttpRequest, HttpResponse, RetryPolicy, Sleeper, Transport};

use super::types::{Account, BuildDefinition, GitRepository, Page, ServiceEndpoint, TeamProject};

pub const DEFAULT_SERVER_URL: &str = "https://dev.azure.com";

const PROFILE_URL: &str =
    "https://app.vssps.visualstudio.com/_apis/profile/profiles/me?api-version=5.0-preview.1";
const ACCOUNTS_URL: &str = "https://app.vssps.visualstudio.com/_apis/accounts";
const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

/// Azure DevOps REST client used for inventory discovery.
///
/// List endpoints are followed across `x-ms-continuationtoken` pages. A `Retry-After`
/// header on any response delays the next request by that many seconds.
pub struct AdoInventory<T, S> {
    transport: T,
    sleeper: S,
    server_url: Url,
    github_org: String,
    retry: RetryPolicy,
    throttle: Mutex<Option<Duration>>,
    log: Arc<dyn EventLog>,
}

impl<T: Transport, S: Sleeper> AdoInventory<T, S> {
    /// `github_org` is the migration target; it names the service connection to look for.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Config`] if `server_url` is not a valid base URL.
    pub fn new(
        transport: T,
        sleeper: S,
        server_url: &str,
        github_org: &str,
        log: Arc<dyn EventLog>,
    ) -> Result<Self> {
        let server_url = Url::parse(server_url.trim_end_matches('/'))
            .map_err(|e| MigrateError::Config(format!("Invalid Azure DevOps server URL: {e}")))?;
        if server_url.cannot_be_a_base() {
            return Err(MigrateError::Config(format!(
                "Invalid Azure DevOps server URL: {server_url}"
            )));
        }

        Ok(Self {
            transport,
            sleeper,
            server_url,
            github_org: github_org.to_owned(),
            retry: RetryPolicy::http(),
            throttle: Mutex::new(None),
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

    #[cfg(test)]
    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Public alias of the user owning the token.
    pub async fn user_id(&self) -> Result<String> {
        let url = parse_url(PROFILE_URL)?;
        let profile: Value = self.get(url).await?.json()?;

        profile
            .pointer("/coreAttributes/PublicAlias/value")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .map(str::to_owned)
            .ok_or(MigrateError::NoResponseData)
    }

    fn project_url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.server_url.clone();
        url.path_segments_mut()
            .map_err(|()| MigrateError::Config(format!("Invalid Azure DevOps server URL: {}", self.server_url)))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn get_paged<D: DeserializeOwned>(&self, url: Url) -> Result<Vec<D>> {
        let mut items = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut page_url = url.clone();
            if let Some(token) = &continuation {
                page_url
                    .query_pairs_mut()
                    .append_pair("continuationToken", token);
            }

            let response = self.get(page_url).await?;
            let page: Page<D> = response.json()?;
            items.extend(page.value);

            match response.header(CONTINUATION_HEADER) {
                Some(token) if !token.trim().is_empty() => continuation = Some(token.to_owned()),
                _ => return Ok(items),
            }
        }
    }

    async fn get(&self, url: Url) -> Result<HttpResponse> {
        self.wait_out_throttle().await;
        self.log.verbose(&format!("HTTP GET: {url}"));

        let request = HttpRequest::get(url);
        let response = self
            .retry
            .retry(
                || self.send_checked(&request),
                transient,
                &self.sleeper,
                self.log.as_ref(),
            )
            .await?;

        self.record_throttle(&response);
        Ok(response)
    }

    async fn send_checked(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.transport.send(request).await?.error_for_status()
    }

    async fn wait_out_throttle(&self) {
        let pending = self.throttle.lock().ok().and_then(|mut delay| delay.take());
        if let Some(delay) = pending {
            self.log.warning(&format!(
                "THROTTLING IN EFFECT. Waiting {} ms",
                delay.as_millis()
            ));
            self.sleeper.sleep(delay).await;
        }
    }

    fn record_throttle(&self, response: &HttpResponse) {
        let delay = response
            .header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        if let (Some(delay), Ok(mut pending)) = (delay, self.throttle.lock()) {
            *pending = Some(delay);
        }
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| MigrateError::Config(format!("Invalid URL {raw}: {e}")))
}

impl<T: Transport, S: Sleeper> InventoryProvider for AdoInventory<T, S> {
    async fn list_orgs(&self) -> Result<Vec<String>> {
        let user_id = self.user_id().await?;

        let mut url = parse_url(ACCOUNTS_URL)?;
        url.query_pairs_mut()
            .append_pair("memberId", &user_id)
            .append_pair("api-version", "5.0-preview.1");

        let accounts: Vec<Account> = self.get_paged(url).await?;
        Ok(accounts.into_iter().map(|a| a.account_name).collect())
    }

    async fn list_projects(&self, org: &str) -> Result<Vec<String>> {
        let url = self.project_url(&[org, "_apis", "projects"], &[("api-version", "6.1-preview")])?;
        let projects: Vec<TeamProject> = self.get_paged(url).await?;
        Ok(projects.into_iter().map(|p| p.name).collect())
    }

    async fn list_repos(&self, org: &str, project: &str) -> Result<Vec<Repository>> {
        let url = self.project_url(
            &[org, project, "_apis", "git", "repositories"],
            &[("api-version", "6.1-preview.1")],
        )?;
        let repos: Vec<GitRepository> = self.get_paged(url).await?;

        Ok(repos
            .into_iter()
            .filter(|repo| !repo.is_disabled)
            .map(|repo| Repository {
                name: repo.name,
                id: Some(repo.id),
                pipelines: Vec::new(),
            })
            .collect())
    }

    async fn list_pipelines(&self, org: &str, project: &str, repo: &Repository) -> Result<Vec<String>> {
        let repo_id = repo
            .id
            .as_deref()
            .ok_or_else(|| MigrateError::NotFound(format!("id of repository {}", repo.name)))?;

        let url = self.project_url(
            &[org, project, "_apis", "build", "definitions"],
            &[
                ("repositoryId", repo_id),
                ("repositoryType", "TfsGit"),
                ("queryOrder", "lastModifiedDescending"),
            ],
        )?;
        let definitions: Vec<BuildDefinition> = self.get_paged(url).await?;
        Ok(definitions.iter().map(BuildDefinition::pipeline_path).collect())
    }

    async fn service_connection(&self, org: &str, projects: &[String]) -> Result<Option<String>> {
        for project in projects {
            let url = self.project_url(
                &[org, project, "_apis", "serviceendpoint", "endpoints"],
                &[("api-version", "6.0-preview.4")],
            )?;
            let endpoints: Vec<ServiceEndpoint> = self.get_paged(url).await?;

            if let Some(endpoint) = endpoints
                .into_iter()
                .find(|e| e.links(&self.github_org, project))
            {
                return Ok(Some(endpoint.id));
            }
        }
        Ok(None)
    }
}
