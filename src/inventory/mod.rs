//! Discovered source-side inventory: organizations, projects, repositories, pipelines.

mod file;

use std::future::Future;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::logging::EventLog;

pub use file::FileInventory;

/// Immutable discovery result handed to the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub orgs: Vec<Organization>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Organization {
    pub name: String,
    /// Id of the service connection linking this organization to the target platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_connection: Option<String>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl Organization {
    pub fn has_integration(&self) -> bool {
        self.service_connection
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub repos: Vec<Repository>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Repository {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Pipeline paths, e.g. `\build\ci`.
    #[serde(default)]
    pub pipelines: Vec<String>,
}

impl Inventory {
    pub fn repo_count(&self) -> usize {
        self.orgs
            .iter()
            .flat_map(|org| &org.projects)
            .map(|project| project.repos.len())
            .sum()
    }
}

/// Read-only access to a source platform's inventory.
pub trait InventoryProvider {
    fn list_orgs(&self) -> impl Future<Output = Result<Vec<String>>>;

    fn list_projects(&self, org: &str) -> impl Future<Output = Result<Vec<String>>>;

    /// Migratable repositories only; pipelines are filled in separately.
    fn list_repos(&self, org: &str, project: &str) -> impl Future<Output = Result<Vec<Repository>>>;

    fn list_pipelines(
        &self,
        org: &str,
        project: &str,
        repo: &Repository,
    ) -> impl Future<Output = Result<Vec<String>>>;

    /// Service connection usable for pipeline rewiring, searched across `projects`.
    fn service_connection(
        &self,
        org: &str,
        projects: &[String],
    ) -> impl Future<Output = Result<Option<String>>>;
}

/// Narrows discovery to one organization and/or one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryFilter {
    pub org: Option<String>,
    pub project: Option<String>,
    pub include_pipelines: bool,
    pub include_integration: bool,
}

/// Walks a provider into an [`Inventory`], keeping discovery order.
///
/// The integration lookup always searches every project of the organization, even when
/// `filter.project` narrows what gets migrated.
pub async fn collect_inventory<P: InventoryProvider>(
    provider: &P,
    filter: &InventoryFilter,
    log: &dyn EventLog,
) -> Result<Inventory> {
    let org_names = match &filter.org {
        Some(org) => vec![org.clone()],
        None => provider.list_orgs().await?,
    };

    let mut orgs = Vec::with_capacity(org_names.len());
    for org in org_names {
        let all_projects = provider.list_projects(&org).await?;

        let service_connection = if filter.include_integration {
            provider.service_connection(&org, &all_projects).await?
        } else {
            None
        };

        let selected: Vec<&String> = all_projects
            .iter()
            .filter(|p| {
                filter
                    .project
                    .as_deref()
                    .map_or(true, |wanted| p.eq_ignore_ascii_case(wanted))
            })
            .collect();

        let mut projects = Vec::with_capacity(selected.len());
        for project in selected {
            let repos = provider.list_repos(&org, project).await?;
            let repos = if filter.include_pipelines {
                try_join_all(repos.into_iter().map(|repo| async {
                    let pipelines = provider.list_pipelines(&org, project, &repo).await?;
                    Ok::<_, crate::error::MigrateError>(Repository { pipelines, ..repo })
                }))
                .await?
            } else {
                repos
            };

            log.verbose(&format!(
                "Found {} repos in {org}/{project}",
                repos.len()
            ));
            projects.push(Project {
                name: project.clone(),
                repos,
            });
        }

        orgs.push(Organization {
            name: org,
            service_connection,
            projects,
        });
    }

    let inventory = Inventory { orgs };
    log.info(&format!(
        "Found {} orgs and {} repos",
        inventory.orgs.len(),
        inventory.repo_count()
    ));
    Ok(inventory)
}
