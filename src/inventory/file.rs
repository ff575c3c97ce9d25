use std::path::Path;

use crate::error::{MigrateError, Result};

use super::{Inventory, InventoryProvider, Repository};

/// Inventory read from a JSON or YAML snapshot instead of a live source platform.
#[derive(Debug, Clone)]
pub struct FileInventory {
    inventory: Inventory,
}

impl FileInventory {
    pub fn new(inventory: Inventory) -> Self {
        Self { inventory }
    }

    /// Loads a snapshot; `.yaml`/`.yml` files are read as YAML, everything else as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let inventory = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        Ok(Self::new(inventory))
    }

    fn org(&self, org: &str) -> Result<&super::Organization> {
        self.inventory
            .orgs
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(org))
            .ok_or_else(|| MigrateError::NotFound(format!("organization {org}")))
    }

    fn project(&self, org: &str, project: &str) -> Result<&super::Project> {
        self.org(org)?
            .projects
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(project))
            .ok_or_else(|| MigrateError::NotFound(format!("project {org}/{project}")))
    }
}

impl InventoryProvider for FileInventory {
    async fn list_orgs(&self) -> Result<Vec<String>> {
        Ok(self.inventory.orgs.iter().map(|o| o.name.clone()).collect())
    }

    async fn list_projects(&self, org: &str) -> Result<Vec<String>> {
        Ok(self.org(org)?.projects.iter().map(|p| p.name.clone()).collect())
    }

    async fn list_repos(&self, org: &str, project: &str) -> Result<Vec<Repository>> {
        Ok(self
            .project(org, project)?
            .repos
            .iter()
            .map(|repo| Repository {
                pipelines: Vec::new(),
                ..repo.clone()
            })
            .collect())
    }

    async fn list_pipelines(&self, org: &str, project: &str, repo: &Repository) -> Result<Vec<String>> {
        Ok(self
            .project(org, project)?
            .repos
            .iter()
            .find(|r| r.name == repo.name)
            .map(|r| r.pipelines.clone())
            .unwrap_or_default())
    }

    async fn service_connection(&self, org: &str, _projects: &[String]) -> Result<Option<String>> {
        Ok(self.org(org)?.service_connection.clone())
    }
}
