use serde::Deserialize;

/// Collection envelope used by every list endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Account {
    pub account_name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct TeamProject {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GitRepository {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_disabled: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct BuildDefinition {
    #[serde(default)]
    pub path: Option<String>,
    pub name: String,
}

impl BuildDefinition {
    /// `\path\name`, with the root folder collapsed so top-level pipelines read `\name`.
    pub fn pipeline_path(&self) -> String {
        let folder = match self.path.as_deref() {
            Some("\\") | None => "",
            Some(path) => path,
        };
        format!("{folder}\\{}", self.name)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ServiceEndpoint {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

impl ServiceEndpoint {
    /// A GitHub connection named after the target org, or a GitHub App connection
    /// named after the project it lives in.
    pub fn links(&self, github_org: &str, project: &str) -> bool {
        (self.kind.eq_ignore_ascii_case("GitHub") && self.name.eq_ignore_ascii_case(github_org))
            || (self.kind.eq_ignore_ascii_case("GitHubProximaPipelines")
                && self.name.eq_ignore_ascii_case(project))
    }
}
