//! Turns a discovered inventory into an ordered, dependency-aware migration plan.

pub mod naming;
mod options;
mod planner;

use std::fmt;

pub use options::{
    ArchiveStorage, ArchiveTransfer, ExecutionMode, PlanOptions, StepOptions, TargetOptions, DEFAULT_CLI_COMMAND,
};
pub use planner::plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamRole {
    Maintain,
    Admin,
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        })
    }
}

/// Step categories, declared in the order they appear inside a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepTag {
    CreateTeams,
    ShareIntegration,
    LockSource,
    Migrate,
    DisableSource,
    GrantTeamRole,
    DownloadLogs,
    RewirePipeline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    CreateTeam {
        team: String,
        idp_group: Option<String>,
    },
    ShareServiceConnection {
        service_connection: String,
    },
    LockSource,
    Migrate,
    DisableSource,
    GrantTeamRole {
        team: String,
        role: TeamRole,
    },
    DownloadLogs,
    RewirePipeline {
        pipeline: String,
        service_connection: String,
    },
}

impl StepKind {
    pub fn tag(&self) -> StepTag {
        match self {
            Self::CreateTeam { .. } => StepTag::CreateTeams,
            Self::ShareServiceConnection { .. } => StepTag::ShareIntegration,
            Self::LockSource => StepTag::LockSource,
            Self::Migrate => StepTag::Migrate,
            Self::DisableSource => StepTag::DisableSource,
            Self::GrantTeamRole { .. } => StepTag::GrantTeamRole,
            Self::DownloadLogs => StepTag::DownloadLogs,
            Self::RewirePipeline { .. } => StepTag::RewirePipeline,
        }
    }
}

/// What has to be true before a step may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// An earlier step of the given kind has completed.
    After(StepTag),
    /// The unit's migration job finished successfully.
    JobSucceeded,
    /// The unit's migration job finished, successfully or not.
    JobTerminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub requires: Vec<Requirement>,
}

impl Step {
    pub fn tag(&self) -> StepTag {
        self.kind.tag()
    }

    /// Runs only once the unit's job has reached a terminal state.
    pub fn waits_for_job(&self) -> bool {
        self.requires
            .iter()
            .any(|r| matches!(r, Requirement::JobSucceeded | Requirement::JobTerminal))
    }

    /// Still worth running when the job ended in failure.
    pub fn runs_after_failure(&self) -> bool {
        self.requires.contains(&Requirement::JobTerminal)
            && !self.requires.contains(&Requirement::JobSucceeded)
    }
}

/// One repository's move from source to target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    pub org: String,
    pub project: String,
    pub repo: String,
    pub target_repo: String,
}

impl MigrationUnit {
    /// Key carrying the job id between the submit and wait passes.
    ///
    /// Built from the source identity: two units can share a target name, never a source.
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.org, self.project, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub unit: MigrationUnit,
    pub steps: Vec<Step>,
}

impl Stage {
    /// Steps that run before the migration is submitted.
    pub fn pre_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| !s.waits_for_job() && s.tag() != StepTag::Migrate)
    }

    pub fn migrate_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.tag() == StepTag::Migrate)
    }

    pub fn post_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.waits_for_job())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPlan {
    pub name: String,
    /// Empty when the project has no migratable repositories.
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgPlan {
    pub name: String,
    pub projects: Vec<ProjectPlan>,
    /// Informational remarks carried into the rendered script.
    pub notes: Vec<String>,
}

impl OrgPlan {
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.projects.iter().flat_map(|p| &p.stages)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPlan {
    pub orgs: Vec<OrgPlan>,
    pub mode: ExecutionMode,
    pub steps: StepOptions,
    pub target: TargetOptions,
}

impl WorkflowPlan {
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.orgs.iter().flat_map(OrgPlan::stages)
    }

    pub fn unit_count(&self) -> usize {
        self.stages().count()
    }

    pub fn is_empty(&self) -> bool {
        self.unit_count() == 0
    }
}
