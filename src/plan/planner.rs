use crate::error::{MigrateError, Result};
use crate::inventory::{Inventory, Organization, Project, Repository};
use crate::logging::EventLog;

use super::naming::{admins_team, duplicates, maintainers_team, target_repo_name};
use super::{
    MigrationUnit, OrgPlan, PlanOptions, ProjectPlan, Requirement, Stage, Step, StepKind,
    StepOptions, StepTag, TeamRole, WorkflowPlan,
};

const NO_INTEGRATION_NOTE: &str =
    "No GitHub App in this org, skipping the re-wiring of Azure Pipelines to GitHub repos";

/// Builds the workflow plan for every repository in `inventory`.
///
/// Empty projects are kept without stages and reported as warnings. Target names that
/// collide are reported once each and all colliding repositories are still planned.
///
/// # Errors
///
/// Returns [`MigrateError::InvalidOptions`] for inconsistent target options and
/// [`MigrateError::NoMigratableRepos`] when nothing at all can be migrated.
pub fn plan(inventory: &Inventory, options: &PlanOptions, log: &dyn EventLog) -> Result<WorkflowPlan> {
    options.target.validate()?;
    let steps = options.steps.normalized();

    let orgs: Vec<OrgPlan> = inventory
        .orgs
        .iter()
        .map(|org| plan_org(org, &steps, log))
        .collect();

    let plan = WorkflowPlan {
        orgs,
        mode: options.mode,
        steps,
        target: options.target.clone(),
    };

    for name in duplicates(plan.stages().map(|s| s.unit.target_repo.as_str())) {
        log.warning(&format!("DUPLICATE REPO NAME: {name}"));
    }

    if plan.is_empty() {
        log.error(
            "A migration script could not be generated because no migratable repos were found. \
             Please note that disabled and TFVC repos are not migrated.",
        );
        return Err(MigrateError::NoMigratableRepos);
    }

    log.verbose(&format!(
        "Planned {} repo migrations across {} orgs",
        plan.unit_count(),
        plan.orgs.len()
    ));
    Ok(plan)
}

fn plan_org(org: &Organization, steps: &StepOptions, log: &dyn EventLog) -> OrgPlan {
    let mut notes = Vec::new();

    let integration = if steps.rewire_pipelines {
        let found = org
            .service_connection
            .as_deref()
            .filter(|_| org.has_integration());
        if found.is_none() {
            log.info(&format!(
                "No GitHub App service connection found in ADO organization {}; pipelines will not be rewired",
                org.name
            ));
            notes.push(NO_INTEGRATION_NOTE.to_string());
        }
        found
    } else {
        None
    };

    let projects = org
        .projects
        .iter()
        .map(|project| {
            if project.repos.is_empty() {
                log.warning(&format!(
                    "Skipping team project {}/{} because it has no git repos",
                    org.name, project.name
                ));
            }
            ProjectPlan {
                name: project.name.clone(),
                stages: project
                    .repos
                    .iter()
                    .enumerate()
                    .map(|(i, repo)| plan_stage(&org.name, project, repo, i == 0, steps, integration))
                    .collect(),
            }
        })
        .collect();

    OrgPlan {
        name: org.name.clone(),
        projects,
        notes,
    }
}

fn plan_stage(
    org: &str,
    project: &Project,
    repo: &Repository,
    first_in_project: bool,
    options: &StepOptions,
    integration: Option<&str>,
) -> Stage {
    let teams = [
        (maintainers_team(&project.name), TeamRole::Maintain),
        (admins_team(&project.name), TeamRole::Admin),
    ];
    let mut steps = Vec::new();

    // Project-scoped setup rides along with the project's first repository.
    if first_in_project {
        if options.create_teams {
            for (team, _) in &teams {
                steps.push(Step {
                    kind: StepKind::CreateTeam {
                        team: team.clone(),
                        idp_group: options.link_idp_groups.then(|| team.clone()),
                    },
                    requires: vec![],
                });
            }
        }
        if let Some(id) = integration {
            steps.push(Step {
                kind: StepKind::ShareServiceConnection {
                    service_connection: id.to_string(),
                },
                requires: vec![],
            });
        }
    }

    if options.lock_source {
        steps.push(Step {
            kind: StepKind::LockSource,
            requires: vec![],
        });
    }

    steps.push(Step {
        kind: StepKind::Migrate,
        requires: if options.lock_source {
            vec![Requirement::After(StepTag::LockSource)]
        } else {
            vec![]
        },
    });

    if options.disable_source {
        steps.push(Step {
            kind: StepKind::DisableSource,
            requires: vec![Requirement::JobSucceeded],
        });
    }

    if options.create_teams {
        for (team, role) in teams {
            steps.push(Step {
                kind: StepKind::GrantTeamRole { team, role },
                requires: vec![Requirement::After(StepTag::CreateTeams), Requirement::JobSucceeded],
            });
        }
    }

    if options.download_logs {
        steps.push(Step {
            kind: StepKind::DownloadLogs,
            requires: vec![Requirement::JobTerminal],
        });
    }

    if let Some(id) = integration {
        for pipeline in &repo.pipelines {
            steps.push(Step {
                kind: StepKind::RewirePipeline {
                    pipeline: pipeline.clone(),
                    service_connection: id.to_string(),
                },
                requires: vec![
                    Requirement::After(StepTag::ShareIntegration),
                    Requirement::JobSucceeded,
                ],
            });
        }
    }

    Stage {
        unit: MigrationUnit {
            org: org.to_string(),
            project: project.name.clone(),
            repo: repo.name.clone(),
            target_repo: target_repo_name(&project.name, &repo.name),
        },
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::testing::{Level, RecordingLog};
    use crate::plan::{ExecutionMode, TargetOptions};

    fn repo(name: &str, pipelines: &[&str]) -> Repository {
        Repository {
            name: name.into(),
            id: None,
            pipelines: pipelines.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn project(name: &str, repos: Vec<Repository>) -> Project {
        Project {
            name: name.into(),
            repos,
        }
    }

    fn inventory(service_connection: Option<&str>, projects: Vec<Project>) -> Inventory {
        Inventory {
            orgs: vec![Organization {
                name: "contoso".into(),
                service_connection: service_connection.map(str::to_owned),
                projects,
            }],
        }
    }

    fn options(steps: StepOptions) -> PlanOptions {
        PlanOptions {
            steps,
            target: TargetOptions::new("contoso-gh"),
            mode: ExecutionMode::Parallel,
        }
    }

    #[test]
    fn test_target_name_is_sanitized() {
        let inv = inventory(None, vec![project("Parts Unlimited", vec![repo("Some Repo", &[])])]);
        let plan = plan(&inv, &options(StepOptions::default()), &RecordingLog::default()).unwrap();

        let stage = plan.stages().next().unwrap();
        assert_eq!(stage.unit.target_repo, "Parts-Unlimited-Some-Repo");
        assert_eq!(stage.unit.key(), "contoso/Parts Unlimited/Some Repo");
        let tags: Vec<_> = stage.steps.iter().map(Step::tag).collect();
        assert_eq!(tags, [StepTag::Migrate]);
    }

    #[test]
    fn test_steps_follow_fixed_precedence() {
        let inv = inventory(
            Some("sc-1"),
            vec![project("p", vec![repo("a", &["\\ci", "\\release"]), repo("b", &[])])],
        );
        let plan = plan(&inv, &options(StepOptions::all()), &RecordingLog::default()).unwrap();
        let stages: Vec<_> = plan.stages().collect();

        let first: Vec<_> = stages[0].steps.iter().map(Step::tag).collect();
        assert_eq!(
            first,
            [
                StepTag::CreateTeams,
                StepTag::CreateTeams,
                StepTag::ShareIntegration,
                StepTag::LockSource,
                StepTag::Migrate,
                StepTag::DisableSource,
                StepTag::GrantTeamRole,
                StepTag::GrantTeamRole,
                StepTag::DownloadLogs,
                StepTag::RewirePipeline,
                StepTag::RewirePipeline,
            ]
        );
        assert!(first.windows(2).all(|w| w[0] <= w[1]));

        // Project setup only happens once per project.
        let second: Vec<_> = stages[1].steps.iter().map(Step::tag).collect();
        assert!(!second.contains(&StepTag::CreateTeams));
        assert!(!second.contains(&StepTag::ShareIntegration));
        assert!(second.contains(&StepTag::GrantTeamRole));
    }

    #[test]
    fn test_dependencies_are_wired() {
        let inv = inventory(Some("sc-1"), vec![project("p", vec![repo("a", &["\\ci"])])]);
        let plan = plan(&inv, &options(StepOptions::all()), &RecordingLog::default()).unwrap();
        let stage = plan.stages().next().unwrap();
        let requires = |tag| {
            stage
                .steps
                .iter()
                .find(|s| s.tag() == tag)
                .map(|s| s.requires.clone())
                .unwrap()
        };

        assert!(requires(StepTag::CreateTeams).is_empty());
        assert!(requires(StepTag::ShareIntegration).is_empty());
        assert!(requires(StepTag::LockSource).is_empty());
        assert_eq!(requires(StepTag::Migrate), [Requirement::After(StepTag::LockSource)]);
        assert_eq!(requires(StepTag::DisableSource), [Requirement::JobSucceeded]);
        assert_eq!(
            requires(StepTag::GrantTeamRole),
            [Requirement::After(StepTag::CreateTeams), Requirement::JobSucceeded]
        );
        assert_eq!(requires(StepTag::DownloadLogs), [Requirement::JobTerminal]);
        assert_eq!(
            requires(StepTag::RewirePipeline),
            [Requirement::After(StepTag::ShareIntegration), Requirement::JobSucceeded]
        );

        assert_eq!(stage.pre_steps().count(), 4);
        assert_eq!(stage.post_steps().count(), 5);
    }

    #[test]
    fn test_idp_groups_imply_teams() {
        let inv = inventory(None, vec![project("p", vec![repo("a", &[])])]);
        let steps = StepOptions {
            link_idp_groups: true,
            ..Default::default()
        };
        let plan = plan(&inv, &options(steps), &RecordingLog::default()).unwrap();

        assert!(plan.steps.create_teams);
        let stage = plan.stages().next().unwrap();
        assert_eq!(
            stage.steps[0].kind,
            StepKind::CreateTeam {
                team: "p-Maintainers".into(),
                idp_group: Some("p-Maintainers".into()),
            }
        );
    }

    #[test]
    fn test_missing_integration_skips_rewire_with_note() {
        let inv = inventory(None, vec![project("p", vec![repo("a", &["\\ci"])])]);
        let steps = StepOptions {
            rewire_pipelines: true,
            ..Default::default()
        };
        let log = RecordingLog::default();
        let plan = plan(&inv, &options(steps), &log).unwrap();

        assert_eq!(plan.orgs[0].notes.len(), 1);
        assert_eq!(plan.unit_count(), 1);
        assert!(plan
            .stages()
            .flat_map(|s| &s.steps)
            .all(|s| !matches!(s.tag(), StepTag::RewirePipeline | StepTag::ShareIntegration)));
        assert_eq!(log.count(Level::Info), 1);
        assert_eq!(log.count(Level::Error), 0);
    }

    #[test]
    fn test_empty_project_warns_and_plans_nothing() {
        let inv = inventory(
            None,
            vec![project("empty", vec![]), project("p", vec![repo("a", &[])])],
        );
        let log = RecordingLog::default();
        let plan = plan(&inv, &options(StepOptions::all()), &log).unwrap();

        assert!(plan.orgs[0].projects[0].stages.is_empty());
        assert_eq!(plan.unit_count(), 1);
        assert_eq!(log.count(Level::Warning), 1);
    }

    #[test]
    fn test_all_empty_org_is_an_error() {
        let inv = inventory(None, vec![project("x", vec![]), project("y", vec![])]);
        let log = RecordingLog::default();
        let result = plan(&inv, &options(StepOptions::default()), &log);

        assert!(matches!(result, Err(MigrateError::NoMigratableRepos)));
        assert_eq!(log.count(Level::Warning), 2);
        assert_eq!(log.count(Level::Error), 1);
    }

    #[test]
    fn test_duplicates_are_planned_and_warned_once() {
        let inv = inventory(
            None,
            vec![
                project("Parts Unlimited", vec![repo("Some Repo", &[])]),
                project("Parts-Unlimited", vec![repo("Some-Repo", &[])]),
                project("Parts/Unlimited", vec![repo("Some Repo", &[])]),
            ],
        );
        let log = RecordingLog::default();
        let plan = plan(&inv, &options(StepOptions::default()), &log).unwrap();

        assert_eq!(plan.unit_count(), 3);
        assert_eq!(
            log.messages(Level::Warning),
            ["DUPLICATE REPO NAME: Parts-Unlimited-Some-Repo"]
        );
    }

    #[test]
    fn test_plan_is_deterministic() {
        let inv = inventory(
            Some("sc"),
            vec![
                project("b", vec![repo("z", &["\\p2", "\\p1"]), repo("a", &[])]),
                project("a", vec![repo("m", &[])]),
            ],
        );
        let first = plan(&inv, &options(StepOptions::all()), &RecordingLog::default()).unwrap();
        let second = plan(&inv, &options(StepOptions::all()), &RecordingLog::default()).unwrap();
        assert_eq!(first, second);

        let order: Vec<_> = first.stages().map(|s| s.unit.target_repo.as_str()).collect();
        assert_eq!(order, ["b-z", "b-a", "a-m"]);
    }

    #[test]
    fn test_invalid_target_rejected_before_planning() {
        let inv = inventory(None, vec![project("p", vec![repo("a", &[])])]);
        let mut opts = options(StepOptions::default());
        opts.target.github_org = String::new();
        let log = RecordingLog::default();

        assert!(matches!(plan(&inv, &opts, &log), Err(MigrateError::InvalidOptions(_))));
        assert_eq!(log.count(Level::Warning) + log.count(Level::Error), 0);
    }
}
