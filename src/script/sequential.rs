use crate::plan::WorkflowPlan;

use super::commands::step_command;
use super::templates::EXEC_BLOCK;
use super::{exec, ScriptWriter};

/// Every step blocks and the first non-zero exit code ends the script.
pub(super) fn render(plan: &WorkflowPlan) -> String {
    let mut script = ScriptWriter::default();
    script.header(plan, &[EXEC_BLOCK]);

    for org in &plan.orgs {
        script.line(format!("# =========== Organization: {} ===========", org.name));
        for note in &org.notes {
            script.line(format!("# {note}"));
        }

        for project in &org.projects {
            script.blank();
            script.line(format!("# === Team Project: {}/{} ===", org.name, project.name));

            if project.stages.is_empty() {
                script.line("# Skipping this Team Project because it has no git repos");
                continue;
            }

            for stage in &project.stages {
                script.blank();
                for step in &stage.steps {
                    let command = step_command(step, &stage.unit, &plan.target, false);
                    script.line(exec(&command.render(&plan.target.cli_command)));
                }
            }
        }

        script.blank();
        script.blank();
    }

    script.finish()
}

#[cfg(test)]
mod tests {
    use crate::plan::{ExecutionMode, StepOptions};
    use crate::script::emit;
    use crate::script::tests::sample_plan;

    #[test]
    fn test_every_step_is_fail_fast() {
        let script = emit(&sample_plan(ExecutionMode::Sequential, StepOptions::all()));

        let step_lines: Vec<_> = script.lines().filter(|l| l.contains("gh ado2gh ")).collect();
        assert!(step_lines.iter().all(|l| l.starts_with("Exec { ")));
        assert!(!script.contains("--queue-only"));
        assert!(!script.contains("ExecBatch"));
        assert!(!script.contains("wait-for-migration"));
    }

    #[test]
    fn test_layout() {
        let script = emit(&sample_plan(ExecutionMode::Sequential, StepOptions::default()));

        assert!(script.contains("# === Team Project: contoso/Empty ===\n# Skipping this Team Project because it has no git repos\n"));
        let migrations: Vec<_> = script.lines().filter(|l| l.contains("migrate-repo")).collect();
        assert_eq!(migrations.len(), 3);
        assert!(migrations[0].contains("--github-repo \"Parts-Unlimited-Some-Repo\""));
        assert!(migrations[2].contains("--github-repo \"ops-infra\""));
    }

    #[test]
    fn test_org_without_integration_gets_note() {
        let script = emit(&sample_plan(ExecutionMode::Sequential, StepOptions::all()));

        let fabrikam = script.find("Organization: fabrikam").unwrap();
        assert!(script[fabrikam..].contains("# No GitHub App in this org"));
        assert!(!script[fabrikam..].contains("rewire-pipeline"));
        assert!(script[..fabrikam].contains("rewire-pipeline"));
        assert_eq!(script.matches("create-team").count(), 4);
    }
}
