use crate::plan::{Stage, Step, TargetOptions, WorkflowPlan};

use super::commands::{migration_id_ref, step_command, wait_command};
use super::templates::{EXEC_AND_GET_MIGRATION_ID_BLOCK, EXEC_BATCH_BLOCK, SUMMARY_BLOCK};
use super::ScriptWriter;

/// Queues every migration first, then waits on each one and runs its post-steps.
///
/// A unit that fails never stops the others; the closing summary exits non-zero when
/// any unit failed.
pub(super) fn render(plan: &WorkflowPlan) -> String {
    let mut script = ScriptWriter::default();
    script.header(plan, &[EXEC_AND_GET_MIGRATION_ID_BLOCK, EXEC_BATCH_BLOCK]);

    script.blank();
    script.line("$Succeeded = 0");
    script.line("$Failed = 0");
    script.line("$RepoMigrations = [ordered]@{}");

    for org in &plan.orgs {
        script.blank();
        script.line(format!(
            "# =========== Queueing migration for Organization: {} ===========",
            org.name
        ));
        for note in &org.notes {
            script.blank();
            script.line(format!("# {note}"));
        }

        for project in &org.projects {
            script.blank();
            script.line(format!(
                "# === Queueing repo migrations for Team Project: {}/{} ===",
                org.name, project.name
            ));

            if project.stages.is_empty() {
                script.line("# Skipping this Team Project because it has no git repos");
                continue;
            }

            for stage in &project.stages {
                submit(&mut script, stage, &plan.target);
            }
        }
    }

    for org in &plan.orgs {
        script.blank();
        script.line(format!(
            "# =========== Waiting for all migrations to finish for Organization: {} ===========",
            org.name
        ));

        for stage in org.stages() {
            complete(&mut script, stage, &plan.target);
        }
    }

    script.line(SUMMARY_BLOCK);
    script.blank();
    script.blank();

    script.finish()
}

/// A failed pre-step leaves the unit without a job id, so the completion pass counts
/// it as failed while every other unit still gets queued.
fn submit(script: &mut ScriptWriter, stage: &Stage, target: &TargetOptions) {
    let render = |step: &Step| {
        step_command(step, &stage.unit, target, true).render(&target.cli_command)
    };
    let pre_steps: Vec<String> = stage.pre_steps().map(render).collect();

    script.blank();
    let guarded = !pre_steps.is_empty();
    if guarded {
        render_batch(script, "", pre_steps);
        script.line("if ($Global:LastBatchFailures -eq 0) {");
    }
    let indent = if guarded { "    " } else { "" };

    if let Some(migrate) = stage.migrate_step() {
        script.line(format!(
            "{indent}$MigrationID = ExecAndGetMigrationID {{ {} }}",
            render(migrate)
        ));
        script.line(format!(
            "{indent}{} = $MigrationID",
            migration_id_ref(&stage.unit.key())
        ));
    }
    if guarded {
        script.line("}");
    }
}

fn render_batch(script: &mut ScriptWriter, indent: &str, commands: Vec<String>) {
    script.line(format!("{indent}ExecBatch @("));
    for command in commands {
        script.line(format!("{indent}    {{ {command} }}"));
    }
    script.line(format!("{indent})"));
}

fn complete(script: &mut ScriptWriter, stage: &Stage, target: &TargetOptions) {
    let unit = &stage.unit;
    let job = migration_id_ref(&unit.key());

    let on_success: Vec<String> = stage
        .post_steps()
        .map(|step| step_command(step, unit, target, true).render(&target.cli_command))
        .collect();
    let on_failure: Vec<String> = stage
        .post_steps()
        .filter(|step| step.runs_after_failure())
        .map(|step| step_command(step, unit, target, true).render(&target.cli_command))
        .collect();

    script.blank();
    script.line(format!(
        "# === Waiting for repo migration to finish for Team Project: {} and Repo: {}. Will then complete the below post migration steps. ===",
        unit.project, unit.repo
    ));
    script.line("$CanExecuteBatch = $false");
    script.line(format!("if ($null -ne {job}) {{"));
    script.line(format!("    {}", wait_command(unit, target).render(&target.cli_command)));
    script.line("    $CanExecuteBatch = ($lastexitcode -eq 0)");
    script.line("}");

    script.line("if ($CanExecuteBatch) {");
    if on_success.is_empty() {
        script.line("    $Succeeded++");
    } else {
        render_batch(script, "    ", on_success);
        script.line("    if ($Global:LastBatchFailures -eq 0) { $Succeeded++ } else { $Failed++ }");
    }
    script.line("} else {");
    if !on_failure.is_empty() {
        script.line(format!("    if ($null -ne {job}) {{"));
        render_batch(script, "        ", on_failure);
        script.line("    }");
    }
    script.line("    $Failed++");
    script.line("}");
}
