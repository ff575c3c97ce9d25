use std::fmt::Write;
use std::path::Path;

use crate::plan::{ExecutionMode, OrgPlan, StepKind, StepOptions, StepTag, WorkflowPlan};

use super::styling::{attention, heading, highlight, muted};
use super::tables::{count_cell, create_table, cyan_header, integration_cell};

/// Prints what a generated script will do, to stderr.
///
/// The overview lists the target, execution mode and enabled steps; the table gives
/// one row per source organization.
pub fn print_plan_summary(plan: &WorkflowPlan, script: &Path) {
    eprintln!("{}", render_plan_summary(plan, script));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", heading(emoji), heading(title).underlined());
}

fn enabled_steps(steps: &StepOptions) -> String {
    let names: Vec<&str> = [
        (steps.create_teams, "create teams"),
        (steps.link_idp_groups, "link IdP groups"),
        (steps.lock_source, "lock source"),
        (steps.disable_source, "disable source"),
        (steps.rewire_pipelines, "rewire pipelines"),
        (steps.download_logs, "download logs"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();

    if names.is_empty() {
        "migrate only".to_string()
    } else {
        names.join(", ")
    }
}

fn org_service_connection(org: &OrgPlan) -> Option<&str> {
    org.stages()
        .flat_map(|stage| &stage.steps)
        .find_map(|step| match &step.kind {
            StepKind::ShareServiceConnection { service_connection } => {
                Some(service_connection.as_str())
            }
            _ => None,
        })
}

fn count_steps(org: &OrgPlan, tag: StepTag) -> usize {
    org.stages()
        .flat_map(|stage| &stage.steps)
        .filter(|step| step.tag() == tag)
        .count()
}

fn render_plan_summary(plan: &WorkflowPlan, script: &Path) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📦", "Migration Plan");
    let mode = match plan.mode {
        ExecutionMode::Sequential => "sequential",
        ExecutionMode::Parallel => "parallel",
    };
    let _ = write!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        muted("Target org:"),
        highlight(&plan.target.github_org),
        muted("Mode:"),
        attention(mode),
        muted("Repositories:"),
        attention(plan.unit_count()),
        muted("Steps:"),
        enabled_steps(&plan.steps),
        muted("Script:"),
        highlight(script.display()),
    );

    let mut table = create_table();
    let mut header = vec!["Organization", "Projects", "Repositories"];
    if plan.steps.rewire_pipelines {
        header.extend(["Service connection", "Pipelines"]);
    }
    table.set_header(cyan_header(&header));

    for org in &plan.orgs {
        let mut row = vec![
            comfy_table::Cell::new(&org.name),
            count_cell(org.projects.len()),
            count_cell(count_steps(org, StepTag::Migrate)),
        ];
        if plan.steps.rewire_pipelines {
            row.push(integration_cell(org_service_connection(org)));
            row.push(count_cell(count_steps(org, StepTag::RewirePipeline)));
        }
        table.add_row(row);
    }
    let _ = writeln!(output, "{table}");

    for note in plan.orgs.iter().flat_map(|org| &org.notes) {
        let _ = writeln!(output, "  {}", attention(note));
    }

    output
}
