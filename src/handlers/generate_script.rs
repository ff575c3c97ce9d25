use std::path::PathBuf;

use crate::error::Result;
use crate::inventory::{collect_inventory, InventoryFilter, InventoryProvider};
use crate::logging::EventLog;
use crate::output::PhaseProgress;
use crate::plan::{plan, PlanOptions, WorkflowPlan};
use crate::script::emit;

#[derive(Debug, Clone)]
pub struct GenerateScriptArgs {
    /// Only `org` and `project` are read; what else to discover follows from the steps.
    pub filter: InventoryFilter,
    pub options: PlanOptions,
    pub output: PathBuf,
}

/// Discovers the source inventory, plans it and writes the rendered script to
/// `args.output`.
///
/// Options are validated before any remote call. The output file is only written once
/// a complete script exists, so a failed run never leaves a partial script behind.
///
/// # Errors
///
/// Returns invalid options, discovery failures, [`crate::error::MigrateError::NoMigratableRepos`]
/// or the write failure.
pub async fn generate_script<P: InventoryProvider>(
    provider: &P,
    args: &GenerateScriptArgs,
    log: &dyn EventLog,
) -> Result<WorkflowPlan> {
    args.options.target.validate()?;

    let steps = args.options.steps.normalized();
    let filter = InventoryFilter {
        include_pipelines: steps.rewire_pipelines,
        include_integration: steps.rewire_pipelines,
        ..args.filter.clone()
    };

    log.info("Generating Script...");
    let progress = PhaseProgress::start_discovery();

    let inventory = match collect_inventory(provider, &filter, log).await {
        Ok(inventory) => inventory,
        Err(err) => {
            progress.abandon();
            return Err(err);
        }
    };
    let progress = progress.finish_discovery_start_planning(inventory.repo_count());

    let workflow = match plan(&inventory, &args.options, log) {
        Ok(workflow) => workflow,
        Err(err) => {
            progress.abandon();
            return Err(err);
        }
    };
    let progress = progress.finish_planning_start_rendering(workflow.unit_count());

    let script = emit(&workflow);
    if let Err(err) = tokio::fs::write(&args.output, script).await {
        progress.abandon();
        return Err(err.into());
    }
    progress.finish_rendering();

    log.success(&format!(
        "Script generated and written to {}",
        args.output.display()
    ));
    Ok(workflow)
}
