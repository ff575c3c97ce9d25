//! Renders a [`WorkflowPlan`] into a self-contained PowerShell script.

mod commands;
mod parallel;
mod sequential;
mod templates;

use crate::plan::{ExecutionMode, WorkflowPlan};

/// Renders `plan` in the control-flow shape chosen by its execution mode.
///
/// Output depends only on the plan, so identical plans give identical scripts.
pub fn emit(plan: &WorkflowPlan) -> String {
    match plan.mode {
        ExecutionMode::Sequential => sequential::render(plan),
        ExecutionMode::Parallel => parallel::render(plan),
    }
}

/// Line-oriented script builder.
#[derive(Debug, Default)]
struct ScriptWriter {
    content: String,
}

impl ScriptWriter {
    /// Appends `text` followed by a newline; blank text is dropped.
    fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.trim().is_empty() {
            return;
        }
        self.content.push_str(text);
        self.content.push('\n');
    }

    fn blank(&mut self) {
        self.content.push('\n');
    }

    fn header(&mut self, plan: &WorkflowPlan, helpers: &[&str]) {
        self.line(templates::PWSH_SHEBANG);
        self.blank();
        self.line(templates::version_banner());
        for block in helpers {
            self.line(block);
        }
        for block in templates::preconditions(&plan.target) {
            self.line(block);
        }
    }

    fn finish(self) -> String {
        self.content
    }
}

fn exec(command: &str) -> String {
    format!("Exec {{ {command} }}")
}
