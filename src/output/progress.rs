use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{attention, heading, success};

/// Spinner for the discovery, planning and rendering phases of `generate-script`.
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_discovery() -> Self {
        eprintln!("{}  {}", heading("⚙️"), heading("Phases").underlined());
        let pb = create_spinner(attention("Phase 1/3: Discovering repositories").to_string());
        Self { pb }
    }

    pub fn finish_discovery_start_planning(self, repos: usize) -> Self {
        self.pb.finish_with_message(
            success(format!("Phase 1/3: Discovered {repos} repositories ✓")).to_string(),
        );
        let pb = create_spinner(attention("Phase 2/3: Planning migrations").to_string());
        Self { pb }
    }

    pub fn finish_planning_start_rendering(self, units: usize) -> Self {
        self.pb.finish_with_message(
            success(format!("Phase 2/3: Planned {units} migrations ✓")).to_string(),
        );
        let pb = create_spinner(attention("Phase 3/3: Writing script").to_string());
        Self { pb }
    }

    pub fn finish_rendering(self) {
        self.pb
            .finish_with_message(success("Phase 3/3: Script written ✓").to_string());
        eprintln!();
    }

    /// Stops the spinner without a completion mark, leaving the error output readable.
    pub fn abandon(self) {
        self.pb.abandon();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
