mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::PhaseProgress;
pub use styling::{attention, failure, success};
pub use summary::print_plan_summary;

use styling::{brand, muted};

/// Prints the repoferry banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        brand("⛴ repoferry"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("Repository migration orchestrator")
    );
}
