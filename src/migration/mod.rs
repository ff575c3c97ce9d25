//! Typed migration job states and the polling loop that waits on them.

mod id;
mod state;
mod wait;

pub use id::MigrationId;
pub use state::{JobSnapshot, MigrationState, OrgMigrationState, RepoMigrationState, RepoProgress};
pub use wait::{wait_for_terminal, TerminalOutcome, WaitOptions, DEFAULT_POLL_INTERVAL};
