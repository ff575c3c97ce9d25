//! One entry point per command, composing discovery, planning, polling and downloads.

mod download_logs;
mod generate_script;
mod wait_for_migration;

pub use download_logs::{download_logs, DownloadLogsArgs};
pub use generate_script::{generate_script, GenerateScriptArgs};
pub use wait_for_migration::wait_for_migration;
