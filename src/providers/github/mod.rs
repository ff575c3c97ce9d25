mod client;
mod types;


pub use client::{GithubApi, DEFAULT_API_URL};
pub use types::RepoMigration;
