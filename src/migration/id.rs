use std::fmt;
use std::str::FromStr;

use crate::error::MigrateError;

const REPO_MIGRATION_ID_PREFIX: &str = "RM_";
const ORG_MIGRATION_ID_PREFIX: &str = "OM_";

/// Platform handle of a submitted migration, classified by its prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MigrationId {
    Repository(String),
    Organization(String),
}

impl MigrationId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Repository(id) | Self::Organization(id) => id,
        }
    }
}

impl FromStr for MigrationId {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        if id.len() > REPO_MIGRATION_ID_PREFIX.len() && id.starts_with(REPO_MIGRATION_ID_PREFIX) {
            Ok(Self::Repository(id.to_owned()))
        } else if id.len() > ORG_MIGRATION_ID_PREFIX.len() && id.starts_with(ORG_MIGRATION_ID_PREFIX) {
            Ok(Self::Organization(id.to_owned()))
        } else {
            Err(MigrateError::InvalidMigrationId(s.to_owned()))
        }
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
