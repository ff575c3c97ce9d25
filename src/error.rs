use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("GraphQL query {query_type} failed: {errors}")]
    GraphQLError { query_type: String, errors: String },

    #[error("Response contained no data")]
    NoResponseData,

    #[error("Unauthorized. Please check your token and try again")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Invalid migration id: {0}")]
    InvalidMigrationId(String),

    #[error("Migration {id} failed: {reason}")]
    MigrationFailed { id: String, reason: String },

    #[error("Migration {id} did not reach a terminal state within {waited_secs} seconds")]
    WaitTimedOut { id: String, waited_secs: u64 },

    #[error("A migration script could not be generated because no migratable repos were found")]
    NoMigratableRepos,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    /// Whether a failed call is worth repeating.
    ///
    /// Connection problems, timeouts, throttling and server-side errors are transient.
    /// Client errors (bad input, auth, validation) are not: repeating them gives the same answer.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ApiError { status, .. } => is_retryable_status(*status),
            Self::Network(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::NoResponseData => true,
            _ => false,
        }
    }
}

/// HTTP statuses that signal a temporary condition on the remote side.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        for status in [500, 502, 503, 504, 408, 429] {
            let err = MigrateError::ApiError {
                status,
                message: String::new(),
            };
            assert!(err.is_transient(), "status {status} should be transient");
        }
    }

    #[test]
    fn test_client_errors_are_fatal() {
        for status in [400, 401, 403, 404, 422] {
            let err = MigrateError::ApiError {
                status,
                message: String::new(),
            };
            assert!(!err.is_transient(), "status {status} should be fatal");
        }
        assert!(!MigrateError::Unauthorized.is_transient());
        assert!(!MigrateError::InvalidMigrationId("XX_1".into()).is_transient());
        assert!(!MigrateError::MigrationFailed {
            id: "RM_1".into(),
            reason: "boom".into()
        }
        .is_transient());
    }
}
