use std::sync::RwLock;

use crate::output::{attention, failure, success};

/// Sink for the notable events of planning, polling and retrying.
///
/// Components take a `&dyn EventLog` instead of reaching for a global logger so
/// callers decide where lines go and tests can count them.
pub trait EventLog: Send + Sync {
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn verbose(&self, message: &str);
}

/// Forwards events to the `log` facade, redacting registered secrets.
pub struct ConsoleLog {
    verbose: bool,
    secrets: RwLock<Vec<String>>,
}

impl ConsoleLog {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            secrets: RwLock::new(Vec::new()),
        }
    }

    /// Any later line containing `secret` has it replaced with `***`.
    pub fn register_secret(&self, secret: &str) {
        if secret.trim().is_empty() {
            return;
        }
        if let Ok(mut secrets) = self.secrets.write() {
            secrets.push(secret.to_owned());
        }
    }

    fn mask(&self, message: &str) -> String {
        let Ok(secrets) = self.secrets.read() else {
            return message.to_owned();
        };
        secrets
            .iter()
            .fold(message.to_owned(), |line, secret| line.replace(secret, "***"))
    }
}

impl EventLog for ConsoleLog {
    fn info(&self, message: &str) {
        log::info!("{}", self.mask(message));
    }

    fn warning(&self, message: &str) {
        log::warn!("{}", attention(self.mask(message)));
    }

    fn success(&self, message: &str) {
        log::info!("{}", success(self.mask(message)));
    }

    fn error(&self, message: &str) {
        log::error!("{}", failure(self.mask(message)));
    }

    fn verbose(&self, message: &str) {
        if self.verbose {
            log::debug!("{}", self.mask(message));
        }
    }
}
