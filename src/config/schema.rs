//! Configuration schema.

use crate::pipeline::DEFAULT_CONCURRENCY;
use crate::recipe::RecipeVars;
use crate::shell::{default_shell, DEFAULT_SCRIPT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for a filtering run.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SieveConfig {
    /// Number of recipes evaluated at once
    pub concurrency: usize,

    /// Per-script timeout in seconds
    pub script_timeout_secs: u64,

    /// Overall deadline for a run in seconds (no deadline when unset)
    pub deadline_secs: Option<u64>,

    /// Shell used to run pre-install scripts
    pub shell: Option<String>,

    /// Variables passed to every pre-install script
    pub vars: RecipeVars,
}

impl Default for SieveConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            script_timeout_secs: DEFAULT_SCRIPT_TIMEOUT.as_secs(),
            deadline_secs: None,
            shell: None,
            vars: RecipeVars::new(),
        }
    }
}

impl SieveConfig {
    /// Worker count, never below 1.
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Per-script timeout, never below one second.
    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs.max(1))
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Configured shell, or the platform default.
    pub fn shell(&self) -> String {
        self.shell.clone().unwrap_or_else(default_shell)
    }
}
