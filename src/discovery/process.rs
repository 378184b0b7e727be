//! Process records used for recipe matching.

use serde::{Deserialize, Serialize};

/// Minimal view of a running process.
///
/// Matching only ever reads [`name`](GenericProcess::name); the other
/// accessors exist for display and diagnostics.
pub trait GenericProcess {
    /// Process name (e.g., "java", "nginx").
    fn name(&self) -> &str;

    /// Process ID, when known.
    fn pid(&self) -> Option<u32> {
        None
    }

    /// Full command line, when known.
    fn cmdline(&self) -> Option<&str> {
        None
    }
}

/// A discovered process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Process name
    pub name: String,

    /// Process ID
    #[serde(default)]
    pub pid: Option<u32>,

    /// Command line joined with spaces
    #[serde(default)]
    pub cmdline: Option<String>,
}

impl ProcessInfo {
    /// Create a process record from just a name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set the process ID.
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Set the command line.
    pub fn with_cmdline(mut self, cmdline: &str) -> Self {
        self.cmdline = Some(cmdline.to_string());
        self
    }
}

impl GenericProcess for ProcessInfo {
    fn name(&self) -> &str {
        &self.name
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn cmdline(&self) -> Option<&str> {
        self.cmdline.as_deref()
    }
}
