//! Recipe schema definitions.
//!
//! A recipe is a declarative install definition for one agent or
//! integration. Only the fields the filtering pipeline needs are modelled;
//! unknown fields in recipe files are ignored.

use serde::{Deserialize, Serialize};

use super::vars::RecipeVars;

/// An installation recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Unique recipe identifier
    pub id: String,

    /// Recipe name (e.g., "java-agent-installer")
    pub name: String,

    /// Human-readable name for display
    #[serde(default)]
    pub display_name: Option<String>,

    /// Short description of what the recipe installs
    #[serde(default)]
    pub description: Option<String>,

    /// Hosts this recipe can install on (empty means any host)
    #[serde(default)]
    pub install_targets: Vec<InstallTarget>,

    /// Regular expressions matched against discovered process names
    #[serde(default)]
    pub process_match: Vec<String>,

    /// Validation hooks run before install
    #[serde(default)]
    pub pre_install: PreInstall,

    /// Variables templated into the pre-install script
    #[serde(default)]
    pub vars: RecipeVars,
}

/// A host description a recipe supports.
///
/// Every field that is set must match the discovery manifest. Text fields
/// compare case-insensitively; `platform_version` is a regular expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallTarget {
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub platform_family: Option<String>,
    #[serde(default)]
    pub platform_version: Option<String>,
    #[serde(default)]
    pub kernel_arch: Option<String>,
}

/// Pre-install validation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreInstall {
    /// Script run during discovery to probe host compatibility.
    ///
    /// Exit 0 means compatible. Exit 132 means the target software was
    /// detected but this recipe cannot support it. Anything else means
    /// incompatible.
    #[serde(default, alias = "requireAtDiscovery")]
    pub require_at_discovery: Option<String>,

    /// Informational message shown before install
    #[serde(default)]
    pub info: Option<String>,
}

impl Recipe {
    /// Create a recipe with only identity fields set.
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a process-name pattern.
    pub fn with_process_match(mut self, pattern: &str) -> Self {
        self.process_match.push(pattern.to_string());
        self
    }

    /// Set the pre-install discovery script.
    pub fn with_pre_install_script(mut self, script: &str) -> Self {
        self.pre_install.require_at_discovery = Some(script.to_string());
        self
    }

    /// Add a supported install target.
    pub fn with_install_target(mut self, target: InstallTarget) -> Self {
        self.install_targets.push(target);
        self
    }

    /// Add a template variable.
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Name to show users, falling back to the recipe name.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// The discovery script, if one is declared and non-blank.
    pub fn discovery_script(&self) -> Option<&str> {
        self.pre_install
            .require_at_discovery
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}
