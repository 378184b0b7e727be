//! Script-based compatibility probing.
//!
//! Runs a recipe's `preInstall.requireAtDiscovery` script against the host
//! and excludes the recipe unless the script exits 0. A script that exits
//! with [`DETECTED_UNSUPPORTED_EXIT_CODE`] additionally records a detection
//! event in the shared [`InstallStatus`] before the decision is returned.
//!
//! [`DETECTED_UNSUPPORTED_EXIT_CODE`]: crate::filter::DETECTED_UNSUPPORTED_EXIT_CODE

use crate::cancel::CancelToken;
use crate::discovery::DiscoveryManifest;
use crate::filter::outcome::{classify, ExecutionError, ProbeOutcome};
use crate::filter::{FilterCost, FilterError, FilterVerdict, RecipeFilterer};
use crate::recipe::{merge_vars, Recipe, RecipeVars};
use crate::status::{InstallStatus, RecipeStatusEvent};
use std::sync::Arc;

/// Runs a recipe's pre-install script.
///
/// Implementations block until the script exits, fails to launch, times
/// out, or `cancel` trips. A pre-install script is a dry-run probe and
/// must not be used to change the host.
pub trait PreInstallExecutor: Send + Sync {
    /// Execute the recipe's discovery script with the given variables.
    fn execute_pre_install(
        &self,
        cancel: &CancelToken,
        recipe: &Recipe,
        vars: &RecipeVars,
    ) -> Result<(), ExecutionError>;
}

/// Pipeline stage that probes host compatibility by running recipe scripts.
pub struct ScriptCompatibilityProbe {
    executor: Arc<dyn PreInstallExecutor>,
    install_status: Arc<InstallStatus>,
    vars: RecipeVars,
}

impl ScriptCompatibilityProbe {
    /// Create a probe that records detections into `install_status`.
    pub fn new(executor: Arc<dyn PreInstallExecutor>, install_status: Arc<InstallStatus>) -> Self {
        Self {
            executor,
            install_status,
            vars: RecipeVars::new(),
        }
    }

    /// Variables passed to every script, overriding recipe-declared ones.
    pub fn with_vars(mut self, vars: RecipeVars) -> Self {
        self.vars = vars;
        self
    }

    /// Run the recipe's probe script and classify the result.
    ///
    /// Recipes without a discovery script are compatible without running
    /// anything.
    pub fn probe(
        &self,
        recipe: &Recipe,
        _manifest: &DiscoveryManifest,
        cancel: &CancelToken,
    ) -> ProbeOutcome {
        if recipe.discovery_script().is_none() {
            tracing::trace!("Recipe {} has no discovery script", recipe.id);
            return ProbeOutcome::Success;
        }

        let vars = merge_vars(&recipe.vars, &self.vars);
        let outcome = classify(self.executor.execute_pre_install(cancel, recipe, &vars));

        match &outcome {
            ProbeOutcome::Success => {
                tracing::debug!("Recipe {} passed script evaluation", recipe.id);
            }
            ProbeOutcome::DetectedUnsupported(err) => {
                tracing::debug!(
                    "Recipe {} detected but unsupported: {}",
                    recipe.id,
                    err
                );
                self.record_detection(recipe, err);
            }
            other => {
                if let Some(err) = other.error() {
                    tracing::trace!(
                        "Recipe {} failed script evaluation ({}): {}",
                        recipe.id,
                        other.label(),
                        err
                    );
                }
            }
        }

        outcome
    }

    /// Check compatibility, returning the original script error on failure.
    pub fn check_compatibility(
        &self,
        recipe: &Recipe,
        manifest: &DiscoveryManifest,
        cancel: &CancelToken,
    ) -> Result<(), ExecutionError> {
        self.probe(recipe, manifest, cancel).into_result()
    }

    fn record_detection(&self, recipe: &Recipe, err: &ExecutionError) {
        let event = RecipeStatusEvent::new(recipe);
        let event = match &err.metadata {
            Some(metadata) => event.with_metadata(metadata.clone()),
            None => event.with_message(err.to_string()),
        };
        self.install_status.recipe_detected(recipe, event);
    }
}

impl RecipeFilterer for ScriptCompatibilityProbe {
    fn name(&self) -> &str {
        "script-evaluation"
    }

    fn cost(&self) -> FilterCost {
        FilterCost::Expensive
    }

    fn evaluate(
        &self,
        recipe: &Recipe,
        manifest: &DiscoveryManifest,
        cancel: &CancelToken,
    ) -> FilterVerdict {
        match self.probe(recipe, manifest, cancel) {
            ProbeOutcome::Success => FilterVerdict::Keep,
            ProbeOutcome::DetectedUnsupported(e) => {
                FilterVerdict::Exclude(Some(FilterError::DetectedUnsupported(e)))
            }
            ProbeOutcome::Incompatible(e) => {
                FilterVerdict::Exclude(Some(FilterError::Incompatible(e)))
            }
            ProbeOutcome::ExecutionError(e) => {
                FilterVerdict::Exclude(Some(FilterError::Execution(e)))
            }
        }
    }
}
