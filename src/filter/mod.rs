//! Recipe filtering strategies.
//!
//! Every strategy implements [`RecipeFilterer`], which decides for one
//! recipe whether it should be excluded from installation. The
//! [`FilterPipeline`](crate::pipeline::FilterPipeline) chains filterers and
//! stops at the first one that excludes a recipe.
//!
//! # Modules
//!
//! - [`target`] - Install-target (OS, platform, architecture) matching
//! - [`process`] - Process-name pattern matching
//! - [`outcome`] - Probe outcomes and exit-code classification
//! - [`script`] - Script-based compatibility probing

pub mod outcome;
pub mod process;
pub mod script;
pub mod target;

pub use outcome::{
    classify, ExecutionError, ExecutionErrorKind, ProbeOutcome, DETECTED_UNSUPPORTED_EXIT_CODE,
};
pub use process::{MatchError, ProcessMatchFilterer, ProcessMatcher};
pub use script::{PreInstallExecutor, ScriptCompatibilityProbe};
pub use target::InstallTargetFilterer;

use crate::cancel::CancelToken;
use crate::discovery::DiscoveryManifest;
use crate::recipe::Recipe;
use crate::status::Metadata;
use thiserror::Error;

/// Relative cost of running a filterer.
///
/// Pipelines run every cheap filterer before any expensive one, which
/// bounds how many external scripts a run launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterCost {
    /// In-memory checks with no side effects.
    Cheap,
    /// Runs external code or records state.
    Expensive,
}

/// Decision a filterer makes for one recipe.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterVerdict {
    /// The recipe stays a candidate.
    Keep,
    /// The recipe is excluded, optionally with the error that caused it.
    Exclude(Option<FilterError>),
}

impl FilterVerdict {
    /// Whether the recipe is excluded.
    pub fn is_excluded(&self) -> bool {
        matches!(self, FilterVerdict::Exclude(_))
    }

    /// The error behind an exclusion, if any.
    pub fn error(&self) -> Option<&FilterError> {
        match self {
            FilterVerdict::Exclude(err) => err.as_ref(),
            FilterVerdict::Keep => None,
        }
    }
}

/// A per-recipe filtering error.
///
/// These never abort a pipeline run; they are reported alongside the
/// surviving recipes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// A recipe declared a malformed process pattern.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// A recipe declared a malformed install target.
    #[error("Recipe '{recipe_id}' has an invalid platform version pattern '{pattern}': {message}")]
    Target {
        recipe_id: String,
        pattern: String,
        message: String,
    },

    /// The probe script detected the software but this recipe cannot support it.
    #[error("Detected but unsupported: {0}")]
    DetectedUnsupported(ExecutionError),

    /// The probe script ran and reported the host as incompatible.
    #[error("Incompatible: {0}")]
    Incompatible(ExecutionError),

    /// The probe script could not be run to completion.
    #[error("Probe failed: {0}")]
    Execution(ExecutionError),
}

impl FilterError {
    /// Structured metadata carried by a probe error.
    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            FilterError::DetectedUnsupported(e)
            | FilterError::Incompatible(e)
            | FilterError::Execution(e) => e.metadata.as_ref(),
            FilterError::Match(_) | FilterError::Target { .. } => None,
        }
    }

    /// Whether this error reports a detected-but-unsupported recipe.
    pub fn is_detected_unsupported(&self) -> bool {
        matches!(self, FilterError::DetectedUnsupported(_))
    }
}

/// A strategy that decides whether a recipe should be excluded.
pub trait RecipeFilterer: Send + Sync {
    /// Short stage name used in reports and logs.
    fn name(&self) -> &str;

    /// Relative cost of this filterer.
    fn cost(&self) -> FilterCost {
        FilterCost::Cheap
    }

    /// Evaluate one recipe against the host.
    fn evaluate(
        &self,
        recipe: &Recipe,
        manifest: &DiscoveryManifest,
        cancel: &CancelToken,
    ) -> FilterVerdict;

    /// Whether the recipe should be excluded.
    fn filter(&self, recipe: &Recipe, manifest: &DiscoveryManifest, cancel: &CancelToken) -> bool {
        self.evaluate(recipe, manifest, cancel).is_excluded()
    }
}
