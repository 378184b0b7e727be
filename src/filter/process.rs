//! Process-name pattern matching.
//!
//! A recipe matches when any of its `processMatch` patterns finds a match in
//! any discovered process name. Patterns are unanchored regular
//! expressions: `java` matches `java` and `openjdk-java`, while `^java$`
//! only matches `java`.
//!
//! A recipe that declares no patterns has no process requirement and always
//! matches.

use crate::cancel::CancelToken;
use crate::discovery::{DiscoveryManifest, GenericProcess};
use crate::filter::{FilterCost, FilterVerdict, RecipeFilterer};
use crate::recipe::Recipe;
use regex::Regex;
use thiserror::Error;

/// A recipe declared a pattern that is not a valid regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Recipe '{recipe_id}' has an invalid process pattern '{pattern}': {message}")]
pub struct MatchError {
    pub recipe_id: String,
    pub pattern: String,
    pub message: String,
}

/// Matches recipe process patterns against discovered processes.
///
/// # Example
///
/// ```
/// use recipe_sieve::discovery::ProcessInfo;
/// use recipe_sieve::filter::ProcessMatcher;
/// use recipe_sieve::recipe::Recipe;
///
/// let recipe = Recipe::new("java-1", "java").with_process_match("java");
/// let processes = vec![ProcessInfo::named("java"), ProcessInfo::named("nginx")];
///
/// assert!(ProcessMatcher::matches(&recipe, &processes).unwrap());
/// ```
pub struct ProcessMatcher;

impl ProcessMatcher {
    /// Whether any recipe pattern matches any process name.
    ///
    /// # Errors
    ///
    /// Returns `MatchError` for the first pattern that fails to compile.
    pub fn matches<P: GenericProcess>(recipe: &Recipe, processes: &[P]) -> Result<bool, MatchError> {
        if recipe.process_match.is_empty() {
            return Ok(true);
        }
        let patterns = compile_patterns(recipe)?;
        Ok(processes
            .iter()
            .any(|p| patterns.iter().any(|re| re.is_match(p.name()))))
    }

    /// The processes matched by any recipe pattern.
    ///
    /// A recipe without patterns matches no specific process, so this
    /// returns an empty list for it.
    pub fn find_matches<'a, P: GenericProcess>(
        recipe: &Recipe,
        processes: &'a [P],
    ) -> Result<Vec<&'a P>, MatchError> {
        let patterns = compile_patterns(recipe)?;
        Ok(processes
            .iter()
            .filter(|p| patterns.iter().any(|re| re.is_match(p.name())))
            .collect())
    }

    /// Like [`matches`](Self::matches), but a malformed pattern counts as no match.
    pub fn is_match<P: GenericProcess>(recipe: &Recipe, processes: &[P]) -> bool {
        Self::matches(recipe, processes).unwrap_or(false)
    }
}

fn compile_patterns(recipe: &Recipe) -> Result<Vec<Regex>, MatchError> {
    recipe
        .process_match
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| MatchError {
                recipe_id: recipe.id.clone(),
                pattern: pattern.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Pipeline stage that drops recipes whose software is not running.
#[derive(Debug, Default)]
pub struct ProcessMatchFilterer;

impl ProcessMatchFilterer {
    pub fn new() -> Self {
        Self
    }
}

impl RecipeFilterer for ProcessMatchFilterer {
    fn name(&self) -> &str {
        "process-match"
    }

    fn cost(&self) -> FilterCost {
        FilterCost::Cheap
    }

    fn evaluate(
        &self,
        recipe: &Recipe,
        manifest: &DiscoveryManifest,
        _cancel: &CancelToken,
    ) -> FilterVerdict {
        match ProcessMatcher::matches(recipe, manifest.processes()) {
            Ok(true) => FilterVerdict::Keep,
            Ok(false) => {
                tracing::debug!("Recipe {} matched no running process", recipe.id);
                FilterVerdict::Exclude(None)
            }
            Err(e) => {
                tracing::warn!("{}", e);
                FilterVerdict::Exclude(Some(e.into()))
            }
        }
    }
}
