//! Filtering results.

use crate::filter::FilterError;
use crate::recipe::Recipe;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// A recipe removed by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exclusion {
    /// Recipe identifier
    pub recipe_id: String,

    /// Recipe name
    pub recipe_name: String,

    /// Name of the stage that excluded the recipe
    pub stage: String,

    /// The error behind the exclusion, if the stage reported one
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<FilterError>,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterReport {
    /// Recipes that passed every stage, in input order
    pub survivors: Vec<Recipe>,

    /// Recipes removed by a stage, in input order
    pub excluded: Vec<Exclusion>,

    /// IDs of recipes never evaluated because the run was cancelled
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unevaluated: Vec<String>,
}

impl FilterReport {
    /// IDs of the surviving recipes.
    pub fn survivor_ids(&self) -> Vec<&str> {
        self.survivors.iter().map(|r| r.id.as_str()).collect()
    }

    /// Exclusions that carry an error.
    pub fn errors(&self) -> impl Iterator<Item = (&Exclusion, &FilterError)> {
        self.excluded
            .iter()
            .filter_map(|e| e.error.as_ref().map(|err| (e, err)))
    }

    /// The exclusion for `recipe_id`, if it was excluded.
    pub fn exclusion(&self, recipe_id: &str) -> Option<&Exclusion> {
        self.excluded.iter().find(|e| e.recipe_id == recipe_id)
    }

    /// Number of recipes that reached a decision.
    pub fn evaluated(&self) -> usize {
        self.survivors.len() + self.excluded.len()
    }

    /// Total number of recipes in the run, evaluated or not.
    pub fn total(&self) -> usize {
        self.evaluated() + self.unevaluated.len()
    }

    /// Whether every recipe reached a decision.
    pub fn is_complete(&self) -> bool {
        self.unevaluated.is_empty()
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<FilterError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let Some(error) = error else {
        return serializer.serialize_none();
    };

    let kind = match error {
        FilterError::Match(_) => "invalid-pattern",
        FilterError::Target { .. } => "invalid-target",
        FilterError::DetectedUnsupported(_) => "detected-unsupported",
        FilterError::Incompatible(_) => "incompatible",
        FilterError::Execution(_) => "execution-error",
    };

    let mut state = serializer.serialize_struct("FilterError", 3)?;
    state.serialize_field("kind", kind)?;
    state.serialize_field("message", &error.to_string())?;
    state.serialize_field("metadata", &error.metadata())?;
    state.end()
}
