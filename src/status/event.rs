//! Recipe status events.

use crate::recipe::Recipe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured diagnostic data attached to probe errors and status events.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// An event recorded against a recipe in the install status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStatusEvent {
    /// ID of the recipe this event is about
    pub recipe_id: String,

    /// Name of the recipe this event is about
    pub recipe_name: String,

    /// Human-readable message (raw error text when no metadata was emitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Structured metadata emitted by the probe script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    /// When the event was created
    pub timestamp: DateTime<Utc>,
}

impl RecipeStatusEvent {
    /// Create an event for a recipe with no message or metadata.
    pub fn new(recipe: &Recipe) -> Self {
        Self {
            recipe_id: recipe.id.clone(),
            recipe_name: recipe.name.clone(),
            message: None,
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
