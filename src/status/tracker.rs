//! Session-wide install status.
//!
//! `InstallStatus` is created once per install run and shared by reference
//! with every filterer that records detections. It is the only mutable state
//! touched by concurrent filter evaluations, so every write goes through an
//! internal lock.

use crate::recipe::Recipe;
use crate::status::event::RecipeStatusEvent;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Status recorded for a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipeStatusType {
    /// Passed every filter and can be installed.
    Available,

    /// Target software was detected, but this recipe cannot support it.
    Detected,
}

impl std::fmt::Display for RecipeStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecipeStatusType::Available => "available",
            RecipeStatusType::Detected => "detected",
        };
        write!(f, "{}", s)
    }
}

/// Status entry for one recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStatus {
    pub recipe_id: String,
    pub recipe_name: String,
    pub status: RecipeStatusType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<RecipeStatusEvent>,
}

/// Observer notified whenever a recipe is recorded as detected.
pub trait StatusSubscriber: Send + Sync {
    /// Called after the status has been stored.
    fn recipe_detected(&self, status: &RecipeStatus);
}

/// Subscriber that logs detections.
#[derive(Debug, Default)]
pub struct LogSubscriber;

impl StatusSubscriber for LogSubscriber {
    fn recipe_detected(&self, status: &RecipeStatus) {
        tracing::info!(
            "Detected {} ({}) but it is not supported: {}",
            status.recipe_name,
            status.recipe_id,
            detection_summary(status)
        );
    }
}

/// The event message, or its metadata as JSON when there is no message.
fn detection_summary(status: &RecipeStatus) -> String {
    let Some(event) = &status.event else {
        return "no details".to_string();
    };
    match (&event.message, &event.metadata) {
        (Some(message), _) => message.clone(),
        (None, Some(metadata)) => serde_json::Value::Object(metadata.clone()).to_string(),
        (None, None) => "no details".to_string(),
    }
}

/// Thread-safe record of recipe statuses for one install run.
#[derive(Default)]
pub struct InstallStatus {
    statuses: Mutex<BTreeMap<String, RecipeStatus>>,
    subscribers: RwLock<Vec<Arc<dyn StatusSubscriber>>>,
}

impl std::fmt::Debug for InstallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallStatus")
            .field("statuses", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl InstallStatus {
    /// Create an empty install status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for detection events.
    pub fn subscribe(&self, subscriber: Arc<dyn StatusSubscriber>) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
    }

    /// Record that a recipe's target was detected but is unsupported.
    ///
    /// Overwrites any earlier entry for the same recipe ID. Subscribers have
    /// been notified by the time this returns.
    pub fn recipe_detected(&self, recipe: &Recipe, event: RecipeStatusEvent) {
        let status = RecipeStatus {
            recipe_id: recipe.id.clone(),
            recipe_name: recipe.name.clone(),
            status: RecipeStatusType::Detected,
            event: Some(event),
        };

        self.lock().insert(recipe.id.clone(), status.clone());
        tracing::debug!("Recorded detection for recipe {}", recipe.id);

        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for subscriber in subscribers {
            subscriber.recipe_detected(&status);
        }
    }

    /// Record that a recipe passed filtering.
    ///
    /// Never downgrades an existing detection.
    pub fn recipe_available(&self, recipe: &Recipe) {
        self.lock()
            .entry(recipe.id.clone())
            .or_insert_with(|| RecipeStatus {
                recipe_id: recipe.id.clone(),
                recipe_name: recipe.name.clone(),
                status: RecipeStatusType::Available,
                event: None,
            });
    }

    /// The last detection event recorded for a recipe ID.
    pub fn detected(&self, recipe_id: &str) -> Option<RecipeStatusEvent> {
        self.lock()
            .get(recipe_id)
            .filter(|s| s.status == RecipeStatusType::Detected)
            .and_then(|s| s.event.clone())
    }

    /// Number of recipes recorded as detected.
    pub fn detected_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|s| s.status == RecipeStatusType::Detected)
            .count()
    }

    /// Current status of a recipe, if any was recorded.
    pub fn status_of(&self, recipe_id: &str) -> Option<RecipeStatusType> {
        self.lock().get(recipe_id).map(|s| s.status)
    }

    /// All recorded statuses, ordered by recipe ID.
    pub fn snapshot(&self) -> Vec<RecipeStatus> {
        self.lock().values().cloned().collect()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, RecipeStatus>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::event::Metadata;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn event_for(recipe: &Recipe, message: &str) -> RecipeStatusEvent {
        RecipeStatusEvent::new(recipe).with_message(message)
    }

    #[test]
    fn detected_event_is_retrievable_by_id() {
        let status = InstallStatus::new();
        let recipe = Recipe::new("x", "x-installer");
        let mut metadata = Metadata::new();
        metadata.insert("reason".to_string(), json!("unsupported-os"));

        status.recipe_detected(&recipe, RecipeStatusEvent::new(&recipe).with_metadata(metadata));

        let event = status.detected("x").unwrap();
        assert_eq!(event.metadata.unwrap()["reason"], "unsupported-os");
        assert_eq!(status.status_of("x"), Some(RecipeStatusType::Detected));
        assert_eq!(status.detected_count(), 1);
    }

    fn detected_status(event: Option<RecipeStatusEvent>) -> RecipeStatus {
        RecipeStatus {
            recipe_id: "x".to_string(),
            recipe_name: "x-installer".to_string(),
            status: RecipeStatusType::Detected,
            event,
        }
    }

    #[test]
    fn log_summary_uses_metadata_without_message() {
        let recipe = Recipe::new("x", "x-installer");
        let mut metadata = Metadata::new();
        metadata.insert("reason".to_string(), json!("unsupported-os"));

        let status = detected_status(Some(RecipeStatusEvent::new(&recipe).with_metadata(metadata)));

        assert_eq!(detection_summary(&status), r#"{"reason":"unsupported-os"}"#);
    }

    #[test]
    fn log_summary_prefers_message() {
        let recipe = Recipe::new("x", "x-installer");
        let status = detected_status(Some(event_for(&recipe, "exit status 132")));

        assert_eq!(detection_summary(&status), "exit status 132");
        assert_eq!(detection_summary(&detected_status(None)), "no details");
    }

    #[test]
    fn last_detection_wins() {
        let status = InstallStatus::new();
        let recipe = Recipe::new("x", "x-installer");

        status.recipe_detected(&recipe, event_for(&recipe, "first"));
        status.recipe_detected(&recipe, event_for(&recipe, "second"));

        assert_eq!(status.detected("x").unwrap().message.as_deref(), Some("second"));
        assert_eq!(status.detected_count(), 1);
    }

    #[test]
    fn available_does_not_downgrade_detection() {
        let status = InstallStatus::new();
        let recipe = Recipe::new("x", "x-installer");

        status.recipe_detected(&recipe, event_for(&recipe, "detected"));
        status.recipe_available(&recipe);

        assert_eq!(status.status_of("x"), Some(RecipeStatusType::Detected));
    }

    #[test]
    fn available_recipe_has_no_detection_event() {
        let status = InstallStatus::new();
        status.recipe_available(&Recipe::new("y", "y-installer"));

        assert_eq!(status.status_of("y"), Some(RecipeStatusType::Available));
        assert!(status.detected("y").is_none());
        assert_eq!(status.detected_count(), 0);
    }

    #[test]
    fn unknown_recipe_has_no_status() {
        let status = InstallStatus::new();
        assert!(status.is_empty());
        assert!(status.status_of("missing").is_none());
        assert!(status.detected("missing").is_none());
    }

    #[test]
    fn snapshot_is_ordered_by_id() {
        let status = InstallStatus::new();
        for id in ["c", "a", "b"] {
            status.recipe_available(&Recipe::new(id, id));
        }
        let ids: Vec<_> = status
            .snapshot()
            .into_iter()
            .map(|s| s.recipe_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn subscribers_are_notified_before_return() {
        struct Counter(AtomicUsize);
        impl StatusSubscriber for Counter {
            fn recipe_detected(&self, _status: &RecipeStatus) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let status = InstallStatus::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        status.subscribe(counter.clone());

        let recipe = Recipe::new("x", "x");
        status.recipe_detected(&recipe, event_for(&recipe, "m"));

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_writers_lose_nothing() {
        let status = Arc::new(InstallStatus::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let status = Arc::clone(&status);
                thread::spawn(move || {
                    let recipe = Recipe::new(&format!("r{}", i), "r");
                    status.recipe_detected(&recipe, RecipeStatusEvent::new(&recipe));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(status.detected_count(), 16);
    }

    #[test]
    fn status_type_displays_lowercase() {
        assert_eq!(RecipeStatusType::Detected.to_string(), "detected");
        assert_eq!(RecipeStatusType::Available.to_string(), "available");
    }
}
