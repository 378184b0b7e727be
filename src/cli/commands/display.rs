//! Human-readable rendering of filtering results.

use crate::filter::FilterError;
use crate::pipeline::{Exclusion, FilterReport};
use crate::status::{Metadata, RecipeStatus};
use crate::ui::UserInterface;

/// Render a pipeline report.
pub fn show_report(ui: &mut dyn UserInterface, report: &FilterReport) {
    ui.show_header(&format!(
        "{} of {} recipes apply to this host",
        report.survivors.len(),
        report.total()
    ));

    for recipe in &report.survivors {
        ui.success(&format!("{} ({})", recipe.label(), recipe.id));
    }

    for exclusion in &report.excluded {
        show_exclusion(ui, exclusion);
    }

    for recipe_id in &report.unevaluated {
        ui.skipped(&format!("{} not evaluated", recipe_id));
    }
}

/// Render one excluded recipe.
pub fn show_exclusion(ui: &mut dyn UserInterface, exclusion: &Exclusion) {
    let line = format!(
        "{} ({}) excluded by {}",
        exclusion.recipe_name, exclusion.recipe_id, exclusion.stage
    );

    match &exclusion.error {
        None => ui.skipped(&line),
        Some(error @ FilterError::DetectedUnsupported(_)) => {
            ui.warning(&format!("{}: {}", line, error));
            show_metadata(ui, error.metadata());
        }
        Some(error @ (FilterError::Match(_) | FilterError::Target { .. })) => {
            ui.error(&format!("{}: {}", line, error));
        }
        Some(error) => {
            ui.skipped(&format!("{}: {}", line, error));
            show_metadata(ui, error.metadata());
        }
    }
}

/// Render detection events recorded during the run.
pub fn show_detections(ui: &mut dyn UserInterface, statuses: &[RecipeStatus]) {
    for status in statuses {
        let Some(event) = &status.event else {
            continue;
        };
        ui.show_detail(
            "detected",
            &format!("{} at {}", status.recipe_id, event.timestamp.to_rfc3339()),
        );
        if let Some(message) = &event.message {
            ui.show_detail("message", message);
        }
        show_metadata(ui, event.metadata.as_ref());
    }
}

fn show_metadata(ui: &mut dyn UserInterface, metadata: Option<&Metadata>) {
    let Some(metadata) = metadata else {
        return;
    };
    for (key, value) in metadata {
        match value.as_str() {
            Some(text) => ui.show_detail(key, text),
            None => ui.show_detail(key, &value.to_string()),
        }
    }
}
