//! Check command implementation.
//!
//! The `recipe-sieve check` command walks a single recipe through each
//! filtering stage and explains where it passes or is excluded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::cancel::CancelToken;
use crate::cli::args::CheckArgs;
use crate::config::load_config;
use crate::discovery::{DiscoveryManifest, GenericProcess};
use crate::error::Result;
use crate::filter::{FilterError, FilterVerdict, ProcessMatcher, RecipeFilterer};
use crate::pipeline::Exclusion;
use crate::recipe::{load_recipes, Recipe};
use crate::status::{InstallStatus, RecipeStatus};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::display::{show_detections, show_exclusion};
use super::setup::{build_pipeline, load_manifest};

/// The check command implementation.
pub struct CheckCommand {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    args: CheckArgs,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckOutput {
    recipe_id: String,
    applicable: bool,
    matched_processes: Vec<String>,
    exclusion: Option<Exclusion>,
    status: Option<RecipeStatus>,
}

impl CheckCommand {
    /// Create a new check command.
    pub fn new(project_root: &Path, args: CheckArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config_path: None,
            args,
        }
    }

    /// Load configuration from this file instead of discovering it.
    pub fn with_config_path(mut self, path: Option<&Path>) -> Self {
        self.config_path = path.map(Path::to_path_buf);
        self
    }

    fn select(&self, recipes: Vec<Recipe>, ui: &mut dyn UserInterface) -> Option<Recipe> {
        match &self.args.id {
            Some(id) => {
                let found = recipes.into_iter().find(|r| &r.id == id);
                if found.is_none() {
                    ui.error(&format!("No recipe with id '{}'", id));
                }
                found
            }
            None if recipes.len() == 1 => recipes.into_iter().next(),
            None => {
                ui.error(&format!(
                    "{} recipes found; choose one with --id",
                    recipes.len()
                ));
                None
            }
        }
    }

    fn matched_processes(&self, recipe: &Recipe, manifest: &DiscoveryManifest) -> Vec<String> {
        ProcessMatcher::find_matches(recipe, manifest.processes())
            .map(|found| found.iter().map(|p| p.name().to_string()).collect())
            .unwrap_or_default()
    }

    /// Run the standard pipeline's stages in order, stopping at the first
    /// exclusion.
    fn evaluate(
        &self,
        recipe: &Recipe,
        manifest: &DiscoveryManifest,
        status: Arc<InstallStatus>,
        ui: &mut dyn UserInterface,
    ) -> Result<Option<Exclusion>> {
        let mut config = load_config(&self.project_root, self.config_path.as_deref())?;
        self.args.probe.apply(&mut config);
        let pipeline = build_pipeline(&config, &self.project_root, status, true)?;
        let cancel = CancelToken::new();

        for stage in pipeline.stages() {
            let FilterVerdict::Exclude(error) = stage.evaluate(recipe, manifest, &cancel) else {
                ui.message(&format!("{}: pass", stage.name()));
                continue;
            };

            if let Some(stderr) = error.as_ref().and_then(error_stderr) {
                ui.show_detail("stderr", stderr);
            }
            return Ok(Some(Exclusion {
                recipe_id: recipe.id.clone(),
                recipe_name: recipe.name.clone(),
                stage: stage.name().to_string(),
                error,
            }));
        }

        Ok(None)
    }
}

fn error_stderr(error: &FilterError) -> Option<&str> {
    match error {
        FilterError::DetectedUnsupported(e)
        | FilterError::Incompatible(e)
        | FilterError::Execution(e) => e.stderr.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        FilterError::Match(_) | FilterError::Target { .. } => None,
    }
}

impl Command for CheckCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let recipes = load_recipes(&self.args.recipes)?;
        let Some(recipe) = self.select(recipes, ui) else {
            return Ok(CommandResult::failure(2));
        };
        let manifest = load_manifest(self.args.probe.manifest.as_deref())?;
        let status = Arc::new(InstallStatus::new());

        if !self.args.probe.json {
            ui.show_header(&format!("{} ({})", recipe.label(), recipe.id));
        }

        let matched = self.matched_processes(&recipe, &manifest);
        if !matched.is_empty() {
            ui.show_detail("processes", &matched.join(", "));
        }

        let exclusion = self.evaluate(&recipe, &manifest, Arc::clone(&status), ui)?;
        let applicable = exclusion.is_none();
        if applicable {
            status.recipe_available(&recipe);
        }

        if self.args.probe.json {
            let output = CheckOutput {
                recipe_id: recipe.id.clone(),
                applicable,
                matched_processes: matched,
                exclusion,
                status: status.snapshot().into_iter().next(),
            };
            let json = serde_json::to_string_pretty(&output).map_err(anyhow::Error::from)?;
            ui.raw(&json);
        } else {
            match &exclusion {
                Some(exclusion) => show_exclusion(ui, exclusion),
                None => ui.success(&format!("{} applies to this host", recipe.label())),
            }
            show_detections(ui, &status.snapshot());
        }

        if applicable {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(1))
        }
    }
}
