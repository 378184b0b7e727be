//! Filter command implementation.
//!
//! The `recipe-sieve filter` command runs every recipe through the standard
//! pipeline and prints the recipes that apply to the host.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::cli::args::FilterArgs;
use crate::config::load_config;
use crate::error::{Result, SieveError};
use crate::pipeline::FilterReport;
use crate::recipe::load_recipes;
use crate::status::{InstallStatus, LogSubscriber, RecipeStatus};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::display::{show_detections, show_report};
use super::setup::{build_pipeline, cancel_token, load_manifest};

/// The filter command implementation.
pub struct FilterCommand {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    args: FilterArgs,
}

#[derive(Serialize)]
struct FilterOutput<'a> {
    #[serde(flatten)]
    report: &'a FilterReport,
    statuses: Vec<RecipeStatus>,
}

impl FilterCommand {
    /// Create a new filter command.
    pub fn new(project_root: &Path, args: FilterArgs) -> Self {
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

    /// Get the command arguments.
    pub fn args(&self) -> &FilterArgs {
        &self.args
    }
}

impl Command for FilterCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let mut config = load_config(&self.project_root, self.config_path.as_deref())?;
        self.args.apply(&mut config);
        tracing::debug!("Effective config: {:?}", config);

        let recipes = load_recipes(&self.args.recipes)?;
        let manifest = load_manifest(self.args.probe.manifest.as_deref())?;

        let status = Arc::new(InstallStatus::new());
        status.subscribe(Arc::new(LogSubscriber));

        let pipeline = build_pipeline(
            &config,
            &self.project_root,
            Arc::clone(&status),
            !self.args.no_scripts,
        )?;
        let cancel = cancel_token(&config);

        let (report, interrupted) = match pipeline.run(&recipes, Some(&manifest), &cancel) {
            Ok(report) => (report, None),
            Err(SieveError::Cancelled {
                evaluated,
                total,
                partial,
            }) => {
                let message = format!("Filtering cancelled after {} of {} recipes", evaluated, total);
                (*partial, Some(message))
            }
            Err(e) => return Err(e),
        };
        for recipe in &report.survivors {
            status.recipe_available(recipe);
        }

        if self.args.probe.json {
            let output = FilterOutput {
                report: &report,
                statuses: status.snapshot(),
            };
            let json = serde_json::to_string_pretty(&output).map_err(anyhow::Error::from)?;
            ui.raw(&json);
        } else {
            show_report(ui, &report);
            show_detections(ui, &status.snapshot());
        }

        if let Some(message) = interrupted {
            ui.error(&message);
            return Ok(CommandResult::failure(1));
        }

        Ok(CommandResult::success())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::cli::args::ProbeArgs;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    const RECIPES: &str = r#"
- id: java-1
  name: java-agent
  processMatch: ["java"]
  preInstall:
    requireAtDiscovery: "exit 0"
- id: nginx-1
  name: nginx-integration
  processMatch: ["nginx"]
- id: x
  name: x-agent
  processMatch: ["java"]
  preInstall:
    requireAtDiscovery: |
      echo '{"metadata": {"reason": "unsupported-os"}}' > "$RECIPE_OUTPUT_FILE"
      exit 132
"#;

    const MANIFEST: &str = r#"{
  "os": "linux",
  "discoveredProcesses": [{"name": "java"}, {"name": "bash"}]
}"#;

    fn setup() -> (TempDir, FilterArgs) {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("recipes.yml"), RECIPES).unwrap();
        fs::write(temp.path().join("host.json"), MANIFEST).unwrap();
        let args = FilterArgs {
            recipes: temp.path().join("recipes.yml"),
            probe: ProbeArgs {
                manifest: Some(temp.path().join("host.json")),
                shell: Some("/bin/sh".to_string()),
                ..Default::default()
            },
            concurrency: Some(2),
            deadline: None,
            no_scripts: false,
        };
        (temp, args)
    }

    #[test]
    fn filters_recipes_for_manifest() {
        let (temp, args) = setup();
        let cmd = FilterCommand::new(temp.path(), args);
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();

        assert!(result.success);
        assert_eq!(ui.successes(), &["java-agent (java-1)".to_string()]);
        assert!(ui.warnings()[0].contains("x-agent (x)"));
        assert!(ui
            .details()
            .contains(&("reason".to_string(), "unsupported-os".to_string())));
    }

    #[test]
    fn json_output_includes_statuses() {
        let (temp, mut args) = setup();
        args.probe.json = true;
        let cmd = FilterCommand::new(temp.path(), args);
        let mut ui = MockUI::new();

        cmd.execute(&mut ui).unwrap();

        let value: serde_json::Value = serde_json::from_str(&ui.raw_output()[0]).unwrap();
        assert_eq!(value["survivors"][0]["id"], "java-1");
        let statuses = value["statuses"].as_array().unwrap();
        assert!(statuses
            .iter()
            .any(|s| s["recipeId"] == "x" && s["status"] == "DETECTED"));
        assert!(statuses
            .iter()
            .any(|s| s["recipeId"] == "java-1" && s["status"] == "AVAILABLE"));
    }

    #[test]
    fn no_scripts_keeps_probe_recipes() {
        let (temp, mut args) = setup();
        args.no_scripts = true;
        let cmd = FilterCommand::new(temp.path(), args);
        let mut ui = MockUI::new();

        cmd.execute(&mut ui).unwrap();

        assert_eq!(ui.successes().len(), 2);
        assert!(ui.warnings().is_empty());
    }

    #[test]
    fn deadline_reports_partial_results() {
        let (temp, mut args) = setup();
        fs::write(
            temp.path().join("recipes.yml"),
            "- id: quick\n  name: quick\n  preInstall:\n    requireAtDiscovery: exit 0\n\
             - id: slow\n  name: slow\n  preInstall:\n    requireAtDiscovery: sleep 10\n",
        )
        .unwrap();
        args.concurrency = Some(1);
        args.deadline = Some(1);
        let cmd = FilterCommand::new(temp.path(), args);
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();

        assert_eq!(result.exit_code, 1);
        assert_eq!(ui.successes(), &["quick (quick)".to_string()]);
        assert_eq!(ui.skipped_lines(), &["slow not evaluated".to_string()]);
        assert!(ui.errors()[0].contains("Filtering cancelled after 1 of 2"));
    }

    #[test]
    fn missing_recipes_is_error() {
        let (temp, mut args) = setup();
        args.recipes = temp.path().join("missing");
        let cmd = FilterCommand::new(temp.path(), args);

        assert!(cmd.execute(&mut MockUI::new()).is_err());
    }
}
