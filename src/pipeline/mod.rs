//! Recipe filtering pipeline.
//!
//! A [`FilterPipeline`] runs an ordered list of [`RecipeFilterer`] stages
//! over every candidate recipe. For each recipe the first stage that
//! excludes it ends evaluation, so later (more expensive) stages never see
//! recipes an earlier stage rejected.
//!
//! Recipes are evaluated by a bounded pool of worker threads. Results are
//! reassembled in input order, so the survivor list is stable regardless
//! of how the workers interleave.

pub mod report;

pub use report::{Exclusion, FilterReport};

use crate::cancel::CancelToken;
use crate::discovery::DiscoveryManifest;
use crate::error::{Result, SieveError};
use crate::filter::{ExecutionErrorKind, FilterCost, FilterError, FilterVerdict, RecipeFilterer};
use crate::recipe::Recipe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

/// Default number of recipes evaluated at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Ordered chain of filter stages.
pub struct FilterPipeline {
    stages: Vec<Arc<dyn RecipeFilterer>>,
    concurrency: usize,
}

/// What happened to one recipe.
enum Decision {
    Survived,
    Excluded(Exclusion),
}

impl FilterPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> FilterPipelineBuilder {
        FilterPipelineBuilder::new()
    }

    /// Stages in evaluation order.
    pub fn stages(&self) -> &[Arc<dyn RecipeFilterer>] {
        &self.stages
    }

    /// Stage names in evaluation order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of recipes evaluated at once.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Filter `recipes` against the host described by `manifest`.
    ///
    /// Per-recipe errors never fail the run; they are reported in
    /// [`FilterReport::excluded`].
    ///
    /// # Errors
    ///
    /// - [`SieveError::ManifestMissing`] if no manifest is supplied
    /// - [`SieveError::Cancelled`] if `cancel` trips before every recipe has
    ///   been evaluated. The error carries the partial report, including the
    ///   IDs of recipes never evaluated. Detections already recorded are kept.
    pub fn run(
        &self,
        recipes: &[Recipe],
        manifest: Option<&DiscoveryManifest>,
        cancel: &CancelToken,
    ) -> Result<FilterReport> {
        let manifest = manifest.ok_or(SieveError::ManifestMissing)?;
        let total = recipes.len();

        if cancel.is_cancelled() {
            let partial = FilterReport {
                unevaluated: recipes.iter().map(|r| r.id.clone()).collect(),
                ..Default::default()
            };
            return Err(SieveError::Cancelled {
                evaluated: 0,
                total,
                partial: Box::new(partial),
            });
        }

        let workers = self.concurrency.min(total).max(1);
        tracing::debug!(
            "Filtering {} recipes through {} stages with {} workers",
            total,
            self.stages.len(),
            workers
        );

        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<(usize, Decision)>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                scope.spawn(move || loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(recipe) = recipes.get(index) else {
                        break;
                    };
                    let Some(decision) = self.evaluate(recipe, manifest, cancel) else {
                        break;
                    };
                    if tx.send((index, decision)).is_err() {
                        break;
                    }
                });
            }
        });
        drop(tx);

        let mut decisions: Vec<Option<Decision>> = (0..total).map(|_| None).collect();
        for (index, decision) in rx {
            decisions[index] = Some(decision);
        }

        let mut report = FilterReport::default();
        for (recipe, decision) in recipes.iter().zip(decisions) {
            match decision {
                Some(Decision::Survived) => report.survivors.push(recipe.clone()),
                Some(Decision::Excluded(exclusion)) => report.excluded.push(exclusion),
                None => report.unevaluated.push(recipe.id.clone()),
            }
        }

        if !report.is_complete() {
            let evaluated = report.evaluated();
            tracing::warn!("Filtering cancelled after {} of {} recipes", evaluated, total);
            return Err(SieveError::Cancelled {
                evaluated,
                total,
                partial: Box::new(report),
            });
        }

        tracing::info!(
            "{} of {} recipes survived filtering",
            report.survivors.len(),
            total
        );
        Ok(report)
    }

    /// Run every stage over one recipe, stopping at the first exclusion.
    ///
    /// Returns `None` when cancellation interrupted the evaluation.
    fn evaluate(
        &self,
        recipe: &Recipe,
        manifest: &DiscoveryManifest,
        cancel: &CancelToken,
    ) -> Option<Decision> {
        for stage in &self.stages {
            if cancel.is_cancelled() {
                return None;
            }

            let FilterVerdict::Exclude(error) = stage.evaluate(recipe, manifest, cancel) else {
                continue;
            };

            if interrupted(error.as_ref()) && cancel.is_cancelled() {
                return None;
            }

            tracing::debug!("Recipe {} excluded by {}", recipe.id, stage.name());
            return Some(Decision::Excluded(Exclusion {
                recipe_id: recipe.id.clone(),
                recipe_name: recipe.name.clone(),
                stage: stage.name().to_string(),
                error,
            }));
        }

        Some(Decision::Survived)
    }
}

fn interrupted(error: Option<&FilterError>) -> bool {
    matches!(
        error,
        Some(FilterError::Execution(e)) if e.kind == ExecutionErrorKind::Cancelled
    )
}

/// Builder for [`FilterPipeline`].
///
/// Stages run in the order they are added. Every cheap stage must come
/// before the first expensive one; [`build`](Self::build) rejects a
/// pipeline that breaks this.
pub struct FilterPipelineBuilder {
    stages: Vec<Arc<dyn RecipeFilterer>>,
    concurrency: usize,
}

impl Default for FilterPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterPipelineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Append a stage.
    pub fn stage(mut self, filterer: impl RecipeFilterer + 'static) -> Self {
        self.stages.push(Arc::new(filterer));
        self
    }

    /// Append a shared stage.
    pub fn shared_stage(mut self, filterer: Arc<dyn RecipeFilterer>) -> Self {
        self.stages.push(filterer);
        self
    }

    /// Number of recipes evaluated at once. Values below 1 are raised to 1.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if a cheap stage follows an expensive one.
    pub fn build(self) -> Result<FilterPipeline> {
        let mut first_expensive: Option<&str> = None;
        for stage in &self.stages {
            match (stage.cost(), first_expensive) {
                (FilterCost::Expensive, None) => first_expensive = Some(stage.name()),
                (FilterCost::Cheap, Some(expensive)) => {
                    return Err(SieveError::InvalidPipeline {
                        message: format!(
                            "cheap stage '{}' must run before expensive stage '{}'",
                            stage.name(),
                            expensive
                        ),
                    });
                }
                _ => {}
            }
        }

        Ok(FilterPipeline {
            stages: self.stages,
            concurrency: self.concurrency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ProcessInfo;
    use crate::filter::{
        ExecutionError, InstallTargetFilterer, ProcessMatchFilterer, ScriptCompatibilityProbe,
    };
    use crate::shell::ScriptedExecutor;
    use crate::status::{InstallStatus, Metadata};
    use serde_json::json;
    use std::time::Duration;

    fn manifest(processes: &[&str]) -> DiscoveryManifest {
        DiscoveryManifest {
            os: "linux".to_string(),
            ..Default::default()
        }
        .with_processes(processes.iter().map(|p| ProcessInfo::named(p)).collect())
    }

    fn pipeline(
        executor: Arc<ScriptedExecutor>,
        status: Arc<InstallStatus>,
        concurrency: usize,
    ) -> FilterPipeline {
        FilterPipeline::builder()
            .stage(ProcessMatchFilterer::new())
            .stage(ScriptCompatibilityProbe::new(executor, status))
            .concurrency(concurrency)
            .build()
            .unwrap()
    }

    fn scripted(id: &str, pattern: &str) -> Recipe {
        Recipe::new(id, id)
            .with_process_match(pattern)
            .with_pre_install_script("./probe.sh")
    }

    #[test]
    fn survivors_keep_input_order() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.respond("b", Err(ExecutionError::exited(1, "exit status 1")));
        let status = Arc::new(InstallStatus::new());
        let recipes: Vec<Recipe> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| scripted(id, "java"))
            .collect();

        let report = pipeline(executor, status, 3)
            .run(&recipes, Some(&manifest(&["java"])), &CancelToken::new())
            .unwrap();

        assert_eq!(report.survivor_ids(), vec!["a", "c", "d", "e"]);
        assert_eq!(report.excluded.len(), 1);
        assert_eq!(report.excluded[0].stage, "script-evaluation");
    }

    #[test]
    fn process_rejection_skips_script() {
        let executor = Arc::new(ScriptedExecutor::new());
        let status = Arc::new(InstallStatus::new());
        let recipes = vec![scripted("nginx-1", "nginx"), scripted("java-1", "java")];

        let report = pipeline(Arc::clone(&executor), status, 2)
            .run(&recipes, Some(&manifest(&["java"])), &CancelToken::new())
            .unwrap();

        assert_eq!(report.survivor_ids(), vec!["java-1"]);
        assert_eq!(executor.calls(), vec!["java-1".to_string()]);
        let excluded = report.exclusion("nginx-1").unwrap();
        assert_eq!(excluded.stage, "process-match");
        assert!(excluded.error.is_none());
    }

    #[test]
    fn concurrent_detections_are_all_recorded() {
        let executor = Arc::new(ScriptedExecutor::new().with_delay(Duration::from_millis(10)));
        let mut recipes = Vec::new();
        for i in 0..24 {
            let id = format!("r{}", i);
            if i % 3 == 0 {
                executor.respond(&id, Err(ExecutionError::exited(132, "exit status 132")));
            }
            recipes.push(scripted(&id, "java"));
        }
        let status = Arc::new(InstallStatus::new());

        let report = pipeline(Arc::clone(&executor), Arc::clone(&status), 4)
            .run(&recipes, Some(&manifest(&["java"])), &CancelToken::new())
            .unwrap();

        assert_eq!(status.detected_count(), 8);
        assert_eq!(report.survivors.len(), 16);
        assert!(executor.max_in_flight() <= 4);
    }

    #[test]
    fn detection_metadata_reaches_report_and_status() {
        let mut metadata = Metadata::new();
        metadata.insert("reason".to_string(), json!("unsupported-os"));
        let executor = Arc::new(ScriptedExecutor::new());
        executor.respond(
            "x",
            Err(ExecutionError::exited(132, "exit status 132").with_metadata(metadata.clone())),
        );
        let status = Arc::new(InstallStatus::new());

        let report = pipeline(executor, Arc::clone(&status), 1)
            .run(&[scripted("x", "java")], Some(&manifest(&["java"])), &CancelToken::new())
            .unwrap();

        let (_, error) = report.errors().next().unwrap();
        assert!(error.is_detected_unsupported());
        assert_eq!(error.metadata(), Some(&metadata));
        assert_eq!(status.detected("x").unwrap().metadata, Some(metadata));
    }

    #[test]
    fn invalid_pattern_is_reported_not_fatal() {
        let executor = Arc::new(ScriptedExecutor::new());
        let status = Arc::new(InstallStatus::new());
        let recipes = vec![scripted("bad", "(java"), scripted("good", "java")];

        let report = pipeline(executor, status, 2)
            .run(&recipes, Some(&manifest(&["java"])), &CancelToken::new())
            .unwrap();

        assert_eq!(report.survivor_ids(), vec!["good"]);
        assert!(matches!(
            report.exclusion("bad").unwrap().error,
            Some(FilterError::Match(_))
        ));
    }

    #[test]
    fn missing_manifest_is_fatal() {
        let executor = Arc::new(ScriptedExecutor::new());
        let result = pipeline(executor, Arc::new(InstallStatus::new()), 1).run(
            &[scripted("a", "java")],
            None,
            &CancelToken::new(),
        );

        assert!(matches!(result, Err(SieveError::ManifestMissing)));
    }

    #[test]
    fn cancelled_before_start() {
        let executor = Arc::new(ScriptedExecutor::new());
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = pipeline(Arc::clone(&executor), Arc::new(InstallStatus::new()), 2).run(
            &[scripted("a", "java"), scripted("b", "java")],
            Some(&manifest(&["java"])),
            &cancel,
        );

        assert!(matches!(
            &result,
            Err(SieveError::Cancelled {
                evaluated: 0,
                total: 2,
                partial,
            }) if partial.unevaluated == ["a", "b"]
        ));
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn deadline_during_run_is_fatal_and_keeps_detections() {
        let executor = Arc::new(ScriptedExecutor::new().with_delay(Duration::from_millis(100)));
        executor.respond("r0", Err(ExecutionError::exited(132, "exit status 132")));
        let status = Arc::new(InstallStatus::new());
        let recipes: Vec<Recipe> = (0..20).map(|i| scripted(&format!("r{}", i), "java")).collect();
        let cancel = CancelToken::with_timeout(Duration::from_millis(250));

        let result = pipeline(executor, Arc::clone(&status), 1).run(
            &recipes,
            Some(&manifest(&["java"])),
            &cancel,
        );

        match result {
            Err(SieveError::Cancelled {
                evaluated,
                total,
                partial,
            }) => {
                assert!(evaluated < total);
                assert_eq!(total, 20);
                assert_eq!(partial.evaluated(), evaluated);
                assert_eq!(partial.unevaluated.len(), total - evaluated);
                assert!(partial.unevaluated.contains(&"r19".to_string()));
                let r0 = partial.exclusion("r0").unwrap();
                assert!(matches!(r0.error, Some(FilterError::DetectedUnsupported(_))));
                assert!(partial.survivors.iter().all(|r| r.id == "r1"));
            }
            other => panic!("expected cancellation, got {:?}", other.map(|r| r.total())),
        }
        assert!(status.detected("r0").is_some());
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let executor = Arc::new(ScriptedExecutor::new());
        let report = pipeline(executor, Arc::new(InstallStatus::new()), 4)
            .run(&[], Some(&manifest(&[])), &CancelToken::new())
            .unwrap();
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn builder_rejects_cheap_after_expensive() {
        let executor = Arc::new(ScriptedExecutor::new());
        let result = FilterPipeline::builder()
            .stage(ScriptCompatibilityProbe::new(executor, Arc::new(InstallStatus::new())))
            .stage(ProcessMatchFilterer::new())
            .build();

        assert!(matches!(result, Err(SieveError::InvalidPipeline { .. })));
    }

    #[test]
    fn builder_accepts_cheap_stages_in_any_order() {
        let pipeline = FilterPipeline::builder()
            .stage(ProcessMatchFilterer::new())
            .stage(InstallTargetFilterer::new())
            .concurrency(0)
            .build()
            .unwrap();

        assert_eq!(pipeline.stage_names(), vec!["process-match", "install-target"]);
        assert_eq!(pipeline.concurrency(), 1);
    }
}
