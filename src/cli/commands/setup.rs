//! Shared construction for recipe-evaluating commands.

use std::path::Path;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::config::SieveConfig;
use crate::discovery::DiscoveryManifest;
use crate::error::Result;
use crate::filter::{InstallTargetFilterer, ProcessMatchFilterer, ScriptCompatibilityProbe};
use crate::pipeline::FilterPipeline;
use crate::shell::ShellExecutor;
use crate::status::InstallStatus;

/// Load the manifest from `path`, or scan this host when no path is given.
pub fn load_manifest(path: Option<&Path>) -> Result<DiscoveryManifest> {
    match path {
        Some(path) => {
            tracing::debug!("Reading discovery manifest from {}", path.display());
            DiscoveryManifest::load(path)
        }
        None => DiscoveryManifest::discover(),
    }
}

/// Shell executor configured from `config`.
pub fn build_executor(config: &SieveConfig, project_root: &Path) -> ShellExecutor {
    ShellExecutor::new(config.shell())
        .with_timeout(config.script_timeout())
        .with_cwd(project_root)
}

/// Script probe configured from `config`.
pub fn build_probe(
    config: &SieveConfig,
    project_root: &Path,
    status: Arc<InstallStatus>,
) -> ScriptCompatibilityProbe {
    let executor = Arc::new(build_executor(config, project_root));
    ScriptCompatibilityProbe::new(executor, status).with_vars(config.vars.clone())
}

/// The standard pipeline: install targets, process match, then scripts.
pub fn build_pipeline(
    config: &SieveConfig,
    project_root: &Path,
    status: Arc<InstallStatus>,
    run_scripts: bool,
) -> Result<FilterPipeline> {
    let mut builder = FilterPipeline::builder()
        .stage(InstallTargetFilterer::new())
        .stage(ProcessMatchFilterer::new())
        .concurrency(config.concurrency());

    if run_scripts {
        builder = builder.stage(build_probe(config, project_root, status));
    }

    builder.build()
}

/// Cancellation token carrying the configured deadline.
pub fn cancel_token(config: &SieveConfig) -> CancelToken {
    match config.deadline() {
        Some(deadline) => CancelToken::with_timeout(deadline),
        None => CancelToken::new(),
    }
}
