//! Install-target matching.
//!
//! Recipes may restrict themselves to particular hosts with
//! `installTargets`. A recipe passes when it declares no targets or when at
//! least one target matches the discovery manifest.

use crate::cancel::CancelToken;
use crate::discovery::DiscoveryManifest;
use crate::filter::{FilterCost, FilterError, FilterVerdict, RecipeFilterer};
use crate::recipe::{InstallTarget, Recipe};
use regex::Regex;

/// Pipeline stage that drops recipes not built for this host.
#[derive(Debug, Default)]
pub struct InstallTargetFilterer;

impl InstallTargetFilterer {
    pub fn new() -> Self {
        Self
    }
}

impl RecipeFilterer for InstallTargetFilterer {
    fn name(&self) -> &str {
        "install-target"
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
        if recipe.install_targets.is_empty() {
            return FilterVerdict::Keep;
        }

        for target in &recipe.install_targets {
            match target_matches(target, manifest) {
                Ok(true) => return FilterVerdict::Keep,
                Ok(false) => {}
                Err((pattern, message)) => {
                    tracing::warn!(
                        "Recipe {} has an invalid platform version pattern '{}'",
                        recipe.id,
                        pattern
                    );
                    return FilterVerdict::Exclude(Some(FilterError::Target {
                        recipe_id: recipe.id.clone(),
                        pattern,
                        message,
                    }));
                }
            }
        }

        tracing::debug!("Recipe {} has no install target for this host", recipe.id);
        FilterVerdict::Exclude(None)
    }
}

fn target_matches(
    target: &InstallTarget,
    manifest: &DiscoveryManifest,
) -> Result<bool, (String, String)> {
    let text_fields = [
        (&target.os, Some(&manifest.os)),
        (&target.platform, manifest.platform.as_ref()),
        (&target.platform_family, manifest.platform_family.as_ref()),
        (&target.kernel_arch, manifest.kernel_arch.as_ref()),
    ];

    for (wanted, actual) in text_fields {
        if let Some(wanted) = wanted {
            if !actual.is_some_and(|a| a.eq_ignore_ascii_case(wanted)) {
                return Ok(false);
            }
        }
    }

    if let Some(pattern) = &target.platform_version {
        let re = Regex::new(pattern).map_err(|e| (pattern.clone(), e.to_string()))?;
        let Some(version) = &manifest.platform_version else {
            return Ok(false);
        };
        if !re.is_match(version) {
            return Ok(false);
        }
    }

    Ok(true)
}
