//! Local recipe loading.
//!
//! Recipes are read from YAML. A path may point at a single file (holding
//! one recipe or a list of recipes) or at a directory, in which case every
//! `*.yml` / `*.yaml` file directly inside it is loaded in file-name order.

use crate::error::{Result, SieveError};
use crate::recipe::schema::Recipe;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A recipe file holds either one recipe or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeDocument {
    Many(Vec<Recipe>),
    One(Box<Recipe>),
}

/// Load all recipes from a file or directory.
///
/// # Errors
///
/// Returns `RecipeNotFound` if the path does not exist, `RecipeParse` if a
/// file is not valid recipe YAML or a recipe has an empty id, and
/// `DuplicateRecipe` if two recipes share an id.
pub fn load_recipes(path: &Path) -> Result<Vec<Recipe>> {
    if !path.exists() {
        return Err(SieveError::RecipeNotFound {
            path: path.to_path_buf(),
        });
    }

    let files = if path.is_dir() {
        recipe_files_in(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut recipes = Vec::new();
    let mut seen = HashSet::new();

    for file in files {
        for recipe in load_recipe_file(&file)? {
            if !seen.insert(recipe.id.clone()) {
                return Err(SieveError::DuplicateRecipe {
                    id: recipe.id,
                    path: file,
                });
            }
            recipes.push(recipe);
        }
    }

    tracing::debug!("Loaded {} recipes from {}", recipes.len(), path.display());
    Ok(recipes)
}

/// Load the recipes declared in a single YAML file.
pub fn load_recipe_file(path: &Path) -> Result<Vec<Recipe>> {
    let content = fs::read_to_string(path)?;
    parse_recipes(&content).map_err(|message| SieveError::RecipeParse {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse recipe YAML content.
///
/// Returns the parse failure as a plain message so callers can attach the
/// source location.
pub fn parse_recipes(content: &str) -> std::result::Result<Vec<Recipe>, String> {
    let document: RecipeDocument = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    let recipes = match document {
        RecipeDocument::Many(recipes) => recipes,
        RecipeDocument::One(recipe) => vec![*recipe],
    };

    if let Some(bad) = recipes.iter().find(|r| r.id.trim().is_empty()) {
        return Err(format!("recipe '{}' has an empty id", bad.name));
    }

    Ok(recipes)
}

fn recipe_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yml") | Some("yaml")
            )
        })
        .collect();
    files.sort();
    Ok(files)
}
