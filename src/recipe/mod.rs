//! Installation recipes.
//!
//! # Modules
//!
//! - [`schema`] - The recipe data model
//! - [`loader`] - Loading recipes from YAML files and directories
//! - [`vars`] - Variable templating for pre-install scripts

pub mod loader;
pub mod schema;
pub mod vars;

pub use loader::{load_recipe_file, load_recipes, parse_recipes};
pub use schema::{InstallTarget, PreInstall, Recipe};
pub use vars::{merge_vars, render_script, RecipeVars};
