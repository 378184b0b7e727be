//! Configuration loading.
//!
//! - Schema and defaults in [`schema`]
//! - File discovery, loading and merging in [`loader`]
//!
//! # Example
//!
//! ```
//! use recipe_sieve::config::load_merged_config;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".recipe-sieve");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("config.yml"), "concurrency: 2").unwrap();
//!
//! let config = load_merged_config(temp.path()).unwrap();
//! assert_eq!(config.concurrency(), 2);
//! ```
//!
//! # Configuration File Locations
//!
//! Files are merged in this order, later files overriding earlier ones
//! field by field:
//! 1. User global config (`~/.recipe-sieve/config.yml`)
//! 2. Project config (`.recipe-sieve/config.yml`)
//!
//! Command-line flags override both.

pub mod loader;
pub mod schema;

pub use loader::{
    load_config, load_config_file, load_from_paths, load_merged_config, parse_config,
    ConfigPaths, CONFIG_DIR, CONFIG_FILE,
};
pub use schema::SieveConfig;
