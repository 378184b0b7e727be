//! recipe-sieve - Decide which install recipes apply to a host.
//!
//! Recipes are declarative install definitions for agents and integrations.
//! Before installing anything, recipe-sieve narrows the candidate list by
//! running each recipe through a chain of filters: install-target matching,
//! process-name matching against the running host, and finally a
//! recipe-supplied probe script whose exit code reports compatibility.
//!
//! # Modules
//!
//! - [`cancel`] - Cooperative cancellation and deadlines
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading and merging
//! - [`discovery`] - Host facts and process discovery
//! - [`error`] - Error types and result aliases
//! - [`filter`] - Filter strategies and probe outcome classification
//! - [`pipeline`] - Concurrent multi-stage filtering
//! - [`recipe`] - Recipe model, loading and script variables
//! - [`shell`] - Pre-install script execution
//! - [`status`] - Install status tracking and detection events
//! - [`ui`] - Terminal output
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use recipe_sieve::cancel::CancelToken;
//! use recipe_sieve::discovery::{DiscoveryManifest, ProcessInfo};
//! use recipe_sieve::filter::{ProcessMatchFilterer, ScriptCompatibilityProbe};
//! use recipe_sieve::pipeline::FilterPipeline;
//! use recipe_sieve::recipe::Recipe;
//! use recipe_sieve::shell::ScriptedExecutor;
//! use recipe_sieve::status::InstallStatus;
//!
//! let status = Arc::new(InstallStatus::new());
//! let pipeline = FilterPipeline::builder()
//!     .stage(ProcessMatchFilterer::new())
//!     .stage(ScriptCompatibilityProbe::new(
//!         Arc::new(ScriptedExecutor::new()),
//!         Arc::clone(&status),
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let recipes = vec![
//!     Recipe::new("java-1", "java-agent").with_process_match("java"),
//!     Recipe::new("nginx-1", "nginx-integration").with_process_match("nginx"),
//! ];
//! let manifest = DiscoveryManifest::default()
//!     .with_processes(vec![ProcessInfo::named("java")]);
//!
//! let report = pipeline
//!     .run(&recipes, Some(&manifest), &CancelToken::new())
//!     .unwrap();
//! assert_eq!(report.survivor_ids(), vec!["java-1"]);
//! ```

pub mod cancel;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod recipe;
pub mod shell;
pub mod status;
pub mod ui;

pub use error::{Result, SieveError};
