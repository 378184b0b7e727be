//! Error types for recipe-sieve operations.
//!
//! This module defines [`SieveError`], the error type for failures that end a
//! whole filtering run, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `SieveError` for run-level failures (missing manifest, unreadable
//!   recipes, cancellation)
//! - Per-recipe failures never become a `SieveError`; they are collected as
//!   [`FilterError`](crate::filter::FilterError) values in the pipeline report
//! - Use `anyhow::Error` (via `SieveError::Other`) for unexpected errors

use crate::pipeline::FilterReport;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for recipe-sieve operations.
#[derive(Debug, Error)]
pub enum SieveError {
    /// No discovery manifest was supplied to the pipeline.
    #[error("Discovery manifest is missing; cannot filter recipes")]
    ManifestMissing,

    /// Host processes could not be enumerated at all.
    #[error("Process discovery failed: {message}")]
    ProcessDiscovery { message: String },

    /// The run was cancelled or its deadline elapsed before all recipes were evaluated.
    ///
    /// `partial` holds the decisions reached before cancellation and lists
    /// the recipes that were never evaluated.
    #[error("Filtering cancelled after {evaluated} of {total} recipes")]
    Cancelled {
        evaluated: usize,
        total: usize,
        partial: Box<FilterReport>,
    },

    /// Recipe file or directory does not exist.
    #[error("Recipe source not found: {path}")]
    RecipeNotFound { path: PathBuf },

    /// Failed to parse a recipe file.
    #[error("Failed to parse recipe at {path}: {message}")]
    RecipeParse { path: PathBuf, message: String },

    /// Two recipes share the same ID.
    #[error("Duplicate recipe id '{id}' in {path}")]
    DuplicateRecipe { id: String, path: PathBuf },

    /// Failed to parse a discovery manifest file.
    #[error("Failed to parse manifest at {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Pipeline stages were assembled in an invalid order.
    #[error("Invalid pipeline: {message}")]
    InvalidPipeline { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for recipe-sieve operations.
pub type Result<T> = std::result::Result<T, SieveError>;
