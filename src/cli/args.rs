//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SieveConfig;
use crate::recipe::RecipeVars;

/// recipe-sieve - Decide which install recipes apply to this host.
#[derive(Debug, Parser)]
#[command(name = "recipe-sieve")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides default .recipe-sieve/config.yml)
    #[arg(short, long, global = true, env = "RECIPE_SIEVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Filter recipes down to those that apply to this host
    Filter(FilterArgs),

    /// Explain the filtering decision for a single recipe
    Check(CheckArgs),

    /// Print the discovery manifest for this host as JSON
    Discover(DiscoverArgs),
}

/// Options shared by commands that evaluate recipes.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ProbeArgs {
    /// Discovery manifest JSON file (default: scan this host)
    #[arg(short, long, env = "RECIPE_SIEVE_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Per-script timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub script_timeout: Option<u64>,

    /// Shell used to run pre-install scripts
    #[arg(long)]
    pub shell: Option<String>,

    /// Variable passed to every pre-install script (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

impl ProbeArgs {
    /// Apply flags on top of file configuration.
    pub fn apply(&self, config: &mut SieveConfig) {
        if let Some(timeout) = self.script_timeout {
            config.script_timeout_secs = timeout;
        }
        if let Some(shell) = &self.shell {
            config.shell = Some(shell.clone());
        }
        config.vars.extend(self.vars.iter().cloned());
    }

    /// Variables given on the command line.
    pub fn var_map(&self) -> RecipeVars {
        self.vars.iter().cloned().collect()
    }
}

/// Arguments for the `filter` command.
#[derive(Debug, Clone, clap::Args)]
pub struct FilterArgs {
    /// Recipe file or directory of recipe files
    pub recipes: PathBuf,

    #[command(flatten)]
    pub probe: ProbeArgs,

    /// Number of recipes evaluated at once
    #[arg(short = 'j', long, env = "RECIPE_SIEVE_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Overall deadline in seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Skip pre-install scripts (only run in-memory checks)
    #[arg(long)]
    pub no_scripts: bool,
}

impl FilterArgs {
    /// Apply flags on top of file configuration.
    pub fn apply(&self, config: &mut SieveConfig) {
        self.probe.apply(config);
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(deadline) = self.deadline {
            config.deadline_secs = Some(deadline);
        }
    }
}

/// Arguments for the `check` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CheckArgs {
    /// Recipe file or directory of recipe files
    pub recipes: PathBuf,

    /// ID of the recipe to check (required when the source holds several)
    #[arg(long)]
    pub id: Option<String>,

    #[command(flatten)]
    pub probe: ProbeArgs,
}

/// Arguments for the `discover` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct DiscoverArgs {
    /// Omit the process list
    #[arg(long)]
    pub no_processes: bool,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
