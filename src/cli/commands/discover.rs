//! Discover command implementation.
//!
//! The `recipe-sieve discover` command prints this host's discovery
//! manifest. The output can be saved and passed back with `--manifest`.

use crate::cli::args::DiscoverArgs;
use crate::discovery::DiscoveryManifest;
use crate::error::Result;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The discover command implementation.
pub struct DiscoverCommand {
    args: DiscoverArgs,
}

impl DiscoverCommand {
    /// Create a new discover command.
    pub fn new(args: DiscoverArgs) -> Self {
        Self { args }
    }
}

impl Command for DiscoverCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let manifest = if self.args.no_processes {
            DiscoveryManifest::for_current_host(Vec::new())
        } else {
            DiscoveryManifest::discover()?
        };

        let json = serde_json::to_string_pretty(&manifest).map_err(anyhow::Error::from)?;
        ui.raw(&json);
        Ok(CommandResult::success())
    }
}
