//! Host process discovery.
//!
//! On Linux, processes are enumerated from `/proc` with the `procfs` crate.
//! Other platforms have no scanner; callers supply a manifest file instead.

use crate::discovery::process::ProcessInfo;
use crate::error::{Result, SieveError};

/// Enumerate processes running on this host.
///
/// Individual processes that vanish or deny access mid-scan are skipped.
///
/// # Errors
///
/// Returns `ProcessDiscovery` if the process table cannot be read at all.
#[cfg(target_os = "linux")]
pub fn discover_processes() -> Result<Vec<ProcessInfo>> {
    let all = procfs::process::all_processes().map_err(|e| SieveError::ProcessDiscovery {
        message: e.to_string(),
    })?;

    let mut processes = Vec::new();
    for entry in all {
        let proc = match entry {
            Ok(p) => p,
            Err(e) => {
                tracing::trace!("Skipping inaccessible process: {}", e);
                continue;
            }
        };

        let stat = match proc.stat() {
            Ok(s) => s,
            Err(e) => {
                tracing::trace!("Skipping process {}: {}", proc.pid(), e);
                continue;
            }
        };

        let cmdline = proc
            .cmdline()
            .ok()
            .filter(|args| !args.is_empty())
            .map(|args| args.join(" "));

        processes.push(ProcessInfo {
            name: stat.comm,
            pid: u32::try_from(stat.pid).ok(),
            cmdline,
        });
    }

    tracing::debug!("Discovered {} processes", processes.len());
    Ok(processes)
}

/// Enumerate processes running on this host.
///
/// Not supported on this platform.
#[cfg(not(target_os = "linux"))]
pub fn discover_processes() -> Result<Vec<ProcessInfo>> {
    Err(SieveError::ProcessDiscovery {
        message: format!(
            "process discovery is not supported on {}; pass a manifest file instead",
            std::env::consts::OS
        ),
    })
}
