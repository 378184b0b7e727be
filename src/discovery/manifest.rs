//! Host discovery manifest.
//!
//! The manifest is an immutable snapshot of host facts taken once per
//! filtering pass. It can be detected from the running host or read from a
//! JSON file (useful for evaluating recipes against another machine's
//! inventory).

use crate::discovery::process::ProcessInfo;
use crate::error::{Result, SieveError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Snapshot of host facts available to filterers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryManifest {
    /// Operating system (e.g., "linux", "macos", "windows")
    pub os: String,

    /// Distribution or platform name (e.g., "ubuntu")
    #[serde(default)]
    pub platform: Option<String>,

    /// Platform family (e.g., "debian", "rhel")
    #[serde(default)]
    pub platform_family: Option<String>,

    /// Platform version (e.g., "22.04")
    #[serde(default)]
    pub platform_version: Option<String>,

    /// CPU architecture (e.g., "x86_64")
    #[serde(default)]
    pub kernel_arch: Option<String>,

    /// Host name
    #[serde(default)]
    pub hostname: Option<String>,

    /// Processes discovered on the host
    #[serde(default)]
    pub discovered_processes: Vec<ProcessInfo>,
}

impl DiscoveryManifest {
    /// Build a manifest describing the current host with the given processes.
    pub fn for_current_host(processes: Vec<ProcessInfo>) -> Self {
        let os_release = read_os_release();
        Self {
            os: std::env::consts::OS.to_string(),
            platform: os_release.as_ref().and_then(|r| r.id.clone()),
            platform_family: os_release.as_ref().and_then(|r| r.id_like.clone()),
            platform_version: os_release.and_then(|r| r.version_id),
            kernel_arch: Some(std::env::consts::ARCH.to_string()),
            hostname: read_hostname(),
            discovered_processes: processes,
        }
    }

    /// Detect host facts and scan running processes.
    pub fn discover() -> Result<Self> {
        let processes = crate::discovery::scanner::discover_processes()?;
        Ok(Self::for_current_host(processes))
    }

    /// Load a manifest from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| SieveError::ManifestParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Replace the discovered process list.
    pub fn with_processes(mut self, processes: Vec<ProcessInfo>) -> Self {
        self.discovered_processes = processes;
        self
    }

    /// Processes discovered on the host.
    pub fn processes(&self) -> &[ProcessInfo] {
        &self.discovered_processes
    }
}

/// Fields of interest from `/etc/os-release`.
#[derive(Debug, Default, PartialEq)]
struct OsRelease {
    id: Option<String>,
    id_like: Option<String>,
    version_id: Option<String>,
}

fn read_os_release() -> Option<OsRelease> {
    fs::read_to_string("/etc/os-release")
        .ok()
        .map(|content| parse_os_release(&content))
}

fn parse_os_release(content: &str) -> OsRelease {
    let mut release = OsRelease::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim() {
            "ID" => release.id = Some(value),
            "ID_LIKE" => release.id_like = Some(value),
            "VERSION_ID" => release.version_id = Some(value),
            _ => {}
        }
    }
    release
}

fn read_hostname() -> Option<String> {
    std::env::var("HOSTNAME").ok().or_else(|| {
        fs::read_to_string("/etc/hostname")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn current_host_reports_os_and_arch() {
        let manifest = DiscoveryManifest::for_current_host(vec![ProcessInfo::named("init")]);
        assert_eq!(manifest.os, std::env::consts::OS);
        assert_eq!(manifest.kernel_arch.as_deref(), Some(std::env::consts::ARCH));
        assert_eq!(manifest.processes().len(), 1);
    }

    #[test]
    fn parses_os_release_fields() {
        let content = "NAME=\"Ubuntu\"\nID=ubuntu\nID_LIKE=debian\nVERSION_ID=\"22.04\"\n";
        let release = parse_os_release(content);
        assert_eq!(
            release,
            OsRelease {
                id: Some("ubuntu".to_string()),
                id_like: Some("debian".to_string()),
                version_id: Some("22.04".to_string()),
            }
        );
    }

    #[test]
    fn loads_manifest_from_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manifest.json");
        fs::write(
            &path,
            r#"{"os":"linux","platform":"ubuntu","discoveredProcesses":[{"name":"java"}]}"#,
        )
        .unwrap();

        let manifest = DiscoveryManifest::load(&path).unwrap();

        assert_eq!(manifest.os, "linux");
        assert_eq!(manifest.platform.as_deref(), Some("ubuntu"));
        assert_eq!(manifest.processes()[0].name, "java");
    }

    #[test]
    fn invalid_manifest_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manifest.json");
        fs::write(&path, "{not json").unwrap();

        let result = DiscoveryManifest::load(&path);

        assert!(matches!(result, Err(SieveError::ManifestParse { .. })));
    }

    #[test]
    fn with_processes_replaces_list() {
        let manifest = DiscoveryManifest::default()
            .with_processes(vec![ProcessInfo::named("a"), ProcessInfo::named("b")]);
        assert_eq!(manifest.processes().len(), 2);
    }
}
