//! Host discovery: processes and platform facts.

pub mod manifest;
pub mod process;
pub mod scanner;

pub use manifest::DiscoveryManifest;
pub use process::{GenericProcess, ProcessInfo};
pub use scanner::discover_processes;
