//! Pre-install script execution.

pub mod executor;
pub mod mock;

pub use executor::{
    default_shell, ShellExecutor, DEFAULT_SCRIPT_TIMEOUT, MAX_CAPTURE_BYTES, OUTPUT_FILE_ENV,
};
pub use mock::ScriptedExecutor;
