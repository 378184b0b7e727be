//! Install status tracking.
//!
//! # Modules
//!
//! - [`event`] - Status events recorded against recipes
//! - [`tracker`] - The shared, synchronized install status

pub mod event;
pub mod tracker;

pub use event::{Metadata, RecipeStatusEvent};
pub use tracker::{
    InstallStatus, LogSubscriber, RecipeStatus, RecipeStatusType, StatusSubscriber,
};
