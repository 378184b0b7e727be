//! Scripted executor for testing.
//!
//! `ScriptedExecutor` implements [`PreInstallExecutor`] without running
//! anything. Results are configured per recipe ID and every call is
//! recorded for later assertion.
//!
//! # Example
//!
//! ```
//! use recipe_sieve::cancel::CancelToken;
//! use recipe_sieve::filter::{ExecutionError, PreInstallExecutor};
//! use recipe_sieve::recipe::{Recipe, RecipeVars};
//! use recipe_sieve::shell::ScriptedExecutor;
//!
//! let executor = ScriptedExecutor::new();
//! executor.respond("x", Err(ExecutionError::exited(132, "exit status 132")));
//!
//! let recipe = Recipe::new("x", "x-installer");
//! let result = executor.execute_pre_install(&CancelToken::new(), &recipe, &RecipeVars::new());
//!
//! assert!(result.unwrap_err().is_exit_status(132));
//! assert_eq!(executor.calls(), vec!["x".to_string()]);
//! ```

use crate::cancel::CancelToken;
use crate::filter::{ExecutionError, PreInstallExecutor};
use crate::recipe::{Recipe, RecipeVars};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Executor returning canned results.
///
/// Recipes without a configured response succeed.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, Result<(), ExecutionError>>>,
    calls: Mutex<Vec<String>>,
    vars: Mutex<HashMap<String, RecipeVars>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every call for `delay`, returning early if cancelled.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the result returned for `recipe_id`.
    pub fn respond(&self, recipe_id: &str, result: Result<(), ExecutionError>) {
        lock(&self.responses).insert(recipe_id.to_string(), result);
    }

    /// Recipe IDs executed, in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Variables passed for `recipe_id` on its last call.
    pub fn vars_for(&self, recipe_id: &str) -> Option<RecipeVars> {
        lock(&self.vars).get(recipe_id).cloned()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn hold(&self, cancel: &CancelToken) -> bool {
        let Some(delay) = self.delay else {
            return true;
        };
        let until = Instant::now() + delay;
        while Instant::now() < until {
            if cancel.is_cancelled() {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }
}

impl PreInstallExecutor for ScriptedExecutor {
    fn execute_pre_install(
        &self,
        cancel: &CancelToken,
        recipe: &Recipe,
        vars: &RecipeVars,
    ) -> Result<(), ExecutionError> {
        lock(&self.calls).push(recipe.id.clone());
        lock(&self.vars).insert(recipe.id.clone(), vars.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let finished = self.hold(cancel);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if !finished {
            return Err(ExecutionError::cancelled());
        }

        lock(&self.responses)
            .get(&recipe.id)
            .cloned()
            .unwrap_or(Ok(()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
