//! Event loop configuration
//!
//! Loaded from a small JSON document, e.g.
//!
//! ```json
//! { "microtaskBudget": 512, "trackUnhandledRejections": true }
//! ```
//!
//! Missing keys fall back to [`EventLoopConfig::default`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{messages, Error, Result};

/// Default number of microtasks drained per tick
pub const DEFAULT_MICROTASK_BUDGET: usize = 10_000;

/// Tunables for [`EventLoop`](crate::event_loop::EventLoop)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventLoopConfig {
    /// Maximum microtasks drained per tick (starvation protection)
    pub microtask_budget: usize,
    /// Record rejections that nobody reacts to
    pub track_unhandled_rejections: bool,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            microtask_budget: DEFAULT_MICROTASK_BUDGET,
            track_unhandled_rejections: true,
        }
    }
}

impl EventLoopConfig {
    /// Load a config from a JSON string
    pub fn load(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::load(&text)
    }

    /// Reject values the event loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.microtask_budget == 0 {
            return Err(Error::Config(messages::must_be(
                "microtaskBudget",
                messages::BUDGET_TOO_SMALL,
            )));
        }
        Ok(())
    }
}
