//! Runtime environment for deferred values
//!
//! This module provides the promise state machine, the dynamic value model it
//! settles with, and a [`Runtime`] bundling both with an event loop.

mod combinators;
mod promise;
mod value;

pub use promise::{Promise, PromiseId, PromiseState, Rejecter, Resolver};
pub use value::{Function, NativeFn, Value};

use crate::config::EventLoopConfig;
use crate::error::{Error, Result};
use crate::event_loop::{EventLoop, RunResult, SchedulerRef};

/// An event loop plus the scheduler handle promises settle through
pub struct Runtime {
    event_loop: EventLoop,
    scheduler: SchedulerRef,
}

impl Runtime {
    /// Create a new runtime
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    /// Create a new runtime with an explicit event loop configuration
    pub fn with_config(config: EventLoopConfig) -> Self {
        let event_loop = EventLoop::with_config(config);
        let scheduler = event_loop.scheduler();
        Self {
            event_loop,
            scheduler,
        }
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    pub fn scheduler(&self) -> &SchedulerRef {
        &self.scheduler
    }

    /// See [`Promise::new`]
    pub fn promise<F>(&self, initializer: F) -> Promise
    where
        F: FnOnce(Resolver, Rejecter) -> Result<()>,
    {
        Promise::new(&self.scheduler, initializer)
    }

    /// See [`Promise::resolve_with`]
    pub fn resolve_with(&self, value: impl Into<Value>) -> Promise {
        Promise::resolve_with(&self.scheduler, value)
    }

    /// See [`Promise::reject_with`]
    pub fn reject_with(&self, reason: impl Into<Value>) -> Promise {
        Promise::reject_with(&self.scheduler, reason)
    }

    /// See [`Promise::all`]
    pub fn all(&self, items: impl IntoIterator<Item = Value>) -> Promise {
        Promise::all(&self.scheduler, items)
    }

    /// See [`Promise::race`]
    pub fn race(&self, items: impl IntoIterator<Item = Value>) -> Promise {
        Promise::race(&self.scheduler, items)
    }

    /// Run the event loop until it is idle
    pub fn run(&self) -> RunResult {
        self.event_loop.run_to_completion()
    }

    /// Run the event loop until idle and report how `promise` ended up.
    /// A rejection comes back as [`Error::Thrown`] carrying the reason.
    pub fn block_on(&self, promise: &Promise) -> Result<Value> {
        self.run();
        match (promise.result(), promise.reason()) {
            (Some(value), _) => Ok(value),
            (None, Some(reason)) => Err(Error::Thrown(reason)),
            (None, None) => Err(Error::type_error(format!(
                "promise {} never settled",
                promise.id()
            ))),
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
