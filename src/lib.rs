//! Deferred: a Promises/A+ deferred value for Rust
//!
//! A [`Promise`] represents the eventual result of an asynchronous operation.
//! It starts pending, settles exactly once (fulfilled with a value or rejected
//! with a reason), and lets callers chain reactions with [`Promise::then`],
//! [`Promise::catch`] and [`Promise::finally`], or combine many promises with
//! [`Promise::all`] and [`Promise::race`].
//!
//! Reactions never run inline. They are handed to an injected [`Scheduler`];
//! [`EventLoop`] is the in-process one, flushed with
//! [`EventLoop::run_to_completion`].
//!
//! # Quick Start
//!
//! ```
//! use deferred::{Function, Runtime, Value};
//!
//! fn main() -> deferred::Result<()> {
//!     let runtime = Runtime::new();
//!     let doubled = runtime
//!         .resolve_with(21)
//!         .then(
//!             Some(Function::unary("double", |v| {
//!                 Ok(Value::from(v.as_number().unwrap_or_default() * 2.0))
//!             })),
//!             None,
//!         );
//!     assert_eq!(runtime.block_on(&doubled)?, Value::from(42));
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`runtime`] | [`Promise`], [`Value`], [`Function`], [`Runtime`] |
//! | [`event_loop`] | [`Scheduler`], [`EventLoop`], statistics |
//! | [`config`] | [`EventLoopConfig`] |
//! | [`error`](Error) | [`Error`], [`ErrorKind`], [`Result`] |

pub mod config;
pub mod event_loop;
pub mod runtime;

mod error;

pub use config::EventLoopConfig;
pub use error::{messages, Error, ErrorKind, Result};
pub use event_loop::{EventLoop, EventLoopStats, PromiseEvent, RunResult, Scheduler, SchedulerRef, Task, TimerId};
pub use runtime::{Function, Promise, PromiseId, PromiseState, Rejecter, Resolver, Runtime, Value};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
