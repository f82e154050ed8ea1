//! Event Loop Implementation
//!
//! Promises never run handlers inline. Every reaction is handed to a
//! [`Scheduler`], which only promises to run it after the current synchronous
//! execution. [`EventLoop`] is the in-process implementation: a FIFO
//! microtask queue drained under a per-tick budget, plus virtual-time timers
//! for macrotasks.

use crate::config::EventLoopConfig;
use crate::runtime::{PromiseId, PromiseState, Value};
use rustc_hash::FxHashMap as HashMap;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, warn};

/// A deferred unit of work
pub type Task = Box<dyn FnOnce()>;

/// Shared handle to the scheduler a promise settles through
pub type SchedulerRef = Rc<dyn Scheduler>;

/// Lifecycle notifications emitted by promises
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseEvent {
    /// A promise was created
    Created(PromiseId),
    /// A promise left the pending state
    Settled {
        promise: PromiseId,
        state: PromiseState,
    },
    /// A promise was rejected while nothing was listening for it
    UnhandledRejection { promise: PromiseId, reason: Value },
    /// A reaction was attached to a promise previously reported as unhandled
    RejectionHandled(PromiseId),
}

/// "Run later" primitive used for every reaction
pub trait Scheduler {
    /// Enqueue a task to run after the current synchronous execution
    fn enqueue(&self, task: Task);

    /// Observe promise lifecycle events. Ignored by default.
    fn observe(&self, _event: PromiseEvent) {}
}

impl<F> Scheduler for F
where
    F: Fn(Task),
{
    fn enqueue(&self, task: Task) {
        self(task)
    }
}

/// Timer handle returned by [`EventLoop::set_timeout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// A macrotask to be executed once virtual time reaches `fire_at`
struct Macrotask {
    id: TimerId,
    callback: Task,
    fire_at: u64,
}

/// Result of running the event loop to completion via `run_to_completion()`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Total number of microtasks that were dequeued and processed
    pub microtasks_processed: usize,
    /// Total number of macrotasks that were dequeued and processed
    pub macrotasks_processed: usize,
    /// Number of full event loop iterations (each iteration = drain microtasks + one macrotask)
    pub iterations: usize,
    /// The virtual time when the event loop finished
    pub final_time: u64,
}

/// Runtime statistics for the event loop
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLoopStats {
    /// Total microtasks processed across all ticks
    pub total_microtasks: u64,
    /// Total macrotasks processed across all ticks
    pub total_macrotasks: u64,
    /// Total number of event loop ticks
    pub total_ticks: u64,
    /// Maximum microtasks drained in a single tick
    pub max_microtasks_per_tick: u64,
    /// Total promises created
    pub total_promises_created: u64,
    /// Total promises settled (fulfilled or rejected)
    pub total_promises_settled: u64,
}

struct LoopState {
    /// Microtask queue (high priority - runs between macrotasks)
    microtask_queue: VecDeque<Task>,
    /// Timer queue
    macrotask_queue: Vec<Macrotask>,
    /// Current virtual time in milliseconds
    virtual_time: u64,
    next_timer_id: u64,
    /// Rejections nobody has reacted to yet
    unhandled_rejections: HashMap<PromiseId, Value>,
    config: EventLoopConfig,
    stats: EventLoopStats,
}

/// Single-threaded event loop. Cloning yields another handle to the same loop.
#[derive(Clone)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    /// Create a new event loop with the default configuration
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    /// Create a new event loop
    pub fn with_config(config: EventLoopConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(LoopState {
                microtask_queue: VecDeque::new(),
                macrotask_queue: Vec::new(),
                virtual_time: 0,
                next_timer_id: 1,
                unhandled_rejections: HashMap::default(),
                config,
                stats: EventLoopStats::default(),
            })),
        }
    }

    /// Scheduler handle for promises settling on this loop
    pub fn scheduler(&self) -> SchedulerRef {
        Rc::new(self.clone())
    }

    /// Get current virtual time
    pub fn current_time(&self) -> u64 {
        self.state.borrow().virtual_time
    }

    /// Advance virtual time without running anything
    pub fn advance_time(&self, ms: u64) {
        self.state.borrow_mut().virtual_time += ms;
    }

    /// Enqueue a plain microtask
    pub fn queue_microtask(&self, callback: impl FnOnce() + 'static) {
        self.enqueue(Box::new(callback));
    }

    /// Schedule `callback` to run once `delay` virtual milliseconds have passed
    pub fn set_timeout(&self, callback: impl FnOnce() + 'static, delay: u64) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = TimerId(state.next_timer_id);
        state.next_timer_id += 1;

        let fire_at = state.virtual_time + delay;
        state.macrotask_queue.push(Macrotask {
            id,
            callback: Box::new(callback),
            fire_at,
        });
        id
    }

    /// Cancel a timer. Returns `false` if it already fired or never existed.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let mut state = self.state.borrow_mut();
        match state.macrotask_queue.iter().position(|t| t.id == id) {
            Some(idx) => {
                state.macrotask_queue.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Number of queued microtasks
    pub fn pending_microtasks(&self) -> usize {
        self.state.borrow().microtask_queue.len()
    }

    /// Check if there are pending microtasks
    pub fn has_pending_microtasks(&self) -> bool {
        self.pending_microtasks() > 0
    }

    /// Check if there are pending timers
    pub fn has_pending_macrotasks(&self) -> bool {
        !self.state.borrow().macrotask_queue.is_empty()
    }

    /// Check if the event loop has any pending work
    pub fn has_pending_work(&self) -> bool {
        self.has_pending_microtasks() || self.has_pending_macrotasks()
    }

    /// Drain microtasks up to the budget limit, including ones enqueued while
    /// draining. Returns how many ran.
    pub fn run_microtasks(&self) -> usize {
        let budget = self.microtask_budget();
        let mut count: usize = 0;

        while count < budget {
            let task = self.state.borrow_mut().microtask_queue.pop_front();
            let Some(task) = task else {
                break;
            };
            task();
            count += 1;
        }

        let mut state = self.state.borrow_mut();
        state.stats.total_microtasks += count as u64;
        if (count as u64) > state.stats.max_microtasks_per_tick {
            state.stats.max_microtasks_per_tick = count as u64;
        }
        count
    }

    /// Run the event loop to completion following the standard algorithm:
    ///   1. Drain all microtasks
    ///   2. If a timer is ready, execute it (advance time if needed)
    ///   3. Repeat from step 1
    ///   4. Stop when no microtasks and no timers remain
    ///
    /// Returns a `RunResult` with statistics about what was processed.
    pub fn run_to_completion(&self) -> RunResult {
        let mut result = RunResult::default();

        loop {
            result.microtasks_processed += self.run_microtasks();
            self.state.borrow_mut().stats.total_ticks += 1;

            // Budget exhausted - give the remaining microtasks another tick
            if self.has_pending_microtasks() {
                result.iterations += 1;
                continue;
            }

            match self.next_macrotask() {
                Some(task) => {
                    task();
                    result.macrotasks_processed += 1;
                    result.iterations += 1;
                    self.state.borrow_mut().stats.total_macrotasks += 1;
                }
                None => break,
            }
        }

        result.final_time = self.current_time();
        debug!(
            microtasks = result.microtasks_processed,
            macrotasks = result.macrotasks_processed,
            final_time = result.final_time,
            "event loop idle"
        );
        result
    }

    /// Take the earliest timer, advancing virtual time to it if it is not due yet
    fn next_macrotask(&self) -> Option<Task> {
        let mut state = self.state.borrow_mut();
        let idx = state
            .macrotask_queue
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.fire_at, t.id.0))
            .map(|(i, _)| i)?;

        let task = state.macrotask_queue.remove(idx);
        if task.fire_at > state.virtual_time {
            state.virtual_time = task.fire_at;
        }
        Some(task.callback)
    }

    /// Set the maximum number of microtasks to drain per tick (starvation protection).
    pub fn set_microtask_budget(&self, limit: usize) {
        self.state.borrow_mut().config.microtask_budget = limit.max(1);
    }

    /// Get the current microtask budget limit.
    pub fn microtask_budget(&self) -> usize {
        self.state.borrow().config.microtask_budget
    }

    /// Get and clear unhandled rejections, oldest promise first.
    ///
    /// While tracking is enabled each recorded reason stays alive here until
    /// it is drained or its promise gains a handler.
    pub fn drain_unhandled_rejections(&self) -> Vec<(PromiseId, Value)> {
        let mut drained: Vec<_> = self
            .state
            .borrow_mut()
            .unhandled_rejections
            .drain()
            .collect();
        drained.sort_by_key(|(id, _)| *id);
        for (id, reason) in &drained {
            warn!(promise = %id, reason = %reason, "unhandled promise rejection");
        }
        drained
    }

    /// Get a snapshot of the current event loop statistics.
    pub fn stats(&self) -> EventLoopStats {
        self.state.borrow().stats.clone()
    }

    /// Reset all event loop statistics to zero.
    pub fn reset_stats(&self) {
        self.state.borrow_mut().stats = EventLoopStats::default();
    }

    /// Drop all pending work
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.microtask_queue.clear();
        state.macrotask_queue.clear();
        state.unhandled_rejections.clear();
    }
}

impl Scheduler for EventLoop {
    fn enqueue(&self, task: Task) {
        self.state.borrow_mut().microtask_queue.push_back(task);
    }

    fn observe(&self, event: PromiseEvent) {
        let mut state = self.state.borrow_mut();
        match event {
            PromiseEvent::Created(_) => state.stats.total_promises_created += 1,
            PromiseEvent::Settled { .. } => state.stats.total_promises_settled += 1,
            PromiseEvent::UnhandledRejection { promise, reason } => {
                if state.config.track_unhandled_rejections {
                    state.unhandled_rejections.insert(promise, reason);
                }
            }
            PromiseEvent::RejectionHandled(promise) => {
                state.unhandled_rejections.remove(&promise);
            }
        }
    }
}
