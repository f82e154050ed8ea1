//! Promise Implementation
//!
//! A Promise/A+ deferred value. The state machine lives behind a shared
//! `Rc<RefCell<_>>`; reaction queues only exist while the promise is pending,
//! and every reaction is handed to the promise's [`Scheduler`] instead of
//! running inline.
//!
//! [`Scheduler`]: crate::event_loop::Scheduler

use super::value::{Function, Value};
use crate::error::{messages, Error, Result};
use crate::event_loop::{PromiseEvent, SchedulerRef};
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// ID counter for Promise tracking
static PROMISE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique promise identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromiseId(u64);

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Promise state enum
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PromiseState {
    /// Promise is pending - not yet settled
    Pending,
    /// Promise is fulfilled with a value
    Fulfilled,
    /// Promise is rejected with a reason
    Rejected,
}

type Reaction = Box<dyn FnOnce(Value)>;

enum Status {
    Pending {
        fulfill_reactions: Vec<Reaction>,
        reject_reactions: Vec<Reaction>,
    },
    Fulfilled(Value),
    Rejected(Value),
}

struct PromiseInner {
    id: PromiseId,
    status: Status,
    /// Set once anything reacts to this promise
    handled: bool,
}

/// A deferred value
///
/// Cloning yields another handle to the same promise.
#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<PromiseInner>>,
    scheduler: SchedulerRef,
}

/// Capability that fulfills (or adopts into) its promise
#[derive(Clone)]
pub struct Resolver {
    promise: Promise,
}

/// Capability that rejects its promise
#[derive(Clone)]
pub struct Rejecter {
    promise: Promise,
}

impl Resolver {
    /// Settle with `value`, or adopt its outcome if it is a promise.
    /// No-op once the promise has settled. Adopting leaves it pending, so
    /// either capability can still settle it first.
    pub fn resolve(&self, value: impl Into<Value>) {
        self.promise.resolve_value(value.into());
    }

    /// Expose as a callable value
    pub fn into_function(self) -> Function {
        Function::unary("resolve", move |value| {
            self.resolve(value);
            Ok(Value::Undefined)
        })
    }
}

impl Rejecter {
    /// Reject with `reason`. No-op once the promise has settled.
    pub fn reject(&self, reason: impl Into<Value>) {
        self.promise.reject(reason.into());
    }

    /// Expose as a callable value
    pub fn into_function(self) -> Function {
        Function::unary("reject", move |reason| {
            self.reject(reason);
            Ok(Value::Undefined)
        })
    }
}

/// Which default a missing handler stands in for
#[derive(Clone, Copy)]
enum Passthrough {
    Identity,
    Thrower,
}

impl Promise {
    /// Create a pending promise along with its capabilities
    pub fn with_resolvers(scheduler: &SchedulerRef) -> (Promise, Resolver, Rejecter) {
        let id = PromiseId(PROMISE_ID.fetch_add(1, Ordering::SeqCst));
        let promise = Promise {
            inner: Rc::new(RefCell::new(PromiseInner {
                id,
                status: Status::Pending {
                    fulfill_reactions: Vec::new(),
                    reject_reactions: Vec::new(),
                },
                handled: false,
            })),
            scheduler: scheduler.clone(),
        };
        trace!(promise = %id, "created");
        scheduler.observe(PromiseEvent::Created(id));

        let resolver = Resolver {
            promise: promise.clone(),
        };
        let rejecter = Rejecter {
            promise: promise.clone(),
        };
        (promise, resolver, rejecter)
    }

    /// Create a promise and run `initializer` synchronously with its
    /// capabilities. An `Err` from the initializer rejects the promise.
    pub fn new<F>(scheduler: &SchedulerRef, initializer: F) -> Promise
    where
        F: FnOnce(Resolver, Rejecter) -> Result<()>,
    {
        let (promise, resolver, rejecter) = Self::with_resolvers(scheduler);
        if let Err(err) = initializer(resolver, rejecter.clone()) {
            rejecter.reject(err.into_reason());
        }
        promise
    }

    /// Construct from a dynamic initializer, which is called with the
    /// `resolve` and `reject` capabilities as function values.
    pub fn construct(scheduler: &SchedulerRef, initializer: &Value) -> Result<Promise> {
        let initializer = initializer
            .as_function()
            .cloned()
            .ok_or_else(|| Error::type_error(messages::not_a_function("initializer")))?;

        Ok(Self::new(scheduler, move |resolver, rejecter| {
            initializer
                .call(&[
                    resolver.into_function().into(),
                    rejecter.into_function().into(),
                ])
                .map(drop)
        }))
    }

    pub fn id(&self) -> PromiseId {
        self.inner.borrow().id
    }

    pub fn state(&self) -> PromiseState {
        match self.inner.borrow().status {
            Status::Pending { .. } => PromiseState::Pending,
            Status::Fulfilled(_) => PromiseState::Fulfilled,
            Status::Rejected(_) => PromiseState::Rejected,
        }
    }

    /// Fulfillment value, present only once fulfilled
    pub fn result(&self) -> Option<Value> {
        match &self.inner.borrow().status {
            Status::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Rejection reason, present only once rejected
    pub fn reason(&self) -> Option<Value> {
        match &self.inner.borrow().status {
            Status::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Scheduler this promise settles through
    pub fn scheduler(&self) -> &SchedulerRef {
        &self.scheduler
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register a handler pair and return the derived promise.
    ///
    /// A missing `on_fulfilled` passes the value through; a missing
    /// `on_rejected` re-raises the reason. Handlers always run from the
    /// scheduler, never inside this call.
    pub fn then(&self, on_fulfilled: Option<Function>, on_rejected: Option<Function>) -> Promise {
        let (derived, resolver, rejecter) = Self::with_resolvers(&self.scheduler);
        let (reject_resolver, reject_rejecter) = (resolver.clone(), rejecter.clone());

        self.react(
            move |value| {
                run_handler(
                    on_fulfilled.as_ref(),
                    Passthrough::Identity,
                    value,
                    &resolver,
                    &rejecter,
                )
            },
            move |reason| {
                run_handler(
                    on_rejected.as_ref(),
                    Passthrough::Thrower,
                    reason,
                    &reject_resolver,
                    &reject_rejecter,
                )
            },
        );
        derived
    }

    /// Shorthand for `then(None, on_rejected)`
    pub fn catch(&self, on_rejected: Option<Function>) -> Promise {
        self.then(None, on_rejected)
    }

    /// Run `on_finally` with no arguments on either outcome, then pass the
    /// original outcome through. A failure of `on_finally`, or a rejected
    /// promise returned from it, overrides the outcome.
    pub fn finally(&self, on_finally: Option<Function>) -> Promise {
        let Some(on_finally) = on_finally else {
            return self.then(None, None);
        };

        let scheduler = self.scheduler.clone();
        let callback = on_finally.clone();
        let on_fulfilled = Function::unary("finally", move |value| {
            let outcome = callback.call(&[])?;
            let pass_value = Function::unary("", move |_| Ok(value.clone()));
            Ok(Promise::resolve_with(&scheduler, outcome)
                .then(Some(pass_value), None)
                .into())
        });

        let scheduler = self.scheduler.clone();
        let on_rejected = Function::unary("finally", move |reason| {
            let outcome = on_finally.call(&[])?;
            let reraise = Function::unary("", move |_| Err(Error::Thrown(reason.clone())));
            Ok(Promise::resolve_with(&scheduler, outcome)
                .then(Some(reraise), None)
                .into())
        });

        self.then(Some(on_fulfilled), Some(on_rejected))
    }

    /// Attach raw reactions. Exactly one of them will be scheduled, once.
    pub(crate) fn react(
        &self,
        on_fulfilled: impl FnOnce(Value) + 'static,
        on_rejected: impl FnOnce(Value) + 'static,
    ) {
        let settled = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.id;
            let was_handled = mem::replace(&mut inner.handled, true);
            match &mut inner.status {
                Status::Pending {
                    fulfill_reactions,
                    reject_reactions,
                } => {
                    fulfill_reactions.push(Box::new(on_fulfilled));
                    reject_reactions.push(Box::new(on_rejected));
                    return;
                }
                Status::Fulfilled(value) => Ok(value.clone()),
                Status::Rejected(reason) => Err((reason.clone(), was_handled, id)),
            }
        };

        match settled {
            Ok(value) => self.scheduler.enqueue(Box::new(move || on_fulfilled(value))),
            Err((reason, was_handled, id)) => {
                if !was_handled {
                    self.scheduler.observe(PromiseEvent::RejectionHandled(id));
                }
                self.scheduler.enqueue(Box::new(move || on_rejected(reason)));
            }
        }
    }

    /// Resolution procedure: adopt promises, fulfill with anything else
    fn resolve_value(&self, value: Value) {
        if self.state() != PromiseState::Pending {
            return;
        }
        match value {
            Value::Promise(source) if source.ptr_eq(self) => {
                self.reject(Error::type_error(messages::CHAINING_CYCLE).into_reason());
            }
            Value::Promise(source) => {
                trace!(promise = %self.id(), source = %source.id(), "adopting");
                let (on_fulfilled, on_rejected) = (self.clone(), self.clone());
                source.react(
                    move |value| on_fulfilled.resolve_value(value),
                    move |reason| on_rejected.reject(reason),
                );
            }
            value => self.fulfill(value),
        }
    }

    fn fulfill(&self, value: Value) {
        let Some((id, reactions)) = self.transition(Status::Fulfilled(value.clone())) else {
            return;
        };
        trace!(promise = %id, reactions = reactions.len(), "fulfilled");
        self.scheduler.observe(PromiseEvent::Settled {
            promise: id,
            state: PromiseState::Fulfilled,
        });
        self.schedule_reactions(reactions, value);
    }

    fn reject(&self, reason: Value) {
        let handled = self.inner.borrow().handled;
        let Some((id, reactions)) = self.transition(Status::Rejected(reason.clone())) else {
            return;
        };
        trace!(promise = %id, reactions = reactions.len(), "rejected");
        self.scheduler.observe(PromiseEvent::Settled {
            promise: id,
            state: PromiseState::Rejected,
        });
        if !handled {
            self.scheduler.observe(PromiseEvent::UnhandledRejection {
                promise: id,
                reason: reason.clone(),
            });
        }
        self.schedule_reactions(reactions, reason);
    }

    /// Move out of pending, returning the reactions matching the new state.
    /// `None` if already settled.
    fn transition(&self, settled: Status) -> Option<(PromiseId, Vec<Reaction>)> {
        let mut inner = self.inner.borrow_mut();
        if !matches!(inner.status, Status::Pending { .. }) {
            return None;
        }
        let fulfilled = matches!(settled, Status::Fulfilled(_));
        let Status::Pending {
            fulfill_reactions,
            reject_reactions,
        } = mem::replace(&mut inner.status, settled)
        else {
            return None;
        };
        let reactions = if fulfilled {
            fulfill_reactions
        } else {
            reject_reactions
        };
        Some((inner.id, reactions))
    }

    fn schedule_reactions(&self, reactions: Vec<Reaction>, value: Value) {
        for reaction in reactions {
            let value = value.clone();
            self.scheduler.enqueue(Box::new(move || reaction(value)));
        }
    }
}

/// Invoke a handler (or its default) and settle the derived promise with
/// the outcome. A handler error rejects directly, without adoption.
fn run_handler(
    handler: Option<&Function>,
    passthrough: Passthrough,
    argument: Value,
    resolver: &Resolver,
    rejecter: &Rejecter,
) {
    let outcome = match (handler, passthrough) {
        (Some(handler), _) => handler.call(&[argument]),
        (None, Passthrough::Identity) => Ok(argument),
        (None, Passthrough::Thrower) => Err(Error::Thrown(argument)),
    };
    match outcome {
        Ok(value) => resolver.resolve(value),
        Err(err) => rejecter.reject(err.into_reason()),
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        match &inner.status {
            Status::Pending { .. } => write!(f, "Promise {} {{ <pending> }}", inner.id),
            Status::Fulfilled(value) => write!(f, "Promise {} {{ {:?} }}", inner.id, value),
            Status::Rejected(reason) => {
                write!(f, "Promise {} {{ <rejected> {:?} }}", inner.id, reason)
            }
        }
    }
}

impl Value {
    fn require_promise(&self) -> Result<&Promise> {
        self.as_promise()
            .ok_or_else(|| Error::type_error(messages::not_a_promise(self.type_of())))
    }

    /// `then` on a dynamic receiver. Non-callable handlers fall back to the
    /// defaults; a non-promise receiver is a TypeError.
    pub fn then(&self, on_fulfilled: &Value, on_rejected: &Value) -> Result<Promise> {
        let promise = self.require_promise()?;
        Ok(promise.then(
            on_fulfilled.as_function().cloned(),
            on_rejected.as_function().cloned(),
        ))
    }

    /// `catch` on a dynamic receiver
    pub fn catch(&self, on_rejected: &Value) -> Result<Promise> {
        self.then(&Value::Undefined, on_rejected)
    }

    /// `finally` on a dynamic receiver
    pub fn finally(&self, on_finally: &Value) -> Result<Promise> {
        let promise = self.require_promise()?;
        Ok(promise.finally(on_finally.as_function().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::event_loop::EventLoop;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn setup() -> (EventLoop, SchedulerRef) {
        let el = EventLoop::new();
        let scheduler = el.scheduler();
        (el, scheduler)
    }

    fn record(log: &Rc<RefCell<Vec<Value>>>, tag: &'static str) -> Option<Function> {
        let log = log.clone();
        Some(Function::unary(tag, move |v| {
            log.borrow_mut().push(Value::from(format!("{}:{}", tag, v)));
            Ok(v)
        }))
    }

    #[test]
    fn test_starts_pending() {
        let (_el, scheduler) = setup();
        let promise = Promise::new(&scheduler, |_, _| Ok(()));
        assert_eq!(promise.state(), PromiseState::Pending);
        assert!(promise.result().is_none());
        assert!(promise.reason().is_none());
    }

    #[test]
    fn test_resolve_settles_synchronously() {
        let (_el, scheduler) = setup();
        let promise = Promise::new(&scheduler, |resolve, _| {
            resolve.resolve(42);
            Ok(())
        });
        assert_eq!(promise.state(), PromiseState::Fulfilled);
        assert_eq!(promise.result(), Some(Value::from(42)));
        assert!(promise.reason().is_none());
    }

    #[test]
    fn test_initializer_error_rejects() {
        let (_el, scheduler) = setup();
        let promise = Promise::new(&scheduler, |_, _| Err(Error::thrown("boom")));
        assert_eq!(promise.state(), PromiseState::Rejected);
        assert_eq!(promise.reason(), Some(Value::from("boom")));
    }

    #[test]
    fn test_initializer_error_after_resolve_is_ignored() {
        let (_el, scheduler) = setup();
        let promise = Promise::new(&scheduler, |resolve, _| {
            resolve.resolve(1);
            Err(Error::thrown("late"))
        });
        assert_eq!(promise.result(), Some(Value::from(1)));
    }

    #[test]
    fn test_settlement_is_idempotent() {
        let (_el, scheduler) = setup();
        let (promise, resolve, reject) = Promise::with_resolvers(&scheduler);
        resolve.resolve(1);
        resolve.resolve(2);
        reject.reject("nope");
        assert_eq!(promise.result(), Some(Value::from(1)));

        let (promise, resolve, reject) = Promise::with_resolvers(&scheduler);
        reject.reject("first");
        resolve.resolve(2);
        assert_eq!(promise.reason(), Some(Value::from("first")));
    }

    #[test]
    fn test_pending_adoption_can_be_overtaken() {
        let (el, scheduler) = setup();
        let (inner, inner_resolve, _) = Promise::with_resolvers(&scheduler);
        let (outer, resolve, reject) = Promise::with_resolvers(&scheduler);
        resolve.resolve(inner);
        assert_eq!(outer.state(), PromiseState::Pending);

        reject.reject("first");
        assert_eq!(outer.reason(), Some(Value::from("first")));

        inner_resolve.resolve("adopted");
        el.run_to_completion();
        assert_eq!(outer.state(), PromiseState::Rejected);
        assert_eq!(outer.reason(), Some(Value::from("first")));
    }

    #[test]
    fn test_adoption_completes_when_not_overtaken() {
        let (el, scheduler) = setup();
        let (inner, inner_resolve, _) = Promise::with_resolvers(&scheduler);
        let (outer, resolve, _) = Promise::with_resolvers(&scheduler);
        resolve.resolve(inner);
        inner_resolve.resolve("adopted");
        el.run_to_completion();
        assert_eq!(outer.result(), Some(Value::from("adopted")));
    }

    #[test]
    fn test_initializer_error_after_pending_adoption_rejects() {
        let (el, scheduler) = setup();
        let (never, _, _) = Promise::with_resolvers(&scheduler);
        let promise = Promise::new(&scheduler, |resolve, _| {
            resolve.resolve(never);
            Err(Error::thrown("late"))
        });
        el.run_to_completion();
        assert_eq!(promise.reason(), Some(Value::from("late")));
    }

    #[test]
    fn test_adopts_rejection() {
        let (el, scheduler) = setup();
        let promise = Promise::new(&scheduler, |resolve, _| {
            resolve.resolve(Promise::reject_with(&scheduler, "inner"));
            Ok(())
        });
        el.run_to_completion();
        assert_eq!(promise.reason(), Some(Value::from("inner")));
    }

    #[test]
    fn test_self_resolution_is_type_error() {
        let (_el, scheduler) = setup();
        let (promise, resolve, _) = Promise::with_resolvers(&scheduler);
        resolve.resolve(promise.clone());
        assert_eq!(promise.state(), PromiseState::Rejected);
        assert!(matches!(
            promise.reason(),
            Some(Value::Error { kind: ErrorKind::TypeError, .. })
        ));
    }

    #[test]
    fn test_then_never_runs_inline() {
        let (el, scheduler) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let promise = Promise::resolve_with(&scheduler, 1);
        let derived = promise.then(record(&log, "f"), None);

        assert!(log.borrow().is_empty());
        assert_eq!(derived.state(), PromiseState::Pending);

        el.run_to_completion();
        assert_eq!(*log.borrow(), vec![Value::from("f:1")]);
        assert_eq!(derived.result(), Some(Value::from(1)));
    }

    #[test]
    fn test_reactions_run_in_registration_order() {
        let (el, scheduler) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (promise, resolve, _) = Promise::with_resolvers(&scheduler);
        promise.then(record(&log, "r1"), None);
        promise.then(record(&log, "r2"), None);
        promise.then(record(&log, "r3"), None);

        resolve.resolve("v");
        assert!(log.borrow().is_empty());
        el.run_to_completion();
        assert_eq!(
            *log.borrow(),
            vec![Value::from("r1:v"), Value::from("r2:v"), Value::from("r3:v")]
        );
    }

    #[test]
    fn test_reject_reactions_run_in_registration_order() {
        let (el, scheduler) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (promise, _, reject) = Promise::with_resolvers(&scheduler);
        promise.then(record(&log, "skip"), record(&log, "e1"));
        promise.catch(record(&log, "e2"));

        reject.reject("x");
        el.run_to_completion();
        assert_eq!(*log.borrow(), vec![Value::from("e1:x"), Value::from("e2:x")]);
    }

    #[test]
    fn test_handler_return_value_fulfills_derived() {
        let (el, scheduler) = setup();
        let double = Function::unary("double", |v| {
            Ok(Value::from(v.as_number().unwrap_or_default() * 2.0))
        });
        let derived = Promise::resolve_with(&scheduler, 21).then(Some(double), None);
        el.run_to_completion();
        assert_eq!(derived.result(), Some(Value::from(42)));
    }

    #[test]
    fn test_handler_error_rejects_derived() {
        let (el, scheduler) = setup();
        let fails = Function::unary("fails", |_| Err(Error::thrown("bad handler")));
        let derived = Promise::resolve_with(&scheduler, 1).then(Some(fails), None);
        el.run_to_completion();
        assert_eq!(derived.reason(), Some(Value::from("bad handler")));
    }

    #[test]
    fn test_handler_returning_promise_is_adopted() {
        let (el, scheduler) = setup();
        let inner_scheduler = scheduler.clone();
        let chained = Function::unary("chained", move |v| {
            let doubled = v.as_number().unwrap_or_default() * 2.0;
            Ok(Promise::resolve_with(&inner_scheduler, doubled).into())
        });
        let derived = Promise::resolve_with(&scheduler, 4).then(Some(chained), None);
        el.run_to_completion();
        assert_eq!(derived.result(), Some(Value::from(8)));
    }

    #[test]
    fn test_rejection_handler_recovers() {
        let (el, scheduler) = setup();
        let recover = Function::unary("recover", |_| Ok(Value::from("recovered")));
        let derived = Promise::reject_with(&scheduler, "x").catch(Some(recover));
        el.run_to_completion();
        assert_eq!(derived.result(), Some(Value::from("recovered")));
    }

    #[test]
    fn test_default_handlers_pass_through() {
        let (el, scheduler) = setup();
        let fulfilled = Promise::resolve_with(&scheduler, 7).then(None, None);
        let rejected = Promise::reject_with(&scheduler, "r").then(None, None);
        el.run_to_completion();
        assert_eq!(fulfilled.result(), Some(Value::from(7)));
        assert_eq!(rejected.reason(), Some(Value::from("r")));
    }

    #[test]
    fn test_finally_passes_value_through() {
        let (el, scheduler) = setup();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let side_effect = Function::new("side_effect", move |args| {
            assert!(args.is_empty());
            counter.set(counter.get() + 1);
            Ok(Value::from("ignored"))
        });

        let derived = Promise::resolve_with(&scheduler, 1).finally(Some(side_effect));
        el.run_to_completion();
        assert_eq!(derived.result(), Some(Value::from(1)));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_finally_passes_reason_through() {
        let (el, scheduler) = setup();
        let noop = Function::new("noop", |_| Ok(Value::Undefined));
        let derived = Promise::reject_with(&scheduler, "why").finally(Some(noop));
        el.run_to_completion();
        assert_eq!(derived.reason(), Some(Value::from("why")));
    }

    #[test]
    fn test_finally_rejection_overrides() {
        let (el, scheduler) = setup();
        let inner_scheduler = scheduler.clone();
        let cleanup = Function::new("cleanup", move |_| {
            Ok(Promise::reject_with(&inner_scheduler, "cleanup failed").into())
        });
        let derived = Promise::resolve_with(&scheduler, 1).finally(Some(cleanup));
        el.run_to_completion();
        assert_eq!(derived.reason(), Some(Value::from("cleanup failed")));
    }

    #[test]
    fn test_finally_error_overrides() {
        let (el, scheduler) = setup();
        let cleanup = Function::new("cleanup", |_| Err(Error::thrown("thrown in finally")));
        let derived = Promise::reject_with(&scheduler, "original").finally(Some(cleanup));
        el.run_to_completion();
        assert_eq!(derived.reason(), Some(Value::from("thrown in finally")));
    }

    #[test]
    fn test_finally_without_callback() {
        let (el, scheduler) = setup();
        let derived = Promise::resolve_with(&scheduler, "same").finally(None);
        el.run_to_completion();
        assert_eq!(derived.result(), Some(Value::from("same")));
    }

    #[test]
    fn test_construct_requires_callable() {
        let (_el, scheduler) = setup();
        let err = Promise::construct(&scheduler, &Value::from(4)).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::TypeError));
    }

    #[test]
    fn test_construct_passes_capabilities() {
        let (_el, scheduler) = setup();
        let initializer = Function::new("init", |args| {
            let resolve = args[0].as_function().expect("resolve capability");
            assert!(args[1].is_callable());
            resolve.call(&[Value::from("via value")])
        });
        let promise = Promise::construct(&scheduler, &initializer.into()).unwrap();
        assert_eq!(promise.result(), Some(Value::from("via value")));
    }

    #[test]
    fn test_construct_initializer_error_rejects() {
        let (_el, scheduler) = setup();
        let initializer = Function::new("init", |_| Err(Error::type_error("broken")));
        let promise = Promise::construct(&scheduler, &initializer.into()).unwrap();
        assert_eq!(
            promise.reason(),
            Some(Value::Error {
                kind: ErrorKind::TypeError,
                message: "broken".to_string(),
            })
        );
    }

    #[test]
    fn test_then_on_non_promise_is_type_error() {
        let err = Value::from(4)
            .then(&Value::Undefined, &Value::Undefined)
            .unwrap_err();
        assert_eq!(err.to_string(), "TypeError: 'number' is not a promise");
        assert!(Value::Null.catch(&Value::Undefined).is_err());
        assert!(Value::from("x").finally(&Value::Undefined).is_err());
    }

    #[test]
    fn test_dynamic_then_ignores_non_callable_handlers() {
        let (el, scheduler) = setup();
        let receiver = Value::from(Promise::reject_with(&scheduler, "kept"));
        let derived = receiver.then(&Value::from(1), &Value::from("not a function")).unwrap();
        el.run_to_completion();
        assert_eq!(derived.reason(), Some(Value::from("kept")));
    }

    #[test]
    fn test_debug_format() {
        let (_el, scheduler) = setup();
        let promise = Promise::resolve_with(&scheduler, 3);
        let rendered = format!("{:?}", promise);
        assert!(rendered.starts_with("Promise #"));
        assert!(rendered.ends_with("{ 3 }"));
    }
}
