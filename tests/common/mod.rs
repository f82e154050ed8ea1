//! Shared test helpers for integration tests

use deferred::{Function, Promise, Runtime, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Handler that records `tag:value` and passes the value through
pub fn recording(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> Option<Function> {
    let log = log.clone();
    Some(Function::unary(tag, move |v| {
        log.borrow_mut().push(format!("{}:{}", tag, v));
        Ok(v)
    }))
}

/// Handler built from a plain closure
pub fn handler(f: impl Fn(Value) -> deferred::Result<Value> + 'static) -> Option<Function> {
    Some(Function::unary("handler", f))
}

/// Promise fulfilled by a timer after `delay` virtual milliseconds
#[allow(dead_code)]
pub fn fulfill_after(runtime: &Runtime, value: impl Into<Value>, delay: u64) -> Value {
    let (promise, resolver, _) = Promise::with_resolvers(runtime.scheduler());
    let value = value.into();
    runtime
        .event_loop()
        .set_timeout(move || resolver.resolve(value), delay);
    promise.into()
}

/// Promise rejected by a timer after `delay` virtual milliseconds
#[allow(dead_code)]
pub fn reject_after(runtime: &Runtime, reason: impl Into<Value>, delay: u64) -> Value {
    let (promise, _, rejecter) = Promise::with_resolvers(runtime.scheduler());
    let reason = reason.into();
    runtime
        .event_loop()
        .set_timeout(move || rejecter.reject(reason), delay);
    promise.into()
}
