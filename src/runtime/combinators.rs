//! Static promise constructors and aggregation
//!
//! `resolve_with` / `reject_with` build already-settled promises; `all` and
//! `race` combine many. The `*_value` variants accept a dynamic [`Value`] and
//! fail with a TypeError when it is not an array.

use super::promise::Promise;
use super::value::Value;
use crate::error::{messages, Error, Result};
use crate::event_loop::SchedulerRef;
use std::cell::{Cell, RefCell};
use std::mem;
use std::rc::Rc;

impl Promise {
    /// Promises are returned unchanged; anything else is wrapped in a new
    /// fulfilled promise.
    pub fn resolve_with(scheduler: &SchedulerRef, value: impl Into<Value>) -> Promise {
        match value.into() {
            Value::Promise(promise) => promise,
            value => {
                let (promise, resolver, _) = Self::with_resolvers(scheduler);
                resolver.resolve(value);
                promise
            }
        }
    }

    /// A new rejected promise. The reason is never unwrapped, even if it is a
    /// promise.
    pub fn reject_with(scheduler: &SchedulerRef, reason: impl Into<Value>) -> Promise {
        let (promise, _, rejecter) = Self::with_resolvers(scheduler);
        rejecter.reject(reason);
        promise
    }

    /// Promise.all: fulfills with index-aligned results once every item has
    /// fulfilled, rejects with the first rejection. Plain values count as
    /// already fulfilled.
    pub fn all<I>(scheduler: &SchedulerRef, items: I) -> Promise
    where
        I: IntoIterator<Item = Value>,
    {
        let items: Vec<Value> = items.into_iter().collect();
        let (result, resolver, rejecter) = Self::with_resolvers(scheduler);

        let count = items.len();
        if count == 0 {
            resolver.resolve(Value::Array(Vec::new()));
            return result;
        }

        let results = Rc::new(RefCell::new(vec![Value::Undefined; count]));
        let remaining = Rc::new(Cell::new(count));

        for (index, item) in items.into_iter().enumerate() {
            let results = results.clone();
            let remaining = remaining.clone();
            let resolver = resolver.clone();
            let rejecter = rejecter.clone();

            Self::resolve_with(scheduler, item).react(
                move |value| {
                    results.borrow_mut()[index] = value;
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let values = mem::take(&mut *results.borrow_mut());
                        resolver.resolve(Value::Array(values));
                    }
                },
                move |reason| rejecter.reject(reason),
            );
        }

        result
    }

    /// Promise.race: settles like whichever item settles first. An empty
    /// input never settles.
    pub fn race<I>(scheduler: &SchedulerRef, items: I) -> Promise
    where
        I: IntoIterator<Item = Value>,
    {
        let (result, resolver, rejecter) = Self::with_resolvers(scheduler);

        for item in items {
            let resolver = resolver.clone();
            let rejecter = rejecter.clone();
            Self::resolve_with(scheduler, item).react(
                move |value| resolver.resolve(value),
                move |reason| rejecter.reject(reason),
            );
        }

        result
    }

    /// [`Promise::all`] over a dynamic value
    pub fn all_value(scheduler: &SchedulerRef, items: &Value) -> Result<Promise> {
        let items = require_array(items)?;
        Ok(Self::all(scheduler, items.iter().cloned()))
    }

    /// [`Promise::race`] over a dynamic value
    pub fn race_value(scheduler: &SchedulerRef, items: &Value) -> Result<Promise> {
        let items = require_array(items)?;
        Ok(Self::race(scheduler, items.iter().cloned()))
    }
}

fn require_array(items: &Value) -> Result<&[Value]> {
    items
        .as_array()
        .ok_or_else(|| Error::type_error(messages::not_iterable(items.type_of())))
}
