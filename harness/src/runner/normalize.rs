// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Reshapes the three supported calling conventions of a body into one
//! [`Deferred`] result.
//!
//! * [`Callback::sync`]: the return value is the result. Returning
//!   `Ok(Value::Error(..))` is a success, only `Err` or a panic fails.
//! * [`Callback::future`]: the returned future's output is adopted.
//! * [`Callback::done`]: the body receives a [`Done`] handle and signals
//!   completion through it. Signalling `Value::Error(..)` fails.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;

use crate::errors::Failure;

/// What a body settles with.
pub type Settled = Result<Value, Failure>;

/// A body's eventual outcome.
pub type Deferred = LocalBoxFuture<'static, Settled>;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Unit,
    Json(serde_json::Value),
    Error(Failure),
}

#[derive(Clone)]
pub enum Callback {
    Sync(Rc<dyn Fn() -> Settled>),
    Future(Rc<dyn Fn() -> Deferred>),
    Done(Rc<dyn Fn(Done)>),
}

impl Callback {
    pub fn sync<F>(body: F) -> Self
    where
        F: Fn() -> Settled + 'static,
    {
        Callback::Sync(Rc::new(body))
    }

    pub fn future<F, Fut>(body: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Settled> + 'static,
    {
        Callback::Future(Rc::new(move || body().boxed_local()))
    }

    pub fn done<F>(body: F) -> Self
    where
        F: Fn(Done) + 'static,
    {
        Callback::Done(Rc::new(body))
    }

    pub fn noop() -> Self {
        Callback::sync(|| Ok(Value::Unit))
    }
}

impl Debug for Callback {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Callback::Sync(_) => f.write_str("Callback::Sync"),
            Callback::Future(_) => f.write_str("Callback::Future"),
            Callback::Done(_) => f.write_str("Callback::Done"),
        }
    }
}

/// Completion handle for [`Callback::done`] bodies. Signalling consumes the
/// handle. Dropping it without signalling leaves the body pending.
#[derive(Debug)]
pub struct Done {
    sender: oneshot::Sender<Value>,
}

impl Done {
    pub fn signal(self, value: Value) {
        // The receiver is gone once a timeout has given up on the body.
        let _ = self.sender.send(value);
    }

    pub fn ok(self) {
        self.signal(Value::Unit)
    }

    pub fn fail(self, failure: Failure) {
        self.signal(Value::Error(failure))
    }
}

/// Invokes `callback` right away and returns its outcome as a [`Deferred`].
/// Panics are caught and reported as [`Failure::Panicked`].
pub fn normalize(callback: &Callback) -> Deferred {
    match callback {
        Callback::Sync(body) => {
            let settled = catch_unwind(AssertUnwindSafe(|| body()))
                .unwrap_or_else(|payload| Err(Failure::from_panic(payload)));
            future::ready(settled).boxed_local()
        }

        Callback::Future(body) => match catch_unwind(AssertUnwindSafe(|| body())) {
            Ok(pending) => AssertUnwindSafe(pending)
                .catch_unwind()
                .map(|settled| settled.unwrap_or_else(|payload| Err(Failure::from_panic(payload))))
                .boxed_local(),
            Err(payload) => future::ready(Err(Failure::from_panic(payload))).boxed_local(),
        },

        Callback::Done(body) => {
            let (sender, receiver) = oneshot::channel();
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| body(Done { sender }))) {
                return future::ready(Err(Failure::from_panic(payload))).boxed_local();
            }
            async move {
                match receiver.await {
                    Ok(Value::Error(failure)) => Err(failure),
                    Ok(value) => Ok(value),
                    Err(oneshot::Canceled) => future::pending().await,
                }
            }
            .boxed_local()
        }
    }
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod normalize_tests;
