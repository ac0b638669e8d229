// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::rc::Rc;

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use indexmap::IndexMap;

use crate::errors::Failure;
use crate::runner::results::{CaseResult, Outcome, RunResults};

/// Receives the result stream of a run. Every method defaults to a no-op.
pub trait Listener {
    /// Called with the pending result of an executed case before it is
    /// counted. The result may be edited in place; returning a failure
    /// turns the case into a failed one.
    fn before_finalize<'a>(
        &'a self,
        _result: &'a mut CaseResult,
    ) -> LocalBoxFuture<'a, Result<(), Failure>> {
        future::ready(Ok(())).boxed_local()
    }

    fn case_finished(&self, _result: &CaseResult) {}

    fn run_finished(&self, _results: &RunResults) {}

    /// The declaring file of the executing case differs from the previous
    /// executing case's.
    fn file_changed(&self, _file: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    entries: IndexMap<ListenerId, Rc<dyn Listener>>,
}

impl Listeners {
    pub fn add(&mut self, listener: Rc<dyn Listener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, listener);
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.entries.shift_remove(&id).is_some()
    }

    /// Listeners in registration order, detached from the registry so they
    /// can be called without holding a borrow on it.
    pub fn snapshot(&self) -> Vec<Rc<dyn Listener>> {
        self.entries.values().cloned().collect()
    }
}

/// Hands `result` to each listener in order. The first listener failure
/// becomes the case's failure and ends the pass.
pub async fn before_finalize(listeners: &[Rc<dyn Listener>], result: &mut CaseResult) {
    for listener in listeners {
        if let Err(failure) = listener.before_finalize(result).await {
            result.outcome = Outcome::Fail;
            result.error = Some(failure);
            break;
        }
    }
}
