// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use futures::future::{self, Either};
use futures::FutureExt;
use log::{trace, warn};
use tokio::time::Instant;

use crate::errors::{Failure, TimeoutFailure};
use crate::runner::normalize::Deferred;

/// Bounds the wait on `operation` by `timeout_ms`.
///
/// A non-positive timeout returns `operation` untouched. Otherwise the
/// first of the operation and the deadline wins. When the deadline wins the
/// operation is not cancelled: it is handed to the current
/// [`tokio::task::LocalSet`] and its late outcome is dropped. The returned
/// future must therefore be polled inside a `LocalSet`.
pub fn wrap(operation: Deferred, timeout_ms: i64) -> Deferred {
    if timeout_ms <= 0 {
        return operation;
    }

    let limit = Duration::from_millis(timeout_ms.unsigned_abs());
    async move {
        let started = Instant::now();
        let deadline = Box::pin(tokio::time::sleep(limit));
        match future::select(operation, deadline).await {
            Either::Left((settled, _deadline)) => settled,
            Either::Right(((), pending)) => {
                let elapsed = started.elapsed();
                trace!("deadline of {timeout_ms}ms hit after {elapsed:?}");
                detach(pending);
                Err(Failure::Timeout(TimeoutFailure::new(elapsed, timeout_ms)))
            }
        }
    }
    .boxed_local()
}

fn detach(pending: Deferred) {
    tokio::task::spawn_local(async move {
        if let Err(failure) = pending.await {
            warn!("discarding failure settled after its deadline: {failure}");
        }
    });
}

#[cfg(test)]
#[path = "timeout_tests.rs"]
mod timeout_tests;
