// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A suite that drives the harness through its own public surface. Every
//! case is expected to succeed, so a non-zero exit status from `run`
//! points at a regression in the engine.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::errors::Failure;
use crate::runner::normalize::{Callback, Settled, Value};
use crate::runner::scope::CaseOptions;
use crate::runner::{Harness, Result};

fn check(holds: bool, message: impl Into<String>) -> Settled {
    match holds {
        true => Ok(Value::Unit),
        false => Err(Failure::Raised(message.into())),
    }
}

pub fn register(harness: &Harness) -> Result<()> {
    let h = harness.clone();
    harness.group(
        "callback conventions",
        Callback::sync(move || {
            h.case("returned value", Callback::sync(|| Ok(Value::Unit)))?;
            h.case(
                "returned error value is a success",
                Callback::sync(|| Ok(Value::Error(Failure::raised("not thrown")))),
            )?;
            h.case(
                "returned future",
                Callback::future(|| async {
                    tokio::task::yield_now().await;
                    Ok(Value::Json(serde_json::json!({ "settled": true })))
                }),
            )?;
            h.case(
                "completion signal",
                Callback::done(|done| {
                    tokio::task::spawn_local(async move {
                        tokio::task::yield_now().await;
                        done.ok();
                    });
                }),
            )?;
            Ok(Value::Unit)
        }),
    )?;

    let h = harness.clone();
    harness.group(
        "hooks",
        Callback::sync(move || {
            let log = Rc::new(RefCell::new(Vec::<&'static str>::new()));
            let record = |name: &'static str| {
                let log = log.clone();
                Callback::sync(move || {
                    log.borrow_mut().push(name);
                    Ok(Value::Unit)
                })
            };
            h.setup_once(record("setup once"))?;
            h.setup_each(record("setup each"))?;
            h.teardown_each(record("teardown each"))?;

            let first = log.clone();
            h.case(
                "setup runs before the first case",
                Callback::sync(move || {
                    check(
                        *first.borrow() == ["setup once", "setup each"],
                        format!("unexpected hook order {:?}", first.borrow()),
                    )
                }),
            )?;
            let second = log.clone();
            h.case(
                "setup once does not repeat",
                Callback::sync(move || {
                    check(
                        *second.borrow()
                            == ["setup once", "setup each", "teardown each", "setup each"],
                        format!("unexpected hook order {:?}", second.borrow()),
                    )
                }),
            )?;
            Ok(Value::Unit)
        }),
    )?;

    let h = harness.clone();
    harness.group(
        "timeouts",
        Callback::sync(move || {
            h.case_with(
                "a per-case timeout overrides the configured one",
                Callback::future(|| async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(Value::Unit)
                }),
                CaseOptions::timeout_ms(5_000),
            )?;
            h.case_with(
                "zero disables the timeout",
                Callback::future(|| async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(Value::Unit)
                }),
                CaseOptions::timeout_ms(0),
            )?;
            Ok(Value::Unit)
        }),
    )?;

    let h = harness.clone();
    harness.group_skip(
        "skipped group",
        Callback::sync(move || {
            h.case(
                "never runs",
                Callback::sync(|| Err(Failure::raised("a skipped case was executed"))),
            )?;
            Ok(Value::Unit)
        }),
    )?;

    let h = harness.clone();
    harness.group(
        "focus",
        Callback::sync(move || {
            h.case(
                "unfocused sibling",
                Callback::sync(|| Err(Failure::raised("an unfocused case was executed"))),
            )?;
            h.case_only("focused case", Callback::sync(|| Ok(Value::Unit)))?;
            Ok(Value::Unit)
        }),
    )?;

    let h = harness.clone();
    harness.group(
        "context",
        Callback::sync(move || {
            let inner = h.clone();
            h.case(
                "knows its own title",
                Callback::sync(move || {
                    let info = inner.current_case_info()?;
                    check(
                        info.title == "knows its own title" && info.title_chain == ["context"],
                        format!("unexpected case info {info:?}"),
                    )
                }),
            )?;
            let inner = h.clone();
            h.case(
                "cannot register while executing",
                Callback::sync(move || {
                    let refused = inner.case("late", Callback::noop()).is_err();
                    check(refused, "registration inside a case was accepted")
                }),
            )?;
            Ok(Value::Unit)
        }),
    )?;

    Ok(())
}
