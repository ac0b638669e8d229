// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod utils;

#[cfg(test)]
mod scheduling_tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    use futures::future::{self, LocalBoxFuture};
    use futures::FutureExt;
    use pretty_assertions::assert_eq;

    use case_harness::config::PartialPhaseTimeouts;
    use case_harness::runner::hooks::HookPhase;
    use case_harness::runner::CancelFuture;
    use case_harness::{
        CaseOptions, CaseResult, Callback, Failure, Harness, HarnessConfig, HarnessError,
        Listener, Outcome, Value,
    };

    use crate::utils::{titles, Log, Recorder};

    type TestResult = Result<(), HarnessError>;

    #[tokio::test]
    async fn root_cases_run_in_registration_order() -> TestResult {
        let harness = Harness::default();
        harness.case("A", Callback::noop())?;
        harness.case("B", Callback::noop())?;

        let results = harness.run()?.await?;

        assert_eq!(results.total_tests, 2);
        assert_eq!(results.total_successes, 2);
        assert_eq!(results.test_results[0].title, "A");
        assert_eq!(results.test_results[1].title, "B");
        assert!(!harness.is_running());
        Ok(())
    }

    #[tokio::test]
    async fn group_bodies_run_only_when_reached() -> TestResult {
        let harness = Harness::default();
        let log = Log::default();

        let (h, l) = (harness.clone(), log.clone());
        harness.group(
            "outer",
            Callback::sync(move || {
                l.push("outer body");
                h.case("a", l.record("a"))?;
                let (hh, ll) = (h.clone(), l.clone());
                h.group(
                    "inner",
                    Callback::sync(move || {
                        ll.push("inner body");
                        hh.case("b", ll.record("b"))?;
                        Ok(Value::Unit)
                    }),
                )?;
                h.case("c", l.record("c"))?;
                Ok(Value::Unit)
            }),
        )?;
        harness.case("d", log.record("d"))?;

        let results = harness.run()?.await?;

        assert_eq!(
            log.entries(),
            vec!["outer body", "a", "inner body", "b", "c", "d"]
        );
        assert_eq!(
            titles(&results),
            vec!["outer > a", "outer > inner > b", "outer > c", "d"]
        );
        assert_eq!(
            results.test_results[1].title_chain,
            vec![String::from("outer"), String::from("inner")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn hooks_nest_around_each_case() -> TestResult {
        let harness = Harness::default();
        let log = Log::default();

        harness.setup_once(log.record("root setup once"))?;
        harness.setup_each(log.record("root setup each"))?;
        harness.teardown_each(log.record("root teardown each"))?;
        harness.teardown_once(log.record("root teardown once"))?;

        let (h, l) = (harness.clone(), log.clone());
        harness.group(
            "g",
            Callback::sync(move || {
                h.setup_once(l.record("g setup once"))?;
                h.setup_each(l.record("g setup each 1"))?;
                h.setup_each(l.record("g setup each 2"))?;
                h.teardown_each(l.record("g teardown each"))?;
                h.teardown_once(l.record("g teardown once"))?;
                h.case("x", l.record("x"))?;
                h.case("y", l.record("y"))?;
                Ok(Value::Unit)
            }),
        )?;

        harness.run()?.await?;

        assert_eq!(
            log.entries(),
            vec![
                "root setup once",
                "g setup once",
                "root setup each",
                "g setup each 1",
                "g setup each 2",
                "x",
                "g teardown each",
                "root teardown each",
                "root setup each",
                "g setup each 1",
                "g setup each 2",
                "y",
                "g teardown each",
                "root teardown each",
                "g teardown once",
                "root teardown once",
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn once_hooks_skip_scopes_without_executed_cases() -> TestResult {
        let harness = Harness::default();
        let log = Log::default();

        let (h, l) = (harness.clone(), log.clone());
        harness.group_skip(
            "skipped",
            Callback::sync(move || {
                h.setup_once(l.record("skipped setup once"))?;
                h.setup_each(l.record("skipped setup each"))?;
                h.teardown_once(l.record("skipped teardown once"))?;
                h.case("never", l.record("never"))?;
                Ok(Value::Unit)
            }),
        )?;

        let (h, l) = (harness.clone(), log.clone());
        harness.group(
            "empty",
            Callback::sync(move || {
                h.setup_once(l.record("empty setup once"))?;
                h.teardown_once(l.record("empty teardown once"))?;
                Ok(Value::Unit)
            }),
        )?;

        let (h, l) = (harness.clone(), log.clone());
        harness.group(
            "busy",
            Callback::sync(move || {
                h.setup_once(l.record("busy setup once"))?;
                h.teardown_once(l.record("busy teardown once"))?;
                h.case("one", Callback::noop())?;
                h.case("two", Callback::noop())?;
                Ok(Value::Unit)
            }),
        )?;

        let results = harness.run()?.await?;

        assert_eq!(log.entries(), vec!["busy setup once", "busy teardown once"]);
        assert_eq!(results.total_tests, 2);
        assert_eq!(results.total_skipped, 1);
        Ok(())
    }

    #[tokio::test]
    async fn root_teardown_fires_once_after_the_case() -> TestResult {
        let harness = Harness::default();
        let log = Log::default();
        harness.teardown_once(log.record("teardown"))?;
        harness.case("only case", log.record("case"))?;

        harness.run()?.await?;

        assert_eq!(log.entries(), vec!["case", "teardown"]);
        Ok(())
    }

    #[tokio::test]
    async fn first_focused_sibling_is_the_only_one_visited() -> TestResult {
        let harness = Harness::default();
        let log = Log::default();

        harness.case("a", log.record("a"))?;
        let (h, l) = (harness.clone(), log.clone());
        harness.group_only(
            "focused",
            Callback::sync(move || {
                h.case("x", l.record("x"))?;
                h.case_only("y", l.record("y"))?;
                h.case_only("z", l.record("z"))?;
                Ok(Value::Unit)
            }),
        )?;
        harness.case_only("b", log.record("b"))?;
        harness.case("c", log.record("c"))?;

        let results = harness.run()?.await?;

        assert_eq!(log.entries(), vec!["y"]);
        assert_eq!(titles(&results), vec!["focused > y"]);
        assert_eq!(results.total_tests, 1);
        Ok(())
    }

    #[tokio::test]
    async fn skip_wins_over_focus_and_runs_no_hooks() -> TestResult {
        let harness = Harness::default();
        let log = Log::default();
        let recorder = Rc::new(Recorder::default());
        harness.add_listener(recorder.clone());

        harness.setup_each(log.record("setup each"))?;
        let (h, l) = (harness.clone(), log.clone());
        harness.group_skip(
            "skipped",
            Callback::sync(move || {
                h.case_only("focused", l.record("focused"))?;
                h.case("plain", l.record("plain"))?;
                Ok(Value::Unit)
            }),
        )?;
        harness.case_skip("skipped case", log.record("skipped case"))?;

        let results = harness.run()?.await?;

        assert!(log.entries().is_empty());
        assert_eq!(results.total_tests, 0);
        assert_eq!(results.total_skipped, 2);
        assert!(results
            .test_results
            .iter()
            .all(|result| result.outcome == Outcome::Skipped));
        assert_eq!(recorder.finished.borrow().len(), 2);
        assert!(recorder.files.borrow().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn stop_on_first_fail_leaves_later_cases_alone() -> TestResult {
        let harness = Harness::new(HarnessConfig::default().with_stop_on_first_fail(true));
        let log = Log::default();
        harness.teardown_once(log.record("teardown once"))?;
        harness.case("first", log.record_failure("first"))?;
        harness.case("second", log.record("second"))?;

        let results = harness.run()?.await?;

        assert_eq!(log.entries(), vec!["first", "teardown once"]);
        assert_eq!(results.total_tests, 1);
        assert_eq!(results.total_failures, 1);
        assert_eq!(
            results.test_results[0].error,
            Some(Failure::raised("first failed"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn a_case_cancelling_its_own_run_still_succeeds() -> TestResult {
        let harness = Harness::default();
        let log = Log::default();
        let pending: Rc<RefCell<Option<CancelFuture>>> = Rc::default();

        let (h, p) = (harness.clone(), pending.clone());
        harness.case(
            "cancels",
            Callback::sync(move || {
                *p.borrow_mut() = Some(h.cancel()?);
                Ok(Value::Unit)
            }),
        )?;
        harness.case("after", log.record("after"))?;
        let l = log.clone();
        harness.group(
            "later group",
            Callback::sync(move || {
                l.push("group body");
                Ok(Value::Unit)
            }),
        )?;

        let results = harness.run()?.await?;

        assert!(log.entries().is_empty());
        assert_eq!(results.total_tests, 1);
        assert_eq!(results.total_successes, 1);

        let cancelled = pending.borrow_mut().take();
        match cancelled {
            Some(cancelled) => assert_eq!(cancelled.await, results),
            None => panic!("cancel() was not reached"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn cancelling_inside_a_group_still_tears_down_entered_scopes() -> TestResult {
        let harness = Harness::default();
        let log = Log::default();
        harness.teardown_once(log.record("root teardown once"))?;

        let (h, l) = (harness.clone(), log.clone());
        harness.group(
            "g",
            Callback::sync(move || {
                h.teardown_once(l.record("g teardown once"))?;
                let (hh, ll) = (h.clone(), l.clone());
                h.case(
                    "c1",
                    Callback::sync(move || {
                        ll.push("c1");
                        drop(hh.cancel()?);
                        Ok(Value::Unit)
                    }),
                )?;
                h.case("c2", l.record("c2"))?;
                Ok(Value::Unit)
            }),
        )?;
        harness.case("after", log.record("after"))?;

        let results = harness.run()?.await?;

        assert_eq!(
            log.entries(),
            vec!["c1", "g teardown once", "root teardown once"]
        );
        assert_eq!(titles(&results), vec!["g > c1"]);
        assert_eq!(results.total_successes, 1);
        Ok(())
    }

    fn late_flag_case(harness: &Harness, finished: &Rc<Cell<bool>>) -> TestResult {
        let finished = finished.clone();
        harness.case_with(
            "outlives its deadline",
            Callback::future(move || {
                let finished = finished.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    finished.set(true);
                    Ok(Value::Unit)
                }
            }),
            CaseOptions::timeout_ms(10),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_work_survives_the_end_of_the_run() -> TestResult {
        let harness = Harness::default();
        let finished = Rc::new(Cell::new(false));
        late_flag_case(&harness, &finished)?;

        let results = harness.run()?.await?;
        assert_eq!(results.total_timeouts, 1);
        assert!(!finished.get());

        harness.drive_detached(Duration::from_millis(100))?.await;
        assert!(finished.get());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_work_progresses_during_the_next_run() -> TestResult {
        let harness = Harness::default();
        let finished = Rc::new(Cell::new(false));
        late_flag_case(&harness, &finished)?;
        harness.run()?.await?;
        assert!(!finished.get());

        harness.reset()?;
        harness.case_with(
            "takes its time",
            Callback::future(|| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(Value::Unit)
            }),
            CaseOptions::timeout_ms(0),
        )?;
        harness.run()?.await?;

        assert!(finished.get());
        Ok(())
    }

    #[tokio::test]
    async fn detached_work_cannot_be_driven_during_a_run() -> TestResult {
        let harness = Harness::default();
        let h = harness.clone();
        let refused = Log::default();
        let r = refused.clone();
        harness.case(
            "drives",
            Callback::sync(move || {
                if matches!(
                    h.drive_detached(Duration::ZERO),
                    Err(HarnessError::AlreadyRunning)
                ) {
                    r.push("refused");
                }
                Ok(Value::Unit)
            }),
        )?;

        harness.run()?.await?;

        assert_eq!(refused.entries(), vec!["refused"]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn a_body_that_never_settles_times_out() -> TestResult {
        let harness = Harness::default();
        harness.case_with(
            "forgets to signal",
            Callback::done(|_done| {}),
            CaseOptions::timeout_ms(1),
        )?;
        harness.case_with(
            "pending future",
            Callback::future(future::pending),
            CaseOptions::timeout_ms(1),
        )?;

        let results = harness.run()?.await?;

        assert_eq!(results.total_tests, 2);
        assert_eq!(results.total_timeouts, 2);
        assert_eq!(results.total_failures, 0);
        for result in &results.test_results {
            assert_eq!(result.outcome, Outcome::Timeout);
            assert!(matches!(
                result.error,
                Some(Failure::Timeout(timeout)) if timeout.timeout_ms == 1
            ));
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn configured_case_timeout_applies_without_an_override() -> TestResult {
        let harness = Harness::new(HarnessConfig::default().with_timeout_ms(5));
        harness.case("slow", Callback::future(future::pending))?;
        harness.case_with(
            "slow but unbounded",
            Callback::future(|| async {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                Ok(Value::Unit)
            }),
            CaseOptions::timeout_ms(0),
        )?;

        let results = harness.run()?.await?;

        assert_eq!(results.test_results[0].outcome, Outcome::Timeout);
        assert_eq!(results.test_results[1].outcome, Outcome::Success);
        Ok(())
    }

    #[tokio::test]
    async fn error_values_only_fail_through_the_completion_signal() -> TestResult {
        let harness = Harness::default();
        harness.case(
            "returns an error value",
            Callback::sync(|| Ok(Value::Error(Failure::raised("returned")))),
        )?;
        harness.case(
            "signals an error value",
            Callback::done(|done| done.signal(Value::Error(Failure::raised("signalled")))),
        )?;
        harness.case(
            "panics",
            Callback::sync(|| panic!("boom")),
        )?;

        let results = harness.run()?.await?;

        assert_eq!(results.test_results[0].outcome, Outcome::Success);
        assert_eq!(results.test_results[1].outcome, Outcome::Fail);
        assert_eq!(
            results.test_results[1].error,
            Some(Failure::raised("signalled"))
        );
        assert_eq!(results.test_results[2].outcome, Outcome::Fail);
        assert_eq!(
            results.test_results[2].error,
            Some(Failure::Panicked(String::from("boom")))
        );
        assert_eq!(
            results.total_tests,
            results.total_successes + results.total_failures + results.total_timeouts
        );
        Ok(())
    }

    struct Forgive;

    impl Listener for Forgive {
        fn before_finalize<'a>(
            &'a self,
            result: &'a mut CaseResult,
        ) -> LocalBoxFuture<'a, Result<(), Failure>> {
            async move {
                if result.title == "flaky" {
                    result.outcome = Outcome::Success;
                    result.error = None;
                }
                Ok(())
            }
            .boxed_local()
        }
    }

    struct RejectTitled(&'static str);

    impl Listener for RejectTitled {
        fn before_finalize<'a>(
            &'a self,
            result: &'a mut CaseResult,
        ) -> LocalBoxFuture<'a, Result<(), Failure>> {
            let verdict = match result.title == self.0 {
                true => Err(Failure::raised("rejected by listener")),
                false => Ok(()),
            };
            future::ready(verdict).boxed_local()
        }
    }

    #[tokio::test]
    async fn listeners_shape_results_before_they_are_counted() -> TestResult {
        let harness = Harness::default();
        let recorder = Rc::new(Recorder::default());
        harness.add_listener(Rc::new(Forgive));
        harness.add_listener(Rc::new(RejectTitled("solid")));
        harness.add_listener(recorder.clone());

        harness.case("flaky", Callback::sync(|| Err(Failure::raised("flaked"))))?;
        harness.case("solid", Callback::noop())?;

        let results = harness.run()?.await?;

        assert_eq!(results.total_successes, 1);
        assert_eq!(results.total_failures, 1);
        assert_eq!(results.test_results[0].outcome, Outcome::Success);
        assert_eq!(
            results.test_results[1].error,
            Some(Failure::raised("rejected by listener"))
        );
        assert_eq!(*recorder.finished.borrow(), results.test_results);
        assert_eq!(recorder.runs.borrow().len(), 1);
        assert_eq!(recorder.files.borrow().len(), 1);
        assert!(recorder.files.borrow()[0].ends_with("scheduling.rs"));
        Ok(())
    }

    #[tokio::test]
    async fn removed_listeners_hear_nothing() -> TestResult {
        let harness = Harness::default();
        let recorder = Rc::new(Recorder::default());
        let id = harness.add_listener(recorder.clone());
        assert!(harness.remove_listener(id));
        assert!(!harness.remove_listener(id));

        harness.case("a", Callback::noop())?;
        harness.run()?.await?;

        assert!(recorder.finished.borrow().is_empty());
        assert!(recorder.runs.borrow().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn usage_errors_are_reported_right_away() -> TestResult {
        let harness = Harness::default();
        assert!(matches!(harness.cancel(), Err(HarnessError::NotRunning)));
        assert!(matches!(
            harness.current_case_info(),
            Err(HarnessError::NotInCase)
        ));

        let seen = Log::default();
        let (h, s) = (harness.clone(), seen.clone());
        harness.case(
            "misbehaves",
            Callback::sync(move || {
                if matches!(
                    h.case("late", Callback::noop()),
                    Err(HarnessError::RegistrationDuringCase)
                ) {
                    s.push("registration refused");
                }
                if matches!(
                    h.setup_each(Callback::noop()),
                    Err(HarnessError::RegistrationDuringCase)
                ) {
                    s.push("hook refused");
                }
                if matches!(h.run(), Err(HarnessError::AlreadyRunning)) {
                    s.push("run refused");
                }
                if matches!(h.reset(), Err(HarnessError::AlreadyRunning)) {
                    s.push("reset refused");
                }
                let info = h.current_case_info()?;
                s.push(format!("inside {}", info.title));
                Ok(Value::Unit)
            }),
        )?;

        let results = harness.run()?.await?;

        assert_eq!(results.total_successes, 1);
        assert_eq!(
            seen.entries(),
            vec![
                "registration refused",
                "hook refused",
                "run refused",
                "reset refused",
                "inside misbehaves",
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn a_second_run_is_refused_while_one_is_pending() -> TestResult {
        let harness = Harness::default();
        harness.case("a", Callback::noop())?;

        let first = harness.run()?;
        assert!(harness.is_running());
        assert!(matches!(harness.run(), Err(HarnessError::AlreadyRunning)));
        drop(first);
        assert!(!harness.is_running());

        let results = harness.run()?.await?;
        assert_eq!(results.total_tests, 1);
        Ok(())
    }

    #[tokio::test]
    async fn a_failing_group_body_aborts_the_run() -> TestResult {
        let harness = Harness::default();
        let log = Log::default();
        let h = harness.clone();
        harness.group(
            "outer",
            Callback::sync(move || {
                h.group(
                    "broken",
                    Callback::sync(|| Err(Failure::raised("cannot declare"))),
                )?;
                Ok(Value::Unit)
            }),
        )?;
        harness.case("after", log.record("after"))?;

        let aborted = harness.run()?.await;

        match aborted {
            Err(HarnessError::GroupFailed {
                title_chain,
                failure,
            }) => {
                assert_eq!(title_chain, vec!["outer", "broken"]);
                assert_eq!(failure, Failure::raised("cannot declare"));
            }
            other => panic!("expected a group failure, got {other:?}"),
        }
        assert!(log.entries().is_empty());
        assert!(!harness.is_running());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn a_stalled_hook_aborts_the_run() -> TestResult {
        let timeouts = PartialPhaseTimeouts {
            setup_once: Some(1),
            ..Default::default()
        };
        let harness = Harness::new(HarnessConfig::default().with_phase_timeouts(timeouts));
        harness.setup_once(Callback::future(future::pending))?;
        harness.case("a", Callback::noop())?;

        match harness.run()?.await {
            Err(HarnessError::HookFailed { phase, failure }) => {
                assert_eq!(phase, HookPhase::SetupOnce);
                assert!(failure.is_timeout());
            }
            other => panic!("expected a hook failure, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn a_failing_hook_aborts_the_run() -> TestResult {
        let harness = Harness::default();
        let log = Log::default();
        harness.setup_each(log.record_failure("setup each"))?;
        harness.case("a", log.record("a"))?;

        let aborted = harness.run()?.await;

        assert!(matches!(
            aborted,
            Err(HarnessError::HookFailed {
                phase: HookPhase::SetupEach,
                ..
            })
        ));
        assert_eq!(log.entries(), vec!["setup each"]);
        Ok(())
    }

    #[tokio::test]
    async fn root_registrations_last_until_reset() -> TestResult {
        let harness = Harness::default();
        let log = Log::default();
        harness.setup_once(log.record("setup once"))?;
        harness.case("a", log.record("a"))?;

        harness.run()?.await?;
        harness.run()?.await?;
        assert_eq!(log.entries(), vec!["setup once", "a", "setup once", "a"]);

        harness.reset()?;
        harness.case("b", log.record("b"))?;
        let results = harness.run()?.await?;

        assert_eq!(titles(&results), vec!["b"]);
        assert_eq!(log.count("setup once"), 2);
        Ok(())
    }
}
