// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The scheduling engine. Groups and cases are registered on a [`Harness`]
//! and discovered lazily: a group's body only runs, and so only registers
//! its children, once traversal reaches it. Traversal is depth first in
//! registration order and strictly sequential.

pub mod events;
pub mod hooks;
pub mod normalize;
pub mod results;
pub mod scope;
pub mod timeout;

use std::cell::RefCell;
use std::panic::Location;
use std::rc::Rc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use log::{debug, trace};
use tokio::task::LocalSet;
use tokio::time::Instant;

use crate::config::{HarnessConfig, PhaseTimeouts};
use crate::errors::HarnessError;
use events::{Listener, ListenerId, Listeners};
use hooks::{HookLedger, HookPhase};
use normalize::{normalize, Callback};
use results::{CaseInfo, CaseResult, Outcome, RunResults};
use scope::{Case, CaseOptions, Group, Mark, Node, Scope};

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Resolves with the results of a run, or with the structural failure that
/// aborted it.
pub type RunFuture = LocalBoxFuture<'static, Result<RunResults>>;

/// Resolves with whatever results the cancelled run accumulated.
pub type CancelFuture = LocalBoxFuture<'static, RunResults>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Cancelling,
}

struct State {
    config: HarnessConfig,
    timeouts: PhaseTimeouts,
    run_state: RunState,
    scopes: Vec<Scope>,
    ledger: HookLedger,
    current: Option<CaseInfo>,
    last_file: Option<String>,
    results: RunResults,
    listeners: Listeners,
    waiters: Vec<oneshot::Sender<RunResults>>,
}

impl State {
    fn new(config: HarnessConfig) -> Self {
        State {
            timeouts: config.phase_timeouts(),
            config,
            run_state: RunState::Idle,
            scopes: vec![Scope::root()],
            ledger: HookLedger::new(),
            current: None,
            last_file: None,
            results: RunResults::default(),
            listeners: Listeners::default(),
            waiters: vec![],
        }
    }

    fn ensure_not_in_case(&self) -> Result<()> {
        match self.current {
            Some(_) => Err(HarnessError::RegistrationDuringCase),
            None => Ok(()),
        }
    }

    fn top_scope(&self) -> &Scope {
        // The root scope is never popped.
        &self.scopes[self.scopes.len() - 1]
    }

    fn top_scope_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
        self.ledger.enter_scope();
    }

    fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
            self.ledger.exit_scope();
        }
    }

    /// Settles the run: back to Idle with only the root scope left, and
    /// hands out the accumulated results to every cancel waiter.
    fn settle(&mut self) -> (RunResults, Vec<oneshot::Sender<RunResults>>) {
        self.run_state = RunState::Idle;
        self.current = None;
        self.scopes.truncate(1);
        self.ledger.unwind();
        (
            std::mem::take(&mut self.results),
            std::mem::take(&mut self.waiters),
        )
    }
}

/// Handle to one engine instance. Clones share the same engine, so bodies
/// can capture a clone to register children or cancel the run.
///
/// Work a timed-out body left behind is detached onto the engine's own
/// [`LocalSet`]. It keeps running whenever that set is driven, during later
/// runs or [`Harness::drive_detached`], and is only dropped together with
/// the last handle.
#[derive(Clone)]
pub struct Harness {
    inner: Rc<RefCell<State>>,
    local: Rc<LocalSet>,
}

impl Default for Harness {
    fn default() -> Self {
        Harness::new(HarnessConfig::default())
    }
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Harness {
            inner: Rc::new(RefCell::new(State::new(config))),
            local: Rc::new(LocalSet::new()),
        }
    }

    pub fn config(&self) -> HarnessConfig {
        self.inner.borrow().config.clone()
    }

    //
    // Registration
    //

    pub fn group(&self, title: impl Into<String>, body: Callback) -> Result<()> {
        self.register_group(title.into(), body, Mark::Normal)
    }

    pub fn group_only(&self, title: impl Into<String>, body: Callback) -> Result<()> {
        self.register_group(title.into(), body, Mark::Only)
    }

    pub fn group_skip(&self, title: impl Into<String>, body: Callback) -> Result<()> {
        self.register_group(title.into(), body, Mark::Skip)
    }

    #[track_caller]
    pub fn case(&self, title: impl Into<String>, body: Callback) -> Result<()> {
        self.register_case(title.into(), body, Mark::Normal, CaseOptions::default())
    }

    #[track_caller]
    pub fn case_only(&self, title: impl Into<String>, body: Callback) -> Result<()> {
        self.register_case(title.into(), body, Mark::Only, CaseOptions::default())
    }

    #[track_caller]
    pub fn case_skip(&self, title: impl Into<String>, body: Callback) -> Result<()> {
        self.register_case(title.into(), body, Mark::Skip, CaseOptions::default())
    }

    #[track_caller]
    pub fn case_with(
        &self,
        title: impl Into<String>,
        body: Callback,
        options: CaseOptions,
    ) -> Result<()> {
        self.register_case(title.into(), body, Mark::Normal, options)
    }

    #[track_caller]
    pub fn case_only_with(
        &self,
        title: impl Into<String>,
        body: Callback,
        options: CaseOptions,
    ) -> Result<()> {
        self.register_case(title.into(), body, Mark::Only, options)
    }

    #[track_caller]
    pub fn case_skip_with(
        &self,
        title: impl Into<String>,
        body: Callback,
        options: CaseOptions,
    ) -> Result<()> {
        self.register_case(title.into(), body, Mark::Skip, options)
    }

    pub fn setup_once(&self, body: Callback) -> Result<()> {
        self.register_hook(HookPhase::SetupOnce, body)
    }

    pub fn setup_each(&self, body: Callback) -> Result<()> {
        self.register_hook(HookPhase::SetupEach, body)
    }

    pub fn teardown_each(&self, body: Callback) -> Result<()> {
        self.register_hook(HookPhase::TeardownEach, body)
    }

    pub fn teardown_once(&self, body: Callback) -> Result<()> {
        self.register_hook(HookPhase::TeardownOnce, body)
    }

    fn register_group(&self, title: String, body: Callback, mark: Mark) -> Result<()> {
        self.register(Node::Group(Group { title, body, mark }))
    }

    #[track_caller]
    fn register_case(
        &self,
        title: String,
        body: Callback,
        mark: Mark,
        options: CaseOptions,
    ) -> Result<()> {
        let file = Location::caller().file().to_string();
        self.register(Node::Case(Case {
            title,
            body,
            file,
            mark,
            options,
        }))
    }

    fn register(&self, node: Node) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        state.ensure_not_in_case()?;
        state.top_scope_mut().push(node);
        Ok(())
    }

    fn register_hook(&self, phase: HookPhase, body: Callback) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        state.ensure_not_in_case()?;
        state.ledger.register(phase, body);
        Ok(())
    }

    //
    // Listeners
    //

    pub fn add_listener(&self, listener: Rc<dyn Listener>) -> ListenerId {
        self.inner.borrow_mut().listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.borrow_mut().listeners.remove(id)
    }

    //
    // Lifecycle
    //

    pub fn is_running(&self) -> bool {
        self.inner.borrow().run_state != RunState::Idle
    }

    /// Starts a run over everything registered at the root. Fails right
    /// away when a run is already in progress. Dropping the returned future
    /// early abandons the run and returns the engine to idle.
    pub fn run(&self) -> Result<RunFuture> {
        {
            let mut state = self.inner.borrow_mut();
            if state.run_state != RunState::Idle {
                return Err(HarnessError::AlreadyRunning);
            }
            state.run_state = RunState::Running;
            state.results = RunResults::default();
            state.last_file = None;
            state.scopes[0].rearm();
        }

        let guard = RunGuard {
            inner: self.inner.clone(),
        };
        let harness = self.clone();
        Ok(async move {
            let settled = harness.local.run_until(harness.drive()).await;
            drop(guard);
            settled
        }
        .boxed_local())
    }

    /// Lets detached late work make progress for `duration` between runs.
    pub fn drive_detached(&self, duration: Duration) -> Result<LocalBoxFuture<'static, ()>> {
        if self.is_running() {
            return Err(HarnessError::AlreadyRunning);
        }
        let local = self.local.clone();
        Ok(async move {
            local.run_until(tokio::time::sleep(duration)).await;
        }
        .boxed_local())
    }

    /// Discards every registered root child and root hook.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        if state.run_state != RunState::Idle {
            return Err(HarnessError::AlreadyRunning);
        }
        state.scopes = vec![Scope::root()];
        state.ledger.clear();
        debug!("harness reset");
        state.results = RunResults::default();
        state.last_file = None;
        Ok(())
    }

    /// Asks the active run to stop entering cases and groups. The run still
    /// fires teardown-once hooks of scopes that executed a case.
    pub fn cancel(&self) -> Result<CancelFuture> {
        let mut state = self.inner.borrow_mut();
        if state.run_state == RunState::Idle {
            return Err(HarnessError::NotRunning);
        }
        debug!("cancellation requested");
        state.run_state = RunState::Cancelling;
        let (sender, receiver) = oneshot::channel();
        state.waiters.push(sender);
        Ok(async move { receiver.await.unwrap_or_default() }.boxed_local())
    }

    pub fn current_case_info(&self) -> Result<CaseInfo> {
        self.inner
            .borrow()
            .current
            .clone()
            .ok_or(HarnessError::NotInCase)
    }

    //
    // Traversal
    //

    fn is_cancelled(&self) -> bool {
        self.inner.borrow().run_state == RunState::Cancelling
    }

    async fn drive(&self) -> Result<RunResults> {
        let started = Instant::now();
        debug!("run started");

        let traversal = match self.drain_scope().await {
            Ok(()) => self.teardown_scope().await,
            Err(err) => Err(err),
        };

        let (listeners, (mut results, waiters)) = {
            let mut state = self.inner.borrow_mut();
            (state.listeners.snapshot(), state.settle())
        };
        results.elapsed = started.elapsed();
        debug!(
            "run settled after {:?}: {} tests, {} failed, {} timed out",
            results.elapsed, results.total_tests, results.total_failures, results.total_timeouts
        );

        for waiter in waiters {
            let _ = waiter.send(results.clone());
        }

        traversal?;
        for listener in &listeners {
            listener.run_finished(&results);
        }
        Ok(results)
    }

    /// Visits the children registered on the innermost scope.
    fn drain_scope(&self) -> LocalBoxFuture<'_, Result<()>> {
        async move {
            let mut pending = self.inner.borrow().top_scope().queue();
            while let Some(node) = pending.pop_front() {
                if self.is_cancelled() {
                    debug!("cancelled, leaving {} sibling(s) unvisited", pending.len() + 1);
                    break;
                }
                match node {
                    Node::Case(case) => self.visit_case(case).await?,
                    Node::Group(group) => self.visit_group(group).await?,
                }
            }
            Ok(())
        }
        .boxed_local()
    }

    async fn visit_group(&self, group: Group) -> Result<()> {
        let title_chain = {
            let mut state = self.inner.borrow_mut();
            let scope = state.top_scope().child(&group.title, group.mark);
            let title_chain = scope.title_chain().to_vec();
            state.push_scope(scope);
            title_chain
        };
        debug!("entering group {}", title_chain.join(" > "));

        if let Err(failure) = normalize(&group.body).await {
            return Err(HarnessError::GroupFailed {
                title_chain,
                failure,
            });
        }

        self.drain_scope().await?;
        self.teardown_scope().await?;
        self.inner.borrow_mut().pop_scope();
        debug!("left group {}", title_chain.join(" > "));
        Ok(())
    }

    /// Fires the innermost scope's teardown-once hooks if a case ran in it.
    async fn teardown_scope(&self) -> Result<()> {
        let hooks = {
            let state = self.inner.borrow();
            if !state.top_scope().has_executed() {
                return Ok(());
            }
            state.ledger.at(state.depth(), HookPhase::TeardownOnce)
        };
        self.run_hooks(HookPhase::TeardownOnce, hooks).await
    }

    async fn visit_case(&self, case: Case) -> Result<()> {
        let (info, skip, listeners) = {
            let state = self.inner.borrow();
            let scope = state.top_scope();
            let info = CaseInfo {
                title: case.title.clone(),
                title_chain: scope.title_chain().to_vec(),
                file: case.file.clone(),
            };
            let skip = scope.skips_descendants() || case.mark == Mark::Skip;
            (info, skip, state.listeners.snapshot())
        };

        if skip {
            trace!("skipping case {}", info.title);
            self.finalize(CaseResult::skipped(&info), &listeners);
            return Ok(());
        }

        self.enter_case(&info, &listeners);

        let setup_once = {
            let mut state = self.inner.borrow_mut();
            let due = state
                .scopes
                .iter()
                .enumerate()
                .filter(|(_, scope)| !scope.setup_done())
                .map(|(depth, _)| depth)
                .collect::<Vec<usize>>();
            for depth in &due {
                state.scopes[*depth].mark_setup_done();
            }
            state.ledger.across(&due, HookPhase::SetupOnce)
        };
        self.run_hooks(HookPhase::SetupOnce, setup_once).await?;

        let setup_each = self.inner.borrow().ledger.chain(HookPhase::SetupEach);
        self.run_hooks(HookPhase::SetupEach, setup_each).await?;

        let timeout_ms = case
            .options
            .timeout_ms
            .unwrap_or(self.inner.borrow().timeouts.case);
        trace!("running case {} with timeout {timeout_ms}ms", info.title);
        let started = Instant::now();
        let settled = timeout::wrap(normalize(&case.body), timeout_ms).await;
        let mut result = CaseResult::settled(&info, settled, started.elapsed());

        let teardown_each = self.inner.borrow().ledger.chain(HookPhase::TeardownEach);
        self.run_hooks(HookPhase::TeardownEach, teardown_each).await?;

        events::before_finalize(&listeners, &mut result).await;

        {
            let mut state = self.inner.borrow_mut();
            state.current = None;
            if state.config.stop_on_first_fail
                && result.outcome != Outcome::Success
                && state.run_state == RunState::Running
            {
                debug!("stopping after first failure in {}", result.full_title());
                state.run_state = RunState::Cancelling;
            }
        }
        self.finalize(result, &listeners);
        Ok(())
    }

    fn enter_case(&self, info: &CaseInfo, listeners: &[Rc<dyn Listener>]) {
        let file_changed = {
            let mut state = self.inner.borrow_mut();
            state.current = Some(info.clone());
            for scope in state.scopes.iter_mut() {
                scope.mark_executed();
            }
            if state.last_file.as_deref() != Some(info.file.as_str()) {
                state.last_file = Some(info.file.clone());
                true
            } else {
                false
            }
        };

        if file_changed {
            for listener in listeners {
                listener.file_changed(&info.file);
            }
        }
    }

    fn finalize(&self, result: CaseResult, listeners: &[Rc<dyn Listener>]) {
        self.inner.borrow_mut().results.record(result.clone());
        for listener in listeners {
            listener.case_finished(&result);
        }
    }

    async fn run_hooks(&self, phase: HookPhase, hooks: Vec<Callback>) -> Result<()> {
        if hooks.is_empty() {
            return Ok(());
        }
        trace!("running {} {phase} hook(s)", hooks.len());
        let timeout_ms = self.inner.borrow().timeouts.for_hook(phase);
        match timeout::wrap(hooks::sequence(hooks), timeout_ms).await {
            Ok(_) => Ok(()),
            Err(failure) => Err(HarnessError::HookFailed { phase, failure }),
        }
    }
}

/// Returns the engine to idle if a run future is dropped before it settles.
struct RunGuard {
    inner: Rc<RefCell<State>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.try_borrow_mut() {
            if state.run_state != RunState::Idle {
                debug!("run abandoned before it settled");
                let (results, waiters) = state.settle();
                for waiter in waiters {
                    let _ = waiter.send(results.clone());
                }
            }
        }
    }
}
