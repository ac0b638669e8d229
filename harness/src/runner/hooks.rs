// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

use futures::FutureExt;
use serde::Serialize;

use crate::runner::normalize::{normalize, Callback, Deferred, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HookPhase {
    SetupOnce,
    SetupEach,
    TeardownEach,
    TeardownOnce,
}

impl HookPhase {
    /// Setup phases walk the scope chain outermost first, teardown phases
    /// innermost first.
    pub fn is_setup(self) -> bool {
        matches!(self, HookPhase::SetupOnce | HookPhase::SetupEach)
    }
}

impl Display for HookPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HookPhase::SetupOnce => f.write_str("setupOnce")?,
            HookPhase::SetupEach => f.write_str("setupEach")?,
            HookPhase::TeardownEach => f.write_str("teardownEach")?,
            HookPhase::TeardownOnce => f.write_str("teardownOnce")?,
        }
        Ok(())
    }
}

/// The four hook lists of one scope, each in registration order.
#[derive(Debug, Clone, Default)]
pub struct HookSet {
    setup_once: Vec<Callback>,
    setup_each: Vec<Callback>,
    teardown_each: Vec<Callback>,
    teardown_once: Vec<Callback>,
}

impl HookSet {
    pub fn hooks(&self, phase: HookPhase) -> &[Callback] {
        match phase {
            HookPhase::SetupOnce => &self.setup_once,
            HookPhase::SetupEach => &self.setup_each,
            HookPhase::TeardownEach => &self.teardown_each,
            HookPhase::TeardownOnce => &self.teardown_once,
        }
    }

    fn hooks_mut(&mut self, phase: HookPhase) -> &mut Vec<Callback> {
        match phase {
            HookPhase::SetupOnce => &mut self.setup_once,
            HookPhase::SetupEach => &mut self.setup_each,
            HookPhase::TeardownEach => &mut self.teardown_each,
            HookPhase::TeardownOnce => &mut self.teardown_once,
        }
    }
}

/// Hook lists for every active scope. Index 0 belongs to the root scope,
/// which is never discarded.
#[derive(Debug)]
pub struct HookLedger {
    scopes: Vec<HookSet>,
}

impl Default for HookLedger {
    fn default() -> Self {
        HookLedger::new()
    }
}

impl HookLedger {
    pub fn new() -> Self {
        HookLedger {
            scopes: vec![HookSet::default()],
        }
    }

    pub fn register(&mut self, phase: HookPhase, hook: Callback) {
        if let Some(active) = self.scopes.last_mut() {
            active.hooks_mut(phase).push(hook);
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HookSet::default());
    }

    pub fn exit_scope(&mut self) -> Option<HookSet> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Drops every scope above the root, keeping the root's hooks.
    pub fn unwind(&mut self) {
        self.scopes.truncate(1);
    }

    pub fn clear(&mut self) {
        self.scopes = vec![HookSet::default()];
    }

    /// Hooks of `phase` registered on the scope at `depth` (0 is the root).
    pub fn at(&self, depth: usize, phase: HookPhase) -> Vec<Callback> {
        self.scopes
            .get(depth)
            .map(|set| set.hooks(phase).to_vec())
            .unwrap_or_default()
    }

    /// Hooks of `phase` across the scopes at `depths`, visited outermost
    /// first for setup phases and innermost first for teardown phases.
    pub fn across(&self, depths: &[usize], phase: HookPhase) -> Vec<Callback> {
        let mut ordered = depths.to_vec();
        ordered.sort_unstable();
        if !phase.is_setup() {
            ordered.reverse();
        }
        ordered
            .into_iter()
            .flat_map(|depth| self.at(depth, phase))
            .collect()
    }

    /// Hooks of `phase` along the whole active chain.
    pub fn chain(&self, phase: HookPhase) -> Vec<Callback> {
        let depths = (0..self.scopes.len()).collect::<Vec<usize>>();
        self.across(&depths, phase)
    }
}

/// Runs `hooks` one after the other as a single deferred unit, stopping at
/// the first failure.
pub fn sequence(hooks: Vec<Callback>) -> Deferred {
    async move {
        for hook in &hooks {
            normalize(hook).await?;
        }
        Ok(Value::Unit)
    }
    .boxed_local()
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod hooks_tests;
