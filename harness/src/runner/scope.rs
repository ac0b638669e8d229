// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;

use crate::runner::normalize::Callback;

/// Focus/skip marker of a registered case or group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mark {
    #[default]
    Normal,
    Only,
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaseOptions {
    /// Overrides the `case` timeout for this one case.
    pub timeout_ms: Option<i64>,
}

impl CaseOptions {
    pub fn timeout_ms(timeout_ms: i64) -> Self {
        CaseOptions {
            timeout_ms: Some(timeout_ms),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Case {
    pub title: String,
    pub body: Callback,
    pub file: String,
    pub mark: Mark,
    pub options: CaseOptions,
}

#[derive(Debug, Clone)]
pub struct Group {
    pub title: String,
    pub body: Callback,
    pub mark: Mark,
}

#[derive(Debug, Clone)]
pub enum Node {
    Case(Case),
    Group(Group),
}

impl Node {
    pub fn mark(&self) -> Mark {
        match self {
            Node::Case(case) => case.mark,
            Node::Group(group) => group.mark,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Node::Case(case) => &case.title,
            Node::Group(group) => &group.title,
        }
    }
}

/// Runtime record of an entered group. Children are only known once the
/// group body has run.
#[derive(Debug, Default)]
pub struct Scope {
    title_chain: Vec<String>,
    children: Vec<Node>,
    focus: Option<usize>,
    skip: bool,
    setup_done: bool,
    executed: usize,
}

impl Scope {
    pub fn root() -> Self {
        Scope::default()
    }

    /// The scope a group opens beneath `self`. Skipping is inherited.
    pub fn child(&self, title: &str, mark: Mark) -> Self {
        let mut title_chain = self.title_chain.clone();
        title_chain.push(title.to_string());
        Scope {
            title_chain,
            skip: self.skip || mark == Mark::Skip,
            ..Default::default()
        }
    }

    pub fn title_chain(&self) -> &[String] {
        &self.title_chain
    }

    pub fn skips_descendants(&self) -> bool {
        self.skip
    }

    pub fn push(&mut self, node: Node) {
        if self.focus.is_none() && node.mark() == Mark::Only {
            self.focus = Some(self.children.len());
        }
        self.children.push(node);
    }

    /// The registered children to visit, in registration order. With a
    /// focused child only the first focused one is visited. Children stay
    /// registered; nested scopes are discarded when traversal leaves them
    /// while the root keeps its children for the next run.
    pub fn queue(&self) -> VecDeque<Node> {
        match self.focus {
            Some(index) => self.children.iter().skip(index).take(1).cloned().collect(),
            None => self.children.iter().cloned().collect(),
        }
    }

    pub fn setup_done(&self) -> bool {
        self.setup_done
    }

    pub fn mark_setup_done(&mut self) {
        self.setup_done = true;
    }

    pub fn mark_executed(&mut self) {
        self.executed += 1;
    }

    pub fn has_executed(&self) -> bool {
        self.executed > 0
    }

    /// Prepares a long-lived root scope for another run. Registered
    /// children are kept.
    pub fn rearm(&mut self) {
        self.setup_done = false;
        self.executed = 0;
    }
}
