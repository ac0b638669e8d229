// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{command::Command, commands};

pub mod writer;

pub fn get_harness_commands() -> Vec<Box<dyn Command>> {
    vec![
        Box::new(commands::run::Run::new()),
        Box::new(commands::show_config::ShowConfig::new()),
    ]
}
