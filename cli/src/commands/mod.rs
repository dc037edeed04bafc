// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the knowmap CLI

pub mod config;
pub mod map;
pub mod simulate;

pub use self::config::ConfigCommand;
pub use self::map::{ClusterArgs, ProjectArgs, ScaleArgs};
pub use self::simulate::SimulateArgs;
