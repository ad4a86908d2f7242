// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Window PoSt submission for a Filecoin storage provider.
//!
//! Once per deadline [`wdpost::WindowPoStScheduler::do_post`] proves the
//! sectors assigned to the deadline and, in the background, declares faults
//! and recoveries for the deadline two windows ahead. The node is reached
//! through the traits in [`api`].

pub mod api;
pub mod chain;
pub mod config;
pub mod logger;
pub mod metrics;
pub mod miner;
pub mod shim;
#[cfg(test)]
mod test_utils;
pub mod wdpost;
