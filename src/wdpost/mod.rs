// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Window PoSt scheduling: once per deadline, prove the sectors assigned to it
//! and declare faults and recoveries for a later deadline.

mod check;
mod declare;
mod failure;
mod prove;
mod scheduler;
mod sender;
mod submit;

pub use check::SectorHealthChecker;
pub use declare::FaultRecoveryDeclarer;
pub use failure::{FailureReporter, PostFailure};
pub use prove::ProofAssembler;
pub use scheduler::{MinerIdentity, RunState, WindowPoStScheduler};
pub use sender::{AddressSelector, ControlAddressSelector, SenderSelector, required_funds};
pub use submit::MessageSubmitter;

use crate::shim::{error::ExitCode, message::MethodNum};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The deadline has no sector that can be proven. Not a failure.
    #[error("no partitions")]
    NoPartitions,
    #[error("received no proofs back from generate window post")]
    EmptyProof,
    #[error("window post run was cancelled")]
    Cancelled,
    #[error("message {cid} calling method {method} failed with exit code {}", .exit_code.value())]
    ExitCode {
        cid: cid::Cid,
        method: MethodNum,
        exit_code: ExitCode,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
