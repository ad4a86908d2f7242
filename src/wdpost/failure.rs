// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use tracing::warn;

use crate::miner::DeadlineInfo;

/// A deadline whose Window PoSt could not be submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostFailure {
    pub deadline: DeadlineInfo,
    pub error: String,
}

/// Receives failed deadline runs.
pub trait FailureReporter: Send + Sync + 'static {
    fn report(&self, failure: PostFailure);
}

impl FailureReporter for flume::Sender<PostFailure> {
    fn report(&self, failure: PostFailure) {
        if let Err(e) = self.send(failure) {
            warn!(deadline = e.0.deadline.index, "Failure receiver dropped, discarding report");
        }
    }
}
