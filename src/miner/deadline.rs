// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

use crate::shim::clock::ChainEpoch;

/// Number of deadlines ahead of the one being proven for which fault and
/// recovery declarations are made. Declarations for the current or the next
/// deadline can no longer take effect.
pub const DECLARATION_DEADLINE_OFFSET: u64 = 2;

/// Index of the deadline that declarations made while proving `index` target.
///
/// Returns `None` for a proving period without deadlines.
pub fn declaration_deadline_index(index: u64, period_deadlines: u64) -> Option<u64> {
    index
        .checked_add(DECLARATION_DEADLINE_OFFSET)?
        .checked_rem(period_deadlines)
}

/// Deadline calculations with respect to a current epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeadlineInfo {
    /// Epoch at which this info was calculated.
    pub current_epoch: ChainEpoch,
    /// First epoch of the proving period.
    pub period_start: ChainEpoch,
    /// Current deadline index, in `[0..period_deadlines)`.
    pub index: u64,
    /// First epoch from which a proof may be submitted.
    pub open_epoch: ChainEpoch,
    /// First epoch from which a proof may no longer be submitted.
    pub close_epoch: ChainEpoch,
    /// Epoch at which to sample the chain for challenge.
    pub challenge_epoch: ChainEpoch,
    /// First epoch at which a fault declaration is rejected.
    pub fault_cutoff: ChainEpoch,
    /// Number of deadlines in a proving period.
    pub period_deadlines: u64,
}

impl DeadlineInfo {
    pub fn declaration_deadline_index(&self) -> Option<u64> {
        declaration_deadline_index(self.index, self.period_deadlines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_deadline_wraps_around_period() {
        assert_eq!(declaration_deadline_index(0, 48), Some(2));
        assert_eq!(declaration_deadline_index(45, 48), Some(47));
        assert_eq!(declaration_deadline_index(46, 48), Some(0));
        assert_eq!(declaration_deadline_index(47, 48), Some(1));
    }

    #[test]
    fn declaration_deadline_for_tiny_periods() {
        assert_eq!(declaration_deadline_index(0, 1), Some(0));
        assert_eq!(declaration_deadline_index(1, 2), Some(1));
        assert_eq!(declaration_deadline_index(0, 0), None);
        assert_eq!(declaration_deadline_index(u64::MAX, 48), None);
    }
}
