// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use anyhow::Context as _;
use tracing::debug;

use crate::api::FaultTracker;
use crate::shim::{
    address::Address,
    sector::{RegisteredPoStProof, SectorID, SectorSet, seal_proof_for_window_post},
};

/// Filters sector sets down to the sectors the storage can currently prove.
pub struct SectorHealthChecker {
    fault_tracker: Arc<dyn FaultTracker>,
    actor: Address,
    proof_type: RegisteredPoStProof,
}

impl SectorHealthChecker {
    pub fn new(
        fault_tracker: Arc<dyn FaultTracker>,
        actor: Address,
        proof_type: RegisteredPoStProof,
    ) -> Self {
        Self {
            fault_tracker,
            actor,
            proof_type,
        }
    }

    /// Returns the sectors of `check` that are provable.
    pub async fn check_provable(&self, check: &SectorSet) -> anyhow::Result<SectorSet> {
        if check.is_empty() {
            return Ok(SectorSet::new());
        }

        let spt = seal_proof_for_window_post(self.proof_type).context("getting seal proof type")?;
        let miner = self
            .actor
            .id()
            .with_context(|| format!("miner address {} is not an ID address", self.actor))?;

        let to_check: Vec<SectorID> = check
            .iter()
            .map(|number| SectorID { miner, number })
            .collect();

        let bad = self
            .fault_tracker
            .check_provable(spt, &to_check)
            .await
            .context("checking provable sectors")?;
        let bad = SectorSet::try_from_numbers(
            bad.iter()
                .filter(|id| id.miner == miner)
                .map(|id| id.number),
        )
        .context("collecting unprovable sectors")?;

        let good = check.subtract(&bad);
        debug!(checked = to_check.len(), good = good.count(), "Checked sectors");

        Ok(good)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockFaultTracker, miner, sectors};

    fn checker(tracker: Arc<MockFaultTracker>) -> SectorHealthChecker {
        SectorHealthChecker::new(
            tracker,
            miner(),
            RegisteredPoStProof::StackedDRGWindow2KiBV1P1,
        )
    }

    #[tokio::test]
    async fn empty_candidates_skip_the_oracle() {
        let tracker = Arc::new(MockFaultTracker::with_unprovable(&[1]));
        let good = checker(tracker.clone())
            .check_provable(&SectorSet::new())
            .await
            .unwrap();

        assert!(good.is_empty());
        assert!(tracker.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn unprovable_sectors_are_removed() {
        let tracker = Arc::new(MockFaultTracker::with_unprovable(&[2, 9]));
        let good = checker(tracker.clone())
            .check_provable(&sectors(&[1, 2, 3]))
            .await
            .unwrap();

        assert_eq!(good, sectors(&[1, 3]));
        let calls = tracker.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec![
                SectorID { miner: 1000, number: 1 },
                SectorID { miner: 1000, number: 2 },
                SectorID { miner: 1000, number: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn oracle_errors_propagate() {
        let tracker = Arc::new(MockFaultTracker {
            fail: true,
            ..Default::default()
        });
        let err = checker(tracker)
            .check_provable(&sectors(&[1]))
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("storage probe failed"));
    }

    #[tokio::test]
    async fn non_id_miner_address_is_an_error() {
        let tracker = Arc::new(MockFaultTracker::default());
        let checker = SectorHealthChecker::new(
            tracker.clone(),
            Address::new_secp256k1(&[4; 65]).unwrap(),
            RegisteredPoStProof::StackedDRGWindow2KiBV1P1,
        );

        assert!(checker.check_provable(&sectors(&[1])).await.is_err());
        assert!(tracker.calls.lock().is_empty());
    }
}
