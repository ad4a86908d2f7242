// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;
use std::time::Instant;

use ahash::{HashMap, HashMapExt as _};
use anyhow::Context as _;
use tracing::{info, warn};

use crate::api::{ChainApi, WindowPoStProver};
use crate::chain::{ApiTipsetKey, ChainSnapshot};
use crate::metrics::{self, HistogramTimerExt as _};
use crate::miner::{
    DeadlineInfo,
    params::{PoStPartition, SubmitWindowedPoStParams},
};
use crate::shim::{
    address::Address,
    crypto::DomainSeparationTag,
    randomness::Randomness,
    sector::{SectorInfo, SectorNumber, SectorSet},
};

use super::{Error, SectorHealthChecker};

/// Assembles the Window PoSt submission of a deadline.
pub struct ProofAssembler {
    api: Arc<dyn ChainApi>,
    checker: Arc<SectorHealthChecker>,
    prover: Arc<dyn WindowPoStProver>,
    actor: Address,
}

impl ProofAssembler {
    pub fn new(
        api: Arc<dyn ChainApi>,
        checker: Arc<SectorHealthChecker>,
        prover: Arc<dyn WindowPoStProver>,
        actor: Address,
    ) -> Self {
        Self {
            api,
            checker,
            prover,
            actor,
        }
    }

    /// Proves the sectors of deadline `di` at `snapshot`.
    ///
    /// Returns [`Error::NoPartitions`] when no partition has a sector that can
    /// be proven.
    #[tracing::instrument(skip_all, fields(deadline = di.index, height = snapshot.epoch))]
    pub async fn run_post(
        &self,
        di: &DeadlineInfo,
        snapshot: &ChainSnapshot,
    ) -> Result<SubmitWindowedPoStParams, Error> {
        let tsk = snapshot.api_key();
        let partitions = self
            .api
            .state_miner_partitions(&self.actor, di.index, &tsk)
            .await
            .context("loading partitions")?;

        let mut params = SubmitWindowedPoStParams {
            deadline: di.index,
            partitions: Vec::with_capacity(partitions.len()),
            proofs: vec![],
            chain_commit_epoch: 0,
            chain_commit_rand: Randomness(vec![]),
        };
        let mut sinfos = vec![];
        let mut sector_to_part = HashMap::new();
        let mut skip_count = 0;

        for (index, partition) in (0u64..).zip(&partitions) {
            let to_prove = partition
                .active_sectors
                .union(&partition.recovering_sectors);
            let good = self
                .checker
                .check_provable(&to_prove)
                .await
                .context("checking sectors to skip")?;
            let skipped = to_prove.subtract(&good);
            skip_count += skipped.count();

            let requested = good.intersect(&partition.all_sectors);
            let ssi = self
                .sectors_for_proof(&requested, &tsk)
                .await
                .context("getting sorted sector info")?;
            if ssi.is_empty() {
                continue;
            }

            let position = params.partitions.len();
            sector_to_part.extend(requested.iter().map(|number| (number, position)));
            sinfos.extend(ssi);
            params.partitions.push(PoStPartition { index, skipped });
        }

        if sinfos.is_empty() {
            return Err(Error::NoPartitions);
        }

        let entropy =
            fvm_ipld_encoding::to_vec(&self.actor).context("failed to marshal address to cbor")?;
        let rand = self
            .api
            .chain_get_randomness_from_beacon(
                &tsk,
                DomainSeparationTag::WindowedPoStChallengeSeed,
                di.challenge_epoch,
                &entropy,
            )
            .await
            .with_context(|| {
                format!(
                    "failed to get chain randomness for window post (height={}; deadline={})",
                    snapshot.epoch, di.index
                )
            })?;

        info!(
            deadline = di.index,
            height = snapshot.epoch,
            skipped = skip_count,
            sectors = sinfos.len(),
            "Running window post"
        );
        metrics::WDPOST_SKIPPED_SECTORS.inc_by(skip_count);

        let miner = self
            .actor
            .id()
            .with_context(|| format!("miner address {} is not an ID address", self.actor))?;
        let start = Instant::now();
        let (proofs, post_skipped) = {
            let _timer = metrics::WDPOST_PROOF_GENERATION_TIME.start_timer();
            self.prover
                .generate_window_post(miner, &sinfos, &rand)
                .await
                .context("running post failed")?
        };
        if proofs.is_empty() {
            return Err(Error::EmptyProof);
        }
        params.proofs = proofs;

        let mut skipped_by_part: HashMap<usize, Vec<SectorNumber>> = HashMap::new();
        for sector in post_skipped {
            match sector_to_part.get(&sector.number) {
                Some(&position) => skipped_by_part.entry(position).or_default().push(sector.number),
                None => warn!(sector = sector.number, "Prover skipped a sector that was not requested"),
            }
        }
        for (position, numbers) in skipped_by_part {
            let part = &mut params.partitions[position];
            part.skipped = part
                .skipped
                .union(&SectorSet::try_from_numbers(numbers).context("collecting skipped sectors")?);
        }

        let elapsed = start.elapsed();

        let commit_epoch = di.open_epoch;
        let commit_rand = self
            .api
            .chain_get_randomness_from_tickets(
                &tsk,
                DomainSeparationTag::PoStChainCommit,
                commit_epoch,
                &[],
            )
            .await
            .with_context(|| {
                format!(
                    "failed to get chain commit randomness for window post (height={}; deadline={})",
                    snapshot.epoch, di.index
                )
            })?;
        params.chain_commit_epoch = commit_epoch;
        params.chain_commit_rand = commit_rand;

        info!(deadline = di.index, ?elapsed, "Submitting window post");

        Ok(params)
    }

    /// Resolves the proof inputs of `requested`, one per sector number in
    /// ascending order. Numbers without on-chain info are stood in for by the
    /// first resolved sector. Returns nothing when no sector resolves.
    pub async fn sectors_for_proof(
        &self,
        requested: &SectorSet,
        tsk: &ApiTipsetKey,
    ) -> anyhow::Result<Vec<SectorInfo>> {
        if requested.is_empty() {
            return Ok(vec![]);
        }
        let sset = self
            .api
            .state_miner_sectors(&self.actor, requested, tsk)
            .await
            .context("getting sector infos")?;
        let Some(first) = sset.first() else {
            return Ok(vec![]);
        };
        let substitute = SectorInfo::from(first);

        let by_number: HashMap<SectorNumber, SectorInfo> = sset
            .iter()
            .map(|sector| (sector.sector_number, SectorInfo::from(sector)))
            .collect();

        Ok(requested
            .iter()
            .map(|number| {
                by_number
                    .get(&number)
                    .cloned()
                    .unwrap_or_else(|| substitute.clone())
            })
            .collect())
    }
}
