// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use anyhow::Context as _;
use cid::Cid;
use num_traits::Zero as _;
use serde::Serialize;
use tracing::{error, warn};

use crate::api::ChainApi;
use crate::chain::ChainSnapshot;
use crate::metrics::{self, KindLabel};
use crate::miner::{
    DeadlineInfo, METHOD_DECLARE_FAULTS, METHOD_DECLARE_FAULTS_RECOVERED, Partition,
    params::{
        DeclareFaultsParams, DeclareFaultsRecoveredParams, FaultDeclaration, RecoveryDeclaration,
    },
};
use crate::shim::{address::Address, econ::TokenAmount, message::MethodNum};

use super::{Error, MessageSubmitter, SectorHealthChecker};

/// Declares faults and recoveries for the deadline two windows after the
/// current one. Declaring for the current deadline is already too late.
pub struct FaultRecoveryDeclarer {
    api: Arc<dyn ChainApi>,
    checker: Arc<SectorHealthChecker>,
    submitter: Arc<MessageSubmitter>,
    actor: Address,
}

impl FaultRecoveryDeclarer {
    pub fn new(
        api: Arc<dyn ChainApi>,
        checker: Arc<SectorHealthChecker>,
        submitter: Arc<MessageSubmitter>,
        actor: Address,
    ) -> Self {
        Self {
            api,
            checker,
            submitter,
            actor,
        }
    }

    /// Runs the recovery pass and then the fault pass. Failures are logged,
    /// a failed recovery pass does not prevent the fault pass.
    pub async fn declare(&self, di: &DeadlineInfo, snapshot: &ChainSnapshot) {
        let Some(decl_index) = di.declaration_deadline_index() else {
            error!(deadline = di.index, "Invalid deadline period, skipping declarations");
            return;
        };

        let partitions = match self
            .api
            .state_miner_partitions(&self.actor, decl_index, &snapshot.api_key())
            .await
        {
            Ok(partitions) => partitions,
            Err(e) => {
                error!(deadline = decl_index, "Loading partitions: {e:#}");
                return;
            }
        };

        if let Err(e) = self.check_next_recoveries(decl_index, &partitions).await {
            error!(deadline = decl_index, "Checking sector recoveries: {e:#}");
        }
        if let Err(e) = self.check_next_faults(decl_index, &partitions).await {
            error!(deadline = decl_index, "Checking sector faults: {e:#}");
        }
    }

    /// Builds the recovery declarations for the faulty sectors of
    /// `partitions` that are provable again.
    pub async fn recoveries(
        &self,
        decl_index: u64,
        partitions: &[Partition],
    ) -> anyhow::Result<DeclareFaultsRecoveredParams> {
        let mut params = DeclareFaultsRecoveredParams::default();
        let mut faulty = 0;

        for (partition_index, partition) in (0u64..).zip(partitions) {
            let unrecovered = partition
                .faulty_sectors
                .subtract(&partition.recovering_sectors);
            if unrecovered.is_empty() {
                continue;
            }
            faulty += unrecovered.count();

            let recovered = self
                .checker
                .check_provable(&unrecovered)
                .await
                .context("checking unrecovered sectors")?;
            // nothing recovered, nothing to declare
            if recovered.is_empty() {
                continue;
            }

            params.recoveries.push(RecoveryDeclaration {
                deadline: decl_index,
                partition: partition_index,
                sectors: recovered,
            });
        }

        if params.recoveries.is_empty() && faulty != 0 {
            warn!(deadline = decl_index, faulty, "No recoveries to declare");
        }

        Ok(params)
    }

    /// Builds the fault declarations for the active sectors of `partitions`
    /// that are no longer provable.
    pub async fn faults(
        &self,
        decl_index: u64,
        partitions: &[Partition],
    ) -> anyhow::Result<DeclareFaultsParams> {
        let mut params = DeclareFaultsParams::default();
        let mut bad = 0;

        for (partition_index, partition) in (0u64..).zip(partitions) {
            let good = self
                .checker
                .check_provable(&partition.active_sectors)
                .await
                .context("checking sectors")?;
            let faulty = partition.active_sectors.subtract(&good);
            if faulty.is_empty() {
                continue;
            }
            bad += faulty.count();

            params.faults.push(FaultDeclaration {
                deadline: decl_index,
                partition: partition_index,
                sectors: faulty,
            });
        }

        if !params.faults.is_empty() {
            error!(count = bad, "DETECTED FAULTY SECTORS, declaring faults");
        }

        Ok(params)
    }

    #[tracing::instrument(skip_all, fields(deadline = decl_index))]
    pub async fn check_next_recoveries(
        &self,
        decl_index: u64,
        partitions: &[Partition],
    ) -> Result<Option<Cid>, Error> {
        let params = self.recoveries(decl_index, partitions).await?;
        if params.recoveries.is_empty() {
            return Ok(None);
        }
        self.send(METHOD_DECLARE_FAULTS_RECOVERED, &params, metrics::values::RECOVERIES)
            .await
            .map(Some)
    }

    #[tracing::instrument(skip_all, fields(deadline = decl_index))]
    pub async fn check_next_faults(
        &self,
        decl_index: u64,
        partitions: &[Partition],
    ) -> Result<Option<Cid>, Error> {
        let params = self.faults(decl_index, partitions).await?;
        if params.faults.is_empty() {
            return Ok(None);
        }
        self.send(METHOD_DECLARE_FAULTS, &params, metrics::values::FAULTS)
            .await
            .map(Some)
    }

    /// Pushes a declaration and waits for its receipt.
    async fn send<P: Serialize>(
        &self,
        method: MethodNum,
        params: &P,
        kind: KindLabel,
    ) -> Result<Cid, Error> {
        let cid = self
            .submitter
            .push(method, params, TokenAmount::zero())
            .await?;
        metrics::WDPOST_DECLARATIONS.get_or_create(&kind).inc();
        warn!(%cid, method, "Declaration message sent");

        let lookup = self.submitter.wait(cid).await?;
        let exit_code = lookup.receipt.exit_code;
        if !exit_code.is_success() {
            return Err(Error::ExitCode {
                cid,
                method,
                exit_code,
            });
        }
        Ok(cid)
    }
}
