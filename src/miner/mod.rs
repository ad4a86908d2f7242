// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod deadline;
pub mod params;

pub use deadline::*;

use cid::Cid;
use fil_actor_miner_state::v17::Method;

use crate::shim::{
    address::Address,
    econ::TokenAmount,
    message::MethodNum,
    sector::{RegisteredPoStProof, RegisteredSealProof, SectorInfo, SectorNumber, SectorSet},
};

pub const METHOD_SUBMIT_WINDOWED_POST: MethodNum = Method::SubmitWindowedPoSt as MethodNum;
pub const METHOD_DECLARE_FAULTS: MethodNum = Method::DeclareFaults as MethodNum;
pub const METHOD_DECLARE_FAULTS_RECOVERED: MethodNum = Method::DeclareFaultsRecovered as MethodNum;

/// Value attached to a Window PoSt submission. The actor charges it as a late
/// fee and refunds it when the proof is on time.
pub fn window_post_late_fee() -> TokenAmount {
    TokenAmount::from_atto(1000)
}

/// Snapshot of a partition of a deadline, as read from the miner actor state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Every sector assigned to the partition.
    pub all_sectors: SectorSet,
    pub active_sectors: SectorSet,
    pub faulty_sectors: SectorSet,
    /// Faulty sectors already declared as recovering.
    pub recovering_sectors: SectorSet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinerInfo {
    pub owner: Address,
    pub worker: Address,
    pub control_addresses: Vec<Address>,
    pub window_post_proof_type: RegisteredPoStProof,
}

/// Public on-chain sector metadata needed to prove a sector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectorOnChainInfo {
    pub sector_number: SectorNumber,
    pub seal_proof: RegisteredSealProof,
    pub sealed_cid: Cid,
}

impl From<&SectorOnChainInfo> for SectorInfo {
    fn from(info: &SectorOnChainInfo) -> Self {
        SectorInfo {
            proof: info.seal_proof,
            sector_number: info.sector_number,
            sealed_cid: info.sealed_cid,
        }
    }
}
