// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Parameters of the miner actor methods the scheduler calls, encoded as
//! DAG-CBOR tuples.

use fvm_ipld_encoding::tuple::*;

use crate::shim::{
    clock::ChainEpoch,
    randomness::Randomness,
    sector::{PoStProof, SectorSet},
};

/// Partition proven by a Window PoSt, with the sectors left out of the proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct PoStPartition {
    pub index: u64,
    pub skipped: SectorSet,
}

/// Information submitted by a miner to provide a Window PoSt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct SubmitWindowedPoStParams {
    pub deadline: u64,
    /// Partitions being proven, in ascending index order.
    pub partitions: Vec<PoStPartition>,
    pub proofs: Vec<PoStProof>,
    /// Epoch whose ticket randomness is committed to by `chain_commit_rand`.
    pub chain_commit_epoch: ChainEpoch,
    pub chain_commit_rand: Randomness,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct FaultDeclaration {
    /// The deadline to which the faulty sectors are assigned.
    pub deadline: u64,
    pub partition: u64,
    pub sectors: SectorSet,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct DeclareFaultsParams {
    pub faults: Vec<FaultDeclaration>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct RecoveryDeclaration {
    /// The deadline to which the recovered sectors are assigned.
    pub deadline: u64,
    pub partition: u64,
    pub sectors: SectorSet,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct DeclareFaultsRecoveredParams {
    pub recoveries: Vec<RecoveryDeclaration>,
}
