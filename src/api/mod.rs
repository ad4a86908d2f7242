// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Capabilities the scheduler consumes from the rest of the node.
//!
//! The method names follow the full node API they are usually backed by
//! (`Filecoin.StateMinerSectors`, `Filecoin.MpoolPushMessage`, ...).

use async_trait::async_trait;
use cid::Cid;

use crate::chain::{ApiTipsetKey, TipsetKey};
use crate::miner::{MinerInfo, Partition, SectorOnChainInfo};
use crate::shim::{
    ActorID,
    address::Address,
    clock::ChainEpoch,
    crypto::DomainSeparationTag,
    econ::TokenAmount,
    error::ExitCode,
    message::Message,
    randomness::Randomness,
    sector::{PoStProof, RegisteredSealProof, SectorID, SectorInfo, SectorSet},
};

/// Limits applied when a message is pushed to the message pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageSendSpec {
    /// Upper bound of `gas_fee_cap * gas_limit` the pool may set.
    pub max_fee: TokenAmount,
}

/// Receipt of an executed message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageReceipt {
    pub exit_code: ExitCode,
    pub gas_used: u64,
}

/// Result of waiting for a message to be included on chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageLookup {
    pub message: Cid,
    pub receipt: MessageReceipt,
    pub tipset: TipsetKey,
    pub height: ChainEpoch,
}

/// Chain reads and message pool writes.
#[async_trait]
pub trait ChainApi: Send + Sync + 'static {
    /// Partitions of a deadline of the miner, in partition index order.
    async fn state_miner_partitions(
        &self,
        miner: &Address,
        deadline: u64,
        tsk: &ApiTipsetKey,
    ) -> anyhow::Result<Vec<Partition>>;

    /// On-chain info of the sectors in `filter` that exist. Unknown sectors
    /// are omitted.
    async fn state_miner_sectors(
        &self,
        miner: &Address,
        filter: &SectorSet,
        tsk: &ApiTipsetKey,
    ) -> anyhow::Result<Vec<SectorOnChainInfo>>;

    async fn state_miner_info(
        &self,
        miner: &Address,
        tsk: &ApiTipsetKey,
    ) -> anyhow::Result<MinerInfo>;

    async fn wallet_balance(&self, address: &Address) -> anyhow::Result<TokenAmount>;

    async fn chain_get_randomness_from_beacon(
        &self,
        tsk: &ApiTipsetKey,
        tag: DomainSeparationTag,
        epoch: ChainEpoch,
        entropy: &[u8],
    ) -> anyhow::Result<Randomness>;

    async fn chain_get_randomness_from_tickets(
        &self,
        tsk: &ApiTipsetKey,
        tag: DomainSeparationTag,
        epoch: ChainEpoch,
        entropy: &[u8],
    ) -> anyhow::Result<Randomness>;

    /// Returns `message` with gas limit, fee cap and premium filled in.
    async fn gas_estimate_message_gas(
        &self,
        message: &Message,
        spec: &MessageSendSpec,
        tsk: &ApiTipsetKey,
    ) -> anyhow::Result<Message>;

    /// Assigns a nonce, signs and pushes `message`, returning its CID.
    async fn mpool_push_message(
        &self,
        message: Message,
        spec: &MessageSendSpec,
    ) -> anyhow::Result<Cid>;

    /// Blocks until the message has been on chain for `confidence` epochs.
    async fn state_wait_msg(&self, message: Cid, confidence: i64)
    -> anyhow::Result<MessageLookup>;
}

/// Storage-side checks of whether sectors can currently be proven.
#[async_trait]
pub trait FaultTracker: Send + Sync + 'static {
    /// Returns the subset of `sectors` that can *not* be proven.
    async fn check_provable(
        &self,
        proof_type: RegisteredSealProof,
        sectors: &[SectorID],
    ) -> anyhow::Result<Vec<SectorID>>;
}

/// The Window PoSt proving engine.
#[async_trait]
pub trait WindowPoStProver: Send + Sync + 'static {
    /// Generates proofs over `sectors`, returning the proofs and the sectors the
    /// engine had to skip. An empty proof list is never a success.
    async fn generate_window_post(
        &self,
        miner: ActorID,
        sectors: &[SectorInfo],
        randomness: &Randomness,
    ) -> anyhow::Result<(Vec<PoStProof>, Vec<SectorID>)>;
}
