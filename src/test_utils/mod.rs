// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! In-memory implementations of the scheduler's collaborators.

use std::sync::atomic::{AtomicU64, Ordering};

use ahash::HashMap;
use anyhow::bail;
use async_trait::async_trait;
use cid::Cid;
use fvm_ipld_encoding::DAG_CBOR;
use multihash_codetable::{Code, MultihashDigest as _};
use num_traits::Zero as _;
use parking_lot::Mutex;

use crate::api::{
    ChainApi, FaultTracker, MessageLookup, MessageReceipt, MessageSendSpec, WindowPoStProver,
};
use crate::chain::{ApiTipsetKey, TipsetKey};
use crate::miner::{DeadlineInfo, MinerInfo, Partition, SectorOnChainInfo};
use crate::shim::{
    ActorID,
    address::Address,
    clock::ChainEpoch,
    crypto::DomainSeparationTag,
    econ::TokenAmount,
    error::ExitCode,
    message::{Message, MethodNum},
    randomness::Randomness,
    sector::{
        PoStProof, RegisteredPoStProof, RegisteredSealProof, SectorID, SectorInfo, SectorNumber,
        SectorSet,
    },
};

pub const MINER_ID: ActorID = 1000;

pub fn miner() -> Address {
    Address::new_id(MINER_ID)
}

pub fn worker() -> Address {
    Address::new_id(1001)
}

pub fn control() -> Address {
    Address::new_id(1002)
}

pub fn sectors(numbers: &[SectorNumber]) -> SectorSet {
    SectorSet::try_from_numbers(numbers.iter().copied()).unwrap()
}

pub fn cid_of(data: &[u8]) -> Cid {
    Cid::new_v1(DAG_CBOR, Code::Blake2b256.digest(data))
}

pub fn sector_info(number: SectorNumber) -> SectorOnChainInfo {
    SectorOnChainInfo {
        sector_number: number,
        seal_proof: RegisteredSealProof::StackedDRG2KiBV1P1,
        sealed_cid: cid_of(&number.to_be_bytes()),
    }
}

/// A partition where every assigned sector is either active or faulty.
pub fn partition(active: &[u64], faulty: &[u64], recovering: &[u64]) -> Partition {
    let active_sectors = sectors(active);
    let faulty_sectors = sectors(faulty);
    Partition {
        all_sectors: active_sectors.union(&faulty_sectors),
        active_sectors,
        faulty_sectors,
        recovering_sectors: sectors(recovering),
    }
}

pub fn deadline(index: u64) -> DeadlineInfo {
    DeadlineInfo {
        current_epoch: 1000,
        period_start: 940,
        index,
        open_epoch: 1000,
        close_epoch: 1060,
        challenge_epoch: 980,
        fault_cutoff: 930,
        period_deadlines: 48,
    }
}

#[derive(Default)]
pub struct MockFaultTracker {
    pub unprovable: SectorSet,
    pub fail: bool,
    pub calls: Mutex<Vec<Vec<SectorID>>>,
}

impl MockFaultTracker {
    pub fn with_unprovable(numbers: &[SectorNumber]) -> Self {
        Self {
            unprovable: sectors(numbers),
            ..Default::default()
        }
    }
}

#[async_trait]
impl FaultTracker for MockFaultTracker {
    async fn check_provable(
        &self,
        _proof_type: RegisteredSealProof,
        sectors: &[SectorID],
    ) -> anyhow::Result<Vec<SectorID>> {
        self.calls.lock().push(sectors.to_vec());
        if self.fail {
            bail!("storage probe failed");
        }
        Ok(sectors
            .iter()
            .filter(|id| self.unprovable.contains(id.number))
            .cloned()
            .collect())
    }
}

pub struct MockProver {
    pub proofs: Vec<PoStProof>,
    pub skipped: Vec<SectorNumber>,
    pub fail: bool,
    pub calls: Mutex<Vec<(ActorID, Vec<SectorInfo>, Randomness)>>,
}

impl Default for MockProver {
    fn default() -> Self {
        Self {
            proofs: vec![PoStProof {
                post_proof: RegisteredPoStProof::StackedDRGWindow2KiBV1P1,
                proof_bytes: vec![0xab; 192],
            }],
            skipped: vec![],
            fail: false,
            calls: Default::default(),
        }
    }
}

impl MockProver {
    pub fn without_proofs() -> Self {
        Self {
            proofs: vec![],
            ..Default::default()
        }
    }

    pub fn skipping(numbers: &[SectorNumber]) -> Self {
        Self {
            skipped: numbers.to_vec(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl WindowPoStProver for MockProver {
    async fn generate_window_post(
        &self,
        miner: ActorID,
        sectors: &[SectorInfo],
        randomness: &Randomness,
    ) -> anyhow::Result<(Vec<PoStProof>, Vec<SectorID>)> {
        self.calls
            .lock()
            .push((miner, sectors.to_vec(), randomness.clone()));
        if self.fail {
            bail!("proving engine crashed");
        }
        let skipped = self
            .skipped
            .iter()
            .map(|&number| SectorID { miner, number })
            .collect();
        Ok((self.proofs.clone(), skipped))
    }
}

pub struct MockChain {
    pub partitions: HashMap<u64, Vec<Partition>>,
    pub sectors: HashMap<SectorNumber, SectorOnChainInfo>,
    pub miner_info: MinerInfo,
    pub balances: HashMap<Address, TokenAmount>,
    pub exit_codes: HashMap<MethodNum, ExitCode>,
    pub fail_miner_info: bool,
    pub fail_gas_estimation: bool,
    pub fail_push: bool,
    pub fail_partitions: bool,
    /// Pushes never complete.
    pub stall_push: bool,
    pub stalled_pushes: AtomicU64,
    pub pushed: Mutex<Vec<(Cid, Message)>>,
    pub push_specs: Mutex<Vec<MessageSendSpec>>,
    pub waited: Mutex<Vec<Cid>>,
    pub randomness_calls: Mutex<Vec<(DomainSeparationTag, ChainEpoch, Vec<u8>)>>,
    pub(crate) nonce: AtomicU64,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            partitions: Default::default(),
            sectors: Default::default(),
            miner_info: MinerInfo {
                owner: Address::new_id(999),
                worker: worker(),
                control_addresses: vec![control()],
                window_post_proof_type: RegisteredPoStProof::StackedDRGWindow2KiBV1P1,
            },
            balances: [
                (worker(), TokenAmount::from_whole(100)),
                (control(), TokenAmount::from_whole(100)),
            ]
            .into_iter()
            .collect(),
            exit_codes: Default::default(),
            fail_miner_info: false,
            fail_gas_estimation: false,
            fail_push: false,
            fail_partitions: false,
            stall_push: false,
            stalled_pushes: AtomicU64::new(0),
            pushed: Default::default(),
            push_specs: Default::default(),
            waited: Default::default(),
            randomness_calls: Default::default(),
            nonce: AtomicU64::new(0),
        }
    }
}

impl MockChain {
    pub fn with_partitions(mut self, deadline: u64, partitions: Vec<Partition>) -> Self {
        self.partitions.insert(deadline, partitions);
        self
    }

    pub fn with_sectors(mut self, numbers: &[SectorNumber]) -> Self {
        self.sectors
            .extend(numbers.iter().map(|&n| (n, sector_info(n))));
        self
    }

    pub fn pushed_methods(&self) -> Vec<MethodNum> {
        self.pushed.lock().iter().map(|(_, m)| m.method_num).collect()
    }

    pub fn pushed_with_method(&self, method: MethodNum) -> Vec<Message> {
        self.pushed
            .lock()
            .iter()
            .filter(|(_, m)| m.method_num == method)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn randomness(
        &self,
        tag: DomainSeparationTag,
        epoch: ChainEpoch,
        entropy: &[u8],
    ) -> Randomness {
        self.randomness_calls
            .lock()
            .push((tag, epoch, entropy.to_vec()));
        Randomness(format!("{tag:?}@{epoch}").into_bytes())
    }
}

#[async_trait]
impl ChainApi for MockChain {
    async fn state_miner_partitions(
        &self,
        _miner: &Address,
        deadline: u64,
        _tsk: &ApiTipsetKey,
    ) -> anyhow::Result<Vec<Partition>> {
        if self.fail_partitions {
            bail!("deadline {deadline} not found in actor state");
        }
        Ok(self.partitions.get(&deadline).cloned().unwrap_or_default())
    }

    async fn state_miner_sectors(
        &self,
        _miner: &Address,
        filter: &SectorSet,
        _tsk: &ApiTipsetKey,
    ) -> anyhow::Result<Vec<SectorOnChainInfo>> {
        Ok(filter
            .iter()
            .filter_map(|n| self.sectors.get(&n).cloned())
            .collect())
    }

    async fn state_miner_info(
        &self,
        _miner: &Address,
        _tsk: &ApiTipsetKey,
    ) -> anyhow::Result<MinerInfo> {
        if self.fail_miner_info {
            bail!("actor not found");
        }
        Ok(self.miner_info.clone())
    }

    async fn wallet_balance(&self, address: &Address) -> anyhow::Result<TokenAmount> {
        Ok(self
            .balances
            .get(address)
            .cloned()
            .unwrap_or_else(TokenAmount::zero))
    }

    async fn chain_get_randomness_from_beacon(
        &self,
        _tsk: &ApiTipsetKey,
        tag: DomainSeparationTag,
        epoch: ChainEpoch,
        entropy: &[u8],
    ) -> anyhow::Result<Randomness> {
        Ok(self.randomness(tag, epoch, entropy))
    }

    async fn chain_get_randomness_from_tickets(
        &self,
        _tsk: &ApiTipsetKey,
        tag: DomainSeparationTag,
        epoch: ChainEpoch,
        entropy: &[u8],
    ) -> anyhow::Result<Randomness> {
        Ok(self.randomness(tag, epoch, entropy))
    }

    async fn gas_estimate_message_gas(
        &self,
        message: &Message,
        _spec: &MessageSendSpec,
        _tsk: &ApiTipsetKey,
    ) -> anyhow::Result<Message> {
        if self.fail_gas_estimation {
            bail!("gas estimation failed");
        }
        let mut estimated = message.clone();
        estimated.gas_limit = 1_000_000;
        estimated.gas_fee_cap = TokenAmount::from_atto(100);
        estimated.gas_premium = TokenAmount::from_atto(10);
        Ok(estimated)
    }

    async fn mpool_push_message(
        &self,
        message: Message,
        spec: &MessageSendSpec,
    ) -> anyhow::Result<Cid> {
        if self.fail_push {
            bail!("mpool is full");
        }
        if self.stall_push {
            self.stalled_pushes.fetch_add(1, Ordering::Relaxed);
            std::future::pending::<()>().await;
        }
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let cid = cid_of(&[nonce.to_be_bytes(), message.method_num.to_be_bytes()].concat());
        self.pushed.lock().push((cid, message));
        self.push_specs.lock().push(spec.clone());
        Ok(cid)
    }

    async fn state_wait_msg(
        &self,
        message: Cid,
        _confidence: i64,
    ) -> anyhow::Result<MessageLookup> {
        self.waited.lock().push(message);
        let method = self
            .pushed
            .lock()
            .iter()
            .find(|(cid, _)| *cid == message)
            .map(|(_, m)| m.method_num);
        let Some(method) = method else {
            bail!("message {message} not found");
        };
        Ok(MessageLookup {
            message,
            receipt: MessageReceipt {
                exit_code: self.exit_codes.get(&method).copied().unwrap_or(ExitCode::OK),
                gas_used: 0,
            },
            tipset: TipsetKey::default(),
            height: 1001,
        })
    }
}
