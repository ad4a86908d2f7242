// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::Context as _;
use cid::Cid;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::{ChainApi, FaultTracker, WindowPoStProver};
use crate::chain::ChainSnapshot;
use crate::config::Config;
use crate::metrics;
use crate::miner::{
    DeadlineInfo, METHOD_SUBMIT_WINDOWED_POST, params::SubmitWindowedPoStParams,
    window_post_late_fee,
};
use crate::shim::{address::Address, sector::RegisteredPoStProof};

use super::{
    AddressSelector, Error, FailureReporter, FaultRecoveryDeclarer, MessageSubmitter,
    PostFailure, ProofAssembler, SectorHealthChecker, SenderSelector,
};

/// The miner the scheduler proves for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinerIdentity {
    /// ID address of the miner actor.
    pub actor: Address,
    pub worker: Address,
    pub proof_type: RegisteredPoStProof,
}

/// Lifecycle of a deadline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum RunState {
    Idle,
    Running,
    /// The submission was accepted by the message pool.
    Completed,
    /// There was nothing to prove.
    Aborted,
    Failed,
}

struct ActiveRun {
    id: u64,
    deadline: DeadlineInfo,
    token: CancellationToken,
}

pub struct WindowPoStScheduler {
    assembler: ProofAssembler,
    declarer: Arc<FaultRecoveryDeclarer>,
    submitter: Arc<MessageSubmitter>,
    reporter: Arc<dyn FailureReporter>,
    miner: MinerIdentity,
    shutdown: CancellationToken,
    next_run: AtomicU64,
    active: Mutex<Option<ActiveRun>>,
    state: Mutex<RunState>,
}

impl WindowPoStScheduler {
    pub fn new(
        api: Arc<dyn ChainApi>,
        fault_tracker: Arc<dyn FaultTracker>,
        prover: Arc<dyn WindowPoStProver>,
        address_selector: Arc<dyn AddressSelector>,
        reporter: Arc<dyn FailureReporter>,
        miner: MinerIdentity,
        config: &Config,
    ) -> Self {
        let checker = Arc::new(SectorHealthChecker::new(
            fault_tracker,
            miner.actor,
            miner.proof_type,
        ));
        let sender =
            SenderSelector::new(api.clone(), address_selector, miner.actor, miner.worker);
        let submitter = Arc::new(MessageSubmitter::new(
            api.clone(),
            sender,
            miner.actor,
            miner.worker,
            config.fees.max_window_post_gas_fee.clone(),
            config.wdpost.message_confidence,
        ));
        let declarer = Arc::new(FaultRecoveryDeclarer::new(
            api.clone(),
            checker.clone(),
            submitter.clone(),
            miner.actor,
        ));
        let assembler = ProofAssembler::new(api, checker, prover, miner.actor);

        Self {
            assembler,
            declarer,
            submitter,
            reporter,
            miner,
            shutdown: CancellationToken::new(),
            next_run: AtomicU64::new(0),
            active: Mutex::new(None),
            state: Mutex::new(RunState::Idle),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Deadline of the run in progress, if any.
    pub fn active_deadline(&self) -> Option<DeadlineInfo> {
        self.active.lock().as_ref().map(|run| run.deadline.clone())
    }

    /// Cancels the run in progress. Returns `false` if there is none.
    ///
    /// A submission cancelled while being pushed may still reach the message
    /// pool.
    pub fn abort(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(run) => {
                warn!(deadline = run.deadline.index, "Aborting window post run");
                run.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels the run in progress and all pending declarations.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    #[cfg(test)]
    fn run_token(&self) -> Option<CancellationToken> {
        self.active.lock().as_ref().map(|run| run.token.clone())
    }

    /// Starts the Window PoSt run of deadline `di` against `snapshot`.
    ///
    /// Faults and recoveries are declared for a later deadline in a separate
    /// task; its failures are logged and never affect the returned state.
    pub fn do_post(
        self: &Arc<Self>,
        di: DeadlineInfo,
        snapshot: ChainSnapshot,
    ) -> JoinHandle<RunState> {
        let id = self.next_run.fetch_add(1, Ordering::Relaxed);
        info!(
            miner = %self.miner.actor,
            deadline = di.index,
            height = snapshot.epoch,
            "Starting window post run"
        );
        let token = self.shutdown.child_token();
        *self.active.lock() = Some(ActiveRun {
            id,
            deadline: di.clone(),
            token: token.clone(),
        });
        *self.state.lock() = RunState::Running;

        self.spawn_declarations(di.clone(), snapshot.clone());

        let this = self.clone();
        tokio::spawn(async move {
            let _guard = token.clone().drop_guard();
            let state = this.run(&di, &snapshot, &token).await;
            this.finish(id, state);
            state
        })
    }

    fn spawn_declarations(&self, di: DeadlineInfo, snapshot: ChainSnapshot) {
        let declarer = self.declarer.clone();
        let token = self.shutdown.child_token();
        tokio::spawn(async move {
            tokio::select! {
                () = declarer.declare(&di, &snapshot) => {}
                () = token.cancelled() => {
                    warn!(deadline = di.index, "Declarations have been cancelled");
                }
            }
        });
    }

    async fn run(
        &self,
        di: &DeadlineInfo,
        snapshot: &ChainSnapshot,
        token: &CancellationToken,
    ) -> RunState {
        let pushing = AtomicBool::new(false);
        let result = tokio::select! {
            res = self.prove_and_submit(di, snapshot, &pushing) => res,
            () = token.cancelled() => Err(Error::Cancelled),
        };
        if matches!(result, Err(Error::Cancelled)) && pushing.load(Ordering::Relaxed) {
            warn!(
                deadline = di.index,
                "Cancelled while pushing the window post, the message may still have been sent"
            );
        }

        match result {
            Ok(cid) => {
                info!(deadline = di.index, %cid, "Window post run completed");
                RunState::Completed
            }
            Err(Error::NoPartitions) => {
                info!(deadline = di.index, "No partitions to prove");
                RunState::Aborted
            }
            Err(e) => {
                error!(deadline = di.index, "Window post run failed: {e:#}");
                self.fail_post(di, &e);
                RunState::Failed
            }
        }
    }

    async fn prove_and_submit(
        &self,
        di: &DeadlineInfo,
        snapshot: &ChainSnapshot,
        pushing: &AtomicBool,
    ) -> Result<Cid, Error> {
        let params = self.assembler.run_post(di, snapshot).await?;
        pushing.store(true, Ordering::Relaxed);
        Ok(self.submit_post(&params).await?)
    }

    #[tracing::instrument(skip_all, fields(deadline = params.deadline))]
    async fn submit_post(&self, params: &SubmitWindowedPoStParams) -> anyhow::Result<Cid> {
        // The late fee is refunded if the submission is on time.
        let cid = self
            .submitter
            .push(METHOD_SUBMIT_WINDOWED_POST, params, window_post_late_fee())
            .await
            .context("could not submit window post")?;
        info!(%cid, "Submitted window post");
        metrics::WDPOST_SUBMITTED.inc();

        self.submitter.spawn_confirmation_wait(cid);
        Ok(cid)
    }

    fn fail_post(&self, di: &DeadlineInfo, err: &Error) {
        metrics::WDPOST_FAILED.inc();
        self.reporter.report(PostFailure {
            deadline: di.clone(),
            error: format!("{err:#}"),
        });
    }

    fn finish(&self, id: u64, state: RunState) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|run| run.id == id) {
            *active = None;
            *self.state.lock() = state;
        }
    }
}
