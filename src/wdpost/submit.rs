// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_encoding::RawBytes;
use num_traits::Zero as _;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::{ChainApi, MessageLookup, MessageSendSpec};
use crate::metrics;
use crate::miner::METHOD_SUBMIT_WINDOWED_POST;
use crate::shim::{
    address::Address,
    econ::TokenAmount,
    message::{Message, MethodNum},
};

use super::{Error, sender::SenderSelector};

/// Builds, sends and tracks messages to the miner actor.
pub struct MessageSubmitter {
    api: Arc<dyn ChainApi>,
    sender: SenderSelector,
    actor: Address,
    worker: Address,
    max_fee: TokenAmount,
    confidence: i64,
}

impl MessageSubmitter {
    pub fn new(
        api: Arc<dyn ChainApi>,
        sender: SenderSelector,
        actor: Address,
        worker: Address,
        max_fee: TokenAmount,
        confidence: i64,
    ) -> Self {
        Self {
            api,
            sender,
            actor,
            worker,
            max_fee,
            confidence,
        }
    }

    fn send_spec(&self) -> MessageSendSpec {
        MessageSendSpec {
            max_fee: self.max_fee.clone(),
        }
    }

    /// Serializes `params` into a call of `method` on the miner actor and
    /// pushes it to the message pool.
    pub async fn push<P: Serialize>(
        &self,
        method: MethodNum,
        params: &P,
        value: TokenAmount,
    ) -> anyhow::Result<Cid> {
        let params = RawBytes::serialize(params).context("could not serialize message params")?;
        let mut message = Message {
            version: 0,
            from: self.worker,
            to: self.actor,
            sequence: 0,
            value,
            method_num: method,
            params,
            gas_limit: 0,
            gas_fee_cap: TokenAmount::zero(),
            gas_premium: TokenAmount::zero(),
        };
        let spec = self.send_spec();
        self.sender.set_sender(&mut message, &spec).await;

        self.api
            .mpool_push_message(message, &spec)
            .await
            .with_context(|| format!("pushing message calling method {method} to mpool"))
    }

    /// Waits for `cid` to land on chain with the configured confidence.
    pub async fn wait(&self, cid: Cid) -> anyhow::Result<MessageLookup> {
        self.api
            .state_wait_msg(cid, self.confidence)
            .await
            .with_context(|| format!("waiting for message {cid}"))
    }

    /// Waits for the proof submission `cid` in the background. The outcome is
    /// only logged, a wait error or a non-zero exit code counts as a failed
    /// submission.
    pub(crate) fn spawn_confirmation_wait(&self, cid: Cid) -> JoinHandle<Result<(), Error>> {
        let api = self.api.clone();
        let confidence = self.confidence;
        tokio::spawn(async move {
            let result = confirm_submission(api.as_ref(), cid, confidence).await;
            if let Err(e) = &result {
                metrics::WDPOST_FAILED.inc();
                error!(%cid, "Submitting window post failed: {e:#}");
            }
            result
        })
    }
}

async fn confirm_submission(api: &dyn ChainApi, cid: Cid, confidence: i64) -> Result<(), Error> {
    let lookup = api
        .state_wait_msg(cid, confidence)
        .await
        .with_context(|| format!("waiting for window post message {cid}"))?;
    let exit_code = lookup.receipt.exit_code;
    if !exit_code.is_success() {
        return Err(Error::ExitCode {
            cid,
            method: METHOD_SUBMIT_WINDOWED_POST,
            exit_code,
        });
    }
    info!(
        %cid,
        height = lookup.height,
        tipset = %lookup.tipset,
        "Window PoSt submission landed on chain"
    );
    Ok(())
}
