// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use anyhow::{Context as _, bail};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::{ChainApi, MessageSendSpec};
use crate::chain::ApiTipsetKey;
use crate::miner::MinerInfo;
use crate::shim::{address::Address, econ::TokenAmount, message::Message};

/// Funds needed to cover the worst-case gas cost of `message`.
pub fn required_funds(message: &Message) -> TokenAmount {
    TokenAmount::from_atto(message.gas_fee_cap.atto() * message.gas_limit)
}

/// Policy picking the address that pays for a Window PoSt message.
#[async_trait]
pub trait AddressSelector: Send + Sync + 'static {
    async fn address_for(
        &self,
        api: &dyn ChainApi,
        info: &MinerInfo,
        min_funds: &TokenAmount,
    ) -> anyhow::Result<Address>;
}

/// Prefers the first control address holding at least `min_funds`, then the
/// worker.
#[derive(Clone, Copy, Debug, Default)]
pub struct ControlAddressSelector;

#[async_trait]
impl AddressSelector for ControlAddressSelector {
    async fn address_for(
        &self,
        api: &dyn ChainApi,
        info: &MinerInfo,
        min_funds: &TokenAmount,
    ) -> anyhow::Result<Address> {
        for addr in &info.control_addresses {
            match api.wallet_balance(addr).await {
                Ok(balance) if &balance >= min_funds => return Ok(*addr),
                Ok(balance) => {
                    debug!(%addr, %balance, %min_funds, "Control address has insufficient funds")
                }
                Err(e) => warn!(%addr, "Failed to get balance of control address: {e:#}"),
            }
        }

        let balance = api
            .wallet_balance(&info.worker)
            .await
            .context("getting worker balance")?;
        if &balance >= min_funds {
            return Ok(info.worker);
        }
        bail!(
            "no address with at least {min_funds} to send the message from, worker {} has {balance}",
            info.worker
        )
    }
}

/// Sets the `from` field of outgoing messages.
pub struct SenderSelector {
    api: Arc<dyn ChainApi>,
    selector: Arc<dyn AddressSelector>,
    actor: Address,
    worker: Address,
}

impl SenderSelector {
    pub fn new(
        api: Arc<dyn ChainApi>,
        selector: Arc<dyn AddressSelector>,
        actor: Address,
        worker: Address,
    ) -> Self {
        Self {
            api,
            selector,
            actor,
            worker,
        }
    }

    /// Picks the sender of `message`. Never fails: when the sender cannot be
    /// determined the worker address is used.
    pub async fn set_sender(&self, message: &mut Message, spec: &MessageSendSpec) {
        message.from = match self.select(message, spec).await {
            Ok(addr) => addr,
            Err(e) => {
                warn!(worker = %self.worker, "Falling back to the worker as message sender: {e:#}");
                self.worker
            }
        };
    }

    async fn select(&self, message: &Message, spec: &MessageSendSpec) -> anyhow::Result<Address> {
        let tsk = ApiTipsetKey::heaviest();
        let info = self
            .api
            .state_miner_info(&self.actor, &tsk)
            .await
            .context("getting miner info")?;
        let estimated = self
            .api
            .gas_estimate_message_gas(message, spec, &tsk)
            .await
            .context("estimating message gas")?;

        let min_funds = required_funds(&estimated) + &estimated.value;
        self.selector
            .address_for(self.api.as_ref(), &info, &min_funds)
            .await
            .context("selecting sender address")
    }
}
