// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use cid::Cid;
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

use crate::shim::clock::ChainEpoch;

/// A set of CIDs forming a unique key for a tipset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipsetKey(Vec<Cid>);

impl TipsetKey {
    pub fn new(cids: Vec<Cid>) -> Self {
        Self(cids)
    }
}

impl fmt::Display for TipsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.iter().join(","))
    }
}

/// Tipset selector for API calls. `None` means the heaviest known tipset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiTipsetKey(pub Option<TipsetKey>);

impl ApiTipsetKey {
    pub fn heaviest() -> Self {
        Self(None)
    }
}

impl From<&ChainSnapshot> for ApiTipsetKey {
    fn from(snapshot: &ChainSnapshot) -> Self {
        Self(Some(snapshot.key.clone()))
    }
}

/// The chain state a deadline run is evaluated against. Every state lookup
/// and randomness draw of a run uses the same snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainSnapshot {
    pub key: TipsetKey,
    pub epoch: ChainEpoch,
}

impl ChainSnapshot {
    pub fn new(key: TipsetKey, epoch: ChainEpoch) -> Self {
        Self { key, epoch }
    }

    pub fn api_key(&self) -> ApiTipsetKey {
        self.into()
    }
}
