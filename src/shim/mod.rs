// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod sector;

pub use fvm_shared_latest::{ActorID, address, clock, econ, error, randomness};

pub mod message {
    pub use super::fvm_shared_latest::MethodNum;
    pub use super::fvm_shared_latest::message::*;
}

pub mod crypto {
    pub use fil_actors_shared::v17::runtime::DomainSeparationTag;
}

mod fvm_shared_latest {
    pub use fvm_shared4::*;
}
