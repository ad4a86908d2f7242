// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use anyhow::{anyhow, bail};
use fil_actors_shared::fvm_ipld_bitfield::BitField;
pub use fvm_shared4::sector::{
    PoStProof, RegisteredPoStProof, RegisteredSealProof, SectorID, SectorInfo, SectorNumber,
};
use serde::{Deserialize, Serialize};

/// Returns the seal proof type that sectors proven with the given Window PoSt
/// proof type were sealed with.
pub fn seal_proof_for_window_post(
    proof: RegisteredPoStProof,
) -> anyhow::Result<RegisteredSealProof> {
    use RegisteredPoStProof as PoSt;
    use RegisteredSealProof as Seal;
    match proof {
        PoSt::StackedDRGWinning2KiBV1 => Ok(Seal::StackedDRG2KiBV1),
        PoSt::StackedDRGWinning8MiBV1 => Ok(Seal::StackedDRG8MiBV1),
        PoSt::StackedDRGWinning512MiBV1 => {
            Ok(Seal::StackedDRG512MiBV1)
        }
        PoSt::StackedDRGWinning32GiBV1 => {
            Ok(Seal::StackedDRG32GiBV1)
        }
        PoSt::StackedDRGWinning64GiBV1 => {
            Ok(Seal::StackedDRG64GiBV1)
        }
        PoSt::StackedDRGWindow2KiBV1P1 => Ok(Seal::StackedDRG2KiBV1P1),
        PoSt::StackedDRGWindow8MiBV1P1 => Ok(Seal::StackedDRG8MiBV1P1),
        PoSt::StackedDRGWindow512MiBV1P1 => Ok(Seal::StackedDRG512MiBV1P1),
        PoSt::StackedDRGWindow32GiBV1P1 => Ok(Seal::StackedDRG32GiBV1P1),
        PoSt::StackedDRGWindow64GiBV1P1 => Ok(Seal::StackedDRG64GiBV1P1),
        other => bail!("unsupported mapping from {other:?} to a seal proof type"),
    }
}

/// A set of sector numbers backed by an RLE+ [`BitField`].
///
/// All set algebra happens on the bitfield; the numbers are only expanded when
/// iterated. The set is never mutated in place, every operation returns a new
/// set.
///
/// # Examples
/// ```
/// # use forest_wdpost::shim::sector::SectorSet;
/// let a = SectorSet::try_from_numbers([1, 2, 3]).unwrap();
/// let b = SectorSet::try_from_numbers([2]).unwrap();
///
/// assert_eq!(a.subtract(&b).iter().collect::<Vec<_>>(), vec![1, 3]);
/// assert_eq!(a.union(&b).count(), 3);
/// ```
#[derive(Clone, Default, Serialize, Deserialize, derive_more::From, derive_more::Into)]
#[serde(transparent)]
pub struct SectorSet(BitField);

impl SectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_from_numbers(
        numbers: impl IntoIterator<Item = SectorNumber>,
    ) -> anyhow::Result<Self> {
        BitField::try_from_bits(numbers)
            .map(Self)
            .map_err(|e| anyhow!("sector number out of range: {e}"))
    }

    pub fn union(&self, other: &SectorSet) -> SectorSet {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => other.clone(),
            (_, true) => self.clone(),
            _ => Self(&self.0 | &other.0),
        }
    }

    pub fn subtract(&self, other: &SectorSet) -> SectorSet {
        if self.is_empty() || other.is_empty() {
            return self.clone();
        }
        Self(&self.0 - &other.0)
    }

    pub fn intersect(&self, other: &SectorSet) -> SectorSet {
        if self.is_empty() || other.is_empty() {
            return Self::new();
        }
        Self(&self.0 & &other.0)
    }

    pub fn contains(&self, number: SectorNumber) -> bool {
        self.0.get(number)
    }

    pub fn count(&self) -> u64 {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the sector numbers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SectorNumber> + '_ {
        self.0.iter()
    }
}

impl PartialEq for SectorSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for SectorSet {}

impl fmt::Debug for SectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for SectorSet {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let numbers = Vec::<u16>::arbitrary(g);
        Self::try_from_numbers(numbers.into_iter().map(u64::from))
            .expect("u16 sector numbers are always in range")
    }
}
