// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::LazyLock;
use std::time::Instant;

use parking_lot::{RwLock, RwLockWriteGuard};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{
        counter::Counter,
        family::Family,
        histogram::{Histogram, exponential_buckets},
    },
};

static DEFAULT_REGISTRY: LazyLock<RwLock<prometheus_client::registry::Registry>> =
    LazyLock::new(Default::default);

pub fn default_registry<'a>() -> RwLockWriteGuard<'a, prometheus_client::registry::Registry> {
    DEFAULT_REGISTRY.write()
}

pub static WDPOST_SUBMITTED: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    default_registry().register(
        "wdpost_submitted",
        "Number of window post submissions accepted by the message pool",
        metric.clone(),
    );
    metric
});

pub static WDPOST_FAILED: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    default_registry().register(
        "wdpost_failed",
        "Number of failed window post runs and submissions",
        metric.clone(),
    );
    metric
});

pub static WDPOST_SKIPPED_SECTORS: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    default_registry().register(
        "wdpost_skipped_sectors",
        "Number of sectors skipped in window post submissions",
        metric.clone(),
    );
    metric
});

pub static WDPOST_DECLARATIONS: LazyLock<Family<KindLabel, Counter>> = LazyLock::new(|| {
    let metric = Family::default();
    default_registry().register(
        "wdpost_declarations",
        "Number of fault and recovery declaration messages sent",
        metric.clone(),
    );
    metric
});

pub static WDPOST_PROOF_GENERATION_TIME: LazyLock<Histogram> = LazyLock::new(|| {
    // 1s to ~68min, each bucket 4 times as big as the last.
    let metric = Histogram::new(exponential_buckets(1., 4., 7));
    default_registry().register(
        "wdpost_proof_generation_seconds",
        "Duration of window post proof generation in seconds",
        metric.clone(),
    );
    metric
});

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet, derive_more::Constructor)]
pub struct KindLabel {
    kind: &'static str,
}

pub mod values {
    use super::KindLabel;

    /// `DeclareFaults` messages.
    pub const FAULTS: KindLabel = KindLabel::new("faults");
    /// `DeclareFaultsRecovered` messages.
    pub const RECOVERIES: KindLabel = KindLabel::new("recoveries");
}

/// Encodes the registry in the text exposition format.
pub fn encode_metrics() -> anyhow::Result<String> {
    let mut metrics = String::new();
    prometheus_client::encoding::text::encode(&mut metrics, &DEFAULT_REGISTRY.read())?;
    Ok(metrics)
}

pub struct HistogramTimer<'a> {
    histogram: &'a Histogram,
    start: Instant,
}

impl Drop for HistogramTimer<'_> {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

pub trait HistogramTimerExt {
    fn start_timer(&self) -> HistogramTimer<'_>;
}

impl HistogramTimerExt for Histogram {
    fn start_timer(&self) -> HistogramTimer<'_> {
        HistogramTimer {
            histogram: self,
            start: Instant::now(),
        }
    }
}
