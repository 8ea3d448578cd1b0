use crate::ledger::Ledger;
use crate::transaction::TransactionData;
use buddyload_core::{SampleData, SampleSet};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use metrics_util::AtomicBucket;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters shared between the run loop and every VU.
pub(crate) struct TaskAtomics {
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    success: Arc<AtomicU64>,
    error: Arc<AtomicU64>,
    check_pass: Arc<AtomicU64>,
    check_fail: Arc<AtomicU64>,
    iterations: Arc<AtomicU64>,
    active: Arc<AtomicUsize>,
    latency: Arc<AtomicBucket<Duration>>,
    ledger: Arc<Ledger>,
}

impl TaskAtomics {
    pub fn new(max_rps: Option<NonZeroU32>) -> Self {
        Self {
            limiter: max_rps.map(|rps| Arc::new(rate_limiter(rps))),
            success: Arc::new(AtomicU64::new(0)),
            error: Arc::new(AtomicU64::new(0)),
            check_pass: Arc::new(AtomicU64::new(0)),
            check_fail: Arc::new(AtomicU64::new(0)),
            iterations: Arc::new(AtomicU64::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
            latency: Arc::new(AtomicBucket::new()),
            ledger: Arc::new(Ledger::default()),
        }
    }

    pub fn clone_to_transaction_data(&self) -> TransactionData {
        TransactionData {
            limiter: self.limiter.clone(),
            success: self.success.clone(),
            error: self.error.clone(),
            check_pass: self.check_pass.clone(),
            check_fail: self.check_fail.clone(),
            latency: self.latency.clone(),
            ledger: self.ledger.clone(),
        }
    }

    pub fn iterations(&self) -> Arc<AtomicU64> {
        self.iterations.clone()
    }

    pub fn active(&self) -> Arc<AtomicUsize> {
        self.active.clone()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Drain everything reported since the last call into `samples`.
    pub fn collect(&self, elapsed: Duration, samples: &mut SampleSet) -> SampleData {
        let sample = SampleData {
            iterations: self.iterations.swap(0, Ordering::Relaxed),
            success: self.success.swap(0, Ordering::Relaxed),
            error: self.error.swap(0, Ordering::Relaxed),
            check_pass: self.check_pass.swap(0, Ordering::Relaxed),
            check_fail: self.check_fail.swap(0, Ordering::Relaxed),
            active_vus: self.active.load(Ordering::Relaxed),
            elapsed,
        };
        self.latency.clear_with(|dur| samples.push_latencies(dur));
        samples.push(sample.clone());
        sample
    }
}

fn rate_limiter(max_rps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(max_rps).allow_burst(NonZeroU32::MIN))
}
