use pdatastructs::tdigest::{TDigest, K1};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::error;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Everything the virtual users reported during one sample interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleData {
    pub iterations: u64,
    pub success: u64,
    pub error: u64,
    pub check_pass: u64,
    pub check_fail: u64,
    pub active_vus: usize,
    pub elapsed: Duration,
}

impl SampleData {
    pub fn tps(&self) -> f64 {
        per_second(self.total(), self.elapsed)
    }

    pub fn iteration_rate(&self) -> f64 {
        per_second(self.iterations, self.elapsed)
    }

    pub fn error_rate(&self) -> f64 {
        ratio(self.error, self.total())
    }

    pub fn check_rate(&self) -> f64 {
        ratio(self.check_pass, self.check_pass + self.check_fail)
    }

    pub fn total(&self) -> u64 {
        self.success + self.error
    }
}

impl fmt::Display for SampleData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VUs={}, TPS={:.2}, Iterations/s={:.2}, ErrorRate={:.2}, Checks={:.2}%",
            self.active_vus,
            self.tps(),
            self.iteration_rate(),
            self.error_rate(),
            self.check_rate() * 100.,
        )
    }
}

/// Every sample of a run plus the latency digest of all its requests.
#[derive(Debug, Clone)]
pub struct SampleSet {
    samples: VecDeque<SampleData>,
    latency: TDigest<K1>,
    latency_count: u64,
    latency_sum: Duration,
    latency_max: Duration,
}

impl Default for SampleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSet {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::new(),
            latency: default_tdigest(),
            latency_count: 0,
            latency_sum: Duration::ZERO,
            latency_max: Duration::ZERO,
        }
    }

    pub fn push(&mut self, sample: SampleData) {
        self.samples.push_back(sample);
    }

    /// Separate Latency push method since the TDigest datastructure does not support merge, and is
    /// probabilistic in nature.
    pub fn push_latencies(&mut self, latencies: &[Duration]) {
        for latency in latencies {
            self.latency.insert(latency.as_secs_f64());
            self.latency_count += 1;
            self.latency_sum += *latency;
            self.latency_max = self.latency_max.max(*latency);
        }
    }

    /// Sum of every sample, with `elapsed` covering the whole set and
    /// `active_vus` the peak.
    pub fn totals(&self) -> SampleData {
        self.samples
            .iter()
            .fold(SampleData::default(), |mut acc, sample| {
                acc.iterations += sample.iterations;
                acc.success += sample.success;
                acc.error += sample.error;
                acc.check_pass += sample.check_pass;
                acc.check_fail += sample.check_fail;
                acc.active_vus = acc.active_vus.max(sample.active_vus);
                acc.elapsed += sample.elapsed;
                acc
            })
    }

    pub fn latency(&self, quantile: f64) -> Duration {
        if self.latency_count == 0 {
            return Duration::ZERO;
        }

        let secs = self.latency.quantile(quantile);

        // TDigest can hand back NaN for sparse data.
        let secs = if secs.is_finite() && secs >= 0. {
            secs
        } else {
            error!("NaN latency calculation for quantile {quantile}.");
            0.
        };

        Duration::from_secs_f64(secs)
    }

    pub fn latency_mean(&self) -> Duration {
        if self.latency_count == 0 {
            Duration::ZERO
        } else {
            self.latency_sum.div_f64(self.latency_count as f64)
        }
    }

    pub fn latency_max(&self) -> Duration {
        self.latency_max
    }

    pub fn latency_count(&self) -> u64 {
        self.latency_count
    }
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}

pub(crate) fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.
    } else {
        part as f64 / whole as f64
    }
}

pub(crate) fn per_second(count: u64, elapsed: Duration) -> f64 {
    if elapsed.is_zero() {
        0.
    } else {
        count as f64 / elapsed.as_secs_f64()
    }
}
