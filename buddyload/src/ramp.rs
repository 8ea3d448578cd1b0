use std::num::NonZeroUsize;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Linear ramp-up: VU `i` of `n` starts `ramp_up * i / n` after the run begins.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RampSchedule {
    vus: NonZeroUsize,
    ramp_up: Duration,
}

impl RampSchedule {
    pub fn new(vus: NonZeroUsize, ramp_up: Duration) -> Self {
        Self { vus, ramp_up }
    }

    pub fn vus(&self) -> usize {
        self.vus.get()
    }

    pub fn start_offset(&self, id: usize) -> Duration {
        let id = id.min(self.vus.get() - 1) as u128;
        let nanos = self.ramp_up.as_nanos().saturating_mul(id) / self.vus.get() as u128;
        let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
        Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
    }
}
