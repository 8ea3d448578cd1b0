use rand::Rng;
use std::time::Duration;

/// Think time between two steps of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// Always wait exactly this long.
    Fixed(Duration),
    /// Wait a duration drawn uniformly from `[min, max)`.
    Uniform { min: Duration, max: Duration },
}

impl Pause {
    pub const fn fixed(duration: Duration) -> Self {
        Self::Fixed(duration)
    }

    pub const fn uniform(min: Duration, max: Duration) -> Self {
        Self::Uniform { min, max }
    }

    pub const fn none() -> Self {
        Self::Fixed(Duration::ZERO)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            Self::Fixed(duration) => duration,
            Self::Uniform { min, max } if max <= min => min,
            Self::Uniform { min, max } => {
                // Whole nanoseconds keep the upper bound exclusive.
                let nanos = rng.gen_range(min.as_nanos()..max.as_nanos());
                Duration::from_nanos(nanos as u64)
            }
        }
    }

    /// Suspend the current virtual user; other VUs keep running.
    pub async fn wait(&self) {
        let duration = self.sample(&mut rand::thread_rng());
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
