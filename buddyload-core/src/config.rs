use crate::{DEFAULT_DURATION, DEFAULT_GRACEFUL_STOP, DEFAULT_RAMP_UP, DEFAULT_VUS};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

#[doc(hidden)]
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub vus: NonZeroUsize,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub duration: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub ramp_up: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub graceful_stop: Duration,
    pub max_rps: Option<NonZeroU32>,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vus: DEFAULT_VUS,
            duration: DEFAULT_DURATION,
            ramp_up: DEFAULT_RAMP_UP,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
            max_rps: None,
        }
    }

    /// Ramp-up never outlasts the run itself.
    pub fn effective_ramp_up(&self) -> Duration {
        self.ramp_up.min(self.duration)
    }
}

impl fmt::Display for ScenarioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} VUs, {}, ramp-up {}",
            self.vus,
            humantime::format_duration(self.duration),
            humantime::format_duration(self.ramp_up),
        )?;
        if let Some(rps) = self.max_rps {
            write!(f, ", max {rps} req/s")?;
        }
        Ok(())
    }
}
