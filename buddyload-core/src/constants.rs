use std::num::NonZeroUsize;
use std::time::Duration;

/// Number of virtual users started for a run when none is given.
pub const DEFAULT_VUS: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(30) };

/// Total run time used when no `.duration()` is given.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(180);

/// Window over which virtual users are brought up, one after another.
pub const DEFAULT_RAMP_UP: Duration = Duration::from_secs(30);

/// How long virtual users may spend finishing their current iteration once the
/// run duration has elapsed.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// Request timeout applied to every virtual user's HTTP client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Interval between two progress samples of a running scenario.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
