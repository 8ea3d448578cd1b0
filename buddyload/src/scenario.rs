//! Scenario logic and constants
use crate::pool::VuPool;
use crate::ramp::RampSchedule;
use crate::timer::Timer;
use buddyload_core::{LatencyStatistics, RunStatistics, SampleSet, ScenarioConfig, SAMPLE_INTERVAL};
use std::{
    future::Future,
    num::{NonZeroU32, NonZeroUsize},
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Load test scenario structure
///
/// Handler for running scenarios. Usually created by the [`#[scenario]`](buddyload_macros::scenario)
/// macro, which adds these methods to functions; scenarios that carry state can be built from a
/// closure with [`Scenario::new`].
#[pin_project::pin_project]
pub struct Scenario<T> {
    func: T,
    runner_fut: Option<Pin<Box<dyn Future<Output = RunStatistics> + Send>>>,
    config: ScenarioConfig,
}

impl<T> Scenario<T> {
    /// Wrap a function into a scenario named `name`, using the default configuration.
    ///
    /// # Example
    /// ```no_run
    /// use buddyload::prelude::*;
    /// use buddyload::Scenario;
    /// use std::sync::Arc;
    ///
    /// # async fn run() {
    /// let target = Arc::new(String::from("http://localhost:3002"));
    /// let stats = Scenario::new("stateful", move || {
    ///     let target = target.clone();
    ///     async move {
    ///         let _ = buddyload::vu::client().get(target.as_str()).send().await;
    ///     }
    /// })
    /// .vus(NonZeroUsize::new(5).unwrap())
    /// .await;
    /// # }
    /// ```
    pub fn new(name: &str, func: T) -> Self {
        Self {
            func,
            runner_fut: None,
            config: ScenarioConfig::new(name),
        }
    }
}

impl<T, F> Future for Scenario<T>
where
    T: Fn() -> F + Send + 'static + Clone + Sync,
    F: Future<Output = ()> + Send + 'static,
{
    type Output = RunStatistics;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let runner = this.runner_fut.get_or_insert_with(|| {
            let func = this.func.clone();
            let config = this.config.clone();
            Box::pin(async move { run_scenario(func, config).await })
        });
        runner.as_mut().poll(cx)
    }
}

pub trait ConfigurableScenario<T: Send>: Future<Output = T> + Sized + Send {
    fn vus(self, vus: NonZeroUsize) -> Self;
    fn duration(self, duration: Duration) -> Self;
    fn ramp_up(self, ramp_up: Duration) -> Self;
    fn graceful_stop(self, graceful_stop: Duration) -> Self;
    fn rps(self, rps: NonZeroU32) -> Self;
    fn config(self, config: ScenarioConfig) -> Self;
}

impl<T, F> ConfigurableScenario<RunStatistics> for Scenario<T>
where
    T: Fn() -> F + Send + 'static + Clone + Sync,
    F: Future<Output = ()> + Send + 'static,
{
    /// Run the scenario with the given number of virtual users (default 30).
    ///
    /// # Example
    /// ```no_run
    /// use buddyload::prelude::*;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     my_scenario()
    ///         .vus(NonZeroUsize::new(10).unwrap())
    ///         .await;
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn vus(mut self, vus: NonZeroUsize) -> Self {
        self.config.vus = vus;
        self
    }

    /// Run the scenario for the given duration (default 3 minutes).
    ///
    /// # Example
    /// ```no_run
    /// use buddyload::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     my_scenario()
    ///         .duration(Duration::from_secs(120))
    ///         .await;
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = duration;
        self
    }

    /// Bring the virtual users up one after another over this window (default 30 seconds).
    fn ramp_up(mut self, ramp_up: Duration) -> Self {
        self.config.ramp_up = ramp_up;
        self
    }

    /// How long virtual users may finish their current iteration after the duration is over
    /// before they are aborted (default 30 seconds).
    fn graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.config.graceful_stop = graceful_stop;
        self
    }

    /// Cap the request rate of all virtual users combined.
    fn rps(mut self, rps: NonZeroU32) -> Self {
        self.config.max_rps = Some(rps);
        self
    }

    /// Replace the whole configuration. The scenario keeps its name.
    fn config(mut self, config: ScenarioConfig) -> Self {
        let name = std::mem::take(&mut self.config.name);
        self.config = ScenarioConfig { name, ..config };
        self
    }
}

#[instrument(name="scenario", skip_all, fields(name=config.name))]
pub(crate) async fn run_scenario<T, F>(scenario: T, config: ScenarioConfig) -> RunStatistics
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    info!("Running {} with config {}", config.name, &config);

    let start = Instant::now();
    let mut pool = VuPool::new(scenario, config.max_rps);
    pool.spawn(RampSchedule::new(config.vus, config.effective_ramp_up()));

    let mut timer = Timer::new(SAMPLE_INTERVAL).await;
    debug!("Sampling every {timer}");

    // NOTE: This loop is time-sensitive. Any long awaits or blocking will throw off measurements
    let mut samples = SampleSet::new();
    loop {
        let remaining = config.duration.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            break;
        }

        let elapsed = match tokio::time::timeout(remaining, timer.tick()).await {
            Ok(elapsed) => elapsed,
            Err(_) => timer.lap(),
        };
        let sample = pool.collect(elapsed, &mut samples);
        info!("{sample}");
    }

    info!("Duration reached, stopping VUs");
    let interrupted = pool.shutdown(config.graceful_stop).await;
    let sample = pool.collect(timer.lap(), &mut samples);
    debug!("Final {sample}");

    let totals = samples.totals();
    let stats = RunStatistics {
        elapsed: start.elapsed(),
        vus_max: totals.active_vus,
        iterations: totals.iterations,
        interrupted_iterations: interrupted,
        http_reqs: totals.total(),
        http_req_failed: totals.error,
        latency: LatencyStatistics::from_samples(&samples),
        checks: pool.ledger().checks(),
        transactions: pool.ledger().transactions(),
        config,
    };

    info!("Scenario complete");
    stats
}
