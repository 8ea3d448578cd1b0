use crate::config::{ConfigError, TargetConfig, TARGET_URL_ENV};
use crate::driver::SCENARIO_NAME;
use buddyload::core::{
    ScenarioConfig, DEFAULT_DURATION, DEFAULT_GRACEFUL_STOP, DEFAULT_RAMP_UP, DEFAULT_VUS,
};
use buddyload::probe::{ProbeConfig, ProbeMethod};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "Load test for the sciencebuddy chat and summary endpoints")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the chat and summary scenario.
    Run(RunArgs),
    /// Fire a fixed number of requests at a single URL and print latency percentiles.
    Probe(ProbeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, default_value_t = DEFAULT_VUS)]
    pub vus: NonZeroUsize,

    #[arg(long, default_value_t = DEFAULT_DURATION.into())]
    pub duration: humantime::Duration,

    #[arg(long, default_value_t = DEFAULT_RAMP_UP.into())]
    pub ramp_up: humantime::Duration,

    #[arg(long, default_value_t = DEFAULT_GRACEFUL_STOP.into())]
    pub graceful_stop: humantime::Duration,

    /// Cap on requests per second across all virtual users.
    #[arg(long)]
    pub rps: Option<NonZeroU32>,

    /// Base URL of the service. Overrides `TARGET_URL`.
    #[arg(long)]
    pub target_url: Option<String>,

    /// Write the end of run statistics to this file as JSON.
    #[arg(long)]
    pub summary_export: Option<PathBuf>,

    /// Serve Prometheus metrics on this address while the run is going.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl RunArgs {
    pub fn scenario_config(&self) -> ScenarioConfig {
        ScenarioConfig {
            vus: self.vus,
            duration: self.duration.into(),
            ramp_up: self.ramp_up.into(),
            graceful_stop: self.graceful_stop.into(),
            max_rps: self.rps,
            ..ScenarioConfig::new(SCENARIO_NAME)
        }
    }

    pub fn target(&self) -> Result<TargetConfig, ConfigError> {
        TargetConfig::resolve(self.target_url.as_deref(), std::env::var(TARGET_URL_ENV).ok())
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    #[value(name = "GET")]
    Get,
    #[value(name = "POST")]
    Post,
}

impl From<Method> for ProbeMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => ProbeMethod::Get,
            Method::Post => ProbeMethod::Post,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    #[arg(long)]
    pub url: String,

    /// Number of concurrent workers.
    #[arg(long, default_value_t = NonZeroUsize::new(30).unwrap_or(NonZeroUsize::MIN))]
    pub concurrency: NonZeroUsize,

    #[arg(long, default_value_t = 10)]
    pub requests_per_worker: usize,

    /// Seconds each worker sleeps between requests.
    #[arg(long, value_parser = parse_seconds, default_value = "0")]
    pub pause: Duration,

    #[arg(long, value_enum, ignore_case = true, default_value_t = Method::Get)]
    pub method: Method,

    /// Per request timeout in seconds.
    #[arg(long, value_parser = parse_seconds, default_value = "30")]
    pub timeout: Duration,
}

impl ProbeArgs {
    pub fn probe_config(&self) -> Result<ProbeConfig, buddyload::Error> {
        Ok(ProbeConfig {
            concurrency: self.concurrency,
            requests_per_worker: self.requests_per_worker,
            pause: self.pause,
            method: self.method.into(),
            timeout: self.timeout,
            ..ProbeConfig::new(&self.url)?
        })
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("{e}"))
}
