use crate::data::{per_second, ratio};
use crate::{SampleSet, ScenarioConfig};
use serde::Serialize;
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// Pass/fail tally of one named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckStatistics {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckStatistics {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    pub fn pass_rate(&self) -> f64 {
        ratio(self.passes, self.total())
    }
}

/// Request tally of one named transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionStatistics {
    pub name: String,
    pub requests: u64,
    pub failed: u64,
}

/// Latency quantiles over every transaction of a run.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStatistics {
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub mean: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub p50: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub p90: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub p95: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub p99: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub max: Duration,
}

impl LatencyStatistics {
    pub fn from_samples(samples: &SampleSet) -> Self {
        Self {
            mean: samples.latency_mean(),
            p50: samples.latency(0.5),
            p90: samples.latency(0.9),
            p95: samples.latency(0.95),
            p99: samples.latency(0.99),
            max: samples.latency_max(),
        }
    }
}

/// Statistics for a finished Scenario run.
#[serde_as]
#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    pub config: ScenarioConfig,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub elapsed: Duration,
    pub vus_max: usize,
    pub iterations: u64,
    pub interrupted_iterations: u64,
    pub http_reqs: u64,
    pub http_req_failed: u64,
    pub latency: LatencyStatistics,
    pub checks: Vec<CheckStatistics>,
    pub transactions: Vec<TransactionStatistics>,
}

impl RunStatistics {
    pub fn check(&self, name: &str) -> Option<&CheckStatistics> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn transaction(&self, name: &str) -> Option<&TransactionStatistics> {
        self.transactions.iter().find(|t| t.name == name)
    }

    pub fn check_passes(&self) -> u64 {
        self.checks.iter().map(|c| c.passes).sum()
    }

    pub fn check_fails(&self) -> u64 {
        self.checks.iter().map(|c| c.fails).sum()
    }

    pub fn check_pass_rate(&self) -> f64 {
        ratio(self.check_passes(), self.check_passes() + self.check_fails())
    }

    pub fn error_rate(&self) -> f64 {
        ratio(self.http_req_failed, self.http_reqs)
    }

    pub fn request_rate(&self) -> f64 {
        per_second(self.http_reqs, self.elapsed)
    }

    pub fn iteration_rate(&self) -> f64 {
        per_second(self.iterations, self.elapsed)
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario: {} ({})", self.config.name, self.config)?;
        writeln!(f)?;

        for check in &self.checks {
            let mark = if check.fails == 0 { '✓' } else { '✗' };
            writeln!(
                f,
                "  {mark} {:<28} {:>7.2}%  ✓ {}  ✗ {}",
                check.name,
                check.pass_rate() * 100.,
                check.passes,
                check.fails,
            )?;
        }
        writeln!(f)?;

        let dots = |name: &str| format!("{name:.<30}");
        writeln!(
            f,
            "  {} {:.2}%  ✓ {}  ✗ {}",
            dots("checks"),
            self.check_pass_rate() * 100.,
            self.check_passes(),
            self.check_fails(),
        )?;
        writeln!(
            f,
            "  {} avg={:?} p(50)={:?} p(90)={:?} p(95)={:?} p(99)={:?} max={:?}",
            dots("http_req_duration"),
            self.latency.mean,
            self.latency.p50,
            self.latency.p90,
            self.latency.p95,
            self.latency.p99,
            self.latency.max,
        )?;
        writeln!(
            f,
            "  {} {:.2}%  {} out of {}",
            dots("http_req_failed"),
            self.error_rate() * 100.,
            self.http_req_failed,
            self.http_reqs,
        )?;
        writeln!(
            f,
            "  {} {}  {:.2}/s",
            dots("http_reqs"),
            self.http_reqs,
            self.request_rate()
        )?;
        for tx in &self.transactions {
            writeln!(
                f,
                "    {} {}  failed={}",
                dots(&format!("{{ {} }}", tx.name)),
                tx.requests,
                tx.failed
            )?;
        }
        writeln!(
            f,
            "  {} {}  {:.2}/s  interrupted={}",
            dots("iterations"),
            self.iterations,
            self.iteration_rate(),
            self.interrupted_iterations,
        )?;
        writeln!(f, "  {} max={}", dots("vus"), self.vus_max)?;
        write!(
            f,
            "  {} {}",
            dots("elapsed"),
            humantime::format_duration(round_to_millis(self.elapsed))
        )
    }
}

fn round_to_millis(dur: Duration) -> Duration {
    Duration::from_millis(dur.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> RunStatistics {
        RunStatistics {
            config: ScenarioConfig::new("sciencebuddy"),
            elapsed: Duration::from_secs(10),
            vus_max: 30,
            iterations: 50,
            interrupted_iterations: 2,
            http_reqs: 100,
            http_req_failed: 5,
            latency: LatencyStatistics::from_samples(&SampleSet::new()),
            checks: vec![
                CheckStatistics {
                    name: "chat status 2xx".to_string(),
                    passes: 48,
                    fails: 2,
                },
                CheckStatistics {
                    name: "summary status ok".to_string(),
                    passes: 50,
                    fails: 0,
                },
            ],
            transactions: vec![TransactionStatistics {
                name: "chat".to_string(),
                requests: 50,
                failed: 5,
            }],
        }
    }

    #[test]
    fn aggregate_rates() {
        let stats = stats();
        assert_eq!(stats.check_passes(), 98);
        assert_eq!(stats.check_fails(), 2);
        assert_eq!(stats.check_pass_rate(), 0.98);
        assert_eq!(stats.error_rate(), 0.05);
        assert_eq!(stats.request_rate(), 10.);
        assert_eq!(stats.iteration_rate(), 5.);
    }

    #[test]
    fn lookup_by_name() {
        let stats = stats();
        assert_eq!(stats.check("summary status ok").unwrap().pass_rate(), 1.);
        assert_eq!(stats.transaction("chat").unwrap().failed, 5);
        assert!(stats.check("missing").is_none());
    }

    #[test]
    fn summary_lists_every_check() {
        let text = stats().to_string();
        assert!(text.contains("✗ chat status 2xx"));
        assert!(text.contains("✓ summary status ok"));
        assert!(text.contains("interrupted=2"));
    }

    #[test]
    fn serializes_for_export() {
        let value = serde_json::to_value(stats()).unwrap();
        assert_eq!(value["http_reqs"], 100);
        assert_eq!(value["elapsed"], 10.0);
        assert_eq!(value["checks"][0]["name"], "chat status 2xx");
    }
}
