//! Fixed-work load probe.
//!
//! Unlike a [`Scenario`](crate::Scenario), which runs for a duration, a probe sends a fixed
//! number of requests: `concurrency` workers each send `requests_per_worker` requests one after
//! another to a single URL, then the latencies and status codes are summarized.
use crate::Error;
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::{debug, info, Instrument};
use url::Url;

const TOP_ERRORS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMethod {
    #[default]
    Get,
    /// POST a small JSON payload.
    Post,
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub url: Url,
    pub concurrency: NonZeroUsize,
    pub requests_per_worker: usize,
    pub pause: Duration,
    pub method: ProbeMethod,
    pub timeout: Duration,
}

impl ProbeConfig {
    pub fn new(url: &str) -> Result<Self, Error> {
        Ok(Self {
            url: Url::parse(url)?,
            concurrency: NonZeroUsize::new(30).unwrap_or(NonZeroUsize::MIN),
            requests_per_worker: 10,
            pause: Duration::ZERO,
            method: ProbeMethod::Get,
            timeout: Duration::from_secs(30),
        })
    }
}

/// Outcome of one probe request. `status` is `None` when no response arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub status: Option<u16>,
    pub latency: Duration,
    pub error: Option<String>,
}

/// Run the probe to completion.
pub async fn run_probe(config: &ProbeConfig) -> Result<ProbeReport, Error> {
    info!(
        "Probing {} with {} workers x {} requests",
        config.url, config.concurrency, config.requests_per_worker
    );

    let start = Instant::now();
    let mut workers = Vec::with_capacity(config.concurrency.get());
    for worker in 0..config.concurrency.get() {
        // One client per worker, like one session per thread.
        let client = Client::builder().timeout(config.timeout).build()?;
        let config = config.clone();
        workers.push(tokio::spawn(
            worker_task(client, config).instrument(tracing::debug_span!("worker", worker)),
        ));
    }

    let mut results = Vec::new();
    for worker in workers {
        results.extend(worker.await?);
    }

    Ok(ProbeReport::new(config, &results, start.elapsed()))
}

async fn worker_task(client: Client, config: ProbeConfig) -> Vec<ProbeResult> {
    let mut results = Vec::with_capacity(config.requests_per_worker);
    for _ in 0..config.requests_per_worker {
        let start = Instant::now();
        let res = send(&client, &config).await;
        let latency = start.elapsed();

        results.push(match res {
            Ok(status) => ProbeResult {
                status: Some(status),
                latency,
                error: None,
            },
            Err(err) => {
                debug!("Request failed: {err}");
                ProbeResult {
                    status: None,
                    latency,
                    error: Some(err.to_string()),
                }
            }
        });

        if !config.pause.is_zero() {
            tokio::time::sleep(config.pause).await;
        }
    }
    results
}

async fn send(client: &Client, config: &ProbeConfig) -> Result<u16, reqwest::Error> {
    let request = match config.method {
        ProbeMethod::Get => client.get(config.url.clone()),
        ProbeMethod::Post => client
            .post(config.url.clone())
            .json(&serde_json::json!({ "dummy": "data" })),
    };

    let response = request.send().await?;
    let status = response.status().as_u16();
    response.bytes().await?;
    Ok(status)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeLatency {
    pub p50: Duration,
    pub p90: Duration,
    pub mean: Duration,
    pub max: Duration,
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub url: Url,
    pub concurrency: usize,
    pub requests_per_worker: usize,
    pub total_requests: usize,
    pub elapsed: Duration,
    pub success: usize,
    pub failures: usize,
    /// `None` when no request was sent.
    pub latency: Option<ProbeLatency>,
    /// Status code counts in ascending order, requests without a response last.
    pub statuses: Vec<(Option<u16>, usize)>,
    /// Most frequent error messages first.
    pub errors: Vec<(String, usize)>,
}

impl ProbeReport {
    pub fn new(config: &ProbeConfig, results: &[ProbeResult], elapsed: Duration) -> Self {
        let total_requests = results.len();
        let success = results
            .iter()
            .filter(|r| matches!(r.status, Some(200..=399)))
            .count();

        let mut latencies: Vec<f64> = results.iter().map(|r| r.latency.as_secs_f64()).collect();
        latencies.sort_by(f64::total_cmp);

        let latency = (!latencies.is_empty()).then(|| ProbeLatency {
            p50: Duration::from_secs_f64(median(&latencies)),
            p90: Duration::from_secs_f64(exclusive_quantile(&latencies, 9, 10)),
            mean: Duration::from_secs_f64(latencies.iter().sum::<f64>() / latencies.len() as f64),
            max: Duration::from_secs_f64(latencies[latencies.len() - 1]),
        });

        let mut by_status: BTreeMap<u16, usize> = BTreeMap::new();
        let mut no_status = 0;
        for result in results {
            match result.status {
                Some(status) => *by_status.entry(status).or_default() += 1,
                None => no_status += 1,
            }
        }
        let mut statuses: Vec<_> = by_status.into_iter().map(|(s, n)| (Some(s), n)).collect();
        if no_status > 0 {
            statuses.push((None, no_status));
        }

        let mut by_error: HashMap<&str, usize> = HashMap::new();
        for error in results.iter().filter_map(|r| r.error.as_deref()) {
            *by_error.entry(error).or_default() += 1;
        }
        let mut errors: Vec<_> = by_error
            .into_iter()
            .map(|(msg, n)| (msg.to_string(), n))
            .collect();
        errors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        errors.truncate(TOP_ERRORS);

        Self {
            url: config.url.clone(),
            concurrency: config.concurrency.get(),
            requests_per_worker: config.requests_per_worker,
            total_requests,
            elapsed,
            success,
            failures: total_requests - success,
            latency,
            statuses,
            errors,
        }
    }

    pub fn requests_per_sec(&self) -> f64 {
        if self.elapsed.is_zero() {
            0.
        } else {
            self.total_requests as f64 / self.elapsed.as_secs_f64()
        }
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Load Test Summary ===")?;
        writeln!(f, "Target URL: {}", self.url)?;
        writeln!(f, "Concurrency workers: {}", self.concurrency)?;
        writeln!(f, "Requests per worker: {}", self.requests_per_worker)?;
        writeln!(f, "Total requests: {}", self.total_requests)?;
        writeln!(f, "Elapsed time: {:.2}s", self.elapsed.as_secs_f64())?;
        if let Some(latency) = &self.latency {
            writeln!(f, "Requests/sec: {:.2}", self.requests_per_sec())?;
            writeln!(f, "Success: {}, Failures: {}", self.success, self.failures)?;
            writeln!(f, "Latency p50: {:.3}s", latency.p50.as_secs_f64())?;
            writeln!(f, "Latency p90: {:.3}s", latency.p90.as_secs_f64())?;
            writeln!(f, "Latency mean: {:.3}s", latency.mean.as_secs_f64())?;
            writeln!(f, "Latency max: {:.3}s", latency.max.as_secs_f64())?;
        }
        write!(f, "Status codes distribution:")?;
        for (status, count) in &self.statuses {
            match status {
                Some(status) => write!(f, "\n  {status}: {count}")?,
                None => write!(f, "\n  None: {count}")?,
            }
        }
        if !self.errors.is_empty() {
            write!(f, "\n\nTop exception messages:")?;
            for (msg, count) in &self.errors {
                write!(f, "\n  {count}x: {msg}")?;
            }
        }
        Ok(())
    }
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.
    } else {
        sorted[mid]
    }
}

/// The `i`-th of `n` cut points, interpolated with the exclusive method (positions scaled by
/// `len + 1`). A single value is its own quantile.
fn exclusive_quantile(sorted: &[f64], i: usize, n: usize) -> f64 {
    let len = sorted.len();
    if len == 1 {
        return sorted[0];
    }

    let m = len + 1;
    let j = (i * m / n).clamp(1, len - 1);
    let delta = (i * m) as f64 - (j * n) as f64;
    (sorted[j - 1] * (n as f64 - delta) + sorted[j] * delta) / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: Option<u16>, millis: u64, error: Option<&str>) -> ProbeResult {
        ProbeResult {
            status,
            latency: Duration::from_millis(millis),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn quantiles_follow_the_exclusive_method() {
        let data: Vec<f64> = (1..=10).map(f64::from).collect();
        assert!((exclusive_quantile(&data, 9, 10) - 9.9).abs() < 1e-9);
        assert_eq!(median(&data), 5.5);
        assert_eq!(median(&[1., 2., 3.]), 2.);
        assert_eq!(exclusive_quantile(&[4.], 9, 10), 4.);
        assert!((exclusive_quantile(&[1., 2.], 9, 10) - 2.7).abs() < 1e-9);
    }

    #[test]
    fn report_counts_2xx_and_3xx_as_success() {
        let config = ProbeConfig::new("http://localhost:5014/").unwrap();
        let results = [
            result(Some(200), 10, None),
            result(Some(302), 20, None),
            result(Some(400), 30, None),
            result(Some(500), 40, None),
            result(None, 50, Some("connection refused")),
            result(None, 60, Some("connection refused")),
            result(None, 70, Some("timed out")),
        ];

        let report = ProbeReport::new(&config, &results, Duration::from_secs(1));
        assert_eq!(report.total_requests, 7);
        assert_eq!(report.success, 2);
        assert_eq!(report.failures, 5);
        assert_eq!(
            report.statuses,
            vec![
                (Some(200), 1),
                (Some(302), 1),
                (Some(400), 1),
                (Some(500), 1),
                (None, 3)
            ]
        );
        assert_eq!(
            report.errors,
            vec![
                ("connection refused".to_string(), 2),
                ("timed out".to_string(), 1)
            ]
        );

        let latency = report.latency.unwrap();
        assert_eq!(latency.p50, Duration::from_millis(40));
        assert_eq!(latency.max, Duration::from_millis(70));
        assert_eq!(report.requests_per_sec(), 7.);
    }

    #[test]
    fn empty_report_skips_latency() {
        let mut config = ProbeConfig::new("http://localhost:5014/").unwrap();
        config.requests_per_worker = 0;
        let report = ProbeReport::new(&config, &[], Duration::from_millis(5));
        assert!(report.latency.is_none());

        let text = report.to_string();
        assert!(text.contains("Total requests: 0"));
        assert!(!text.contains("Latency p50"));
    }

    #[test]
    fn display_lists_statuses_and_errors() {
        let config = ProbeConfig::new("http://localhost:5014/").unwrap();
        let results = [result(Some(200), 10, None), result(None, 20, Some("boom"))];
        let text = ProbeReport::new(&config, &results, Duration::from_secs(2)).to_string();

        assert!(text.starts_with("=== Load Test Summary ==="));
        assert!(text.contains("Target URL: http://localhost:5014/"));
        assert!(text.contains("Success: 1, Failures: 1"));
        assert!(text.contains("\n  200: 1\n  None: 1"));
        assert!(text.contains("Top exception messages:\n  1x: boom"));
    }

    #[test]
    fn rejects_malformed_url() {
        assert!(matches!(
            ProbeConfig::new("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn probes_a_live_service() {
        let mock = mock_service::spawn(mock_service::MockConfig::default())
            .await
            .unwrap();

        let mut config = ProbeConfig::new(&format!("{}/api/test", mock.url())).unwrap();
        config.concurrency = NonZeroUsize::new(3).unwrap();
        config.requests_per_worker = 4;

        let report = run_probe(&config).await.unwrap();
        assert_eq!(report.total_requests, 12);
        assert_eq!(report.success, 12);
        assert_eq!(report.statuses, vec![(Some(200), 12)]);
    }

    #[tokio::test]
    async fn dummy_post_to_chat_is_rejected() {
        let mock = mock_service::spawn(mock_service::MockConfig::default())
            .await
            .unwrap();

        let mut config = ProbeConfig::new(&format!("{}/chat", mock.url())).unwrap();
        config.concurrency = NonZeroUsize::new(2).unwrap();
        config.requests_per_worker = 2;
        config.method = ProbeMethod::Post;

        let report = run_probe(&config).await.unwrap();
        assert_eq!(report.success, 0);
        assert_eq!(report.statuses, vec![(Some(400), 4)]);
        assert_eq!(mock.chat_requests().len(), 4);
    }
}
