use crate::ledger::Ledger;
use buddyload_core::TransactionLabels;
use governor::DefaultDirectRateLimiter;
use metrics_util::AtomicBucket;
use std::time::{Duration, Instant};
use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// Transaction hook used by the `#[transaction]` macro. Not intended to be used manually.
pub async fn transaction_hook<T, R, E>(labels: TransactionLabels, func: T) -> T::Output
where
    T: Future<Output = Result<R, E>>,
{
    if let Ok(hook) = TRANSACTION_HOOK.try_with(|v| v.clone()) {
        if let Some(limiter) = &hook.limiter {
            limiter.until_ready().await;
        }

        let start = Instant::now();
        let res = func.await;
        let elapsed = start.elapsed();

        hook.latency.push(elapsed);
        hook.ledger.transaction(labels.name).record(res.is_ok());

        #[cfg(feature = "metrics")]
        {
            metrics::histogram!(labels.duration).record(elapsed.as_secs_f64());
            metrics::counter!(labels.requests).increment(1);
        }

        if res.is_ok() {
            hook.success.fetch_add(1, Ordering::Relaxed);
        } else {
            hook.error.fetch_add(1, Ordering::Relaxed);

            #[cfg(feature = "metrics")]
            metrics::counter!(labels.failed).increment(1);
        }

        res
    } else {
        tracing::warn!("No hook available for transaction {}.", labels.name);
        func.await
    }
}

#[derive(Clone)]
pub(crate) struct TransactionData {
    pub limiter: Option<Arc<DefaultDirectRateLimiter>>,
    pub success: Arc<AtomicU64>,
    pub error: Arc<AtomicU64>,
    pub check_pass: Arc<AtomicU64>,
    pub check_fail: Arc<AtomicU64>,
    pub latency: Arc<AtomicBucket<Duration>>,
    pub ledger: Arc<Ledger>,
}

impl TransactionData {
    pub fn record_check(&self, name: &'static str, passed: bool) {
        self.ledger.check(name).record(passed);

        if passed {
            self.check_pass.fetch_add(1, Ordering::Relaxed);
        } else {
            self.check_fail.fetch_add(1, Ordering::Relaxed);
        }

        #[cfg(feature = "metrics")]
        metrics::counter!(
            buddyload_core::CHECKS_COUNTER,
            "check" => name,
            "result" => if passed { "pass" } else { "fail" }
        )
        .increment(1);
    }
}

tokio::task_local! {
    pub(crate) static TRANSACTION_HOOK: TransactionData;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_atomics::TaskAtomics;
    use buddyload_core::SampleSet;

    #[crate::transaction]
    async fn succeeds() -> Result<u16, String> {
        Ok(200)
    }

    #[crate::transaction]
    async fn fails() -> Result<u16, String> {
        Err("connection refused".to_string())
    }

    #[tokio::test]
    async fn outcomes_are_counted_per_transaction() {
        let atomics = TaskAtomics::new(None);

        TRANSACTION_HOOK
            .scope(atomics.clone_to_transaction_data(), async {
                assert_eq!(succeeds().await, Ok(200));
                assert_eq!(succeeds().await, Ok(200));
                assert!(fails().await.is_err());
            })
            .await;

        let mut samples = SampleSet::new();
        let sample = atomics.collect(Duration::from_secs(1), &mut samples);
        assert_eq!(sample.success, 2);
        assert_eq!(sample.error, 1);
        assert_eq!(samples.latency_count(), 3);

        let transactions = atomics.ledger().transactions();
        let succeeds = transactions.iter().find(|t| t.name == "succeeds").unwrap();
        let fails = transactions.iter().find(|t| t.name == "fails").unwrap();
        assert_eq!((succeeds.requests, succeeds.failed), (2, 0));
        assert_eq!((fails.requests, fails.failed), (1, 1));
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn runs_without_a_hook() {
        assert_eq!(succeeds().await, Ok(200));
        assert!(logs_contain("No hook available"));
    }
}
