use crate::ledger::Ledger;
use crate::ramp::RampSchedule;
use crate::task_atomics::TaskAtomics;
use crate::transaction::TRANSACTION_HOOK;
use crate::vu::{build_client, VuContext, VU};
use buddyload_core::{SampleData, SampleSet};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};

/// The set of virtual users running one scenario.
pub(crate) struct VuPool<T> {
    scenario: T,
    tasks: Vec<JoinHandle<()>>,
    task_atomics: TaskAtomics,
    stop: watch::Sender<bool>,
}

impl<T, F> VuPool<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    pub fn new(scenario: T, max_rps: Option<NonZeroU32>) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            scenario,
            tasks: vec![],
            task_atomics: TaskAtomics::new(max_rps),
            stop,
        }
    }

    /// Spawn one task per VU; each waits for its ramp-up offset and then loops the scenario
    /// until told to stop.
    pub fn spawn(&mut self, ramp: RampSchedule) {
        for id in 0..ramp.vus() {
            let scenario = self.scenario.clone();
            let transaction_data = self.task_atomics.clone_to_transaction_data();
            let iterations = self.task_atomics.iterations();
            let active = self.task_atomics.active();
            let mut stop = self.stop.subscribe();
            let offset = ramp.start_offset(id);

            self.tasks.push(tokio::spawn(
                TRANSACTION_HOOK.scope(
                    transaction_data,
                    async move {
                        tokio::select! {
                            _ = tokio::time::sleep(offset) => {}
                            _ = stop.wait_for(|stopped| *stopped) => return,
                        }

                        let client = match build_client() {
                            Ok(client) => client,
                            Err(err) => {
                                error!("VU {id} could not build an HTTP client: {err}");
                                return;
                            }
                        };

                        trace!("VU {id} started after {offset:?}");
                        active.fetch_add(1, Ordering::Relaxed);
                        VU.scope(VuContext { id, client }, async {
                            while !*stop.borrow() {
                                scenario().await;
                                iterations.fetch_add(1, Ordering::Relaxed);
                            }
                        })
                        .await;
                        active.fetch_sub(1, Ordering::Relaxed);
                    }
                    .in_current_span(),
                ),
            ));
        }
    }

    pub fn collect(&self, elapsed: Duration, samples: &mut SampleSet) -> SampleData {
        let sample = self.task_atomics.collect(elapsed, samples);

        #[cfg(feature = "metrics")]
        {
            metrics::gauge!(buddyload_core::VUS_GAUGE).set(sample.active_vus as f64);
            metrics::counter!(buddyload_core::ITERATIONS_COUNTER).increment(sample.iterations);
        }

        sample
    }

    pub fn ledger(&self) -> &Ledger {
        self.task_atomics.ledger()
    }

    /// Ask every VU to stop after its current iteration, then abort whatever is still running
    /// once `graceful_stop` has passed. Returns how many iterations were cut short.
    pub async fn shutdown(&mut self, graceful_stop: Duration) -> u64 {
        self.stop.send_replace(true);

        // A graceful stop too long to represent waits for every VU.
        let deadline = Instant::now().checked_add(graceful_stop);
        let mut interrupted = 0;
        for mut handle in self.tasks.drain(..) {
            let finished = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, &mut handle).await.is_ok(),
                None => {
                    let _ = (&mut handle).await;
                    true
                }
            };
            if !finished {
                handle.abort();
                interrupted += 1;
            }
        }

        if interrupted > 0 {
            warn!("{interrupted} VUs did not finish within the graceful stop of {graceful_stop:?}");
        }
        interrupted
    }
}

impl<T> Drop for VuPool<T> {
    fn drop(&mut self) {
        for handle in &self.tasks {
            handle.abort();
        }
    }
}
