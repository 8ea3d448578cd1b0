use buddyload_core::{CheckStatistics, TransactionStatistics};
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, PoisonError, RwLock,
};

/// Cumulative pass/fail counts for one name.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    pass: AtomicU64,
    fail: AtomicU64,
}

impl Tally {
    pub fn record(&self, passed: bool) {
        if passed {
            self.pass.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fail.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn load(&self) -> (u64, u64) {
        (
            self.pass.load(Ordering::Relaxed),
            self.fail.load(Ordering::Relaxed),
        )
    }
}

type TallyMap = RwLock<BTreeMap<&'static str, Arc<Tally>>>;

/// Named tallies for every check and transaction seen during a run.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    checks: TallyMap,
    transactions: TallyMap,
}

impl Ledger {
    pub fn check(&self, name: &'static str) -> Arc<Tally> {
        entry(&self.checks, name)
    }

    pub fn transaction(&self, name: &'static str) -> Arc<Tally> {
        entry(&self.transactions, name)
    }

    pub fn checks(&self) -> Vec<CheckStatistics> {
        snapshot(&self.checks)
            .map(|(name, passes, fails)| CheckStatistics {
                name,
                passes,
                fails,
            })
            .collect()
    }

    pub fn transactions(&self) -> Vec<TransactionStatistics> {
        snapshot(&self.transactions)
            .map(|(name, requests, failed)| TransactionStatistics {
                name,
                requests: requests + failed,
                failed,
            })
            .collect()
    }
}

fn entry(map: &TallyMap, name: &'static str) -> Arc<Tally> {
    if let Some(tally) = map.read().unwrap_or_else(PoisonError::into_inner).get(name) {
        return tally.clone();
    }

    map.write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(name)
        .or_default()
        .clone()
}

fn snapshot(map: &TallyMap) -> impl Iterator<Item = (String, u64, u64)> {
    let rows: Vec<_> = map
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .map(|(name, tally)| {
            let (pass, fail) = tally.load();
            (name.to_string(), pass, fail)
        })
        .collect();
    rows.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_shares_a_tally() {
        let ledger = Ledger::default();
        ledger.check("chat status 2xx").record(true);
        ledger.check("chat status 2xx").record(false);
        ledger.check("summary status ok").record(true);

        let checks = ledger.checks();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].name, "chat status 2xx");
        assert_eq!((checks[0].passes, checks[0].fails), (1, 1));
        assert_eq!((checks[1].passes, checks[1].fails), (1, 0));
    }

    #[test]
    fn transaction_requests_include_failures() {
        let ledger = Ledger::default();
        let chat = ledger.transaction("chat");
        chat.record(true);
        chat.record(true);
        chat.record(false);

        let transactions = ledger.transactions();
        assert_eq!(transactions[0].requests, 3);
        assert_eq!(transactions[0].failed, 1);
    }
}
