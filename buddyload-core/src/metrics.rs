/// Metric names and registry key for one transaction.
#[derive(Copy, Clone, Debug)]
pub struct TransactionLabels {
    pub name: &'static str,
    pub requests: &'static str,
    pub failed: &'static str,
    pub duration: &'static str,
}

#[macro_export]
macro_rules! generate_labels {
    ($base_name:ident) => {
        ::buddyload::core::TransactionLabels {
            name: stringify!($base_name),
            requests: concat!(stringify!($base_name), "_requests"),
            failed: concat!(stringify!($base_name), "_failed"),
            duration: concat!(stringify!($base_name), "_duration"),
        }
    };
}

/// Gauge tracking the number of virtual users currently running.
pub const VUS_GAUGE: &str = "buddyload_vus";

/// Counter of check outcomes, labelled with `check` and `result`.
pub const CHECKS_COUNTER: &str = "buddyload_checks";

/// Counter of completed scenario iterations.
pub const ITERATIONS_COUNTER: &str = "buddyload_iterations";
