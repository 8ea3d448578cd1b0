#![cfg_attr(docsrs, feature(doc_cfg))]
//! A small virtual-user load testing engine.
//!
//! A scenario is an async function run in a loop by a pool of virtual users (VUs). VUs are
//! brought up linearly over a ramp-up window and run for a fixed duration. Inside a scenario,
//! `#[transaction]` functions are timed and counted, and [`check`] records named pass/fail
//! assertions. Awaiting a scenario yields [`RunStatistics`](core::RunStatistics).
//!
//! ```no_run
//! use buddyload::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let stats = my_scenario()
//!         .duration(Duration::from_secs(60))
//!         .ramp_up(Duration::from_secs(10))
//!         .await;
//!     println!("{stats}");
//! }
//!
//! #[scenario]
//! async fn my_scenario() {
//!     let ok = my_request().await.is_ok();
//!     check("request ok", ok);
//!     Pause::fixed(Duration::from_secs(1)).wait().await;
//! }
//!
//! #[transaction]
//! async fn my_request() -> Result<(), reqwest::Error> {
//!     buddyload::vu::client().get("http://localhost:3002/api/test").send().await?;
//!     Ok(())
//! }
//! ```
extern crate self as buddyload;

mod check;
mod error;
mod ledger;
mod pacing;
mod pool;
pub mod probe;
mod ramp;
pub mod report;
pub mod scenario;
mod task_atomics;
mod timer;
#[doc(hidden)]
pub mod transaction;
pub mod vu;

pub use buddyload_core as core;
#[doc(hidden)]
pub use buddyload_core::generate_labels;
pub use buddyload_macros::{scenario, transaction};
pub use check::check;
pub use error::Error;
pub use pacing::Pause;
pub use scenario::Scenario;

pub mod prelude {
    pub use crate::check;
    pub use crate::pacing::Pause;
    pub use crate::scenario::ConfigurableScenario;
    pub use buddyload_core::RunStatistics;
    pub use buddyload_macros::{scenario, transaction};
    pub use std::num::{NonZeroU32, NonZeroUsize};
}
