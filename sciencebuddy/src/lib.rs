//! Load test for the sciencebuddy chat and summary endpoints.
//!
//! Every virtual user sends a prediction to `/chat`, thinks for a moment, asks for a summary
//! through `/summary` and thinks again. Only status codes are checked.
pub mod cli;
mod config;
pub mod driver;

pub use config::*;
pub use driver::ScienceBuddy;
