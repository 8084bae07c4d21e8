//! Periodic website prober.
//!
//! Each round fetches every monitored URL, at most `concurrent_requests` at a
//! time, and alerts a chat webhook when a page is missing all of its expected
//! texts.

pub mod alert;
pub mod checker;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod worker;

pub use alert::{AlertDispatcher, AlertStatus};
pub use checker::{CheckOutcome, Checker, Probe};
pub use config::MonitorConfig;
pub use error::Error;
pub use registry::{Target, TargetRegistry};
pub use worker::{RoundSummary, Scheduler};
