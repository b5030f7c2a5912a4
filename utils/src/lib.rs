//! Shared utilities for the shipment ledger.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat, UnknownLogFormat};
pub use time::{format_duration, transit_secs};
