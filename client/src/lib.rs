//! Ledger client facade.
//!
//! [`LedgerClient`] is the single entry point presentation code uses: it
//! negotiates a session before every mutating call, forwards reads without
//! one, and passes ledger and session errors through unchanged. The ledger
//! itself sits behind the [`LedgerEngine`] trait; [`LocalEngine`] runs the
//! shipment state machine in-process.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;

pub use client::{CreatePayload, LedgerClient, TransitionPayload};
pub use config::ClientConfig;
pub use engine::{LedgerEngine, LocalEngine};
pub use error::ClientError;
