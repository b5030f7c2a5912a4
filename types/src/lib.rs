//! Fundamental types for the shipment ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! account identities, fixed-point amounts, timestamps, shipment status and
//! network profiles.

pub mod address;
pub mod amount;
pub mod error;
pub mod network;
pub mod state;
pub mod time;

pub use address::AccountId;
pub use amount::Amount;
pub use error::TypesError;
pub use network::NetworkId;
pub use state::ShipmentStatus;
pub use time::{Clock, SystemClock, Timestamp};

/// Global sequence number of a shipment.
pub type ShipmentId = u64;
