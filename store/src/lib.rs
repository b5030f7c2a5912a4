//! Abstract storage traits for the shipment ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Reads and writes are separate traits: anything that only needs to look at
//! the ledger takes a [`ShipmentReader`], while [`ShipmentStore`] is reserved
//! for the state machine, which is the single writer.

pub mod balance;
pub mod error;
pub mod shipment;

pub use balance::{BalanceStore, Payout};
pub use error::StoreError;
pub use shipment::{Shipment, ShipmentReader, ShipmentSnapshot, ShipmentStore};
