//! LMDB storage backend for the shipment ledger.
//!
//! Implements the storage traits from `shiptrack-store` using the `heed` LMDB
//! bindings. All stores share a single environment; each logical store maps to
//! one or more named databases inside it.

pub mod balance;
pub mod environment;
pub mod error;
pub mod integrity;
pub mod shipment;

pub use balance::LmdbBalanceStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use shipment::LmdbShipmentStore;
