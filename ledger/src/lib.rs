//! Shipment state machine.
//!
//! Every shipment moves `Pending → InTransit → Delivered`. Creation escrows the
//! price; completion releases it to the payee. The machine is the only writer
//! of the ledger store and emits a notification for every transition it
//! applies.

pub mod error;
pub mod event;
pub mod machine;

pub use error::{LedgerError, TransitionError};
pub use event::{EventBus, LedgerEvent};
pub use machine::{read_shipment, CreateShipment, Receipt, ShipmentMachine};
