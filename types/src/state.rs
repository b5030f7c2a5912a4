//! Shipment status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a shipment is in its lifecycle.
///
/// Status only moves forward: `Pending → InTransit → Delivered`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShipmentStatus {
    /// Created and escrowed, not yet picked up.
    Pending,
    /// Picked up and on its way.
    InTransit,
    /// Delivered and paid out. Terminal.
    Delivered,
}

impl ShipmentStatus {
    /// The only status reachable from this one, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::InTransit),
            Self::InTransit => Some(Self::Delivered),
            Self::Delivered => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Numeric code used by the on-chain enum (0, 1, 2).
    pub fn code(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InTransit => 1,
            Self::Delivered => 2,
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
        };
        f.write_str(s)
    }
}
