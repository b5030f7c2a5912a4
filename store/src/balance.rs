//! Payout balance storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use shiptrack_types::{AccountId, Amount, ShipmentId, Timestamp};

/// Escrow released to a payee, recorded against the shipment it settles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub shipment: ShipmentId,
    pub payee: AccountId,
    pub amount: Amount,
    /// Delivery time the shipment record is settled with.
    pub delivered_at: Timestamp,
}

/// Balances of escrow released to payees.
///
/// A balance is the total an account has been paid out on completed
/// shipments. Value attached to `create` is escrowed by the ledger and is
/// never debited from a stored balance, so a sender's balance does not drop
/// when it creates a shipment.
pub trait BalanceStore: Send + Sync {
    /// Credit `payout.amount` to `payout.payee` and record the payout against
    /// its shipment, as one unit.
    ///
    /// A shipment is paid at most once: if a payout is already recorded for
    /// `payout.shipment` this is a no-op. Fails with [`StoreError::Rejected`]
    /// when the payee cannot accept funds and with [`StoreError::Overflow`]
    /// when the balance would wrap; a failed payout records nothing.
    fn pay(&self, payout: &Payout) -> Result<(), StoreError>;

    /// The payout recorded for `shipment`, if any.
    fn payout_for(&self, shipment: ShipmentId) -> Result<Option<Payout>, StoreError>;

    /// Total paid out to `account` (zero for unknown accounts).
    fn balance_of(&self, account: &AccountId) -> Result<Amount, StoreError>;
}
