//! Shipment record and the ledger store traits.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use shiptrack_types::{AccountId, Amount, ShipmentId, ShipmentStatus, Timestamp};

/// A shipment as stored in the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    /// Global sequence number, assigned by the store on append.
    pub id: ShipmentId,
    pub sender: AccountId,
    pub receiver: AccountId,
    pub pickup_time: Timestamp,
    /// `Timestamp::EPOCH` until the shipment is delivered.
    pub delivery_time: Timestamp,
    pub distance: u64,
    /// Value escrowed at creation, released to the payee on completion.
    pub price: Amount,
    pub status: ShipmentStatus,
    pub is_paid: bool,
}

impl Shipment {
    /// A freshly created shipment: pending, unpaid, no delivery time.
    ///
    /// The id is a placeholder until the store assigns one.
    pub fn pending(
        sender: AccountId,
        receiver: AccountId,
        pickup_time: Timestamp,
        distance: u64,
        price: Amount,
    ) -> Self {
        Self {
            id: 0,
            sender,
            receiver,
            pickup_time,
            delivery_time: Timestamp::EPOCH,
            distance,
            price,
            status: ShipmentStatus::Pending,
            is_paid: false,
        }
    }

    /// Whether the record satisfies the per-shipment invariants:
    /// a delivery time is set exactly when delivered, and only delivered
    /// shipments are paid.
    pub fn is_consistent(&self) -> bool {
        let delivered = self.status == ShipmentStatus::Delivered;
        delivered == !self.delivery_time.is_unset() && (!self.is_paid || delivered)
    }
}

/// A point-in-time copy of the global sequence, in creation order.
///
/// Iterating never observes a write made after the snapshot was taken, and
/// the snapshot can be iterated any number of times.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShipmentSnapshot {
    shipments: Vec<Shipment>,
}

impl ShipmentSnapshot {
    pub fn new(shipments: Vec<Shipment>) -> Self {
        Self { shipments }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Shipment> {
        self.shipments.iter()
    }

    pub fn len(&self) -> usize {
        self.shipments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shipments.is_empty()
    }

    pub fn get(&self, id: ShipmentId) -> Option<&Shipment> {
        usize::try_from(id).ok().and_then(|i| self.shipments.get(i))
    }

    /// Shipments issued by `sender`, in the sender's creation order.
    pub fn sent_by<'a>(&'a self, sender: &'a AccountId) -> impl Iterator<Item = &'a Shipment> + 'a {
        self.shipments.iter().filter(move |s| &s.sender == sender)
    }

    pub fn into_vec(self) -> Vec<Shipment> {
        self.shipments
    }
}

impl IntoIterator for ShipmentSnapshot {
    type Item = Shipment;
    type IntoIter = std::vec::IntoIter<Shipment>;

    fn into_iter(self) -> Self::IntoIter {
        self.shipments.into_iter()
    }
}

impl<'a> IntoIterator for &'a ShipmentSnapshot {
    type Item = &'a Shipment;
    type IntoIter = std::slice::Iter<'a, Shipment>;

    fn into_iter(self) -> Self::IntoIter {
        self.shipments.iter()
    }
}

/// Read access to the ledger.
///
/// Shipments are reachable two ways: by global id, and by
/// `(sender, local_index)` where `local_index` counts that sender's
/// shipments from zero in creation order.
pub trait ShipmentReader: Send + Sync {
    /// Look up a shipment through the sender's index.
    fn get(&self, sender: &AccountId, local_index: u64) -> Result<Shipment, StoreError>;

    /// Look up a shipment by its global id.
    fn get_by_id(&self, id: ShipmentId) -> Result<Shipment, StoreError>;

    /// Snapshot of every shipment in creation order.
    fn all(&self) -> Result<ShipmentSnapshot, StoreError>;

    /// Number of shipments issued by `sender`.
    fn count_for(&self, sender: &AccountId) -> Result<u64, StoreError>;

    /// Total number of shipments.
    fn len(&self) -> Result<u64, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        self.len().map(|n| n == 0)
    }
}

/// Write access to the ledger. Only the shipment state machine writes.
pub trait ShipmentStore: ShipmentReader {
    /// Assign the next global id to `shipment`, store it, and push it onto
    /// the sender's index.
    ///
    /// Returns `(id, local_index)`. Fails with [`StoreError::Overflow`] only
    /// when the id space is exhausted.
    fn append(&self, shipment: Shipment) -> Result<(ShipmentId, u64), StoreError>;

    /// Apply `mutator` to the shipment at `(sender, local_index)` in place and
    /// return the updated record.
    ///
    /// The mutator must not change `id` or `sender`; a store rejects the
    /// update if it does.
    fn update<F>(&self, sender: &AccountId, local_index: u64, mutator: F) -> Result<Shipment, StoreError>
    where
        F: FnOnce(&mut Shipment);
}

/// Shared check for [`ShipmentStore::update`] implementations.
pub fn ensure_same_identity(before: &Shipment, after: &Shipment) -> Result<(), StoreError> {
    if before.id != after.id || before.sender != after.sender {
        return Err(StoreError::Backend(format!(
            "update of shipment {} attempted to change its identity",
            before.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(b: u8) -> AccountId {
        AccountId::from_bytes([b; 20])
    }

    #[test]
    fn pending_shipment_is_consistent() {
        let s = Shipment::pending(account(1), account(2), Timestamp::new(10), 100, Amount::ONE);
        assert_eq!(s.status, ShipmentStatus::Pending);
        assert!(!s.is_paid);
        assert!(s.delivery_time.is_unset());
        assert!(s.is_consistent());
    }

    #[test]
    fn paid_without_delivery_is_inconsistent() {
        let mut s = Shipment::pending(account(1), account(2), Timestamp::new(10), 100, Amount::ONE);
        s.is_paid = true;
        assert!(!s.is_consistent());
        s.status = ShipmentStatus::Delivered;
        assert!(!s.is_consistent());
        s.delivery_time = Timestamp::new(20);
        assert!(s.is_consistent());
    }

    #[test]
    fn snapshot_filters_by_sender() {
        let a = account(1);
        let b = account(2);
        let mut first = Shipment::pending(a.clone(), b.clone(), Timestamp::new(1), 1, Amount::ZERO);
        let mut second = Shipment::pending(b.clone(), a.clone(), Timestamp::new(2), 2, Amount::ZERO);
        let mut third = Shipment::pending(a.clone(), b.clone(), Timestamp::new(3), 3, Amount::ZERO);
        first.id = 0;
        second.id = 1;
        third.id = 2;
        let snap = ShipmentSnapshot::new(vec![first, second, third]);
        let ids: Vec<_> = snap.sent_by(&a).map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(snap.get(1).map(|s| s.distance), Some(2));
        assert_eq!(snap.iter().count(), snap.iter().count());
    }
}
