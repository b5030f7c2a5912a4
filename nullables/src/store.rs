//! Nullable stores: thread-safe in-memory ledger and balances for testing.

use shiptrack_store::shipment::ensure_same_identity;
use shiptrack_store::{
    BalanceStore, Payout, Shipment, ShipmentReader, ShipmentSnapshot, ShipmentStore, StoreError,
};
use shiptrack_types::{AccountId, Amount, ShipmentId};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct Ledger {
    /// Global sequence; position == id.
    shipments: Vec<Shipment>,
    /// Per-sender index of global ids.
    by_sender: HashMap<AccountId, Vec<ShipmentId>>,
}

impl Ledger {
    fn locate(&self, sender: &AccountId, local_index: u64) -> Result<usize, StoreError> {
        self.by_sender
            .get(sender)
            .and_then(|ids| ids.get(local_index as usize))
            .map(|id| *id as usize)
            .ok_or_else(|| StoreError::NotFound(format!("{sender}[{local_index}]")))
    }
}

/// An in-memory shipment ledger for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullShipmentStore {
    ledger: Mutex<Ledger>,
    /// When set, `append` reports id exhaustion once the ledger reaches this size.
    capacity: Option<u64>,
}

impl NullShipmentStore {
    pub fn new() -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            capacity: None,
        }
    }

    /// A store whose id space is exhausted after `capacity` shipments.
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            capacity: Some(capacity),
        }
    }
}

impl Default for NullShipmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ShipmentReader for NullShipmentStore {
    fn get(&self, sender: &AccountId, local_index: u64) -> Result<Shipment, StoreError> {
        let ledger = self.ledger.lock().unwrap();
        let pos = ledger.locate(sender, local_index)?;
        Ok(ledger.shipments[pos].clone())
    }

    fn get_by_id(&self, id: ShipmentId) -> Result<Shipment, StoreError> {
        self.ledger
            .lock()
            .unwrap()
            .shipments
            .get(id as usize)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("shipment {id}")))
    }

    fn all(&self) -> Result<ShipmentSnapshot, StoreError> {
        Ok(ShipmentSnapshot::new(
            self.ledger.lock().unwrap().shipments.clone(),
        ))
    }

    fn count_for(&self, sender: &AccountId) -> Result<u64, StoreError> {
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .by_sender
            .get(sender)
            .map(|ids| ids.len() as u64)
            .unwrap_or(0))
    }

    fn len(&self) -> Result<u64, StoreError> {
        Ok(self.ledger.lock().unwrap().shipments.len() as u64)
    }
}

impl ShipmentStore for NullShipmentStore {
    fn append(&self, mut shipment: Shipment) -> Result<(ShipmentId, u64), StoreError> {
        let mut ledger = self.ledger.lock().unwrap();
        let id = ledger.shipments.len() as u64;
        if self.capacity.is_some_and(|cap| id >= cap) {
            return Err(StoreError::Overflow(format!("shipment id {id}")));
        }
        shipment.id = id;
        let sender = shipment.sender.clone();
        ledger.shipments.push(shipment);
        let index = ledger.by_sender.entry(sender).or_default();
        index.push(id);
        Ok((id, index.len() as u64 - 1))
    }

    fn update<F>(&self, sender: &AccountId, local_index: u64, mutator: F) -> Result<Shipment, StoreError>
    where
        F: FnOnce(&mut Shipment),
    {
        let mut ledger = self.ledger.lock().unwrap();
        let pos = ledger.locate(sender, local_index)?;
        let mut updated = ledger.shipments[pos].clone();
        mutator(&mut updated);
        ensure_same_identity(&ledger.shipments[pos], &updated)?;
        ledger.shipments[pos] = updated.clone();
        Ok(updated)
    }
}

/// An in-memory balance book for testing.
///
/// Accounts can be marked as refusing funds to exercise payout failures.
pub struct NullBalanceStore {
    balances: Mutex<HashMap<AccountId, Amount>>,
    payouts: Mutex<HashMap<ShipmentId, Payout>>,
    refusing: Mutex<HashSet<AccountId>>,
}

impl NullBalanceStore {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            payouts: Mutex::new(HashMap::new()),
            refusing: Mutex::new(HashSet::new()),
        }
    }

    /// Make every future payout to `account` fail.
    pub fn refuse(&self, account: &AccountId) {
        self.refusing.lock().unwrap().insert(account.clone());
    }

    /// Let `account` accept funds again.
    pub fn accept(&self, account: &AccountId) {
        self.refusing.lock().unwrap().remove(account);
    }

    /// Seed a starting balance.
    pub fn set_balance(&self, account: &AccountId, amount: Amount) {
        self.balances.lock().unwrap().insert(account.clone(), amount);
    }
}

impl Default for NullBalanceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceStore for NullBalanceStore {
    fn pay(&self, payout: &Payout) -> Result<(), StoreError> {
        let mut payouts = self.payouts.lock().unwrap();
        if payouts.contains_key(&payout.shipment) {
            return Ok(());
        }
        if self.refusing.lock().unwrap().contains(&payout.payee) {
            return Err(StoreError::Rejected(payout.payee.to_string()));
        }
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(payout.payee.clone()).or_default();
        *balance = balance
            .checked_add(payout.amount)
            .ok_or_else(|| StoreError::Overflow(format!("balance of {}", payout.payee)))?;
        payouts.insert(payout.shipment, payout.clone());
        Ok(())
    }

    fn payout_for(&self, shipment: ShipmentId) -> Result<Option<Payout>, StoreError> {
        Ok(self.payouts.lock().unwrap().get(&shipment).cloned())
    }

    fn balance_of(&self, account: &AccountId) -> Result<Amount, StoreError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(account)
            .copied()
            .unwrap_or_default())
    }
}
