//! The ledger engine seam.
//!
//! A [`LedgerEngine`] is whatever actually executes ledger operations: a
//! remote contract behind an RPC endpoint, or [`LocalEngine`] running the
//! state machine in this process.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use shiptrack_ledger::{read_shipment, CreateShipment, LedgerError, LedgerEvent, Receipt, ShipmentMachine};
use shiptrack_store::{BalanceStore, Shipment, ShipmentSnapshot, ShipmentStore};
use shiptrack_types::{AccountId, Amount, Clock};

/// Executes ledger operations on behalf of an authenticated caller.
///
/// Mutations are applied atomically and in submission order. Reads may run
/// concurrently with a pending mutation and observe the ledger before or
/// after it.
#[async_trait]
pub trait LedgerEngine: Send + Sync {
    async fn create(
        &self,
        sender: &AccountId,
        request: CreateShipment,
        attached: Amount,
    ) -> Result<Receipt, LedgerError>;

    async fn start(&self, caller: &AccountId, receiver: &AccountId, index: u64) -> Result<Receipt, LedgerError>;

    async fn complete(&self, caller: &AccountId, receiver: &AccountId, index: u64) -> Result<Receipt, LedgerError>;

    async fn read(&self, sender: &AccountId, index: u64) -> Result<Shipment, LedgerError>;

    async fn list_all(&self) -> Result<ShipmentSnapshot, LedgerError>;

    async fn count(&self, sender: &AccountId) -> Result<u64, LedgerError>;

    async fn balance_of(&self, account: &AccountId) -> Result<Amount, LedgerError>;
}

/// Runs the shipment state machine in-process.
///
/// The machine sits behind an async mutex, which makes it the single writer:
/// mutations queue on the lock and are applied one at a time. Reads bypass
/// the lock and go straight to the shared store.
pub struct LocalEngine<S, B> {
    machine: Mutex<ShipmentMachine<S, B>>,
    reader: Arc<S>,
    balances: Arc<B>,
}

impl<S, B> LocalEngine<S, B>
where
    S: ShipmentStore + 'static,
    B: BalanceStore + 'static,
{
    pub fn new(store: Arc<S>, balances: Arc<B>, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        let machine = ShipmentMachine::new(Arc::clone(&store), Arc::clone(&balances), clock)?;
        debug!(escrowed = %machine.escrowed(), "local ledger engine ready");
        Ok(Self {
            machine: Mutex::new(machine),
            reader: store,
            balances,
        })
    }

    /// Register a listener for ledger notifications.
    pub async fn subscribe(&self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.machine.lock().await.subscribe(listener);
    }

    /// Total value currently held in escrow.
    pub async fn escrowed(&self) -> Amount {
        self.machine.lock().await.escrowed()
    }
}

#[async_trait]
impl<S, B> LedgerEngine for LocalEngine<S, B>
where
    S: ShipmentStore + 'static,
    B: BalanceStore + 'static,
{
    async fn create(
        &self,
        sender: &AccountId,
        request: CreateShipment,
        attached: Amount,
    ) -> Result<Receipt, LedgerError> {
        self.machine.lock().await.create(sender, request, attached)
    }

    async fn start(&self, caller: &AccountId, receiver: &AccountId, index: u64) -> Result<Receipt, LedgerError> {
        self.machine.lock().await.start(caller, receiver, index)
    }

    async fn complete(&self, caller: &AccountId, receiver: &AccountId, index: u64) -> Result<Receipt, LedgerError> {
        self.machine.lock().await.complete(caller, receiver, index)
    }

    async fn read(&self, sender: &AccountId, index: u64) -> Result<Shipment, LedgerError> {
        read_shipment(self.reader.as_ref(), sender, index)
    }

    async fn list_all(&self) -> Result<ShipmentSnapshot, LedgerError> {
        Ok(self.reader.all()?)
    }

    async fn count(&self, sender: &AccountId) -> Result<u64, LedgerError> {
        Ok(self.reader.count_for(sender)?)
    }

    async fn balance_of(&self, account: &AccountId) -> Result<Amount, LedgerError> {
        Ok(self.balances.balance_of(account)?)
    }
}
