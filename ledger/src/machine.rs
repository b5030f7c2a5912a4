//! The shipment state machine: transition rules, escrow, payout.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use shiptrack_store::{BalanceStore, Payout, Shipment, ShipmentReader, ShipmentStore, StoreError};
use shiptrack_types::{AccountId, Amount, Clock, ShipmentId, ShipmentStatus, Timestamp};
use tracing::{info, warn};

use crate::error::{LedgerError, TransitionError};
use crate::event::{EventBus, LedgerEvent};

/// Arguments of a `create` call, minus the attached value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateShipment {
    pub receiver: AccountId,
    pub pickup_time: Timestamp,
    pub distance: u64,
    pub price: Amount,
}

/// Confirmation of an applied transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Receipt {
    /// Global id of the affected shipment.
    pub id: ShipmentId,
    pub sender: AccountId,
    /// Position in the sender's index.
    pub index: u64,
    /// Status after the transition.
    pub status: ShipmentStatus,
    /// Notifications emitted by the transition, in order.
    pub events: Vec<LedgerEvent>,
}

/// Applies shipment transitions against a ledger store.
///
/// Methods that write take `&mut self`; callers serialise them (see the
/// client's `LocalEngine`), so each transition is checked and applied in
/// full before the next one starts.
pub struct ShipmentMachine<S, B> {
    store: Arc<S>,
    balances: Arc<B>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    /// Value held for shipments that have not been paid out.
    escrowed: Amount,
}

impl<S, B> ShipmentMachine<S, B>
where
    S: ShipmentStore,
    B: BalanceStore,
{
    /// Build a machine over `store`, recomputing the escrow total from the
    /// unpaid shipments already in it.
    ///
    /// A shipment whose payout was recorded but whose record was never
    /// settled (the process stopped between the two writes) is settled here
    /// with the recorded delivery time.
    pub fn new(store: Arc<S>, balances: Arc<B>, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        let mut escrowed = Amount::ZERO;
        let mut positions: HashMap<AccountId, u64> = HashMap::new();
        for shipment in store.all()?.iter() {
            let slot = positions.entry(shipment.sender.clone()).or_default();
            let index = *slot;
            *slot += 1;
            if shipment.is_paid {
                continue;
            }
            if let Some(payout) = balances.payout_for(shipment.id)? {
                warn!(id = shipment.id, sender = %shipment.sender, "settling shipment paid before shutdown");
                settle(store.as_ref(), &shipment.sender, index, &payout)?;
                continue;
            }
            escrowed = escrowed
                .checked_add(shipment.price)
                .ok_or_else(|| LedgerError::Escrow("escrow total overflows".into()))?;
        }
        Ok(Self {
            store,
            balances,
            clock,
            events: EventBus::new(),
            escrowed,
        })
    }

    /// Register a listener for every notification this machine emits.
    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    /// Total value currently held in escrow.
    pub fn escrowed(&self) -> Amount {
        self.escrowed
    }

    /// Read-only handle on the underlying store.
    pub fn reader(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    /// Create a pending shipment from `sender`, escrowing `attached`.
    ///
    /// `attached` must equal the declared price exactly.
    pub fn create(
        &mut self,
        sender: &AccountId,
        request: CreateShipment,
        attached: Amount,
    ) -> Result<Receipt, LedgerError> {
        if attached != request.price {
            warn!(%sender, price = %request.price, %attached, "create rejected: payment mismatch");
            return Err(LedgerError::PaymentMismatch {
                price: request.price,
                attached,
            });
        }
        if request.distance == 0 {
            return Err(LedgerError::InvalidDistance);
        }
        let escrowed = self
            .escrowed
            .checked_add(request.price)
            .ok_or_else(|| LedgerError::Escrow("escrow total overflows".into()))?;

        let shipment = Shipment::pending(
            sender.clone(),
            request.receiver.clone(),
            request.pickup_time,
            request.distance,
            request.price,
        );
        let (id, index) = self.store.append(shipment)?;
        self.escrowed = escrowed;
        info!(id, %sender, receiver = %request.receiver, price = %request.price, "shipment created");

        let event = LedgerEvent::ShipmentCreated {
            sender: sender.clone(),
            receiver: request.receiver,
            pickup_time: request.pickup_time,
            distance: request.distance,
            price: request.price,
        };
        Ok(self.finish(id, sender, index, ShipmentStatus::Pending, vec![event]))
    }

    /// Mark the shipment at `(caller, index)` as picked up.
    pub fn start(
        &mut self,
        caller: &AccountId,
        receiver: &AccountId,
        index: u64,
    ) -> Result<Receipt, LedgerError> {
        let shipment = self.read(caller, index)?;
        check_receiver(&shipment, receiver)?;
        match shipment.status {
            ShipmentStatus::Pending => {}
            ShipmentStatus::InTransit => return Err(TransitionError::AlreadyInTransit.into()),
            ShipmentStatus::Delivered => return Err(TransitionError::AlreadyDelivered.into()),
        }

        let updated = self
            .store
            .update(caller, index, |s| s.status = ShipmentStatus::InTransit)?;
        info!(id = updated.id, sender = %caller, "shipment in transit");

        let event = LedgerEvent::ShipmentInTransit {
            sender: updated.sender.clone(),
            receiver: updated.receiver.clone(),
            pickup_time: updated.pickup_time,
        };
        Ok(self.finish(updated.id, caller, index, updated.status, vec![event]))
    }

    /// Deliver the shipment at `(caller, index)` and release its price to
    /// the caller.
    ///
    /// The payout is made before the record changes. If it fails nothing is
    /// written, no notification is emitted, and
    /// [`LedgerError::TransferFailure`] is returned so the call can be
    /// repeated. A payout already recorded for the shipment is reused, never
    /// paid again.
    pub fn complete(
        &mut self,
        caller: &AccountId,
        receiver: &AccountId,
        index: u64,
    ) -> Result<Receipt, LedgerError> {
        let before = self.read(caller, index)?;
        check_receiver(&before, receiver)?;
        if before.is_paid {
            return Err(TransitionError::AlreadyPaid.into());
        }
        if before.status != ShipmentStatus::InTransit {
            return Err(TransitionError::NotInTransit.into());
        }
        let remaining = self.escrowed.checked_sub(before.price).ok_or_else(|| {
            LedgerError::Escrow(format!(
                "escrow holds {} but shipment {} needs {}",
                self.escrowed, before.id, before.price
            ))
        })?;

        let payout = match self.balances.payout_for(before.id)? {
            Some(recorded) => {
                warn!(id = before.id, payee = %recorded.payee, "resuming settlement of a recorded payout");
                recorded
            }
            None => {
                let payout = Payout {
                    shipment: before.id,
                    payee: caller.clone(),
                    amount: before.price,
                    // Zero is the "not delivered" sentinel.
                    delivered_at: Timestamp::new(self.clock.now().as_secs().max(1)),
                };
                if let Err(e) = self.balances.pay(&payout) {
                    warn!(id = before.id, payee = %caller, error = %e, "payout failed");
                    return Err(LedgerError::TransferFailure(e.to_string()));
                }
                payout
            }
        };

        let updated = settle(self.store.as_ref(), caller, index, &payout)?;
        self.escrowed = remaining;
        info!(id = updated.id, payee = %payout.payee, amount = %payout.amount, "shipment delivered and paid");

        let events = vec![
            LedgerEvent::ShipmentDelivered {
                sender: updated.sender.clone(),
                receiver: updated.receiver.clone(),
                delivery_time: updated.delivery_time,
            },
            LedgerEvent::ShipmentPaid {
                sender: updated.sender.clone(),
                receiver: updated.receiver.clone(),
                amount: updated.price,
            },
        ];
        Ok(self.finish(updated.id, caller, index, updated.status, events))
    }

    /// Look up the shipment at `(sender, index)`. Never mutates.
    pub fn read(&self, sender: &AccountId, index: u64) -> Result<Shipment, LedgerError> {
        read_shipment(self.store.as_ref(), sender, index)
    }

    fn finish(
        &self,
        id: ShipmentId,
        sender: &AccountId,
        index: u64,
        status: ShipmentStatus,
        events: Vec<LedgerEvent>,
    ) -> Receipt {
        for event in &events {
            self.events.emit(event);
        }
        Receipt {
            id,
            sender: sender.clone(),
            index,
            status,
            events,
        }
    }
}

/// Look up a shipment through any reader, mapping a missing entry to
/// [`LedgerError::NotFound`].
pub fn read_shipment<R>(reader: &R, sender: &AccountId, index: u64) -> Result<Shipment, LedgerError>
where
    R: ShipmentReader + ?Sized,
{
    reader.get(sender, index).map_err(|e| match e {
        StoreError::NotFound(_) => LedgerError::NotFound {
            sender: sender.clone(),
            index,
        },
        other => LedgerError::Storage(other),
    })
}

/// Mark the shipment at `(sender, index)` delivered and paid per `payout`.
fn settle<S>(store: &S, sender: &AccountId, index: u64, payout: &Payout) -> Result<Shipment, LedgerError>
where
    S: ShipmentStore,
{
    let delivered_at = payout.delivered_at;
    Ok(store.update(sender, index, |s| {
        s.delivery_time = delivered_at;
        s.status = ShipmentStatus::Delivered;
        s.is_paid = true;
    })?)
}

fn check_receiver(shipment: &Shipment, receiver: &AccountId) -> Result<(), LedgerError> {
    if &shipment.receiver != receiver {
        return Err(LedgerError::InvalidReceiver {
            expected: shipment.receiver.clone(),
            supplied: receiver.clone(),
        });
    }
    Ok(())
}
