//! Notifications emitted by the state machine for subscribers.

use serde::Serialize;
use shiptrack_types::{AccountId, Amount, Timestamp};

/// Ledger-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    /// A shipment was created and its price escrowed.
    ShipmentCreated {
        sender: AccountId,
        receiver: AccountId,
        pickup_time: Timestamp,
        distance: u64,
        price: Amount,
    },
    /// A shipment was picked up.
    ShipmentInTransit {
        sender: AccountId,
        receiver: AccountId,
        pickup_time: Timestamp,
    },
    /// A shipment reached its receiver.
    ShipmentDelivered {
        sender: AccountId,
        receiver: AccountId,
        delivery_time: Timestamp,
    },
    /// The escrowed price was released.
    ShipmentPaid {
        sender: AccountId,
        receiver: AccountId,
        amount: Amount,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ShipmentCreated { .. } => "ShipmentCreated",
            Self::ShipmentInTransit { .. } => "ShipmentInTransit",
            Self::ShipmentDelivered { .. } => "ShipmentDelivered",
            Self::ShipmentPaid { .. } => "ShipmentPaid",
        }
    }
}

/// Synchronous fan-out event bus for ledger events.
///
/// Listeners are invoked inline on the emitting thread, while the writer is
/// still held; keep handlers fast.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&LedgerEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &LedgerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn account(b: u8) -> AccountId {
        AccountId::from_bytes([b; 20])
    }

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));

        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&LedgerEvent::ShipmentPaid {
            sender: account(1),
            receiver: account(2),
            amount: Amount::ONE,
        });

        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn emit_with_no_listeners_is_noop() {
        let bus = EventBus::default();
        bus.emit(&LedgerEvent::ShipmentInTransit {
            sender: account(1),
            receiver: account(2),
            pickup_time: Timestamp::new(5),
        });
        assert!(bus.listeners.is_empty());
    }

    #[test]
    fn events_serialize_with_their_name() {
        let event = LedgerEvent::ShipmentDelivered {
            sender: account(1),
            receiver: account(2),
            delivery_time: Timestamp::new(99),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["delivery_time"], 99);
    }
}
