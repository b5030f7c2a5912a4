use shiptrack_types::{AccountId, Amount};
use thiserror::Error;

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("shipment is already in transit")]
    AlreadyInTransit,

    #[error("shipment has already been delivered")]
    AlreadyDelivered,

    #[error("shipment is not in transit")]
    NotInTransit,

    #[error("shipment has already been paid")]
    AlreadyPaid,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("payment amount must match the price: price {price}, attached {attached}")]
    PaymentMismatch { price: Amount, attached: Amount },

    #[error("distance must be positive")]
    InvalidDistance,

    #[error("invalid receiver: shipment is addressed to {expected}, got {supplied}")]
    InvalidReceiver { expected: AccountId, supplied: AccountId },

    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("shipment {sender}[{index}] not found")]
    NotFound { sender: AccountId, index: u64 },

    #[error("payout transfer failed: {0}")]
    TransferFailure(String),

    #[error("escrow accounting error: {0}")]
    Escrow(String),

    #[error("storage error: {0}")]
    Storage(#[from] shiptrack_store::StoreError),
}

impl LedgerError {
    /// Whether repeating the same call can succeed without changing its input.
    ///
    /// Only a failed payout qualifies: the shipment is left in transit and
    /// unpaid, so `complete` can be resubmitted.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransferFailure(_))
    }
}
