//! The client facade.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use shiptrack_ledger::{CreateShipment, Receipt};
use shiptrack_session::{Mode, Negotiator, Session, SessionError};
use shiptrack_store::{Shipment, ShipmentSnapshot};
use shiptrack_types::{AccountId, Amount, Timestamp};

use crate::engine::LedgerEngine;
use crate::ClientError;

/// Arguments of [`LedgerClient::create`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatePayload {
    pub receiver: AccountId,
    pub pickup_time: Timestamp,
    pub distance: u64,
    pub price: Amount,
    /// Value attached to the call. Defaults to `price`.
    pub value: Option<Amount>,
}

impl CreatePayload {
    fn attached(&self) -> Amount {
        self.value.unwrap_or(self.price)
    }
}

/// Arguments of [`LedgerClient::start`] and [`LedgerClient::complete`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionPayload {
    pub receiver: AccountId,
    /// Index in the caller's own shipment list.
    pub index: u64,
}

/// Stateless facade over a negotiator and a ledger engine.
///
/// Mutating calls negotiate a signing session first and act as the session's
/// account. Reads never prompt.
pub struct LedgerClient {
    negotiator: Arc<Negotiator>,
    engine: Arc<dyn LedgerEngine>,
    negotiation_timeout: Option<Duration>,
}

impl LedgerClient {
    pub fn new(negotiator: Arc<Negotiator>, engine: Arc<dyn LedgerEngine>) -> Self {
        Self {
            negotiator,
            engine,
            negotiation_timeout: None,
        }
    }

    /// Bound every negotiation by `timeout`.
    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = Some(timeout);
        self
    }

    pub fn negotiator(&self) -> &Arc<Negotiator> {
        &self.negotiator
    }

    async fn signing_session(&self) -> Result<Session, ClientError> {
        let session = match self.negotiation_timeout {
            Some(deadline) => self.negotiator.negotiate_within(Mode::Forced, deadline).await?,
            None => self.negotiator.negotiate(Mode::Forced).await?,
        };
        if !session.can_sign() {
            return Err(SessionError::ReadOnly.into());
        }
        if !self.negotiator.is_live(&session) {
            warn!(account = %session.account(), "session invalidated during negotiation");
            return Err(SessionError::Invalidated.into());
        }
        Ok(session)
    }

    /// Create a shipment from the session account, attaching `payload.value`
    /// (or the price when unset).
    pub async fn create(&self, payload: CreatePayload) -> Result<Receipt, ClientError> {
        let session = self.signing_session().await?;
        let attached = payload.attached();
        let request = CreateShipment {
            receiver: payload.receiver,
            pickup_time: payload.pickup_time,
            distance: payload.distance,
            price: payload.price,
        };
        Ok(self.engine.create(session.account(), request, attached).await?)
    }

    pub async fn start(&self, payload: TransitionPayload) -> Result<Receipt, ClientError> {
        let session = self.signing_session().await?;
        Ok(self
            .engine
            .start(session.account(), &payload.receiver, payload.index)
            .await?)
    }

    /// Deliver a shipment; its price is paid to the session account.
    pub async fn complete(&self, payload: TransitionPayload) -> Result<Receipt, ClientError> {
        let session = self.signing_session().await?;
        Ok(self
            .engine
            .complete(session.account(), &payload.receiver, payload.index)
            .await?)
    }

    /// The current account's shipment at `index`, or `None` when no account
    /// is available.
    pub async fn read(&self, index: u64) -> Result<Option<Shipment>, ClientError> {
        let Some(account) = self.negotiator.current_account().await else {
            debug!(index, "read without an account");
            return Ok(None);
        };
        Ok(Some(self.engine.read(&account, index).await?))
    }

    /// Every shipment, in creation order. Needs no session.
    pub async fn list_all(&self) -> Result<ShipmentSnapshot, ClientError> {
        Ok(self.engine.list_all().await?)
    }

    pub async fn count(&self, account: &AccountId) -> Result<u64, ClientError> {
        Ok(self.engine.count(account).await?)
    }

    /// Shipment count of the current account; zero when there is none.
    pub async fn my_count(&self) -> Result<u64, ClientError> {
        match self.negotiator.current_account().await {
            Some(account) => self.count(&account).await,
            None => Ok(0),
        }
    }

    pub async fn balance_of(&self, account: &AccountId) -> Result<Amount, ClientError> {
        Ok(self.engine.balance_of(account).await?)
    }

    pub async fn current_account(&self) -> Option<AccountId> {
        self.negotiator.current_account().await
    }

    pub async fn connect(&self) -> Option<AccountId> {
        self.negotiator.connect().await
    }

    pub fn disconnect(&self) {
        self.negotiator.disconnect();
    }

    pub async fn switch_account(&self) -> Option<AccountId> {
        self.negotiator.switch_account().await
    }
}
