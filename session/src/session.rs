//! The session value handed to callers.

use std::fmt;
use std::sync::Arc;

use shiptrack_types::AccountId;

use crate::provider::Provider;

/// What a session is allowed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    ReadOnly,
    Sign,
}

/// Which path of the fallback chain produced the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Injected,
    ConnectorSupplied,
}

/// An authenticated context: an account plus what it may do.
///
/// Sessions are cheap to clone and are never persisted. A session stays
/// usable only while the negotiator that produced it reports it live.
#[derive(Clone)]
pub struct Session {
    account: AccountId,
    capability: Capability,
    origin: Origin,
    pub(crate) generation: u64,
    provider: Arc<dyn Provider>,
}

impl Session {
    pub(crate) fn new(
        account: AccountId,
        capability: Capability,
        origin: Origin,
        provider: Arc<dyn Provider>,
    ) -> Self {
        Self {
            account,
            capability,
            origin,
            generation: 0,
            provider,
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn can_sign(&self) -> bool {
        self.capability == Capability::Sign
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// The provider the session is bound to.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub(crate) fn rebind(&mut self, account: AccountId) {
        self.account = account;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("capability", &self.capability)
            .field("origin", &self.origin)
            .field("generation", &self.generation)
            .field("provider", &self.provider.name())
            .finish()
    }
}
