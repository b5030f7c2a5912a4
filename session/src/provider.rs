//! The identity/signing provider surface the negotiator consumes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shiptrack_types::AccountId;
use tokio::sync::broadcast;

use crate::error::ProviderError;

/// Notifications a provider pushes to its subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The set of authorized accounts changed. Empty means none are left.
    AccountsChanged(Vec<AccountId>),
    /// The provider switched to another chain.
    ChainChanged(u64),
}

/// An external component that can authorize accounts and sign on their behalf.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Accounts already authorized for this client. Never prompts.
    async fn authorized_accounts(&self) -> Result<Vec<AccountId>, ProviderError>;

    /// Ask the user to authorize accounts. May prompt.
    async fn request_authorization(&self) -> Result<Vec<AccountId>, ProviderError>;

    /// Ask the user to pick accounts again (account switching).
    async fn request_permissions(&self) -> Result<Vec<AccountId>, ProviderError> {
        self.request_authorization().await
    }

    /// Subscribe to account/network notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// The external selection flow used when no provider is injected.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn Provider>, ProviderError>;
}

/// Where a provider comes from.
#[derive(Clone)]
pub enum ProviderSource {
    /// Injected into the runtime environment.
    Injected(Arc<dyn Provider>),
    /// Obtained through a connector flow.
    ConnectorSupplied(Arc<dyn Provider>),
    None,
}

impl ProviderSource {
    pub fn provider(&self) -> Option<&Arc<dyn Provider>> {
        match self {
            Self::Injected(p) | Self::ConnectorSupplied(p) => Some(p),
            Self::None => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Inspects the runtime environment for a provider.
///
/// Probed afresh at every step of negotiation, so a provider that appears
/// mid-flow is picked up.
pub trait ProviderProbe: Send + Sync {
    fn probe(&self) -> ProviderSource;
}

/// A probe with a fixed answer.
pub struct FixedProbe {
    source: ProviderSource,
}

impl FixedProbe {
    pub fn injected(provider: Arc<dyn Provider>) -> Self {
        Self {
            source: ProviderSource::Injected(provider),
        }
    }

    pub fn none() -> Self {
        Self {
            source: ProviderSource::None,
        }
    }
}

impl ProviderProbe for FixedProbe {
    fn probe(&self) -> ProviderSource {
        self.source.clone()
    }
}

/// A provider over a fixed list of unlocked accounts, as exposed by a local
/// development node. Every account is authorized up front; nothing prompts.
pub struct StaticProvider {
    accounts: Mutex<Vec<AccountId>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl StaticProvider {
    pub fn new(accounts: Vec<AccountId>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts: Mutex::new(accounts),
            events,
        }
    }

    /// Replace the unlocked accounts and notify subscribers.
    pub fn set_accounts(&self, accounts: Vec<AccountId>) {
        *self.accounts.lock().unwrap_or_else(|e| e.into_inner()) = accounts.clone();
        let _ = self.events.send(ProviderEvent::AccountsChanged(accounts));
    }

    fn snapshot(&self) -> Vec<AccountId> {
        self.accounts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Provider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn authorized_accounts(&self) -> Result<Vec<AccountId>, ProviderError> {
        Ok(self.snapshot())
    }

    async fn request_authorization(&self) -> Result<Vec<AccountId>, ProviderError> {
        let accounts = self.snapshot();
        if accounts.is_empty() {
            return Err(ProviderError::Request("no unlocked accounts".into()));
        }
        Ok(accounts)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
