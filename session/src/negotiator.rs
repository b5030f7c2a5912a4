//! The session negotiation protocol and liveness tracking.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use shiptrack_types::AccountId;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, SessionError};
use crate::provider::{Connector, Provider, ProviderEvent, ProviderProbe, ProviderSource};
use crate::session::{Capability, Origin, Session};

/// How hard to try when negotiating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Reuse an existing authorization without prompting when one exists.
    Silent,
    /// Skip the silent check and ask the provider explicitly.
    Forced,
}

#[derive(Default)]
struct State {
    current: Option<Session>,
    /// Bumped on every install, rebind and invalidation.
    generation: u64,
    /// Set by an explicit disconnect; suppresses silent account discovery.
    disconnected: bool,
    last_chain: Option<u64>,
}

/// State shared with the subscription task.
#[derive(Default)]
struct Shared {
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply(&self, event: &ProviderEvent) {
        let mut state = self.lock();
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                Some(first) => {
                    state.disconnected = false;
                    state.generation += 1;
                    let generation = state.generation;
                    if let Some(session) = state.current.as_mut() {
                        info!(account = %first, "account changed, session rebound");
                        session.rebind(first.clone());
                        session.generation = generation;
                    }
                }
                None => {
                    info!("provider reports no accounts, session invalidated");
                    state.current = None;
                    state.generation += 1;
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                // Observed only; the session stays valid across chain switches.
                debug!(chain_id, "chain changed");
                state.last_chain = Some(*chain_id);
            }
        }
    }

    fn invalidate(&self) {
        let mut state = self.lock();
        state.current = None;
        state.generation += 1;
    }
}

/// Handle on the task that forwards provider notifications to the
/// negotiator. Dropping it cancels the task.
pub struct Subscription {
    provider: Arc<dyn Provider>,
    task: JoinHandle<()>,
}

impl Subscription {
    fn watch(provider: Arc<dyn Provider>, shared: Arc<Shared>) -> Self {
        let mut rx = provider.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => shared.apply(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        // Missed notifications may have included an account change.
                        warn!(skipped, "provider notifications lagged, session invalidated");
                        shared.invalidate();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Self { provider, task }
    }

    fn watches(&self, provider: &Arc<dyn Provider>) -> bool {
        same_provider(&self.provider, provider)
    }

    /// Whether the forwarding task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn same_provider(a: &Arc<dyn Provider>, b: &Arc<dyn Provider>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Obtains sessions and keeps track of whether they are still valid.
///
/// Owns at most one provider subscription at a time; it is replaced when a
/// session is established through a different provider and torn down by
/// [`Negotiator::shutdown`] or [`Negotiator::disconnect`].
pub struct Negotiator {
    probe: Arc<dyn ProviderProbe>,
    connector: Option<Arc<dyn Connector>>,
    shared: Arc<Shared>,
    subscription: Mutex<Option<Subscription>>,
}

impl Negotiator {
    pub fn new(probe: Arc<dyn ProviderProbe>) -> Self {
        Self {
            probe,
            connector: None,
            shared: Arc::new(Shared::default()),
            subscription: Mutex::new(None),
        }
    }

    /// Use `connector` when no provider is injected.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Produce a session able to sign.
    ///
    /// Never returns without a session: every failure is reported as
    /// [`SessionError::SessionDenied`] or [`SessionError::SessionUnavailable`].
    pub async fn negotiate(&self, mode: Mode) -> Result<Session, SessionError> {
        let session = match self.probe.probe() {
            ProviderSource::Injected(provider) => self.via_injected(provider, mode).await?,
            ProviderSource::ConnectorSupplied(provider) => {
                authorize(provider, Origin::ConnectorSupplied)
                    .await
                    .map_err(denied)?
            }
            ProviderSource::None => self.via_connector().await?,
        };
        Ok(self.install(session))
    }

    /// [`Negotiator::negotiate`] bounded by a caller deadline.
    pub async fn negotiate_within(&self, mode: Mode, deadline: Duration) -> Result<Session, SessionError> {
        tokio::time::timeout(deadline, self.negotiate(mode))
            .await
            .map_err(|_| SessionError::TimedOut)?
    }

    async fn via_injected(&self, provider: Arc<dyn Provider>, mode: Mode) -> Result<Session, SessionError> {
        if mode == Mode::Silent {
            match provider.authorized_accounts().await {
                Ok(accounts) => {
                    if let Some(account) = accounts.into_iter().next() {
                        debug!(%account, provider = provider.name(), "reusing authorized account");
                        return Ok(Session::new(account, Capability::Sign, Origin::Injected, provider));
                    }
                }
                Err(e) => warn!(error = %e, "silent account check failed"),
            }
        }
        authorize(provider, Origin::Injected).await.map_err(denied)
    }

    async fn via_connector(&self) -> Result<Session, SessionError> {
        let original = match self.connector.as_ref() {
            Some(connector) => match connector.connect().await {
                Ok(provider) => match authorize(provider, Origin::ConnectorSupplied).await {
                    Ok(session) => return Ok(session),
                    Err(e) => e,
                },
                Err(e) => e,
            },
            None => ProviderError::Connector("no connector configured".into()),
        };
        warn!(error = %original, "connector flow failed, re-checking for an injected provider");

        if let ProviderSource::Injected(provider) = self.probe.probe() {
            match authorize(provider, Origin::Injected).await {
                Ok(session) => return Ok(session),
                Err(e) => warn!(error = %e, "fallback authorization failed"),
            }
        }
        Err(SessionError::SessionUnavailable(original.to_string()))
    }

    fn install(&self, mut session: Session) -> Session {
        {
            let mut state = self.shared.lock();
            state.generation += 1;
            state.disconnected = false;
            session.generation = state.generation;
            state.current = Some(session.clone());
        }
        let mut subscription = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        let watching = subscription
            .as_ref()
            .is_some_and(|s| s.watches(session.provider()) && !s.is_finished());
        if !watching {
            *subscription = Some(Subscription::watch(
                Arc::clone(session.provider()),
                Arc::clone(&self.shared),
            ));
        }
        info!(account = %session.account(), origin = ?session.origin(), "session established");
        session
    }

    /// Whether `session` is still the negotiator's current session.
    pub fn is_live(&self, session: &Session) -> bool {
        self.shared
            .lock()
            .current
            .as_ref()
            .is_some_and(|c| c.generation == session.generation && c.account() == session.account())
    }

    /// The current session, if any.
    pub fn current(&self) -> Option<Session> {
        self.shared.lock().current.clone()
    }

    /// Last chain id reported by the provider.
    pub fn last_chain(&self) -> Option<u64> {
        self.shared.lock().last_chain
    }

    /// Best-effort, non-prompting lookup of the active account.
    ///
    /// Returns `None` after an explicit disconnect, when no provider is
    /// reachable, or when the provider reports an error.
    pub async fn current_account(&self) -> Option<AccountId> {
        if self.shared.lock().disconnected {
            return None;
        }
        match self.probe.probe().provider() {
            Some(provider) => match provider.authorized_accounts().await {
                Ok(accounts) => accounts.into_iter().next(),
                Err(e) => {
                    debug!(error = %e, "silent account check failed");
                    None
                }
            },
            None => self.current().map(|s| s.account().clone()),
        }
    }

    /// A read-only session for the active account, without prompting.
    pub async fn observe(&self) -> Option<Session> {
        let account = self.current_account().await?;
        let (origin, provider) = match self.probe.probe() {
            ProviderSource::Injected(p) => (Origin::Injected, p),
            ProviderSource::ConnectorSupplied(p) => (Origin::ConnectorSupplied, p),
            ProviderSource::None => {
                let current = self.current()?;
                (current.origin(), Arc::clone(current.provider()))
            }
        };
        Some(Session::new(account, Capability::ReadOnly, origin, provider))
    }

    /// Prompt the injected provider for an account.
    ///
    /// Returns `None` when nothing is injected or the user declines.
    pub async fn connect(&self) -> Option<AccountId> {
        let ProviderSource::Injected(provider) = self.probe.probe() else {
            warn!("no injected provider to connect to");
            return None;
        };
        match authorize(provider, Origin::Injected).await {
            Ok(session) => Some(self.install(session).account().clone()),
            Err(e) => {
                warn!(error = %e, "connect failed");
                None
            }
        }
    }

    /// Forget the session and stop discovering accounts silently until the
    /// next explicit connect or negotiation.
    pub fn disconnect(&self) {
        {
            let mut state = self.shared.lock();
            state.current = None;
            state.generation += 1;
            state.disconnected = true;
        }
        self.shutdown();
        info!("disconnected");
    }

    /// Ask the injected provider to switch accounts.
    pub async fn switch_account(&self) -> Option<AccountId> {
        let ProviderSource::Injected(provider) = self.probe.probe() else {
            return None;
        };
        match provider.request_permissions().await {
            Ok(accounts) => {
                self.apply_event(&ProviderEvent::AccountsChanged(accounts.clone()));
                accounts.into_iter().next()
            }
            Err(e) => {
                warn!(error = %e, "account switch failed");
                None
            }
        }
    }

    /// Feed a provider notification in directly.
    pub fn apply_event(&self, event: &ProviderEvent) {
        self.shared.apply(event);
    }

    /// Tear down the provider subscription.
    pub fn shutdown(&self) {
        self.subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    /// Whether a provider subscription is active.
    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|s| !s.is_finished())
    }
}

impl Drop for Negotiator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn authorize(provider: Arc<dyn Provider>, origin: Origin) -> Result<Session, ProviderError> {
    let accounts = provider.request_authorization().await?;
    let account = accounts
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Request("provider returned no accounts".into()))?;
    Ok(Session::new(account, Capability::Sign, origin, provider))
}

fn denied(e: ProviderError) -> SessionError {
    SessionError::SessionDenied(e.to_string())
}
