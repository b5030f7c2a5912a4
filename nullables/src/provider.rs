//! Nullable providers: scripted identity providers, probe and connector.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shiptrack_session::{Connector, Provider, ProviderError, ProviderEvent, ProviderProbe, ProviderSource};
use shiptrack_types::AccountId;
use tokio::sync::broadcast;

/// A provider whose answers are scripted by the test.
///
/// Counts silent checks and prompts separately so tests can assert that a
/// flow never prompted.
pub struct NullProvider {
    name: String,
    authorized: Mutex<Vec<AccountId>>,
    silent_error: Mutex<Option<ProviderError>>,
    /// What a prompt returns. On success the accounts become authorized.
    prompt: Mutex<Result<Vec<AccountId>, ProviderError>>,
    silent_calls: AtomicUsize,
    prompt_calls: AtomicUsize,
    events: broadcast::Sender<ProviderEvent>,
}

impl NullProvider {
    fn build(name: &str, authorized: Vec<AccountId>, prompt: Result<Vec<AccountId>, ProviderError>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            name: name.to_string(),
            authorized: Mutex::new(authorized),
            silent_error: Mutex::new(None),
            prompt: Mutex::new(prompt),
            silent_calls: AtomicUsize::new(0),
            prompt_calls: AtomicUsize::new(0),
            events,
        }
    }

    /// Already authorized for `accounts`; a prompt returns the same accounts.
    pub fn authorized(accounts: Vec<AccountId>) -> Self {
        Self::build("null-authorized", accounts.clone(), Ok(accounts))
    }

    /// Nothing authorized yet; a prompt grants `accounts`.
    pub fn locked(accounts: Vec<AccountId>) -> Self {
        Self::build("null-locked", Vec::new(), Ok(accounts))
    }

    /// Nothing authorized; the user declines every prompt.
    pub fn rejecting() -> Self {
        Self::build("null-rejecting", Vec::new(), Err(ProviderError::UserRejected))
    }

    /// Make the silent check fail with `error`.
    pub fn fail_silent_check(&self, error: ProviderError) {
        *self.silent_error.lock().unwrap() = Some(error);
    }

    /// Script the next prompts.
    pub fn set_prompt(&self, result: Result<Vec<AccountId>, ProviderError>) {
        *self.prompt.lock().unwrap() = result;
    }

    /// Push a notification to subscribers.
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn silent_count(&self) -> usize {
        self.silent_calls.load(Ordering::SeqCst)
    }

    pub fn prompt_count(&self) -> usize {
        self.prompt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for NullProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authorized_accounts(&self) -> Result<Vec<AccountId>, ProviderError> {
        self.silent_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.silent_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.authorized.lock().unwrap().clone())
    }

    async fn request_authorization(&self) -> Result<Vec<AccountId>, ProviderError> {
        self.prompt_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.prompt.lock().unwrap().clone();
        if let Ok(accounts) = &result {
            *self.authorized.lock().unwrap() = accounts.clone();
        }
        result
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// A probe whose injected provider can appear and disappear mid-test.
pub struct NullProbe {
    injected: Mutex<Option<Arc<dyn Provider>>>,
    probes: AtomicUsize,
}

impl NullProbe {
    pub fn empty() -> Self {
        Self {
            injected: Mutex::new(None),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn injected(provider: Arc<dyn Provider>) -> Self {
        let probe = Self::empty();
        probe.inject(provider);
        probe
    }

    pub fn inject(&self, provider: Arc<dyn Provider>) {
        *self.injected.lock().unwrap() = Some(provider);
    }

    pub fn remove(&self) {
        self.injected.lock().unwrap().take();
    }

    /// How many times the environment was inspected.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl ProviderProbe for NullProbe {
    fn probe(&self) -> ProviderSource {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.injected.lock().unwrap().clone() {
            Some(provider) => ProviderSource::Injected(provider),
            None => ProviderSource::None,
        }
    }
}

/// A connector flow with a scripted outcome.
pub struct NullConnector {
    outcome: Result<Arc<dyn Provider>, ProviderError>,
    /// Injected into this probe while the flow runs, to simulate a provider
    /// showing up mid-flow.
    late_injection: Option<(Arc<NullProbe>, Arc<dyn Provider>)>,
    calls: AtomicUsize,
}

impl NullConnector {
    pub fn supplying(provider: Arc<dyn Provider>) -> Self {
        Self {
            outcome: Ok(provider),
            late_injection: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(ProviderError::Connector(reason.to_string())),
            late_injection: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// While connecting, inject `provider` into `probe`.
    pub fn injecting_into(mut self, probe: Arc<NullProbe>, provider: Arc<dyn Provider>) -> Self {
        self.late_injection = Some((probe, provider));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for NullConnector {
    async fn connect(&self) -> Result<Arc<dyn Provider>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((probe, provider)) = &self.late_injection {
            probe.inject(Arc::clone(provider));
        }
        self.outcome.clone()
    }
}
