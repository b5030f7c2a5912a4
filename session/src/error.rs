use thiserror::Error;

/// Failure reported by a provider or connector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The user declined the request (EIP-1193 code 4001).
    #[error("user rejected the request")]
    UserRejected,

    #[error("provider request failed: {0}")]
    Request(String),

    #[error("connector flow failed: {0}")]
    Connector(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The provider refused or failed to authorize an account.
    #[error("session denied: {0}")]
    SessionDenied(String),

    /// No provider could be obtained through any fallback path.
    #[error("no identity provider available: {0}")]
    SessionUnavailable(String),

    /// The session was invalidated by an account change or disconnect.
    #[error("session is no longer valid; negotiate again")]
    Invalidated,

    /// The session cannot sign mutating operations.
    #[error("session is read-only")]
    ReadOnly,

    #[error("session negotiation timed out")]
    TimedOut,
}
