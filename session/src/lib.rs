//! Session negotiation for mutating ledger calls.
//!
//! A [`Session`] binds an account to the ability to sign. The [`Negotiator`]
//! obtains one through a fixed fallback chain:
//! - silent check of an injected provider (unless forced)
//! - prompting authorization through the injected provider
//! - the external connector flow when nothing is injected
//! - a last re-check of the injected provider if the connector fails
//!
//! Once a session exists the negotiator follows the provider's
//! account/network notifications and invalidates or rebinds the session.

pub mod error;
pub mod negotiator;
pub mod provider;
pub mod session;

pub use error::{ProviderError, SessionError};
pub use negotiator::{Mode, Negotiator, Subscription};
pub use provider::{
    Connector, FixedProbe, Provider, ProviderEvent, ProviderProbe, ProviderSource, StaticProvider,
};
pub use session::{Capability, Origin, Session};
