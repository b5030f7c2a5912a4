//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid account id: {0}")]
    InvalidAccount(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount has more than {max} fractional digits")]
    TooPrecise { max: u32 },

    #[error("amount overflows u128 base units")]
    AmountOverflow,

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}
