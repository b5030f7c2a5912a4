use shiptrack_ledger::LedgerError;
use shiptrack_session::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("configuration error: {0}")]
    Config(String),
}
