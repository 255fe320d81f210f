use thiserror::Error;

use crate::RejectionReason;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Order rejected: {reason}")]
    OrderRejected { reason: RejectionReason },

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
