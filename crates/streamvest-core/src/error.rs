use crate::types::{Principal, Shares, StreamId};
use thiserror::Error;

/// Streaming engine errors.
///
/// Validation and authorization failures are rejected before any state
/// change; economic failures are rolled back atomically by the engine's
/// transaction boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    // Validation.
    #[error("stream start time must not be in the past")]
    InvalidStartTime,

    #[error("stream end time must be after the start time")]
    InvalidEndTime,

    #[error("deposit amount must be greater than zero")]
    ZeroDeposit,

    #[error("withdrawal shares must be greater than zero")]
    ZeroWithdrawal,

    #[error("principal must not be null")]
    NullPrincipal,

    #[error("stream {0} does not exist")]
    StreamNotFound(StreamId),

    // Authorization.
    #[error("caller is not the stream sender")]
    NotSender,

    #[error("caller is neither the stream sender nor its recipient")]
    NotSenderOrRecipient,

    #[error("caller is not the stream recipient")]
    NotRecipient,

    #[error("caller is not the owner")]
    NotOwner,

    #[error("settlement agent '{0}' is not whitelisted")]
    UnknownAgent(Principal),

    // Economic.
    #[error("withdrawal of {requested} shares exceeds the {available} currently withdrawable")]
    Overdraw { requested: Shares, available: Shares },

    #[error("conversion delivered {received}, below the required minimum of {minimum}")]
    InsufficientOutput { received: u64, minimum: u64 },

    // Infrastructure.
    #[error("vault error: {0}")]
    Vault(String),

    #[error("audit log error: {0}")]
    Ledger(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
