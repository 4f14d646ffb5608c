//! Error types for minibank

use crate::common::Money;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Protocol Errors ===
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("missing arguments for {0}")]
    MissingArguments(&'static str),

    #[error("invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    // === Ledger Errors ===
    #[error("account not found: {0}")]
    AccountNotFound(u64),

    #[error("source account not found: {0}")]
    SourceNotFound(u64),

    #[error("destination account not found: {0}")]
    DestinationNotFound(u64),

    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("source and destination accounts must differ")]
    SameAccount,

    #[error("insufficient funds: available {available}")]
    InsufficientFunds { available: Money },

    // === Dispatch Errors ===
    #[error("no node available")]
    NoNodeAvailable,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("empty response from node")]
    EmptyResponse,

    #[error("task timed out")]
    TaskTimeout,

    // === Data Errors ===
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    // === Config Errors ===
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("internal error: {0}")]
    Internal(String),
}
