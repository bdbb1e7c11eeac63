//! Error types for the token ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Every variant aborts the whole operation; there is no local recovery and
/// no partial state change. The reason is returned verbatim to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed symbol, amount, or memo
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authorization predicate not satisfied
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Missing stats, account, or exemption row
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate token creation
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Issue would push supply past the cap
    #[error("Quantity exceeds available supply: {0}")]
    SupplyExceeded(String),

    /// Debit larger than the account balance
    #[error("Overdrawn balance: {0}")]
    InsufficientBalance(String),

    /// Close attempted on an account still holding funds
    #[error("Balance is not zero: {0}")]
    BalanceNotZero(String),

    /// Debit or credit against a frozen account
    #[error("Account is frozen: {0}")]
    FrozenAccount(String),

    /// Transfer with identical sender and recipient
    #[error("Cannot transfer to self")]
    SelfTransfer,

    /// Transfer recipient unknown to the host
    #[error("Recipient account does not exist: {0}")]
    RecipientNotFound(String),

    /// Sender holds no balance row for the symbol
    #[error("No balance record found: {0}")]
    NoBalanceRecord(String),

    /// Amount arithmetic overflow
    #[error("Amount overflow: {0}")]
    Overflow(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
