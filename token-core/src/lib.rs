//! TokenRail Token Core
//!
//! Fungible-token ledger engine: per-account balances and per-symbol
//! supply statistics, with invariant-preserving transitions over both and
//! a fee/exemption overlay on transfers.
//!
//! # Architecture
//!
//! - **Two tables + overlay**: `stat` rows (supply, cap, issuer, fee rate)
//!   and `accounts` rows (balance, frozen flag), plus a presence-only
//!   fee-exemption table
//! - **Single writer**: the host serializes actions; a commit lock upholds
//!   the assumption for in-process embedders
//! - **Atomic actions**: validate against a transaction-local overlay,
//!   then commit one write batch - or nothing
//! - **Host seam**: authorization, account existence, and post-commit
//!   notification are delegated to the embedding runtime
//!
//! # Invariants
//!
//! - `0 <= supply <= max_supply` for every symbol
//! - `balance >= 0` for every account row
//! - Transfers conserve value: debits equal credits, and the fee always
//!   accrues to the symbol's issuer
//! - A failed action leaves no partial state, even transiently

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod error;
pub mod fee;
pub mod host;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use host::{Host, LocalHost};
pub use ledger::Ledger;
pub use types::{
    AccountId, AccountRecord, Amount, StatsRecord, Symbol, SymbolCode,
};
