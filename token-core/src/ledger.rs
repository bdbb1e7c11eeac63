//! Token ledger action handlers
//!
//! This module ties together storage, the host seam, and metrics into the
//! public operation surface: `create`, `setfee`, `issue`, `retire`,
//! `transfer`, `open`, `close`, `freeze`, `switchexempt`, `logfee`, plus
//! the read-only supply and balance queries.
//!
//! Every handler follows the same shape: authorization, input validation,
//! staging of row mutations against a transaction-local overlay, then a
//! single atomic commit. A failure anywhere drops the overlay, so no
//! partial update is ever observable. Notification and fee audit hooks run
//! after the commit and cannot abort it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use token_core::{AccountId, Amount, Config, Ledger, LocalHost, Symbol};
//!
//! fn main() -> token_core::Result<()> {
//!     let host = Arc::new(LocalHost::new());
//!     let ledger = Ledger::open(Config::default(), host.clone())?;
//!
//!     let issuer = AccountId::new("issuer");
//!     host.authorize(&AccountId::new("token.ledger"));
//!     host.authorize(&issuer);
//!
//!     let sym = Symbol::from_code("TOK", 4)?;
//!     ledger.create(&issuer, &Amount::new(10_000_000, sym))?;
//!     ledger.issue(&issuer, &Amount::new(1_000_000, sym), "genesis")?;
//!     Ok(())
//! }
//! ```

use crate::{
    fee::transfer_fee,
    host::Host,
    metrics::Metrics,
    storage::{Batch, Storage},
    types::{
        AccountId, AccountRecord, Amount, StatsRecord, Symbol, SymbolCode, DEFAULT_FEE_RATE,
        MAX_FEE_RATE,
    },
    Config, Error, Result,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Longest memo accepted, in bytes.
pub const MEMO_MAX_BYTES: usize = 256;

/// Main ledger interface
pub struct Ledger {
    /// Table storage
    storage: Arc<Storage>,

    /// Execution-environment seam
    host: Arc<dyn Host>,

    /// The ledger's own principal
    self_account: AccountId,

    /// Observability counters
    metrics: Metrics,

    /// Serializes the commit path. The host already serializes actions;
    /// the lock upholds that assumption for in-process embedders too.
    write_lock: Mutex<()>,
}

impl Ledger {
    /// Open ledger with configuration and a host seam.
    pub fn open(config: Config, host: Arc<dyn Host>) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let metrics = Metrics::new().map_err(|e| Error::Other(e.to_string()))?;
        let self_account = AccountId::new(config.ledger_account.clone());

        Ok(Self {
            storage,
            host,
            self_account,
            metrics,
            write_lock: Mutex::new(()),
        })
    }

    /// The principal whose authority gates `create` and `logfee`.
    pub fn self_account(&self) -> &AccountId {
        &self.self_account
    }

    /// Observability counters.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    // Actions

    /// Create a token: insert the stats row for `max_supply`'s symbol.
    ///
    /// Requires the ledger's own authority. The row starts at zero supply
    /// with the default fee rate and is never deleted afterwards.
    pub fn create(&self, issuer: &AccountId, max_supply: &Amount) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.require_auth(&self.self_account)?;

        let sym = max_supply.symbol();
        if !sym.is_valid() {
            return Err(Error::InvalidInput(format!("invalid symbol name {}", sym)));
        }
        if !max_supply.is_valid() {
            return Err(Error::InvalidInput(format!(
                "invalid supply {}",
                max_supply
            )));
        }
        if max_supply.amount() <= 0 {
            return Err(Error::InvalidInput(
                "max-supply must be positive".to_string(),
            ));
        }
        if self.storage.get_stats(sym.code())?.is_some() {
            return Err(Error::AlreadyExists(format!(
                "token with symbol {} already exists",
                sym.code()
            )));
        }

        let mut batch = Batch::default();
        batch.put_stats(
            sym.code(),
            StatsRecord {
                supply: Amount::zero(sym),
                max_supply: *max_supply,
                issuer: issuer.clone(),
                fee_rate: DEFAULT_FEE_RATE,
            },
        );
        self.storage.commit(batch)?;

        self.metrics.record_action();
        self.metrics.record_token_created();
        tracing::info!(symbol = %sym, issuer = %issuer, max_supply = %max_supply, "Token created");
        Ok(())
    }

    /// Update the transfer fee rate for a symbol. Issuer-only.
    pub fn setfee(&self, issuer: &AccountId, symbol: &Symbol, fee_rate: u8) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.require_auth(issuer)?;

        if fee_rate > MAX_FEE_RATE {
            return Err(Error::InvalidInput(format!(
                "fee rate {} exceeds maximum of {} basis points",
                fee_rate, MAX_FEE_RATE
            )));
        }
        if !symbol.is_valid() {
            return Err(Error::InvalidInput(format!(
                "invalid symbol name {}",
                symbol
            )));
        }

        let mut stats = self.get_stats_or_not_found(symbol.code())?;
        if stats.issuer != *issuer {
            return Err(Error::Unauthorized("issuer not authorized".to_string()));
        }

        stats.fee_rate = fee_rate;
        let mut batch = Batch::default();
        batch.put_stats(symbol.code(), stats);
        self.storage.commit(batch)?;

        self.metrics.record_action();
        tracing::info!(symbol = %symbol, fee_rate, "Fee rate updated");
        Ok(())
    }

    /// Issue `quantity` into circulation, credited to the issuer.
    ///
    /// Tokens are always issued to the issuer's own balance and
    /// redistributed via `transfer`.
    pub fn issue(&self, to: &AccountId, quantity: &Amount, memo: &str) -> Result<()> {
        let _guard = self.write_lock.lock();

        let sym = quantity.symbol();
        if !sym.is_valid() {
            return Err(Error::InvalidInput(format!("invalid symbol name {}", sym)));
        }
        check_memo(memo)?;

        let mut stats = self.storage.get_stats(sym.code())?.ok_or_else(|| {
            Error::NotFound(format!(
                "token with symbol {} does not exist, create token before issue",
                sym.code()
            ))
        })?;
        if *to != stats.issuer {
            return Err(Error::InvalidInput(
                "tokens can only be issued to issuer account".to_string(),
            ));
        }
        self.require_auth(&stats.issuer)?;

        self.check_quantity(quantity, &stats)?;
        if quantity.amount() > stats.max_supply.amount() - stats.supply.amount() {
            return Err(Error::SupplyExceeded(format!(
                "quantity {} exceeds available supply of {}",
                quantity,
                stats.max_supply.checked_sub(&stats.supply)?
            )));
        }
        stats.supply = stats.supply.checked_add(quantity)?;

        let issuer = stats.issuer.clone();
        let mut tx = TxState::new(&self.storage);
        tx.add_balance(&issuer, quantity, &issuer)?;

        let mut batch = tx.into_batch();
        batch.put_stats(sym.code(), stats);
        self.storage.commit(batch)?;

        self.metrics.record_action();
        tracing::info!(quantity = %quantity, memo, "Tokens issued");
        Ok(())
    }

    /// Retire `quantity` from circulation, debited from the issuer.
    ///
    /// The inverse of `issue`. Supply carries no explicit floor; the
    /// issuer's non-negative balance bounds what can be retired.
    pub fn retire(&self, quantity: &Amount, memo: &str) -> Result<()> {
        let _guard = self.write_lock.lock();

        let sym = quantity.symbol();
        if !sym.is_valid() {
            return Err(Error::InvalidInput(format!("invalid symbol name {}", sym)));
        }
        check_memo(memo)?;

        let mut stats = self.get_stats_or_not_found(sym.code())?;
        self.require_auth(&stats.issuer)?;

        self.check_quantity(quantity, &stats)?;
        stats.supply = stats.supply.checked_sub(quantity)?;

        let issuer = stats.issuer.clone();
        let mut tx = TxState::new(&self.storage);
        tx.sub_balance(&issuer, quantity)?;

        let mut batch = tx.into_batch();
        batch.put_stats(sym.code(), stats);
        self.storage.commit(batch)?;

        self.metrics.record_action();
        tracing::info!(quantity = %quantity, memo, "Tokens retired");
        Ok(())
    }

    /// Transfer `quantity` from `from` to `to`, routing the transfer fee
    /// to the symbol's issuer.
    ///
    /// The fee is charged on top of the quantity for ordinary senders and
    /// deducted from the credited quantity when the sender is fee-exempt;
    /// either way the issuer receives it. A newly created recipient row is
    /// paid for by the recipient when it co-authorized the call, otherwise
    /// by the sender.
    pub fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        quantity: &Amount,
        memo: &str,
    ) -> Result<()> {
        let _guard = self.write_lock.lock();

        if from == to {
            return Err(Error::SelfTransfer);
        }
        self.require_auth(from)?;
        if !self.host.account_exists(to) {
            return Err(Error::RecipientNotFound(format!(
                "to account {} does not exist",
                to
            )));
        }

        let code = quantity.symbol().code();
        let stats = self.storage.get_stats(code)?.ok_or_else(|| {
            Error::NotFound(format!("no token with symbol {}", code))
        })?;

        self.check_quantity(quantity, &stats)?;
        check_memo(memo)?;

        let payer = if self.host.is_authorized(to) {
            to.clone()
        } else {
            from.clone()
        };

        let fee = transfer_fee(quantity, stats.fee_rate);
        let is_exempt = self.storage.is_exempt(code, from)?;

        let mut tx = TxState::new(&self.storage);
        let fee_payer = if is_exempt {
            tx.sub_balance(from, quantity)?;
            tx.add_balance(to, &quantity.checked_sub(&fee)?, &payer)?;
            to.clone()
        } else {
            tx.sub_balance(from, &quantity.checked_add(&fee)?)?;
            tx.add_balance(to, quantity, &payer)?;
            from.clone()
        };
        tx.add_balance(&stats.issuer, &fee, &payer)?;

        self.storage.commit(tx.into_batch())?;

        self.metrics.record_action();
        self.metrics.record_transfer();
        tracing::info!(from = %from, to = %to, quantity = %quantity, fee = %fee, memo, "Transfer applied");

        self.host.notify(from);
        self.host.notify(to);
        self.audit_fee(&fee_payer, &fee);
        Ok(())
    }

    /// Open a zero-balance row for `(owner, symbol)` at `ram_payer`'s
    /// expense. Idempotent: an already-open row is left untouched.
    pub fn open(&self, owner: &AccountId, symbol: &Symbol, ram_payer: &AccountId) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.require_auth(ram_payer)?;

        if !self.host.account_exists(owner) {
            return Err(Error::NotFound(format!(
                "owner account {} does not exist",
                owner
            )));
        }
        let stats = self.get_stats_or_not_found(symbol.code())?;
        if stats.supply.symbol() != *symbol {
            return Err(Error::InvalidInput("symbol precision mismatch".to_string()));
        }

        if self.storage.get_account(owner, symbol.code())?.is_none() {
            let mut batch = Batch::default();
            batch.put_account(
                owner.clone(),
                symbol.code(),
                AccountRecord {
                    balance: Amount::zero(*symbol),
                    is_frozen: false,
                },
            );
            self.storage.commit(batch)?;
            tracing::debug!(owner = %owner, symbol = %symbol, payer = %ram_payer, "Balance row opened");
        }

        self.metrics.record_action();
        Ok(())
    }

    /// Delete the `(owner, symbol)` row. Owner-only; the balance must be
    /// exactly zero.
    pub fn close(&self, owner: &AccountId, symbol: &Symbol) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.require_auth(owner)?;

        let record = self
            .storage
            .get_account(owner, symbol.code())?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "balance row for {} already deleted or never existed",
                    owner
                ))
            })?;
        if record.balance.amount() != 0 {
            return Err(Error::BalanceNotZero(format!(
                "cannot close {}: balance is {}",
                owner, record.balance
            )));
        }

        let mut batch = Batch::default();
        batch.erase_account(owner.clone(), symbol.code());
        self.storage.commit(batch)?;

        self.metrics.record_action();
        tracing::debug!(owner = %owner, symbol = %symbol, "Balance row closed");
        Ok(())
    }

    /// Set the frozen flag on an existing account row. Issuer-only.
    ///
    /// There is no pre-freeze: the row must already exist.
    pub fn freeze(&self, account: &AccountId, symbol: &Symbol, status: bool) -> Result<()> {
        let _guard = self.write_lock.lock();

        let stats = self.get_stats_or_not_found(symbol.code())?;
        self.require_auth(&stats.issuer)?;

        let mut record = self
            .storage
            .get_account(account, symbol.code())?
            .ok_or_else(|| Error::NotFound(format!("account {} not found", account)))?;
        record.is_frozen = status;

        let mut batch = Batch::default();
        batch.put_account(account.clone(), symbol.code(), record);
        self.storage.commit(batch)?;

        self.metrics.record_action();
        tracing::info!(account = %account, symbol = %symbol, status, "Account freeze status updated");
        Ok(())
    }

    /// Toggle `account`'s fee exemption for a symbol. Issuer-only.
    pub fn switchexempt(
        &self,
        issuer: &AccountId,
        symbol: &Symbol,
        account: &AccountId,
    ) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.require_auth(issuer)?;

        if !symbol.is_valid() {
            return Err(Error::InvalidInput(format!(
                "invalid symbol name {}",
                symbol
            )));
        }
        if !self.host.account_exists(account) {
            return Err(Error::InvalidInput(format!("invalid account {}", account)));
        }

        let stats = self.get_stats_or_not_found(symbol.code())?;
        if stats.issuer != *issuer {
            return Err(Error::Unauthorized("issuer not authorized".to_string()));
        }

        let mut batch = Batch::default();
        let now_exempt = if self.storage.is_exempt(symbol.code(), account)? {
            batch.erase_exempt(symbol.code(), account.clone());
            false
        } else {
            batch.put_exempt(symbol.code(), account.clone());
            true
        };
        self.storage.commit(batch)?;

        self.metrics.record_action();
        tracing::info!(account = %account, symbol = %symbol, now_exempt, "Fee exemption toggled");
        Ok(())
    }

    /// Emit a fee audit record. No state change; requires the ledger's own
    /// authority.
    pub fn logfee(&self, account: &AccountId, fee: &Amount) -> Result<()> {
        self.require_auth(&self.self_account)?;
        self.audit_fee(account, fee);
        Ok(())
    }

    // Queries

    /// Current circulating supply of a symbol.
    pub fn get_supply(&self, code: SymbolCode) -> Result<Amount> {
        self.storage
            .get_stats(code)?
            .map(|stats| stats.supply)
            .ok_or_else(|| Error::NotFound(format!("no token with symbol {}", code)))
    }

    /// Current balance of `(owner, symbol)`.
    pub fn get_balance(&self, owner: &AccountId, code: SymbolCode) -> Result<Amount> {
        self.storage
            .get_account(owner, code)?
            .map(|record| record.balance)
            .ok_or_else(|| {
                Error::NoBalanceRecord(format!(
                    "no balance record for {} with symbol {}",
                    owner, code
                ))
            })
    }

    /// Whether `owner` currently skips sender-side fee deduction.
    pub fn is_fee_exempt(&self, owner: &AccountId, code: SymbolCode) -> Result<bool> {
        self.storage.is_exempt(code, owner)
    }

    // Helpers

    fn require_auth(&self, principal: &AccountId) -> Result<()> {
        if self.host.is_authorized(principal) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "missing authority of {}",
                principal
            )))
        }
    }

    fn get_stats_or_not_found(&self, code: SymbolCode) -> Result<StatsRecord> {
        self.storage
            .get_stats(code)?
            .ok_or_else(|| Error::NotFound(format!("token with symbol {} does not exist", code)))
    }

    fn check_quantity(&self, quantity: &Amount, stats: &StatsRecord) -> Result<()> {
        if !quantity.is_valid() {
            return Err(Error::InvalidInput(format!(
                "invalid quantity {}",
                quantity
            )));
        }
        if quantity.amount() <= 0 {
            return Err(Error::InvalidInput(
                "quantity must be positive".to_string(),
            ));
        }
        if quantity.symbol() != stats.supply.symbol() {
            return Err(Error::InvalidInput("symbol precision mismatch".to_string()));
        }
        Ok(())
    }

    fn audit_fee(&self, account: &AccountId, fee: &Amount) {
        self.metrics.record_fee_event();
        tracing::info!(account = %account, fee = %fee, "Transfer fee recorded");
    }
}

/// Transaction-local overlay of the account table.
///
/// Reads fall through to storage unless the row was already touched in
/// this action; writes land in the overlay only. On success the overlay
/// becomes part of one atomic batch; on failure it is simply dropped.
struct TxState<'a> {
    storage: &'a Storage,
    accounts: BTreeMap<(AccountId, SymbolCode), AccountRecord>,
}

impl<'a> TxState<'a> {
    fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            accounts: BTreeMap::new(),
        }
    }

    fn get(&self, owner: &AccountId, code: SymbolCode) -> Result<Option<AccountRecord>> {
        if let Some(record) = self.accounts.get(&(owner.clone(), code)) {
            return Ok(Some(record.clone()));
        }
        self.storage.get_account(owner, code)
    }

    /// Debit `value` from `owner`. The row must exist, be unfrozen, and
    /// hold at least `value`.
    fn sub_balance(&mut self, owner: &AccountId, value: &Amount) -> Result<()> {
        let code = value.symbol().code();
        let record = self.get(owner, code)?.ok_or_else(|| {
            Error::NoBalanceRecord(format!(
                "no balance record for {} with symbol {}",
                owner, code
            ))
        })?;
        if record.balance.amount() < value.amount() {
            return Err(Error::InsufficientBalance(format!(
                "{} holds {}, needs {}",
                owner, record.balance, value
            )));
        }
        if record.is_frozen {
            return Err(Error::FrozenAccount(format!(
                "sender account {} is frozen",
                owner
            )));
        }
        let balance = record.balance.checked_sub(value)?;
        self.accounts.insert(
            (owner.clone(), code),
            AccountRecord {
                balance,
                is_frozen: record.is_frozen,
            },
        );
        Ok(())
    }

    /// Credit `value` to `owner`, creating the row at `payer`'s expense if
    /// absent. An existing frozen row rejects the credit.
    fn add_balance(&mut self, owner: &AccountId, value: &Amount, payer: &AccountId) -> Result<()> {
        let code = value.symbol().code();
        match self.get(owner, code)? {
            None => {
                self.accounts.insert(
                    (owner.clone(), code),
                    AccountRecord {
                        balance: *value,
                        is_frozen: false,
                    },
                );
                tracing::debug!(owner = %owner, payer = %payer, "Balance row created");
            }
            Some(record) => {
                if record.is_frozen {
                    return Err(Error::FrozenAccount(format!(
                        "receiver account {} is frozen",
                        owner
                    )));
                }
                let balance = record.balance.checked_add(value)?;
                self.accounts.insert(
                    (owner.clone(), code),
                    AccountRecord {
                        balance,
                        is_frozen: record.is_frozen,
                    },
                );
            }
        }
        Ok(())
    }

    fn into_batch(self) -> Batch {
        let mut batch = Batch::default();
        for ((owner, code), record) in self.accounts {
            batch.put_account(owner, code, record);
        }
        batch
    }
}

fn check_memo(memo: &str) -> Result<()> {
    if memo.len() > MEMO_MAX_BYTES {
        return Err(Error::InvalidInput(format!(
            "memo has more than {} bytes",
            MEMO_MAX_BYTES
        )));
    }
    Ok(())
}
