//! Core types for the token ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (raw `i64` fixed-point, no floats)
//! - Validation at the action boundary (`is_valid` mirrors how the
//!   handlers check inputs; construction itself is cheap and infallible
//!   except where parsing is involved)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest representable amount magnitude.
pub const MAX_AMOUNT: i64 = (1 << 62) - 1;

/// Highest decimal precision a symbol may carry.
pub const MAX_PRECISION: u8 = 18;

/// Fee rate assigned to a token at creation, in basis points.
pub const DEFAULT_FEE_RATE: u8 = 10;

/// Highest fee rate an issuer may set (0.49%).
pub const MAX_FEE_RATE: u8 = 49;

/// Token identifier: 1-7 uppercase `A-Z` characters packed into a `u64`.
///
/// The packed value doubles as the table key for per-symbol rows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SymbolCode(u64);

impl SymbolCode {
    /// Parse a symbol code from its string form.
    pub fn new(code: &str) -> Result<Self> {
        if code.is_empty() || code.len() > 7 {
            return Err(Error::InvalidInput(format!(
                "invalid symbol name: {}",
                code
            )));
        }
        let mut raw = 0u64;
        for (i, b) in code.bytes().enumerate() {
            if !b.is_ascii_uppercase() {
                return Err(Error::InvalidInput(format!(
                    "invalid symbol name: {}",
                    code
                )));
            }
            raw |= u64::from(b) << (8 * i);
        }
        Ok(Self(raw))
    }

    /// Reconstruct from a packed value, e.g. a table key.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Packed value, used as the primary key of per-symbol rows.
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Whether the packed value decodes to a well-formed code.
    pub fn is_valid(&self) -> bool {
        let mut raw = self.0;
        if raw == 0 {
            return false;
        }
        while raw > 0 {
            let b = (raw & 0xff) as u8;
            if !b.is_ascii_uppercase() {
                return false;
            }
            raw >>= 8;
        }
        true
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = self.0;
        while raw > 0 {
            write!(f, "{}", (raw & 0xff) as u8 as char)?;
            raw >>= 8;
        }
        Ok(())
    }
}

/// Token identifier plus fixed decimal precision.
///
/// Two symbols are equal only if both code and precision match; a quantity
/// of `4,TOK` never mixes with `2,TOK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    code: SymbolCode,
    precision: u8,
}

impl Symbol {
    /// Create a symbol from a code and decimal precision.
    pub fn new(code: SymbolCode, precision: u8) -> Self {
        Self { code, precision }
    }

    /// Parse from `"TOK"` plus precision.
    pub fn from_code(code: &str, precision: u8) -> Result<Self> {
        Ok(Self::new(SymbolCode::new(code)?, precision))
    }

    /// The symbol code.
    pub fn code(&self) -> SymbolCode {
        self.code
    }

    /// Decimal precision of amounts in this symbol.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Whether code and precision are both well-formed.
    pub fn is_valid(&self) -> bool {
        self.code.is_valid() && self.precision <= MAX_PRECISION
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

/// Signed fixed-point quantity tied to a symbol.
///
/// The raw `amount` is scaled by the symbol's precision: `1000000` at
/// precision 4 renders as `100.0000`. Arithmetic requires matching symbols
/// and fails on overflow past [`MAX_AMOUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    amount: i64,
    symbol: Symbol,
}

impl Amount {
    /// Create an amount. Validity is checked at the action boundary via
    /// [`Amount::is_valid`], not here.
    pub fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    /// Zero in the given symbol.
    pub fn zero(symbol: Symbol) -> Self {
        Self::new(0, symbol)
    }

    /// Raw precision-scaled value.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// The symbol this amount is denominated in.
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Whether the magnitude is representable and the symbol well-formed.
    pub fn is_valid(&self) -> bool {
        self.symbol.is_valid()
            && self.amount.checked_abs().is_some_and(|a| a <= MAX_AMOUNT)
    }

    /// Sum of two amounts of the same symbol.
    pub fn checked_add(&self, other: &Amount) -> Result<Amount> {
        self.combine(other, i64::checked_add)
    }

    /// Difference of two amounts of the same symbol.
    pub fn checked_sub(&self, other: &Amount) -> Result<Amount> {
        self.combine(other, i64::checked_sub)
    }

    fn combine(&self, other: &Amount, op: fn(i64, i64) -> Option<i64>) -> Result<Amount> {
        if self.symbol != other.symbol {
            return Err(Error::InvalidInput(format!(
                "symbol mismatch: {} vs {}",
                self.symbol, other.symbol
            )));
        }
        let raw = op(self.amount, other.amount)
            .filter(|v| v.checked_abs().is_some_and(|a| a <= MAX_AMOUNT))
            .ok_or_else(|| {
                Error::Overflow(format!("amount overflow on {} symbol", self.symbol))
            })?;
        Ok(Amount::new(raw, self.symbol))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = u32::from(self.symbol.precision());
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        let divisor = 10u64.pow(p.min(u32::from(MAX_PRECISION)));
        let int_part = magnitude / divisor;
        let frac_part = magnitude % divisor;
        if p == 0 {
            write!(f, "{}{} {}", sign, int_part, self.symbol.code())
        } else {
            write!(
                f,
                "{}{}.{:0width$} {}",
                sign,
                int_part,
                frac_part,
                self.symbol.code(),
                width = p as usize
            )
        }
    }
}

/// Principal identifier (account name in the host's identity space).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-symbol supply statistics row.
///
/// Created exactly once by `create` and never deleted; `fee_rate` is the
/// only field an issuer may later change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRecord {
    /// Current circulating supply, always in the row's symbol.
    pub supply: Amount,

    /// Cap on supply, fixed at creation.
    pub max_supply: Amount,

    /// Principal with exclusive administrative rights over the symbol.
    pub issuer: AccountId,

    /// Transfer fee in basis points, `0..=49`.
    pub fee_rate: u8,
}

/// Per-owner, per-symbol balance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Non-negative balance in the row's symbol.
    pub balance: Amount,

    /// When set, the row may be neither debited nor credited.
    pub is_frozen: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(precision: u8) -> Symbol {
        Symbol::from_code("TOK", precision).unwrap()
    }

    #[test]
    fn test_symbol_code_round_trip() {
        let code = SymbolCode::new("TOK").unwrap();
        assert_eq!(code.to_string(), "TOK");
        assert_eq!(SymbolCode::from_raw(code.raw()), code);
        assert!(code.is_valid());
    }

    #[test]
    fn test_symbol_code_rejects_malformed() {
        assert!(SymbolCode::new("").is_err());
        assert!(SymbolCode::new("toolong8").is_err());
        assert!(SymbolCode::new("tok").is_err());
        assert!(SymbolCode::new("T0K").is_err());
        assert!(!SymbolCode::from_raw(0).is_valid());
        assert!(!SymbolCode::from_raw(0x31).is_valid());
    }

    #[test]
    fn test_symbol_equality_includes_precision() {
        assert_eq!(tok(4), tok(4));
        assert_ne!(tok(4), tok(2));
        assert_ne!(tok(4), Symbol::from_code("TKN", 4).unwrap());
    }

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::new(1_000_000, tok(4)).to_string(), "100.0000 TOK");
        assert_eq!(Amount::new(-5, tok(2)).to_string(), "-0.05 TOK");
        assert_eq!(Amount::new(42, tok(0)).to_string(), "42 TOK");
    }

    #[test]
    fn test_amount_checked_add() {
        let a = Amount::new(100, tok(4));
        let b = Amount::new(50, tok(4));
        assert_eq!(a.checked_add(&b).unwrap().amount(), 150);
        assert_eq!(a.checked_sub(&b).unwrap().amount(), 50);
    }

    #[test]
    fn test_amount_symbol_mismatch() {
        let a = Amount::new(100, tok(4));
        let b = Amount::new(50, tok(2));
        assert!(matches!(a.checked_add(&b), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_amount_overflow() {
        let a = Amount::new(MAX_AMOUNT, tok(4));
        let b = Amount::new(1, tok(4));
        assert!(matches!(a.checked_add(&b), Err(Error::Overflow(_))));
        assert!(!Amount::new(i64::MAX, tok(4)).is_valid());
        assert!(Amount::new(MAX_AMOUNT, tok(4)).is_valid());
    }
}
