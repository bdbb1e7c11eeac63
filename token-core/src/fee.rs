//! Transfer fee calculation
//!
//! The fee accrues per whole [`FEE_DIVISOR`] raw units transferred, so the
//! division truncates toward zero: small transfers carry no fee regardless
//! of the configured rate.

use crate::types::Amount;

/// Raw units per basis-point step of the fee rate.
pub const FEE_DIVISOR: i64 = 10_000;

/// Fee owed on a transfer of `quantity` at `fee_rate` basis points.
///
/// `fee = (quantity / 10_000) * fee_rate`, in the quantity's symbol. The
/// result cannot overflow for any valid quantity and `fee_rate <= 49`.
pub fn transfer_fee(quantity: &Amount, fee_rate: u8) -> Amount {
    let steps = quantity.amount() / FEE_DIVISOR;
    Amount::new(steps * i64::from(fee_rate), quantity.symbol())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;

    fn amount(raw: i64) -> Amount {
        Amount::new(raw, Symbol::from_code("TOK", 4).unwrap())
    }

    #[test]
    fn test_fee_truncates_toward_zero() {
        // 9999 raw units never reach a whole fee step.
        assert_eq!(transfer_fee(&amount(9_999), 49).amount(), 0);
        assert_eq!(transfer_fee(&amount(10_000), 49).amount(), 49);
        assert_eq!(transfer_fee(&amount(19_999), 49).amount(), 49);
    }

    #[test]
    fn test_fee_scales_with_rate() {
        assert_eq!(transfer_fee(&amount(1_000_000), 10).amount(), 1_000);
        assert_eq!(transfer_fee(&amount(1_000_000), 0).amount(), 0);
        assert_eq!(transfer_fee(&amount(500_000), 10).amount(), 500);
    }

    #[test]
    fn test_fee_keeps_symbol() {
        let q = amount(1_000_000);
        assert_eq!(transfer_fee(&q, 10).symbol(), q.symbol());
    }
}
