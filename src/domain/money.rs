use thiserror::Error;

/// Money is represented as integer minor units to avoid floating-point precision issues.
/// For EUR/USD, 1 unit = 100 cents, so €50.00 = 5000 cents.
pub type Cents = i64;

/// Largest amount a single movement may carry, and largest balance a wallet may hold.
pub const UPPER_LIMIT: Cents = 999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LimitError {
    #[error("amount {0} must be greater than 0 and must not exceed {UPPER_LIMIT}")]
    AmountOutOfRange(Cents),

    #[error("balance {0} must be between 0 and {UPPER_LIMIT}")]
    BalanceOutOfRange(Cents),
}

/// Bounds-check a movement amount: `0 < amount <= UPPER_LIMIT`.
pub fn validate_amount(amount: Cents) -> Result<(), LimitError> {
    if amount <= 0 || amount > UPPER_LIMIT {
        return Err(LimitError::AmountOutOfRange(amount));
    }
    Ok(())
}

/// Bounds-check a projected post-mutation balance: `0 <= balance <= UPPER_LIMIT`.
pub fn validate_balance(balance: Cents) -> Result<(), LimitError> {
    if !(0..=UPPER_LIMIT).contains(&balance) {
        return Err(LimitError::BalanceOutOfRange(balance));
    }
    Ok(())
}

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}
