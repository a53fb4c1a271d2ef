use thiserror::Error;

use crate::domain::{Cents, UsernameError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("Amount out of range: {0}")]
    AmountOutOfRange(Cents),

    #[error(
        "Balance out of range for {username}: balance {balance}, amount {amount}, resulting {resulting}"
    )]
    BalanceOutOfRange {
        username: String,
        balance: Cents,
        amount: Cents,
        resulting: Cents,
    },

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Counterparty not found: {0}")]
    CounterpartyNotFound(String),

    #[error("Store failure: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("Commit failed: {0:#}")]
    Commit(anyhow::Error),

    #[error("Internal fault: {0}")]
    InternalFault(String),

    #[error("Operation timed out")]
    Timeout,
}

impl AppError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidUsername(_) => "ERR_INVALID_USERNAME",
            AppError::AmountOutOfRange(_) => "ERR_AMOUNT_OUT_OF_RANGE",
            AppError::BalanceOutOfRange { .. } => "ERR_BALANCE_OUT_OF_RANGE",
            AppError::WalletNotFound(_) => "ERR_WALLET_NOT_FOUND",
            AppError::CounterpartyNotFound(_) => "ERR_COUNTERPARTY_NOT_FOUND",
            AppError::Store(_) => "ERR_STORE_FAILURE",
            AppError::Commit(_) => "ERR_COMMIT_FAILED",
            AppError::InternalFault(_) => "ERR_INTERNAL_FAULT",
            AppError::Timeout => "ERR_TIMEOUT",
        }
    }

    pub(crate) fn balance_out_of_range(
        username: &str,
        balance: Cents,
        amount: Cents,
        resulting: Cents,
    ) -> Self {
        AppError::BalanceOutOfRange {
            username: username.to_string(),
            balance,
            amount,
            resulting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            AppError::from(UsernameError::Empty).code(),
            "ERR_INVALID_USERNAME"
        );
        assert_eq!(
            AppError::AmountOutOfRange(0).code(),
            "ERR_AMOUNT_OUT_OF_RANGE"
        );
        assert_eq!(
            AppError::balance_out_of_range("JUAN", 1000, 1500, -500).code(),
            "ERR_BALANCE_OUT_OF_RANGE"
        );
        assert_eq!(
            AppError::from(anyhow::anyhow!("disk full")).code(),
            "ERR_STORE_FAILURE"
        );
        assert_eq!(AppError::Timeout.code(), "ERR_TIMEOUT");
    }

    #[test]
    fn test_store_error_keeps_context_chain() {
        let err = anyhow::anyhow!("disk full").context("Failed to debit wallet");
        let message = AppError::from(err).to_string();
        assert!(message.contains("Failed to debit wallet"));
        assert!(message.contains("disk full"));
    }
}
