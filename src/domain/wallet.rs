use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

/// Per-user balance, keyed by canonical username.
///
/// Created implicitly by the first successful deposit and never deleted.
/// `0 <= balance <= UPPER_LIMIT` holds at all times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub username: String,
    pub balance: Cents,
    pub last_deposit_amount: Option<Cents>,
    pub last_deposit_updated: Option<DateTime<Utc>>,
    pub last_withdraw_amount: Option<Cents>,
    pub last_withdraw_updated: Option<DateTime<Utc>>,
}

impl Wallet {
    /// A zero-balance wallet with no recorded movements.
    pub fn empty(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            balance: 0,
            last_deposit_amount: None,
            last_deposit_updated: None,
            last_withdraw_amount: None,
            last_withdraw_updated: None,
        }
    }

    /// Apply a credit in place, stamping the deposit markers.
    pub fn credit(&mut self, amount: Cents, at: DateTime<Utc>) {
        self.balance += amount;
        self.last_deposit_amount = Some(amount);
        self.last_deposit_updated = Some(at);
    }

    /// Apply a debit in place, stamping the withdraw markers.
    pub fn debit(&mut self, amount: Cents, at: DateTime<Utc>) {
        self.balance -= amount;
        self.last_withdraw_amount = Some(amount);
        self.last_withdraw_updated = Some(at);
    }
}
