use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Cents;

/// Store-assigned, monotonically increasing record id.
pub type TransactionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    TransferIn,
    TransferOut,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Deposit,
        TransactionType::Withdraw,
        TransactionType::TransferIn,
        TransactionType::TransferOut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::TransferIn => "transfer_in",
            TransactionType::TransferOut => "transfer_out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Some(TransactionType::Deposit),
            "withdraw" => Some(TransactionType::Withdraw),
            "transfer_in" => Some(TransactionType::TransferIn),
            "transfer_out" => Some(TransactionType::TransferOut),
            _ => None,
        }
    }

    /// Transfer legs are the only records that carry a counterparty.
    pub fn is_transfer_leg(&self) -> bool {
        matches!(
            self,
            TransactionType::TransferIn | TransactionType::TransferOut
        )
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One balance-affecting movement. Records are write-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub username: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Always positive
    pub amount: Cents,
    pub counterparty: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Hex SHA-256 over the business fields and the timestamp
    pub hash: String,
}

impl Transaction {
    /// Build a new record and seal it with its hash. The id is assigned on insert.
    ///
    /// The timestamp is truncated to microseconds, the precision it is stored and
    /// hashed with, so a record read back from storage verifies identically.
    pub fn new(
        username: impl Into<String>,
        kind: TransactionType,
        amount: Cents,
        counterparty: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            id: 0, // Will be set by the store
            username: username.into(),
            kind,
            amount,
            counterparty,
            timestamp: timestamp.trunc_subsecs(6),
            hash: String::new(),
        };
        record.hash = record.compute_hash();
        record
    }

    pub fn compute_hash(&self) -> String {
        transaction_hash(
            &self.username,
            self.kind,
            self.amount,
            self.counterparty.as_deref(),
            &self.timestamp,
        )
    }

    /// Recompute the digest from this record's own fields and compare it to the stored one.
    ///
    /// Detects edits to a single record. Reordering, insertion or deletion of
    /// records is not detectable, since hashes are not chained.
    pub fn verify(&self) -> bool {
        self.compute_hash() == self.hash
    }
}

/// Fixed ISO-8601 rendering used both for storage and hashing.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn transaction_hash(
    username: &str,
    kind: TransactionType,
    amount: Cents,
    counterparty: Option<&str>,
    timestamp: &DateTime<Utc>,
) -> String {
    let preimage = format!(
        "{}|{}|{}|{}|{}",
        username,
        kind.as_str(),
        amount,
        counterparty.unwrap_or(""),
        format_timestamp(timestamp)
    );
    hex::encode(Sha256::digest(preimage.as_bytes()))
}
