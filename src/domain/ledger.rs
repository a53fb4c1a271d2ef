use serde::Serialize;

use super::{Transaction, TransactionId};

/// Outcome of re-verifying every record in the transaction log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub checked: usize,
    /// Records whose stored hash no longer matches their fields
    pub tampered: Vec<TransactionId>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.tampered.is_empty()
    }
}

/// Recompute each record's hash and collect the ids that fail.
///
/// Verification is per record: each hash covers only its own fields.
pub fn audit_transactions(transactions: &[Transaction]) -> AuditReport {
    let tampered = transactions
        .iter()
        .filter(|t| !t.verify())
        .map(|t| t.id)
        .collect();

    AuditReport {
        checked: transactions.len(),
        tampered,
    }
}
