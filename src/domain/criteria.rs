use serde::{Deserialize, Serialize};

use super::TransactionType;

/// Conjunctive filter over the transaction log. An absent field imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    /// 0 or less means unlimited
    #[serde(skip_serializing_if = "is_unlimited")]
    pub limit: i64,
}

fn is_unlimited(limit: &i64) -> bool {
    *limit <= 0
}

impl Criteria {
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = Some(counterparty.into());
        self
    }

    pub fn with_kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unconstrained() {
        let criteria = Criteria::default();
        assert!(criteria.username.is_none());
        assert!(criteria.counterparty.is_none());
        assert!(criteria.kind.is_none());
        assert_eq!(criteria.limit, 0);
        assert_eq!(serde_json::to_string(&criteria).unwrap(), "{}");
    }

    #[test]
    fn test_serializes_only_present_fields() {
        let criteria = Criteria::default()
            .with_username("JUAN")
            .with_kind(TransactionType::TransferOut)
            .with_limit(5);
        let json = serde_json::to_value(&criteria).unwrap();
        assert_eq!(json["username"], "JUAN");
        assert_eq!(json["type"], "transfer_out");
        assert_eq!(json["limit"], 5);
        assert!(json.get("counterparty").is_none());
    }
}
