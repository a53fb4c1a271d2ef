//! Request and response bodies.

use serde::{Deserialize, Serialize};

use crate::domain::{Cents, Criteria, Transaction, Wallet};

/// Body of `POST /deposit`, `POST /withdraw` and `POST /transfer`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MovementRequest {
    pub username: String,
    pub amount: Cents,
    /// Required by transfers, ignored otherwise.
    #[serde(default)]
    pub counterparty: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementResponse {
    pub status: u16,
    pub action: &'static str,
    pub wallet: Wallet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WalletResponse {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<Wallet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallets: Option<Vec<Wallet>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionQueryResponse {
    pub status: u16,
    pub criteria: Criteria,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Query string of `GET /balance`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceParams {
    pub username: Option<String>,
}

/// Query string of `GET /transactions`. Values stay raw; the ledger decides
/// what is usable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionParams {
    pub username: Option<String>,
    pub counterparty: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_request_rejects_unknown_fields() {
        let parsed: Result<MovementRequest, _> =
            serde_json::from_str(r#"{"username":"juan","amount":10,"memo":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_movement_request_counterparty_optional() {
        let parsed: MovementRequest =
            serde_json::from_str(r#"{"username":"juan","amount":10}"#).unwrap();
        assert_eq!(parsed.amount, 10);
        assert!(parsed.counterparty.is_none());
    }

    #[test]
    fn test_movement_request_rejects_fractional_amount() {
        let parsed: Result<MovementRequest, _> =
            serde_json::from_str(r#"{"username":"juan","amount":10.5}"#);
        assert!(parsed.is_err());
    }
}
