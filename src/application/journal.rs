use chrono::Utc;
use tracing::{debug, info};

use crate::domain::{
    loose_normalize, normalize, Cents, Criteria, Transaction, TransactionType,
};
use crate::storage::WalletStore;

use super::{AppError, LedgerService};

/// Outcome of [`LedgerService::log_transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutcome {
    Recorded(Transaction),
    /// Nothing was written because the amount was not positive.
    Skipped,
}

impl LogOutcome {
    pub fn record(&self) -> Option<&Transaction> {
        match self {
            LogOutcome::Recorded(record) => Some(record),
            LogOutcome::Skipped => None,
        }
    }
}

impl<S: WalletStore> LedgerService<S> {
    /// Append a sealed record to the log inside the caller's scope.
    pub async fn log_transaction(
        &self,
        scope: &mut S::Scope,
        username_raw: &str,
        kind: TransactionType,
        amount: Cents,
        counterparty: Option<&str>,
    ) -> Result<LogOutcome, AppError> {
        if amount <= 0 {
            debug!(username = username_raw, %kind, amount, "Non-positive amount, skipping log");
            return Ok(LogOutcome::Skipped);
        }

        let username = normalize(username_raw)?;
        let counterparty = counterparty.map(normalize).transpose()?;

        let mut record = Transaction::new(username, kind, amount, counterparty, Utc::now());
        self.store.insert_transaction(scope, &mut record).await?;

        info!(
            id = record.id,
            username = %record.username,
            %kind,
            amount,
            counterparty = record.counterparty.as_deref(),
            hash = %record.hash,
            "Transaction logged"
        );
        Ok(LogOutcome::Recorded(record))
    }

    /// Search the log with raw, untrusted filter values.
    ///
    /// Usernames are loosely normalised, an unknown type is dropped and an
    /// unparsable limit means unlimited. Filters that end up empty are left
    /// out. The effective criteria are returned with the results.
    pub async fn query_transactions(
        &self,
        username_raw: Option<&str>,
        counterparty_raw: Option<&str>,
        type_raw: Option<&str>,
        limit_raw: Option<&str>,
    ) -> Result<(Vec<Transaction>, Criteria), AppError> {
        let criteria = build_criteria(username_raw, counterparty_raw, type_raw, limit_raw);
        debug!(?criteria, "Transaction criteria built");

        self.guarded("query_transactions", async {
            let records = self.store.fetch_transactions(&criteria).await?;
            info!(count = records.len(), "Transactions fetched");
            Ok((records, criteria.clone()))
        })
        .await
    }
}

fn build_criteria(
    username_raw: Option<&str>,
    counterparty_raw: Option<&str>,
    type_raw: Option<&str>,
    limit_raw: Option<&str>,
) -> Criteria {
    let present = |raw: Option<&str>| {
        raw.map(loose_normalize)
            .filter(|normalized| !normalized.is_empty())
    };

    Criteria {
        username: present(username_raw),
        counterparty: present(counterparty_raw),
        kind: type_raw.and_then(TransactionType::from_str),
        limit: limit_raw
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::application::CreditLeg;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_zero_amount_is_skipped() {
        let service = LedgerService::new(MemoryStore::new());
        let mut scope = service.store().begin().await.unwrap();

        let outcome = service
            .log_transaction(&mut scope, "JUAN", TransactionType::Deposit, 0, None)
            .await
            .unwrap();
        assert_eq!(outcome, LogOutcome::Skipped);
        assert!(outcome.record().is_none());
    }

    #[tokio::test]
    async fn test_skip_happens_before_username_check() {
        let service = LedgerService::new(MemoryStore::new());
        let mut scope = service.store().begin().await.unwrap();

        let outcome = service
            .log_transaction(&mut scope, "j@uan", TransactionType::Withdraw, -5, None)
            .await
            .unwrap();
        assert_eq!(outcome, LogOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_malformed_username_rejected() {
        let service = LedgerService::new(MemoryStore::new());
        let mut scope = service.store().begin().await.unwrap();

        let err = service
            .log_transaction(&mut scope, "j@uan", TransactionType::Deposit, 5, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_USERNAME");
    }

    #[tokio::test]
    async fn test_recorded_with_canonical_names() {
        let service = LedgerService::new(MemoryStore::new());
        let mut scope = service.store().begin().await.unwrap();
        service
            .deposit_in(&mut scope, "JUAN", 100, CreditLeg::Plain)
            .await
            .unwrap();

        let outcome = service
            .log_transaction(
                &mut scope,
                " juan ",
                TransactionType::TransferOut,
                100,
                Some("mary"),
            )
            .await
            .unwrap();

        let record = outcome.record().unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.username, "JUAN");
        assert_eq!(record.counterparty.as_deref(), Some("MARY"));
        assert!(record.verify());
    }

    #[rstest]
    #[case(None, None, None, None, Criteria::default())]
    #[case(Some(" juan "), None, None, None, Criteria::default().with_username("JUAN"))]
    #[case(Some("@@@"), Some(""), None, None, Criteria::default())]
    #[case(None, Some("m@ry"), None, None, Criteria::default().with_counterparty("MRY"))]
    #[case(None, None, Some("TRANSFER_IN"), None, Criteria::default().with_kind(TransactionType::TransferIn))]
    #[case(None, None, Some("refund"), None, Criteria::default())]
    #[case(None, None, None, Some("10"), Criteria::default().with_limit(10))]
    #[case(None, None, None, Some("ten"), Criteria::default())]
    #[case(None, None, None, Some("-3"), Criteria::default())]
    #[case(None, None, None, Some("18446744073709551615"), Criteria::default())]
    #[case(None, None, None, Some("9223372036854775807"), Criteria::default().with_limit(i64::MAX))]
    fn test_build_criteria(
        #[case] username: Option<&str>,
        #[case] counterparty: Option<&str>,
        #[case] kind: Option<&str>,
        #[case] limit: Option<&str>,
        #[case] expected: Criteria,
    ) {
        assert_eq!(build_criteria(username, counterparty, kind, limit), expected);
    }
}
