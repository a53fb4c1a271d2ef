use tracing::{debug, info, warn};

use crate::domain::{normalize, validate_balance, Cents, TransactionType, Wallet};
use crate::storage::{DebitOutcome, WalletStore};

use super::service::check_amount;
use super::{AppError, LedgerService};

impl<S: WalletStore> LedgerService<S> {
    /// Withdraw from an existing wallet and log the movement.
    pub async fn withdraw(&self, username_raw: &str, amount: Cents) -> Result<Wallet, AppError> {
        debug!(username = username_raw, amount, "Withdraw received");
        let username = normalize(username_raw)?;
        check_amount(amount)?;

        let (scope, result) = self.guarded("withdraw", async {
            let mut scope = self.store.begin().await?;
            let outcome = async {
                let wallet = self.withdraw_in(&mut scope, &username, amount).await?;
                self.log_transaction(
                    &mut scope,
                    &wallet.username,
                    TransactionType::Withdraw,
                    amount,
                    None,
                )
                .await?;
                Ok::<_, AppError>(wallet)
            }
            .await;
            self.settle("withdraw", scope, outcome).await
        })
        .await?;
        self.finalize("withdraw", scope, result).await
    }

    /// Debit leg inside the caller's scope. Never creates a wallet.
    pub async fn withdraw_in(
        &self,
        scope: &mut S::Scope,
        username_raw: &str,
        amount: Cents,
    ) -> Result<Wallet, AppError> {
        let username = normalize(username_raw)?;
        debug!(%username, "Username normalised");
        check_amount(amount)?;
        debug!(amount, "Amount validated");

        let current = self
            .store
            .fetch(scope, &username)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(username.clone()))?;

        let resulting = current.balance - amount;
        validate_balance(resulting).map_err(|_| {
            AppError::balance_out_of_range(&username, current.balance, amount, resulting)
        })?;
        info!(%username, balance = current.balance, resulting, "Balance validated");

        match self.store.debit(scope, &username, amount).await? {
            DebitOutcome::Applied(wallet) => {
                info!(
                    username = %wallet.username,
                    amount,
                    balance = wallet.balance,
                    "Wallet debited"
                );
                Ok(wallet)
            }
            // A concurrent debit drained the wallet between fetch and update.
            DebitOutcome::GuardFailed => {
                warn!(%username, amount, "Debit guard rejected withdrawal");
                Err(AppError::balance_out_of_range(
                    &username,
                    current.balance,
                    amount,
                    resulting,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::CreditLeg;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_missing_wallet() {
        let service = LedgerService::new(MemoryStore::new());
        let mut scope = service.store().begin().await.unwrap();

        let err = service.withdraw_in(&mut scope, "juan", 1).await.unwrap_err();
        assert!(matches!(err, AppError::WalletNotFound(name) if name == "JUAN"));
    }

    #[tokio::test]
    async fn test_overdraft_rejected_before_debit() {
        let service = LedgerService::new(MemoryStore::new());
        let mut scope = service.store().begin().await.unwrap();
        service
            .deposit_in(&mut scope, "JUAN", 1000, CreditLeg::Plain)
            .await
            .unwrap();

        let err = service
            .withdraw_in(&mut scope, "JUAN", 1500)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ERR_BALANCE_OUT_OF_RANGE");

        let wallet = service.store().fetch(&mut scope, "JUAN").await.unwrap().unwrap();
        assert_eq!(wallet.balance, 1000);
        assert!(wallet.last_withdraw_amount.is_none());
    }

    #[tokio::test]
    async fn test_exact_balance_drains_to_zero() {
        let service = LedgerService::new(MemoryStore::new());
        let mut scope = service.store().begin().await.unwrap();
        service
            .deposit_in(&mut scope, "JUAN", 1000, CreditLeg::Plain)
            .await
            .unwrap();

        let wallet = service.withdraw_in(&mut scope, "JUAN", 1000).await.unwrap();
        assert_eq!(wallet.balance, 0);
        assert_eq!(wallet.last_withdraw_amount, Some(1000));
    }
}
