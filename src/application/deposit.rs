use tracing::{debug, info};

use crate::domain::{normalize, validate_balance, Cents, TransactionType, Wallet};
use crate::storage::WalletStore;

use super::service::check_amount;
use super::{AppError, LedgerService};

/// Which side of a movement a credit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditLeg {
    /// A plain deposit. Creates the wallet when it doesn't exist yet.
    Plain,
    /// The receiving leg of a transfer. The wallet must already exist.
    Counterparty,
}

impl<S: WalletStore> LedgerService<S> {
    /// Deposit into a wallet, creating it on first use, and log the movement.
    pub async fn deposit(&self, username_raw: &str, amount: Cents) -> Result<Wallet, AppError> {
        debug!(username = username_raw, amount, "Deposit received");
        let username = normalize(username_raw)?;
        check_amount(amount)?;

        let (scope, result) = self.guarded("deposit", async {
            let mut scope = self.store.begin().await?;
            let outcome = async {
                let wallet = self
                    .deposit_in(&mut scope, &username, amount, CreditLeg::Plain)
                    .await?;
                self.log_transaction(
                    &mut scope,
                    &wallet.username,
                    TransactionType::Deposit,
                    amount,
                    None,
                )
                .await?;
                Ok::<_, AppError>(wallet)
            }
            .await;
            self.settle("deposit", scope, outcome).await
        })
        .await?;
        self.finalize("deposit", scope, result).await
    }

    /// Credit leg inside the caller's scope. Logging and commit are the caller's.
    pub async fn deposit_in(
        &self,
        scope: &mut S::Scope,
        username_raw: &str,
        amount: Cents,
        leg: CreditLeg,
    ) -> Result<Wallet, AppError> {
        let username = normalize(username_raw)?;
        debug!(%username, "Username normalised");
        check_amount(amount)?;
        debug!(amount, "Amount validated");

        match self.store.fetch(scope, &username).await? {
            None if leg == CreditLeg::Counterparty => {
                return Err(AppError::CounterpartyNotFound(username));
            }
            None => debug!(%username, "Wallet will be created"),
            Some(current) => {
                let resulting = current.balance + amount;
                validate_balance(resulting).map_err(|_| {
                    AppError::balance_out_of_range(&username, current.balance, amount, resulting)
                })?;
                info!(%username, balance = current.balance, resulting, "Balance validated");
            }
        }

        let wallet = self.store.upsert_credit(scope, &username, amount).await?;
        info!(
            username = %wallet.username,
            amount,
            balance = wallet.balance,
            ?leg,
            "Wallet credited"
        );
        Ok(wallet)
    }
}
