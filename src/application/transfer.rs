use tracing::{debug, info};

use crate::domain::{normalize, Cents, TransactionType, Wallet};
use crate::storage::WalletStore;

use super::service::check_amount;
use super::{AppError, CreditLeg, LedgerService};

/// Result of a transfer
#[derive(Debug, Clone)]
pub struct TransferResult {
    /// Sender wallet after the debit leg
    pub wallet: Wallet,
    /// Receiver wallet after the credit leg
    pub counterparty: Wallet,
}

impl<S: WalletStore> LedgerService<S> {
    /// Move `amount` from `username` to `counterparty` in a single scope.
    ///
    /// Both wallets must already exist. The sender is debited first, so a sender
    /// or amount error is reported before anything about the counterparty. Any
    /// failure rolls back both legs and both log records.
    pub async fn transfer(
        &self,
        username_raw: &str,
        counterparty_raw: &str,
        amount: Cents,
    ) -> Result<TransferResult, AppError> {
        debug!(
            username = username_raw,
            counterparty = counterparty_raw,
            amount,
            "Transfer received"
        );
        let username = normalize(username_raw)?;
        check_amount(amount)?;

        let (scope, result) = self.guarded("transfer", async {
            let mut scope = self.store.begin().await?;
            let outcome = async {
                let sender = self.withdraw_in(&mut scope, &username, amount).await?;
                info!(username = %sender.username, "Transfer out applied");

                let receiver = self
                    .deposit_in(&mut scope, counterparty_raw, amount, CreditLeg::Counterparty)
                    .await?;
                info!(username = %receiver.username, "Transfer in applied");

                self.log_transaction(
                    &mut scope,
                    &sender.username,
                    TransactionType::TransferOut,
                    amount,
                    Some(receiver.username.as_str()),
                )
                .await?;
                self.log_transaction(
                    &mut scope,
                    &receiver.username,
                    TransactionType::TransferIn,
                    amount,
                    Some(sender.username.as_str()),
                )
                .await?;

                Ok::<_, AppError>(TransferResult {
                    wallet: sender,
                    counterparty: receiver,
                })
            }
            .await;
            self.settle("transfer", scope, outcome).await
        })
        .await?;
        self.finalize("transfer", scope, result).await
    }
}
