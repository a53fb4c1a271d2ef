use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::domain::{
    audit_transactions, loose_normalize, validate_amount, AuditReport, Cents, Criteria, Wallet,
};
use crate::storage::{SqliteStore, WalletStore};

use super::{AppError, LedgerConfig};

/// Application service providing the money-movement operations of the ledger.
/// This is the primary interface for any client (CLI, HTTP API, tests).
///
/// Top-level operations own their atomic scope: they validate their inputs,
/// open the scope, run the body under the configured deadline and commit only
/// if every step succeeded. The `*_in` legs take the caller's scope instead so
/// they compose inside a larger operation.
pub struct LedgerService<S: WalletStore = SqliteStore> {
    pub(super) store: Arc<S>,
    config: LedgerConfig,
}

impl<S: WalletStore> Clone for LedgerService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

impl LedgerService<SqliteStore> {
    /// Initialize the database at the given path (create + migrate).
    pub async fn init(database_path: impl AsRef<Path>) -> Result<Self, AppError> {
        let store = SqliteStore::init(database_path).await?;
        Ok(Self::new(store))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: impl AsRef<Path>) -> Result<Self, AppError> {
        let store = SqliteStore::connect(database_path).await?;
        Ok(Self::new(store))
    }
}

impl<S: WalletStore> LedgerService<S> {
    /// Create a new ledger service over the given store with default tunables.
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ========================
    // Read operations
    // ========================

    /// Fetch one wallet. The username is loosely normalised, so a malformed
    /// name simply finds nothing.
    pub async fn get_wallet(&self, username_raw: &str) -> Result<Wallet, AppError> {
        let username = loose_normalize(username_raw);
        debug!(raw = username_raw, %username, "Fetching wallet");

        self.guarded("get_wallet", async {
            let mut scope = self.store.begin().await?;
            let found = self.store.fetch(&mut scope, &username).await;
            self.store.rollback(scope).await?;

            found?.ok_or_else(|| AppError::WalletNotFound(username.clone()))
        })
        .await
    }

    /// Every wallet, ordered by username.
    pub async fn list_wallets(&self) -> Result<Vec<Wallet>, AppError> {
        self.guarded("list_wallets", async {
            let wallets = self.store.fetch_all().await?;
            debug!(count = wallets.len(), "Wallets listed");
            Ok(wallets)
        })
        .await
    }

    /// Recompute the hash of every stored record.
    pub async fn verify_ledger(&self) -> Result<AuditReport, AppError> {
        self.guarded("verify_ledger", async {
            let records = self.store.fetch_transactions(&Criteria::default()).await?;
            let report = audit_transactions(&records);

            if report.is_clean() {
                info!(checked = report.checked, "Ledger verified");
            } else {
                warn!(
                    checked = report.checked,
                    tampered = ?report.tampered,
                    "Ledger verification found mismatched hashes"
                );
            }
            Ok(report)
        })
        .await
    }

    // ========================
    // Scope discipline
    // ========================

    /// Run `work` under the operation deadline, converting a panic into
    /// [`AppError::InternalFault`].
    ///
    /// When the deadline elapses or the body panics, the body future is dropped
    /// together with any scope it owns, which rolls the scope back. Commit is
    /// not part of `work`; see [`finalize`](Self::finalize).
    pub(super) async fn guarded<T, F>(&self, operation: &'static str, work: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let timeout = self.config.operation_timeout;
        match tokio::time::timeout(timeout, AssertUnwindSafe(work).catch_unwind()).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(internal_fault(operation, panic.as_ref())),
            Err(_) => {
                warn!(operation, ?timeout, "Deadline elapsed, scope rolled back");
                Err(AppError::Timeout)
            }
        }
    }

    /// Roll the scope back if `outcome` failed and hand the original error
    /// back. On success the still-open scope is returned for [`finalize`](Self::finalize).
    pub(super) async fn settle<T>(
        &self,
        operation: &'static str,
        scope: S::Scope,
        outcome: Result<T, AppError>,
    ) -> Result<(S::Scope, T), AppError> {
        match outcome {
            Ok(value) => Ok((scope, value)),
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback(scope).await {
                    warn!(operation, error = %rollback_err, "Rollback failed");
                }
                warn!(operation, code = err.code(), error = %err, "Scope rolled back");
                Err(err)
            }
        }
    }

    /// Commit a settled scope.
    ///
    /// Runs outside the deadline: once the store has been asked to commit, the
    /// caller sees the store's own answer, never [`AppError::Timeout`] for a
    /// commit that may have landed.
    pub(super) async fn finalize<T>(
        &self,
        operation: &'static str,
        scope: S::Scope,
        value: T,
    ) -> Result<T, AppError> {
        match AssertUnwindSafe(self.store.commit(scope)).catch_unwind().await {
            Ok(Ok(())) => {
                info!(operation, "Scope committed");
                Ok(value)
            }
            Ok(Err(err)) => {
                warn!(operation, error = %err, "Commit failed, scope rolled back");
                Err(AppError::Commit(err))
            }
            Err(panic) => Err(internal_fault(operation, panic.as_ref())),
        }
    }
}

pub(super) fn check_amount(amount: Cents) -> Result<(), AppError> {
    validate_amount(amount).map_err(|_| AppError::AmountOutOfRange(amount))
}

fn internal_fault(operation: &'static str, panic: &(dyn Any + Send)) -> AppError {
    let detail = panic_message(panic);
    error!(operation, fault = %detail, "Recovered internal fault, scope rolled back");
    AppError::InternalFault(detail)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
