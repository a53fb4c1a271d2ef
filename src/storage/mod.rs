mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{Cents, Criteria, Transaction, Wallet};

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Result of a conditional debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    Applied(Wallet),
    /// The wallet is missing or its balance is below the requested amount.
    GuardFailed,
}

/// Persistence contract the ledger core consumes.
///
/// Every write goes through a caller-owned [`WalletStore::Scope`]; writes made
/// through one scope become visible together on [`commit`](WalletStore::commit)
/// and are discarded on [`rollback`](WalletStore::rollback) or when the scope
/// is dropped without being committed.
#[async_trait]
pub trait WalletStore: Send + Sync {
    type Scope: Send;

    async fn begin(&self) -> Result<Self::Scope>;
    async fn commit(&self, scope: Self::Scope) -> Result<()>;
    async fn rollback(&self, scope: Self::Scope) -> Result<()>;

    /// Absence is not an error.
    async fn fetch(&self, scope: &mut Self::Scope, username: &str) -> Result<Option<Wallet>>;

    async fn fetch_all(&self) -> Result<Vec<Wallet>>;

    /// Create a zero-balance wallet if absent, then add `amount`, in one atomic
    /// read-modify-write.
    async fn upsert_credit(
        &self,
        scope: &mut Self::Scope,
        username: &str,
        amount: Cents,
    ) -> Result<Wallet>;

    /// Subtract `amount` only if `balance >= amount`.
    async fn debit(
        &self,
        scope: &mut Self::Scope,
        username: &str,
        amount: Cents,
    ) -> Result<DebitOutcome>;

    /// Append a record and assign its id.
    async fn insert_transaction(
        &self,
        scope: &mut Self::Scope,
        record: &mut Transaction,
    ) -> Result<()>;

    /// Matching records, newest first, truncated to `criteria.limit` when positive.
    async fn fetch_transactions(&self, criteria: &Criteria) -> Result<Vec<Transaction>>;
}
