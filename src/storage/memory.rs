use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::{
    validate_balance, Cents, Criteria, Transaction, TransactionId, Wallet,
};

use super::{DebitOutcome, WalletStore};

/// Store operations that can have a [`Fault`] injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Begin,
    Commit,
    Rollback,
    Fetch,
    FetchAll,
    UpsertCredit,
    Debit,
    InsertTransaction,
    FetchTransactions,
}

/// How an injected fault manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The operation returns an error.
    Error,
    /// The operation panics.
    Panic,
    /// The operation never completes.
    Stall,
    /// The operation succeeds after the given delay.
    Delay(Duration),
}

#[derive(Debug, Clone, Default)]
struct State {
    wallets: BTreeMap<String, Wallet>,
    transactions: Vec<Transaction>,
    last_id: TransactionId,
}

/// In-process wallet store.
///
/// A scope holds the state lock exclusively for its lifetime, so scopes are
/// serialized. Writes apply in place against a snapshot taken at
/// [`begin`](WalletStore::begin); rollback, or dropping an uncommitted scope,
/// restores the snapshot.
#[derive(Default)]
pub struct MemoryStore {
    state: Arc<AsyncMutex<State>>,
    faults: Mutex<HashMap<StoreOp, Fault>>,
}

pub struct MemoryScope {
    state: OwnedMutexGuard<State>,
    snapshot: Option<State>,
}

impl Drop for MemoryScope {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.state = snapshot;
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `op` fail the given way.
    pub fn inject(&self, op: StoreOp, fault: Fault) {
        self.faults_table().insert(op, fault);
    }

    pub fn clear_faults(&self) {
        self.faults_table().clear();
    }

    /// Number of records in the log, read without opening a scope.
    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }

    /// Overwrite a stored record in place. Used to exercise audit verification.
    pub async fn tamper<F>(&self, id: TransactionId, edit: F) -> bool
    where
        F: FnOnce(&mut Transaction),
    {
        let mut state = self.state.lock().await;
        match state.transactions.iter_mut().find(|t| t.id == id) {
            Some(record) => {
                edit(record);
                true
            }
            None => false,
        }
    }

    fn faults_table(&self) -> std::sync::MutexGuard<'_, HashMap<StoreOp, Fault>> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn trip(&self, op: StoreOp) -> Result<()> {
        let fault = self.faults_table().get(&op).copied();
        match fault {
            None => Ok(()),
            Some(Fault::Error) => bail!("injected failure in {:?}", op),
            Some(Fault::Panic) => panic!("injected panic in {:?}", op),
            Some(Fault::Stall) => std::future::pending().await,
            Some(Fault::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    type Scope = MemoryScope;

    async fn begin(&self) -> Result<MemoryScope> {
        self.trip(StoreOp::Begin).await?;
        let state = self.state.clone().lock_owned().await;
        let snapshot = Some(state.clone());
        Ok(MemoryScope { state, snapshot })
    }

    async fn commit(&self, mut scope: MemoryScope) -> Result<()> {
        self.trip(StoreOp::Commit).await?;
        scope.snapshot = None;
        Ok(())
    }

    async fn rollback(&self, scope: MemoryScope) -> Result<()> {
        // Dropping the scope restores the snapshot even if the fault fires.
        self.trip(StoreOp::Rollback).await?;
        drop(scope);
        Ok(())
    }

    async fn fetch(&self, scope: &mut MemoryScope, username: &str) -> Result<Option<Wallet>> {
        self.trip(StoreOp::Fetch).await?;
        Ok(scope.state.wallets.get(username).cloned())
    }

    async fn fetch_all(&self) -> Result<Vec<Wallet>> {
        self.trip(StoreOp::FetchAll).await?;
        let state = self.state.lock().await;
        Ok(state.wallets.values().cloned().collect())
    }

    async fn upsert_credit(
        &self,
        scope: &mut MemoryScope,
        username: &str,
        amount: Cents,
    ) -> Result<Wallet> {
        self.trip(StoreOp::UpsertCredit).await?;
        let wallet = scope
            .state
            .wallets
            .entry(username.to_string())
            .or_insert_with(|| Wallet::empty(username));

        validate_balance(wallet.balance + amount)?;
        wallet.credit(amount, Utc::now());
        Ok(wallet.clone())
    }

    async fn debit(
        &self,
        scope: &mut MemoryScope,
        username: &str,
        amount: Cents,
    ) -> Result<DebitOutcome> {
        self.trip(StoreOp::Debit).await?;
        match scope.state.wallets.get_mut(username) {
            Some(wallet) if wallet.balance >= amount => {
                wallet.debit(amount, Utc::now());
                Ok(DebitOutcome::Applied(wallet.clone()))
            }
            _ => Ok(DebitOutcome::GuardFailed),
        }
    }

    async fn insert_transaction(
        &self,
        scope: &mut MemoryScope,
        record: &mut Transaction,
    ) -> Result<()> {
        self.trip(StoreOp::InsertTransaction).await?;
        if !scope.state.wallets.contains_key(&record.username) {
            bail!("No wallet for transaction owner {}", record.username);
        }

        scope.state.last_id += 1;
        record.id = scope.state.last_id;
        scope.state.transactions.push(record.clone());
        Ok(())
    }

    async fn fetch_transactions(&self, criteria: &Criteria) -> Result<Vec<Transaction>> {
        self.trip(StoreOp::FetchTransactions).await?;
        let state = self.state.lock().await;

        let mut matching: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| criteria.username.as_ref().is_none_or(|u| &t.username == u))
            .filter(|t| {
                criteria
                    .counterparty
                    .as_ref()
                    .is_none_or(|c| t.counterparty.as_ref() == Some(c))
            })
            .filter(|t| criteria.kind.is_none_or(|k| t.kind == k))
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        if criteria.limit > 0 {
            matching.truncate(usize::try_from(criteria.limit).unwrap_or(usize::MAX));
        }
        Ok(matching)
    }
}
