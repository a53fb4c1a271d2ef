use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::debug;

use crate::domain::{
    format_timestamp, Cents, Criteria, Transaction, TransactionType, Wallet,
};

use super::{DebitOutcome, WalletStore, MIGRATION_001_INITIAL};

/// Atomic scope of the SQLite store: a database transaction that rolls back on drop.
pub type SqliteScope = sqlx::Transaction<'static, Sqlite>;

const WALLET_COLUMNS: &str = "username, balance, last_deposit_amount, last_deposit_updated, last_withdraw_amount, last_withdraw_updated";
const TRANSACTION_COLUMNS: &str = "id, username, type, amount, counterparty, timestamp, hash";

/// Wallet store backed by a SQLite database.
///
/// SQLite admits a single writer, so the pool holds one connection and
/// scopes are serialized at the database layer instead of failing with
/// lock-upgrade conflicts.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the database file at `path`, creating it if it doesn't exist.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate). Safe to run against an existing file.
    pub async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::connect(path).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_wallet(row: &SqliteRow) -> Result<Wallet> {
        let last_deposit_updated: Option<String> = row.get("last_deposit_updated");
        let last_withdraw_updated: Option<String> = row.get("last_withdraw_updated");

        Ok(Wallet {
            username: row.get("username"),
            balance: row.get("balance"),
            last_deposit_amount: row.get("last_deposit_amount"),
            last_deposit_updated: last_deposit_updated
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .context("Invalid last_deposit_updated timestamp")?,
            last_withdraw_amount: row.get("last_withdraw_amount"),
            last_withdraw_updated: last_withdraw_updated
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .context("Invalid last_withdraw_updated timestamp")?,
        })
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let kind_str: String = row.get("type");
        let timestamp_str: String = row.get("timestamp");

        Ok(Transaction {
            id: row.get("id"),
            username: row.get("username"),
            kind: TransactionType::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", kind_str))?,
            amount: row.get("amount"),
            counterparty: row.get("counterparty"),
            timestamp: parse_timestamp(&timestamp_str).context("Invalid transaction timestamp")?,
            hash: row.get("hash"),
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

#[async_trait]
impl WalletStore for SqliteStore {
    type Scope = SqliteScope;

    async fn begin(&self) -> Result<SqliteScope> {
        self.pool.begin().await.context("Failed to begin transaction")
    }

    async fn commit(&self, scope: SqliteScope) -> Result<()> {
        scope.commit().await.context("Failed to commit transaction")
    }

    async fn rollback(&self, scope: SqliteScope) -> Result<()> {
        scope
            .rollback()
            .await
            .context("Failed to roll back transaction")
    }

    async fn fetch(&self, scope: &mut SqliteScope, username: &str) -> Result<Option<Wallet>> {
        let query = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE username = ?");
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&mut **scope)
            .await
            .context("Failed to fetch wallet")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_wallet(&row)?)),
            None => {
                debug!(username, "No wallet found");
                Ok(None)
            }
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Wallet>> {
        let query = format!("SELECT {WALLET_COLUMNS} FROM wallets ORDER BY username");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list wallets")?;

        rows.iter().map(Self::row_to_wallet).collect()
    }

    async fn upsert_credit(
        &self,
        scope: &mut SqliteScope,
        username: &str,
        amount: Cents,
    ) -> Result<Wallet> {
        let now = format_timestamp(&Utc::now());
        let query = format!(
            r#"
            INSERT INTO wallets (username, balance, last_deposit_amount, last_deposit_updated)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (username) DO UPDATE SET
                balance              = wallets.balance + excluded.balance,
                last_deposit_amount  = excluded.last_deposit_amount,
                last_deposit_updated = excluded.last_deposit_updated
            RETURNING {WALLET_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(username)
            .bind(amount)
            .bind(amount)
            .bind(&now)
            .fetch_one(&mut **scope)
            .await
            .context("Failed to upsert wallet")?;

        Self::row_to_wallet(&row)
    }

    async fn debit(
        &self,
        scope: &mut SqliteScope,
        username: &str,
        amount: Cents,
    ) -> Result<DebitOutcome> {
        let now = format_timestamp(&Utc::now());
        let query = format!(
            r#"
            UPDATE wallets
            SET
                balance               = balance - ?,
                last_withdraw_amount  = ?,
                last_withdraw_updated = ?
            WHERE username = ? AND balance >= ?
            RETURNING {WALLET_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(amount)
            .bind(amount)
            .bind(&now)
            .bind(username)
            .bind(amount)
            .fetch_optional(&mut **scope)
            .await
            .context("Failed to debit wallet")?;

        match row {
            Some(row) => Ok(DebitOutcome::Applied(Self::row_to_wallet(&row)?)),
            None => Ok(DebitOutcome::GuardFailed),
        }
    }

    async fn insert_transaction(
        &self,
        scope: &mut SqliteScope,
        record: &mut Transaction,
    ) -> Result<()> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (username, type, amount, counterparty, timestamp, hash)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&record.username)
        .bind(record.kind.as_str())
        .bind(record.amount)
        .bind(&record.counterparty)
        .bind(format_timestamp(&record.timestamp))
        .bind(&record.hash)
        .fetch_one(&mut **scope)
        .await
        .context("Failed to insert transaction")?;

        record.id = row.get("id");
        Ok(())
    }

    async fn fetch_transactions(&self, criteria: &Criteria) -> Result<Vec<Transaction>> {
        // Build query dynamically based on filters
        let mut query = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE 1=1");

        if criteria.username.is_some() {
            query.push_str(" AND username = ?");
        }
        if criteria.counterparty.is_some() {
            query.push_str(" AND counterparty = ?");
        }
        if criteria.kind.is_some() {
            query.push_str(" AND type = ?");
        }

        query.push_str(" ORDER BY timestamp DESC, id DESC");

        if criteria.limit > 0 {
            query.push_str(" LIMIT ?");
        }

        debug!(%query, "Transaction query built");

        let mut sql_query = sqlx::query(&query);
        if let Some(username) = &criteria.username {
            sql_query = sql_query.bind(username);
        }
        if let Some(counterparty) = &criteria.counterparty {
            sql_query = sql_query.bind(counterparty);
        }
        if let Some(kind) = criteria.kind {
            sql_query = sql_query.bind(kind.as_str());
        }
        if criteria.limit > 0 {
            sql_query = sql_query.bind(criteria.limit);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }
}
