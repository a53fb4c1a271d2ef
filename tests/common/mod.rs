// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::time::Duration;

use anyhow::Result;
use coffer::application::{LedgerConfig, LedgerService};
use coffer::domain::Cents;
use coffer::storage::MemoryStore;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to create a service over the in-memory store, for fault injection
pub fn memory_service() -> LedgerService<MemoryStore> {
    let config = LedgerConfig::default().with_operation_timeout(Duration::from_millis(200));
    LedgerService::with_config(MemoryStore::new(), config)
}

/// Test fixture: JUAN and MARY with 1000 each
pub struct StandardWallets;

impl StandardWallets {
    pub const OPENING_BALANCE: Cents = 1000;

    pub async fn create<S: coffer::storage::WalletStore>(service: &LedgerService<S>) -> Result<()> {
        service.deposit("juan", Self::OPENING_BALANCE).await?;
        service.deposit("mary", Self::OPENING_BALANCE).await?;
        Ok(())
    }
}

/// Current balance of a wallet, or None if it doesn't exist
pub async fn balance_of<S: coffer::storage::WalletStore>(
    service: &LedgerService<S>,
    username: &str,
) -> Option<Cents> {
    service.get_wallet(username).await.ok().map(|w| w.balance)
}
