mod common;

use anyhow::Result;
use coffer::domain::{Criteria, TransactionType};
use common::{StandardWallets, test_service};

#[tokio::test]
async fn test_query_returns_newest_first() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardWallets::create(&service).await?;
    service.withdraw("juan", 100).await?;
    service.transfer("mary", "juan", 50).await?;

    let (records, criteria) = service.query_transactions(None, None, None, None).await?;
    assert_eq!(criteria, Criteria::default());

    let kinds: Vec<_> = records.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TransactionType::TransferIn,
            TransactionType::TransferOut,
            TransactionType::Withdraw,
            TransactionType::Deposit,
            TransactionType::Deposit,
        ]
    );
    assert!(records.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    assert!(records.windows(2).all(|w| w[0].id > w[1].id));

    Ok(())
}

#[tokio::test]
async fn test_query_filters_are_conjunctive() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardWallets::create(&service).await?;
    service.transfer("juan", "mary", 10).await?;
    service.transfer("mary", "juan", 20).await?;

    let (records, criteria) = service
        .query_transactions(Some(" juan "), Some("mary"), Some("TRANSFER_OUT"), None)
        .await?;
    assert_eq!(
        criteria,
        Criteria::default()
            .with_username("JUAN")
            .with_counterparty("MARY")
            .with_kind(TransactionType::TransferOut)
    );
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].amount, 10);

    let (records, _) = service
        .query_transactions(Some("juan"), None, None, None)
        .await?;
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|t| t.username == "JUAN"));

    Ok(())
}

#[tokio::test]
async fn test_query_limit() -> Result<()> {
    let (service, _temp) = test_service().await?;
    for amount in 1..=5 {
        service.deposit("juan", amount).await?;
    }

    let (records, criteria) = service
        .query_transactions(None, None, None, Some("2"))
        .await?;
    assert_eq!(criteria.limit, 2);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].amount, 5);
    assert_eq!(records[1].amount, 4);

    // Unparsable limit means unlimited
    let (records, criteria) = service
        .query_transactions(None, None, None, Some("lots"))
        .await?;
    assert_eq!(criteria.limit, 0);
    assert_eq!(records.len(), 5);

    // Too large for a signed 64-bit integer
    let (records, criteria) = service
        .query_transactions(None, None, None, Some("18446744073709551615"))
        .await?;
    assert_eq!(criteria.limit, 0);
    assert_eq!(records.len(), 5);

    Ok(())
}

#[tokio::test]
async fn test_unknown_type_is_dropped() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.deposit("juan", 10).await?;

    let (records, criteria) = service
        .query_transactions(None, None, Some("refund"), None)
        .await?;
    assert!(criteria.kind.is_none());
    assert_eq!(records.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_malformed_username_filter_matches_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.deposit("juan", 10).await?;

    let (records, criteria) = service
        .query_transactions(Some("j@u-a n!"), None, None, None)
        .await?;
    assert_eq!(criteria.username.as_deref(), Some("JUAN"));
    assert_eq!(records.len(), 1);

    let (records, _) = service
        .query_transactions(Some("nobody"), None, None, None)
        .await?;
    assert!(records.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_verify_clean_ledger() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardWallets::create(&service).await?;
    service.transfer("juan", "mary", 250).await?;

    let report = service.verify_ledger().await?;
    assert_eq!(report.checked, 4);
    assert!(report.is_clean());

    Ok(())
}

#[tokio::test]
async fn test_verify_detects_edited_amount() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardWallets::create(&service).await?;

    // Bypass the append-only guard the way an attacker with file access would
    let pool = service.store().pool();
    sqlx::query("DROP TRIGGER transactions_no_update")
        .execute(pool)
        .await?;
    sqlx::query("UPDATE transactions SET amount = 999 WHERE username = 'MARY'")
        .execute(pool)
        .await?;

    let report = service.verify_ledger().await?;
    assert_eq!(report.checked, 2);
    assert_eq!(report.tampered.len(), 1);

    let (mary, _) = service
        .query_transactions(Some("mary"), None, None, None)
        .await?;
    assert_eq!(report.tampered, vec![mary[0].id]);

    Ok(())
}
