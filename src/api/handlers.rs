//! HTTP handlers. Each one decodes its input, calls the ledger and shapes
//! the JSON response.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use tracing::info;

use crate::application::LedgerService;
use crate::storage::WalletStore;

use super::dto::{
    BalanceParams, HealthResponse, MovementRequest, MovementResponse, TransactionParams,
    TransactionQueryResponse, WalletResponse,
};
use super::error::ApiErrorResponse;

type ApiResult<T> = Result<Json<T>, ApiErrorResponse>;

const OK: u16 = 200;

pub async fn deposit<S: WalletStore + 'static>(
    State(service): State<LedgerService<S>>,
    payload: Result<Json<MovementRequest>, JsonRejection>,
) -> ApiResult<MovementResponse> {
    let Json(request) = payload?;
    let wallet = service.deposit(&request.username, request.amount).await?;
    info!(username = %wallet.username, balance = wallet.balance, "Deposit succeeded");

    Ok(Json(MovementResponse {
        status: OK,
        action: "deposit",
        wallet,
        counterparty: None,
    }))
}

pub async fn withdraw<S: WalletStore + 'static>(
    State(service): State<LedgerService<S>>,
    payload: Result<Json<MovementRequest>, JsonRejection>,
) -> ApiResult<MovementResponse> {
    let Json(request) = payload?;
    let wallet = service.withdraw(&request.username, request.amount).await?;
    info!(username = %wallet.username, balance = wallet.balance, "Withdraw succeeded");

    Ok(Json(MovementResponse {
        status: OK,
        action: "withdraw",
        wallet,
        counterparty: None,
    }))
}

pub async fn transfer<S: WalletStore + 'static>(
    State(service): State<LedgerService<S>>,
    payload: Result<Json<MovementRequest>, JsonRejection>,
) -> ApiResult<MovementResponse> {
    let Json(request) = payload?;
    let counterparty = request.counterparty.as_deref().ok_or_else(|| {
        ApiErrorResponse::bad_request("ERR_COUNTERPARTY_REQUIRED", "counterparty is required")
    })?;

    let result = service
        .transfer(&request.username, counterparty, request.amount)
        .await?;
    info!(
        username = %result.wallet.username,
        counterparty = %result.counterparty.username,
        amount = request.amount,
        "Transfer succeeded"
    );

    Ok(Json(MovementResponse {
        status: OK,
        action: "transfer",
        wallet: result.wallet,
        counterparty: Some(result.counterparty.username),
    }))
}

pub async fn balance<S: WalletStore + 'static>(
    State(service): State<LedgerService<S>>,
    Query(params): Query<BalanceParams>,
) -> ApiResult<WalletResponse> {
    let wallet = service
        .get_wallet(params.username.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(WalletResponse {
        status: OK,
        wallet: Some(wallet),
        ..Default::default()
    }))
}

pub async fn admin_balance<S: WalletStore + 'static>(
    State(service): State<LedgerService<S>>,
) -> ApiResult<WalletResponse> {
    let wallets = service.list_wallets().await?;
    let message = wallets.is_empty().then(|| "No wallets found".to_string());

    Ok(Json(WalletResponse {
        status: OK,
        message,
        wallets: Some(wallets),
        ..Default::default()
    }))
}

pub async fn transactions<S: WalletStore + 'static>(
    State(service): State<LedgerService<S>>,
    Query(params): Query<TransactionParams>,
) -> ApiResult<TransactionQueryResponse> {
    let (transactions, criteria) = service
        .query_transactions(
            params.username.as_deref(),
            params.counterparty.as_deref(),
            params.kind.as_deref(),
            params.limit.as_deref(),
        )
        .await?;

    Ok(Json(TransactionQueryResponse {
        status: OK,
        criteria,
        transactions,
    }))
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "Healthy" })
}
