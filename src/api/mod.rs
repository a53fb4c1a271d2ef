//! HTTP surface of the ledger.

pub mod dto;
pub mod error;
pub mod handlers;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::application::LedgerService;
use crate::storage::WalletStore;

pub use error::{ApiError, ApiErrorResponse};

/// Build the application router over a ledger service.
pub fn router<S: WalletStore + 'static>(service: LedgerService<S>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Mutations
        .route("/deposit", post(handlers::deposit::<S>))
        .route("/withdraw", post(handlers::withdraw::<S>))
        .route("/transfer", post(handlers::transfer::<S>))
        // Reads
        .route("/balance", get(handlers::balance::<S>))
        .route("/admin/balance", get(handlers::admin_balance::<S>))
        .route("/transactions", get(handlers::transactions::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
