// Application layer - use cases and orchestration.
// Every mutating operation runs inside one atomic scope opened by the
// top-level call; the `*_in` legs compose inside a caller's scope.

mod config;
mod deposit;
pub mod error;
mod journal;
mod service;
mod transfer;
mod withdraw;

pub use config::*;
pub use deposit::*;
pub use error::*;
pub use journal::*;
pub use service::LedgerService;
pub use transfer::*;
