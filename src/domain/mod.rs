mod criteria;
mod ledger;
mod money;
mod transaction;
mod username;
mod wallet;

pub use criteria::*;
pub use ledger::*;
pub use money::*;
pub use transaction::*;
pub use username::*;
pub use wallet::*;
