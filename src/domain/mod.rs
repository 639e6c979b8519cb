pub mod ledger;
pub mod money;
pub mod payout;
pub mod recipient;
pub mod status;
pub mod transaction;
pub mod user;

pub use ledger::{InternalLedgerEntry, LedgerEventType, NewLedgerEntry};
pub use payout::PayoutMethod;
pub use recipient::Recipient;
pub use status::{InvalidTransition, TransactionEvent, TransactionStatus};
pub use transaction::{QuoteFields, Transaction};
pub use user::{KycStatus, User};
