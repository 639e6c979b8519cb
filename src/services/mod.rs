pub mod fees;
pub mod payments;
pub mod quote;
pub mod rates;
pub mod review;
pub mod transactions;

pub use fees::{FeeBreakdown, FeePolicy, StandardFeePolicy};
pub use payments::{PaymentError, PaymentIntent, PaymentProvider, SimulatedPaymentProvider};
pub use quote::{Quote, QuoteEngine, QuoteRequest};
pub use rates::{FixedRateProvider, HttpRateProvider, RateError, RateProvider};
pub use review::ReviewService;
pub use transactions::{CreateTransactionRequest, CreatedTransaction, TransactionService};
