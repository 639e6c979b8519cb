pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod validation;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::ports::{RecipientStore, TransactionStore, UserStore};
use crate::services::{
    FeePolicy, PaymentProvider, QuoteEngine, RateProvider, ReviewService, StandardFeePolicy,
    TransactionService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn TransactionStore>,
    pub recipients: Arc<dyn RecipientStore>,
    pub users: Arc<dyn UserStore>,
    pub quotes: Arc<QuoteEngine>,
    pub transactions: Arc<TransactionService>,
    pub review: Arc<ReviewService>,
}

impl AppState {
    /// Wires the service graph over one storage backend. The same path builds
    /// the production state (Postgres store) and the test state (in-memory
    /// store).
    pub fn build<S>(
        config: Config,
        store: S,
        rates: Arc<dyn RateProvider>,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self
    where
        S: TransactionStore + RecipientStore + UserStore + Clone + Send + Sync + 'static,
    {
        let transactions_store: Arc<dyn TransactionStore> = Arc::new(store.clone());
        let recipients: Arc<dyn RecipientStore> = Arc::new(store.clone());
        let users: Arc<dyn UserStore> = Arc::new(store);

        let fees: Arc<dyn FeePolicy> = Arc::new(StandardFeePolicy::from_config(&config));
        let quotes = Arc::new(QuoteEngine::new(
            rates,
            fees,
            config.supported_currencies.clone(),
            config.quote_ttl_secs,
        ));
        let transactions = Arc::new(TransactionService::new(
            transactions_store.clone(),
            recipients.clone(),
            payments,
            config.supported_currencies.clone(),
        ));
        let review = Arc::new(ReviewService::new(transactions_store.clone()));

        Self {
            config: Arc::new(config),
            store: transactions_store,
            recipients,
            users,
            quotes,
            transactions,
            review,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/webhooks/payment", post(handlers::webhook::payment_webhook))
        .route(
            "/api/v1/transactions/quote",
            post(handlers::quotes::create_quote),
        )
        .route(
            "/api/v1/transactions",
            post(handlers::transactions::create_transaction)
                .get(handlers::transactions::list_transactions),
        )
        .route(
            "/api/v1/transactions/:id",
            get(handlers::transactions::get_transaction),
        )
        .route(
            "/api/v1/transactions/:id/cancel",
            post(handlers::transactions::cancel_transaction),
        )
        .route(
            "/api/v1/recipients",
            post(handlers::recipients::create_recipient)
                .get(handlers::recipients::list_recipients),
        )
        .route(
            "/api/v1/recipients/:id",
            get(handlers::recipients::get_recipient).patch(handlers::recipients::update_recipient),
        )
        .route(
            "/api/v1/admin/transactions/pending",
            get(handlers::admin::list_pending),
        )
        .route(
            "/api/v1/admin/transactions/:id/approve",
            post(handlers::admin::approve),
        )
        .route(
            "/api/v1/admin/transactions/:id/reject",
            post(handlers::admin::reject),
        )
        .route(
            "/api/v1/admin/transactions/:id/payout-initiated",
            post(handlers::admin::payout_initiated),
        )
        .route(
            "/api/v1/admin/transactions/:id/payout-completed",
            post(handlers::admin::payout_completed),
        )
        .route(
            "/api/v1/admin/transactions/:id/delivered",
            post(handlers::admin::delivered),
        )
        .route(
            "/api/v1/admin/transactions/:id/refund-confirmed",
            post(handlers::admin::refund_confirmed),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
