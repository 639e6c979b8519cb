use clap::Parser;
use sqlx::migrate::Migrator;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use remity_core::adapters::{create_pool, PostgresStore};
use remity_core::cli::{Cli, Commands, DbCommands};
use remity_core::config::Config;
use remity_core::services::{
    FixedRateProvider, HttpRateProvider, PaymentProvider, RateProvider, SimulatedPaymentProvider,
};
use remity_core::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Db(DbCommands::Migrate) => remity_core::cli::handle_db_migrate(&config).await,
        Commands::Config => remity_core::cli::handle_config_validate(&config),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = create_pool(&config.database_url).await?;

    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let rates: Arc<dyn RateProvider> = match &config.rate_provider_url {
        Some(url) => {
            tracing::info!(url, "using external rate provider");
            Arc::new(HttpRateProvider::new(url.clone()))
        }
        None => {
            tracing::warn!("RATE_PROVIDER_URL unset, using static development rates");
            Arc::new(FixedRateProvider::with_default_rates())
        }
    };
    let payments: Arc<dyn PaymentProvider> = Arc::new(SimulatedPaymentProvider::new());

    let server_port = config.server_port;
    let state = AppState::build(config, PostgresStore::new(pool), rates, payments);
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
