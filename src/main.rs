use axum::Router;
use mirage::config::Config;
use mirage::services::{
    FeedConfig, MarketDataFeed, PortfolioEngine, SqliteStore, TransactionLedger,
};
use mirage::types::{SymbolSpec, TransactionInput};
use mirage::{api, AppState};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Holder seeded with a starter history on first launch, so the UI has
/// something to render before any manual submissions.
const DEMO_HOLDER: &str = "demo";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mirage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting Mirage server on {}:{}", config.host, config.port);

    // Durable ledger store
    let store = Arc::new(SqliteStore::new(&config.db_path)?);
    let ledger = Arc::new(TransactionLedger::new(store));

    // Synthetic market over the built-in universe
    let feed = MarketDataFeed::new(
        SymbolSpec::default_universe(),
        FeedConfig {
            tick_interval: config.tick_interval,
            seed: config.market_seed,
            ..FeedConfig::default()
        },
    );

    // Accounting engine wired to feed and ledger
    let engine = PortfolioEngine::new(feed.clone(), ledger);
    engine.ensure_holder(DEMO_HOLDER).await;
    seed_demo_account(&engine).await;

    // Start ticking
    feed.start();

    let state = AppState {
        config: config.clone(),
        feed: feed.clone(),
        engine: engine.clone(),
    };

    let app = Router::new()
        .merge(api::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Tear the session down: no background work may survive.
    engine.shutdown();
    feed.stop();
    info!("Mirage server stopped");

    Ok(())
}

/// Give a fresh demo account a starter history: one deposit and two buys.
async fn seed_demo_account(engine: &Arc<PortfolioEngine>) {
    if !engine.transactions(DEMO_HOLDER).is_empty() {
        return;
    }

    let starter = [
        TransactionInput::deposit("USDT", 20_000.0),
        TransactionInput::buy("BTC/USDT", 0.25, 42_000.0, 10.5),
        TransactionInput::buy("ETH/USDT", 2.5, 2_600.0, 6.5),
    ];

    for input in starter {
        if let Err(e) = engine.submit_transaction(DEMO_HOLDER, input).await {
            warn!("Could not seed demo account: {}", e);
            return;
        }
    }
    info!("Seeded demo account");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
