//! Prediction Market API Server
//!
//! Serves reconciled on-chain market state for the web client.

mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use market_chain::{AdminWallet, ContractGateway, OracleController, RpcGateway};
use market_services::{
    AdminService, Clock, MarketAggregator, MarketWatcher, PortfolioReader,
    ReadContext, RefreshInputs, ServiceConfig, SystemClock,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ctx: ReadContext,
    pub watcher: Arc<MarketWatcher>,
    pub portfolio: Arc<PortfolioReader>,
    pub clock: Arc<dyn Clock>,
    /// Creation time used for markets without a recorded one
    pub created_at: i64,
    /// Admin trigger (optional - requires ORACLE_CONTROLLER_ADDRESS and ORACLE_PRIVATE_KEY)
    pub admin: Option<Arc<AdminService>>,
}

/// Build the HTTP router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local in the current directory
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,market_api=debug,market_services=debug".into()
            }),
        )
        .init();

    info!("Starting Prediction Market API Server");

    let config = ServiceConfig::from_env()?;
    info!("Configuration: {:?}", config);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let started_at = clock.now();

    let gateway = Arc::new(RpcGateway::connect(config.rpc_url.clone()));
    match gateway.chain_id().await {
        Ok(chain_id) if chain_id == config.chain_id => {
            info!("Connected to chain {} at {}", chain_id, config.rpc_url);
        }
        Ok(chain_id) => {
            warn!(
                "RPC node at {} serves chain {}, expected {}",
                config.rpc_url, chain_id, config.chain_id
            );
        }
        Err(e) => {
            warn!("Could not reach RPC node at {}: {}", config.rpc_url, e);
        }
    }

    let ctx = ReadContext::new(config.chain_id, gateway);

    if config.market_maker.is_none() {
        warn!("MARKET_MAKER_ADDRESS not set - serving placeholder markets");
    }

    let settings = config.aggregator_settings(started_at);
    let created_at = settings.metadata.created_at;
    let aggregator = Arc::new(MarketAggregator::new(settings, clock.clone()));
    let watcher = Arc::new(MarketWatcher::spawn(
        aggregator,
        ctx.clone(),
        RefreshInputs {
            account: None,
            market_maker: config.market_maker,
        },
        config.refresh_interval,
    ));

    let admin = match (config.oracle_controller, config.oracle_private_key.as_deref()) {
        (Some(address), Some(key)) => {
            let wallet = AdminWallet::from_private_key(key)?;
            let oracle = OracleController::connect(config.rpc_url.clone(), address, &wallet);
            info!(
                "Admin trigger enabled (controller {}, sender {})",
                address,
                wallet.address_string()
            );
            Some(Arc::new(AdminService::new(Arc::new(oracle), watcher.clone())))
        }
        (Some(_), None) => {
            warn!("ORACLE_CONTROLLER_ADDRESS set without ORACLE_PRIVATE_KEY - admin trigger disabled");
            None
        }
        _ => {
            info!("Admin trigger disabled");
            None
        }
    };

    let state = AppState {
        ctx,
        watcher: watcher.clone(),
        portfolio: Arc::new(PortfolioReader::new(clock.clone(), config.refresh_timeout)),
        clock,
        created_at,
        admin,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    watcher.shutdown().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use alloy_primitives::{Address, B256};
    use market_chain::testing::{FakeChain, FakeMarketMaker};
    use market_services::{AggregatorSettings, FixedClock};
    use std::time::Duration;

    pub const NOW: i64 = 1_760_000_000;
    pub const MARKET_MAKER: Address = Address::repeat_byte(0xa1);
    pub const CONDITIONAL_TOKENS: Address = Address::repeat_byte(0xb2);
    pub const COLLATERAL: Address = Address::repeat_byte(0xc3);
    pub const CONDITION: B256 = B256::repeat_byte(0xd4);

    /// State over an in-memory chain, with the first refresh applied
    pub async fn state(chain: Arc<FakeChain>, market_maker: Option<Address>) -> AppState {
        chain.add_market(
            MARKET_MAKER,
            FakeMarketMaker::new(CONDITIONAL_TOKENS, COLLATERAL, CONDITION),
        );

        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(NOW));
        let ctx = ReadContext::new(31337, chain);
        let aggregator = Arc::new(MarketAggregator::new(
            AggregatorSettings::new(NOW - 86_400),
            clock.clone(),
        ));
        let watcher = Arc::new(MarketWatcher::spawn(
            aggregator,
            ctx.clone(),
            RefreshInputs {
                account: None,
                market_maker,
            },
            Duration::from_secs(3600),
        ));

        let mut updates = watcher.subscribe();
        while updates.borrow_and_update().is_none() {
            if updates.changed().await.is_err() {
                break;
            }
        }

        AppState {
            ctx,
            watcher,
            portfolio: Arc::new(PortfolioReader::new(clock.clone(), Duration::from_secs(5))),
            clock,
            created_at: NOW - 86_400,
            admin: None,
        }
    }
}
