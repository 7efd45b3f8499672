//! Scallop Leverage Loop
//!
//! Repeatedly deposits wallet collateral into a Scallop obligation on Sui and
//! borrows against the resulting capacity, with safety margins on every borrow.
//! Ctrl-C stops the loop at the next suspension point.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use leverage_chain::OracleProvider;
use leverage_core::{
    config, init_config, load_deployment_from_env, AssetRegistry, LeverageLoop, ScallopMarket,
    StopSignal,
};

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,leverage_core=debug,leverage_chain=debug")),
        )
        .init();

    // Deployment selected by DEPLOYMENT, files under CONFIG_DIR
    let deployment = load_deployment_from_env().context("Failed to load deployment")?;
    deployment.bot.log_config();
    init_config(deployment.bot.clone());
    let bot = config();

    info!(
        deployment = %deployment.name,
        network = %deployment.network,
        owner = %deployment.owner,
        "Starting leverage loop"
    );

    let market = Arc::new(
        ScallopMarket::new(
            deployment.name.clone(),
            &deployment.rpc_url,
            &deployment.gateway_url,
            bot.cycle.rpc_timeout(),
        )
        .context("Failed to initialize market adapter")?,
    );

    let oracle = Arc::new(OracleProvider::new(market.clone()));
    let registry = AssetRegistry::from_resolved(&deployment.assets);
    let feeds = registry.register_feeds(&oracle);
    info!(assets = registry.len(), feeds, "Asset registry loaded");

    let stop = StopSignal::new();
    let lever = LeverageLoop::new(
        market,
        oracle,
        &registry,
        deployment.owner,
        bot,
        stop.clone(),
    )
    .context("Invalid strategy configuration")?;

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                stop.stop();
            }
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let summary = lever.run().await.context("Leverage loop aborted")?;

    info!(
        iterations = summary.iterations,
        completed = summary.completed,
        deposited = summary.total_deposited_raw,
        borrowed = summary.total_borrowed_raw,
        "Shutdown complete"
    );

    Ok(())
}

/// Print startup banner.
fn print_banner() {
    println!(
        r#"
    ╔═╗┌─┐┌─┐┬  ┬  ┌─┐┌─┐  ╦  ┌─┐┌─┐┌─┐
    ╚═╗│  ├─┤│  │  │ │├─┘  ║  │ ││ │├─┘
    ╚═╝└─┘┴ ┴┴─┘┴─┘└─┘┴    ╩═╝└─┘└─┘┴
    Leverage Loop v0.1.0
    "#
    );
}
