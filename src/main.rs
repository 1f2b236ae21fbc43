//! Items API and demo frontend entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dynamo_items::api::{cors_layer, create_router, AppState};
use dynamo_items::client::ItemsClient;
use dynamo_items::config::Config;
use dynamo_items::frontend::create_frontend_router;
use dynamo_items::guard::TableGuard;
use dynamo_items::metrics;
use dynamo_items::seed::{seed_direct, seed_via_api, SampleItems};
use dynamo_items::store::{DynamoStore, ItemStore};
use dynamo_items::utils::shutdown_signal;

/// Items API backed by DynamoDB, plus its static demo frontend.
#[derive(Parser, Debug)]
#[command(name = "dynamo-items")]
#[command(about = "Create and list items in a lazily provisioned DynamoDB table")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the items API (default).
    Serve {
        /// Listen port, overrides BACKEND_PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Serve the browser demo.
    Frontend {
        /// Listen port, overrides FRONTEND_PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Create sample items.
    Seed {
        /// Number of items to create.
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,

        /// Write to the table directly instead of going through the API.
        #[arg(long)]
        direct: bool,
    },

    /// Print every item.
    List {
        /// Scan the table directly instead of going through the API.
        #[arg(long)]
        direct: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Configuration is loaded before logging so RUST_LOG and LOG_JSON apply
    let config = Config::load();
    let (log_level, log_json) = match &config {
        Ok(c) => (c.rust_log.as_str(), c.log_json),
        Err(_) => ("info", false),
    };

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("dynamo_items=debug,info")
    } else {
        EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(config),
        Some(Command::Frontend { port }) => cmd_frontend(config, port).await,
        Some(Command::Seed { count, direct }) => cmd_seed(config, count, direct).await,
        Some(Command::List { direct }) => cmd_list(config, direct).await,
        Some(Command::Serve { port }) => cmd_serve(config, port).await,
        None => cmd_serve(config, None).await,
    }
}

fn validated(config: Config) -> anyhow::Result<Config> {
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }
    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config(config: Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("ITEMS API - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Backend Port: {}", config.backend_port);
    println!("  Frontend Port: {}", config.frontend_port);
    println!("  Frontend Origin (CORS): {}", config.frontend_origin);
    println!("  Backend URL: {}", config.backend_url);
    println!("  Static Dir: {}", config.static_dir);
    println!("  Table: {}", config.table_name);
    println!(
        "  Throughput: {} read / {} write",
        config.table_read_capacity, config.table_write_capacity
    );
    println!(
        "  Table Wait: {}s (poll every {}s)",
        config.table_wait_secs, config.table_poll_secs
    );
    println!(
        "  AWS Region: {}",
        config.aws_region.as_deref().unwrap_or("(SDK default chain)")
    );
    println!(
        "  AWS Endpoint: {}",
        config.aws_endpoint_url.as_deref().unwrap_or("(default)")
    );
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Run the items API.
async fn cmd_serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let config = validated(config)?;
    let port = port.unwrap_or(config.backend_port);

    let handle = metrics::install_prometheus()?;

    let store = DynamoStore::from_config(&config).await;
    let guard = Arc::new(TableGuard::new(config.table_definition(), config.wait_policy()));

    info!("Table: {}", guard.table_name());
    match guard.ensure(&store).await {
        Ok(()) => info!("Table ready"),
        Err(e) => warn!(
            code = e.code(),
            "Table not ready at startup: {}. Requests will retry provisioning",
            e
        ),
    }

    let store: Arc<dyn ItemStore> = Arc::new(store);
    let app_state = AppState::new(store, guard).with_metrics(handle);
    let router = create_router(app_state, cors_layer(&config.frontend_origin)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Items API listening on http://{}", addr);
    info!("Allowing requests from: {}", config.frontend_origin);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Items API stopped");
    Ok(())
}

/// Serve the browser demo.
async fn cmd_frontend(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let config = validated(config)?;
    let port = port.unwrap_or(config.frontend_port);

    if !std::path::Path::new(&config.static_dir).is_dir() {
        warn!("Static directory {} does not exist", config.static_dir);
    }

    let router = create_frontend_router(&config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Frontend listening on http://{}", addr);
    info!("Open http://localhost:{}/index.html", port);
    info!("API calls go to {}", config.backend_base_url());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Frontend stopped");
    Ok(())
}

/// Create sample items.
async fn cmd_seed(config: Config, count: usize, direct: bool) -> anyhow::Result<()> {
    let config = validated(config)?;
    let mut generator = SampleItems::new("cli");

    let outcomes = if direct {
        let store = DynamoStore::from_config(&config).await;
        let guard = TableGuard::new(config.table_definition(), config.wait_policy());
        seed_direct(&store, &guard, &mut generator, count).await?
    } else {
        let client = ItemsClient::new(config.backend_base_url())?;
        seed_via_api(&client, &mut generator, count).await
    };

    for outcome in &outcomes {
        match &outcome.error {
            None => println!("  OK      {}", outcome.id),
            Some(e) => println!("  FAILED  {}: {}", outcome.id, e),
        }
    }

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    println!("{} of {} items stored", outcomes.len() - failed, outcomes.len());

    if failed > 0 {
        return Err(anyhow::anyhow!("{} items could not be stored", failed));
    }
    Ok(())
}

/// Print every item.
async fn cmd_list(config: Config, direct: bool) -> anyhow::Result<()> {
    let config = validated(config)?;

    let items = if direct {
        let store = DynamoStore::from_config(&config).await;
        let guard = TableGuard::new(config.table_definition(), config.wait_policy());
        guard.ensure(&store).await?;
        store.scan(guard.table_name()).await?
    } else {
        let client = ItemsClient::new(config.backend_base_url())?;
        client.list_items().await?.items
    };

    println!("{}", serde_json::to_string_pretty(&items)?);
    println!("{} items", items.len());
    Ok(())
}
