pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use tokio::signal;

use anyhow::Context;
use auth::SessionManager;
pub use config::Config;
use db::Store;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.clone(), value.clone())?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "serve" | "-s" | "--serve" => run_server(config, prometheus_handle).await,

        "check" | "-c" | "--check" => run_single_check(config).await,

        "init" => {
            if Config::create_default_if_missing()? {
                println!("Created default config.toml");
            } else {
                println!("config.toml already exists, leaving it alone");
            }
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        unknown => {
            println!("Unknown command: {unknown}");
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("ModelBay - Model Package Registry");
    println!("A self-hosted registry for ML model packages");
    println!();
    println!("USAGE:");
    println!("  modelbay <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("  serve             Start the HTTP API server");
    println!("  check             Verify config, database, and session key");
    println!("  init              Create default config file");
    println!("  help              Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  modelbay init     # Write config.toml with defaults");
    println!("  modelbay check    # Make sure the server could start");
    println!("  modelbay serve    # Serve the API on the configured port");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to configure the server, auth, and logging.");
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("ModelBay v{} starting...", env!("CARGO_PKG_VERSION"));

    let port = config.server.port;
    let state = api::create_app_state_from_config(config, prometheus_handle).await?;

    let app = api::router(state).await;
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("API server running at http://0.0.0.0:{port}");
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    info!("Server running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    server_handle.abort();
    info!("Server stopped");

    Ok(())
}

async fn run_single_check(config: Config) -> anyhow::Result<()> {
    info!("Checking configuration and database...");

    let store = Store::new(&config.general.database_path).await?;
    store.ping().await?;

    let users = store.count_users().await?;
    let packages = store.count_packages().await?;

    // Loading the manager proves the key file is usable.
    let _sessions = SessionManager::new(store, &config.auth)?;

    println!("Database: {}", config.general.database_path);
    println!("  Users: {users}");
    println!("  Packages: {packages}");
    println!("Session key: {} (ok)", config.auth.key_path);
    println!("Server port: {}", config.server.port);

    info!("Check complete");
    Ok(())
}
