//! # xapi server
//!
//! Serves the assets API. Startup order: logging, configuration (`.env`
//! layering plus environment), record store selection (Supabase, then
//! MySQL), router, then serve until Ctrl-C or SIGTERM and close the store.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xapi_config::{Config, ConfigLoad, ConfigLoader};
use xapi_core::{
    AssetRepository, StoreContext, database::mysql::MySqlAssetRepository,
};
use xapi_server::{AppState, create_app};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "xapi-server")]
#[command(about = "Assets API over MySQL or Supabase")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Server port (overrides SERVER_PORT from the environment and env files)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides SERVER_HOST from the environment and env files)
    #[arg(long)]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Select a record store exactly as the server would, report it and exit
    Check,
    /// Create the MySQL assets table if it does not exist and exit
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(&cli.serve)?;

    match cli.command {
        Some(Command::Db(DbCommand::Check)) => run_db_check(&config).await,
        Some(Command::Db(DbCommand::Init)) => run_db_init(&config).await,
        None => run_server(config).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(args: &ServeArgs) -> anyhow::Result<Config> {
    let ConfigLoad {
        mut config,
        warnings,
    } = ConfigLoader::new()
        .load()
        .context("failed to load configuration")?;

    for path in &config.metadata.env_files_loaded {
        info!(path = %path.display(), "loaded env file");
    }
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => warn!(%hint, "{}", warning.message),
            None => warn!("{}", warning.message),
        }
    }

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    Ok(config)
}

async fn run_db_check(config: &Config) -> anyhow::Result<()> {
    let store = StoreContext::connect(&config.database, &config.cache).await;
    let kind = store
        .backend_kind()
        .context("no record store backend is reachable")?;
    info!(backend = %kind, "record store check passed");
    store.close().await;
    Ok(())
}

async fn run_db_init(config: &Config) -> anyhow::Result<()> {
    let mysql = MySqlAssetRepository::connect(&config.database.mysql)
        .await
        .context("failed to connect to MySQL")?;
    mysql
        .initialize_schema()
        .await
        .context("failed to create the assets table")?;
    mysql.close().await;
    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let config = Arc::new(config);
    info!(
        environment = %config.auth.environment,
        api_keys = config.auth.api_keys.len(),
        "starting xapi server"
    );

    let store = StoreContext::connect(&config.database, &config.cache).await;
    let state = AppState::new(store.clone(), Arc::clone(&config));
    let router = create_app(state);

    let listener = tokio::net::TcpListener::bind((
        config.server.host.as_str(),
        config.server.port,
    ))
    .await
    .with_context(|| {
        format!(
            "failed to bind {}:{}",
            config.server.host, config.server.port
        )
    })?;
    let addr = listener.local_addr()?;
    info!(%addr, backend = ?store.backend_kind(), "listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    store.close().await;
    info!("xapi server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
