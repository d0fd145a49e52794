//! Padel bracket server.
//!
//! Serves bracket generation, result recording and the ranking over HTTP,
//! backed by PostgreSQL.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use padel_bracket::db::{Database, PgBracketRepository};
use padel_bracket::{BracketManager, RankingManager};
use pb_server::{api, config::ServerConfig, logging, metrics};
use pico_args::Arguments;
use tracing::{error, info, warn};

const HELP: &str = "\
Run the padel bracket server

USAGE:
  pb_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/padel_db]
  --seed       N           Fixed seed for bracket draws  [default: env BRACKET_SHUFFLE_SEED or random]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  RANKING_DEFAULT_LIMIT    Ranking page size when no limit is given [default: 50]
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
  (See .env file for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        seed: pargs.opt_value_from_str("--seed")?,
    };

    let config = ServerConfig::from_env(args.bind, args.database_url, args.seed)?;
    config.validate()?;

    logging::init();
    info!("Starting padel bracket server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        match metrics::init_metrics(addr) {
            Ok(()) => info!("Prometheus metrics exposed at http://{}/metrics", addr),
            Err(e) => warn!("Metrics disabled: {}", e),
        }
    }

    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    db.migrate()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database connected successfully");

    let repo = Arc::new(PgBracketRepository::new(db.pool().clone()));
    let bracket_manager = match config.shuffle_seed {
        Some(seed) => {
            warn!("Bracket draws use the fixed seed {}", seed);
            BracketManager::with_seed(repo.clone(), seed)
        }
        None => BracketManager::new(repo.clone()),
    };

    let api_state = api::AppState {
        bracket_manager: Arc::new(bracket_manager),
        ranking_manager: Arc::new(RankingManager::new(repo)),
        ranking_default_limit: config.ranking_default_limit,
    };

    let app = api::create_router(api_state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
