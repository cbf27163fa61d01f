//! Riskdesk API server binary.
//!
//! Serves the session authentication endpoints over the PostgreSQL admin
//! store. Shuts down gracefully on Ctrl-C.

use clap::Parser;
use riskdesk_api::config::{ApiConfig, Environment};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments for the API server. Each flag overrides the matching
/// environment variable read by [`ApiConfig::from_env`].
#[derive(Parser, Debug)]
#[command(name = "riskdesk_api_server", about = "Riskdesk API server")]
struct Args {
    /// Address to listen on (`BIND_ADDR`).
    #[arg(long)]
    bind: Option<String>,

    /// PostgreSQL connection URL (`DATABASE_URL`).
    #[arg(long)]
    database_url: Option<String>,

    /// Deployment environment (`RISKDESK_ENV`); `production` enables secure
    /// cross-site cookies.
    #[arg(long)]
    env: Option<Environment>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Skip running embedded migrations at startup.
    #[arg(long, default_value_t = false)]
    skip_migrations: bool,
}

impl Args {
    fn into_config(self, mut config: ApiConfig) -> ApiConfig {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(url) = self.database_url {
            config.pg_connection_url = url;
        }
        if let Some(env) = self.env {
            config.environment = env;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,riskdesk_api=debug,riskdesk_core=debug".into()),
        )
        .init();

    let args = Args::parse();
    let max_connections = args.max_connections;
    let skip_migrations = args.skip_migrations;
    let config = args.into_config(ApiConfig::from_env());

    info!(
        bind = %config.bind_addr,
        environment = ?config.environment,
        "starting riskdesk_api_server"
    );
    if !config.environment.is_production() {
        warn!("development mode: session cookies are sent without the Secure flag");
    }

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.pg_connection_url)
        .await?;

    if skip_migrations {
        info!("skipping database migrations");
    } else {
        info!("running database migrations");
        riskdesk_api::migrate(&pool).await?;
    }

    let state = riskdesk_api::AppState::with_pool(pool, &config);
    let app = riskdesk_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
            }
            shutdown.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("server stopped");
    Ok(())
}
