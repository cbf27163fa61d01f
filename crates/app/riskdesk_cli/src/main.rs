// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use riskdesk_client::{HttpTransport, SessionGuard};
use riskdesk_core::auth::password::hash_password;
use riskdesk_core::auth::store::{AdminDirectory, PgAdminStore};
use riskdesk_core::models::auth::NewAdmin;
use sqlx::postgres::PgPoolOptions;

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
        }
        Commands::CreateAdmin {
            database_url,
            username,
            email,
            password,
            role,
        } => {
            let admin = NewAdmin {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                password_hash: hash_password(&password)?,
                role,
            };
            runtime()?.block_on(create_admin(&database_url, admin))?;
        }
        Commands::Probe {
            url,
            identifier,
            password,
            path,
        } => {
            runtime()?.block_on(probe(&url, &identifier, &password, &path))?;
        }
    }

    Ok(())
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

async fn create_admin(database_url: &str, admin: NewAdmin) -> Result<()> {
    if admin.username.is_empty() || admin.email.is_empty() {
        return Err(Error::Custom("username and email are required".into()));
    }

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await?;
    riskdesk_core::migrate::migrate(&pool).await?;

    let account = PgAdminStore::new(pool).create_admin(admin).await?;
    log::info!("created admin {}", account.id);
    println!("{}", serde_json::to_string_pretty(&account.profile())?);
    Ok(())
}

async fn probe(url: &str, identifier: &str, password: &str, path: &str) -> Result<()> {
    let guard = SessionGuard::new(HttpTransport::new(url)?);

    let who = guard.login(identifier, password).await?;
    log::info!("logged in as {}", who.username);

    let outcome = guard.get_json::<serde_json::Value>(path).await;

    if let Err(e) = guard.logout().await {
        log::warn!("logout failed: {e}");
    }

    println!("{}", serde_json::to_string_pretty(&outcome?)?);
    Ok(())
}
