use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "riskdesk", version, about = "Riskdesk admin tooling")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the CLI version.
    Version,

    /// Print a bcrypt hash for a password.
    HashPassword {
        password: String,
    },

    /// Insert an admin account (runs migrations first).
    CreateAdmin {
        #[arg(
            long,
            env = "DATABASE_URL",
            default_value = "postgres://localhost:5432/riskdesk"
        )]
        database_url: String,

        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "RISKDESK_ADMIN_PASSWORD")]
        password: String,

        #[arg(long, default_value = "admin")]
        role: String,
    },

    /// Log in to a running server, call a protected path, then log out.
    Probe {
        #[arg(long, env = "RISKDESK_URL", default_value = "http://127.0.0.1:5000")]
        url: String,

        #[arg(long)]
        identifier: String,

        #[arg(long, env = "RISKDESK_ADMIN_PASSWORD")]
        password: String,

        #[arg(long, default_value = "/auth/me")]
        path: String,
    },
}
