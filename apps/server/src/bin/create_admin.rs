//! Creates an admin account. Fails if the email is already registered.

use api_protocol::RegisterRequest;
use asali_server::{init_tracing, services::accounts};
use clap::Parser;
use entities::UserRole;
use shop_store::PostgresShopStore;

/// Asali admin bootstrap
#[derive(Debug, Parser)]
#[command(name = "create-admin", about = "Create an Asali admin account", long_about = None)]
struct Args {
    /// Display name for a new account
    #[arg(long, env = "ADMIN_NAME", default_value = "Admin")]
    name: String,

    /// Account email
    #[arg(long, env = "ADMIN_EMAIL")]
    email: String,

    /// Password for a new account
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,

    /// `PostgreSQL` connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(&args.log_level);

    let store = PostgresShopStore::connect(&args.database_url, 1).await?;
    store.init().await?;

    let request = RegisterRequest {
        name: args.name,
        email: args.email,
        password: args.password,
        role: None,
    };
    let user = accounts::register(&store, request, UserRole::Admin).await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Admin account created");
    Ok(())
}
