//! Vitalis CLI - migrations, catalog seeding, and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! vitalis migrate
//!
//! # Upsert the catalog rows from the pricing tables
//! vitalis seed products
//!
//! # Grant or revoke admin access
//! vitalis admin grant 4f0c...e1
//! vitalis admin revoke 4f0c...e1
//!
//! # Price lookups (no store needed)
//! vitalis price quote vision annual
//! vitalis price distributor neuro 30-pack
//! vitalis price table
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vitalis")]
#[command(author, version, about = "Vitalis storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage admin access
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Look up prices
    Price {
        #[command(subcommand)]
        query: PriceQuery,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert one `product` row per catalog product
    Products,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Mark a user account as admin
    Grant {
        /// Identity-provider user id
        user_id: String,
    },
    /// Remove admin access from a user account
    Revoke {
        /// Identity-provider user id
        user_id: String,
    },
}

#[derive(Subcommand)]
enum PriceQuery {
    /// Subscription price for one billing period
    Quote {
        /// Product id (vision, neuro, fortify, complete)
        product: String,
        /// Billing frequency (monthly, annual)
        frequency: String,
    },
    /// Distributor package price
    Distributor {
        /// Product id (vision, neuro, fortify)
        product: String,
        /// Package tier (10, 30, 60 or 10-pack, ...)
        tier: String,
    },
    /// Full price sheet
    Table,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products => {
                commands::seed::products().await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Grant { user_id } => commands::admin::set_admin(&user_id, true).await?,
            AdminAction::Revoke { user_id } => {
                commands::admin::set_admin(&user_id, false).await?;
            }
        },
        Commands::Price { query } => match query {
            PriceQuery::Quote { product, frequency } => commands::price::quote(&product, &frequency)?,
            PriceQuery::Distributor { product, tier } => {
                commands::price::distributor(&product, &tier)?;
            }
            PriceQuery::Table => commands::price::table(),
        },
    }
    Ok(())
}
