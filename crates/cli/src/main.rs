//! Souk CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! souk-cli migrate
//!
//! # Load regions, sub-regions, desks and shipping rates
//! souk-cli seed locations data/locations.yaml
//!
//! # Create a 10% code limited to 100 uses
//! souk-cli promo create --code SAVE10 --kind percentage --value 10 --usage-limit 100
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed locations` - Upsert location reference data from YAML
//! - `promo create` - Create promotional codes

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::promo::PromoArgs;

#[derive(Parser)]
#[command(name = "souk-cli")]
#[command(author, version, about = "Souk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage promotional codes
    Promo {
        #[command(subcommand)]
        action: PromoAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert regions, sub-regions, desks and shipping rates from a YAML file
    Locations {
        /// Path to the YAML file
        file: String,

        /// Validate the file without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum PromoAction {
    /// Create a new promotional code
    Create(PromoArgs),
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Locations { file, dry_run } => {
                commands::seed::locations(&file, dry_run).await?;
            }
        },
        Commands::Promo { action } => match action {
            PromoAction::Create(args) => {
                commands::promo::create(&args).await?;
            }
        },
    }
    Ok(())
}
