//! Apotek CLI - catalog management against the remote catalog service.
//!
//! # Usage
//!
//! ```bash
//! # List products, optionally filtered and sorted
//! apotek-cli products list --query para --sort price --desc
//!
//! # Add a product (prices may be written as "Rp 12.500")
//! apotek-cli products add -b 8991001 -n "Paracetamol 500mg" -u strip -p 12500 -s 40
//!
//! # Edit only the fields given
//! apotek-cli products edit 8991001 --stock 25
//!
//! # Delete a product
//! apotek-cli products delete 8991001
//!
//! # Pay for a quantity of one product
//! apotek-cli pay 8991001 2
//! ```
//!
//! # Environment Variables
//!
//! - `CATALOG_API_URL` - Catalog service base URL (default: `http://localhost:5000`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use apotek_core::SortKey;
use clap::{Parser, Subcommand, ValueEnum};
use url::Url;

mod commands;

#[derive(Parser)]
#[command(name = "apotek-cli")]
#[command(author, version, about = "Apotek catalog tools")]
struct Cli {
    /// Catalog service base URL
    #[arg(long, env = "CATALOG_API_URL", default_value = "http://localhost:5000")]
    api_url: Url,

    /// Request timeout in seconds
    #[arg(long, env = "CATALOG_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage catalog products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Submit a payment for one product
    Pay {
        /// Product barcode
        barcode: String,

        /// Units paid for
        quantity: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortColumn {
    Barcode,
    Name,
    Price,
    Stock,
}

impl From<SortColumn> for SortKey {
    fn from(column: SortColumn) -> Self {
        match column {
            SortColumn::Barcode => Self::Barcode,
            SortColumn::Name => Self::Name,
            SortColumn::Price => Self::Price,
            SortColumn::Stock => Self::Stock,
        }
    }
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products
    List {
        /// Only products whose barcode, name, price or stock contain this text
        #[arg(short, long, default_value = "")]
        query: String,

        /// Column to sort by
        #[arg(long, value_enum)]
        sort: Option<SortColumn>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
    },
    /// Add a product
    Add {
        #[arg(short, long)]
        barcode: String,

        #[arg(short, long)]
        name: String,

        /// Selling unit (e.g., strip, bottle)
        #[arg(short, long)]
        unit: String,

        #[arg(short, long)]
        price: String,

        #[arg(short, long)]
        stock: String,
    },
    /// Edit a product; omitted fields are left unchanged
    Edit {
        barcode: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        unit: Option<String>,

        #[arg(short, long)]
        price: Option<String>,

        #[arg(short, long)]
        stock: Option<String>,
    },
    /// Delete a product
    Delete { barcode: String },
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), commands::CommandError> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let client = commands::client(cli.api_url, Duration::from_secs(cli.timeout))?;

    match cli.command {
        Commands::Products { action } => match action {
            ProductAction::List { query, sort, desc } => {
                commands::products::list(&client, &query, sort.map(SortKey::from), desc).await?;
            }
            ProductAction::Add {
                barcode,
                name,
                unit,
                price,
                stock,
            } => {
                let form = apotek_core::ProductForm {
                    barcode,
                    name,
                    unit,
                    price,
                    stock,
                };
                commands::products::add(&client, &form).await?;
            }
            ProductAction::Edit {
                barcode,
                name,
                unit,
                price,
                stock,
            } => {
                let form = apotek_core::ProductPatchForm {
                    name,
                    unit,
                    price,
                    stock,
                };
                commands::products::edit(&client, &barcode, &form).await?;
            }
            ProductAction::Delete { barcode } => {
                commands::products::delete(&client, &barcode).await?;
            }
        },
        Commands::Pay { barcode, quantity } => {
            commands::pay::pay(&client, &barcode, quantity).await?;
        }
    }
    Ok(())
}
