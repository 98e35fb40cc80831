//! Lunaria CLI - exercise a shopping session against a live backend.
//!
//! # Usage
//!
//! ```bash
//! # Inspect and edit the cart
//! lunaria cart show
//! lunaria cart add -p 42 -q 2
//! lunaria cart set -i 7 -q 3
//! lunaria cart remove -i 7
//! lunaria cart clear
//!
//! # Wishlist
//! lunaria wishlist show
//! lunaria wishlist add -p 42
//!
//! # Local comparison tray
//! lunaria compare add -p 42
//! lunaria compare show
//!
//! # Scripted checkout (card details via CARD_* environment variables)
//! lunaria checkout run --address 3 --method card
//! ```
//!
//! # Environment Variables
//!
//! - `COMMERCE_API_BASE_URL` - Base URL of the catalog/order backend
//! - `COMMERCE_BEARER_TOKEN` - Bearer token for the signed-in shopper
//! - `COMMERCE_USER_ID` / `COMMERCE_USER_EMAIL` - The shopper the token
//!   belongs to
//! - `PAYMENT_GATEWAY_URL` / `PAYMENT_SECRET_KEY` - Card payment gateway

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use lunaria_core::PaymentMethod;

mod commands;

#[derive(Parser)]
#[command(name = "lunaria")]
#[command(author, version, about = "Lunaria shopping session CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Inspect and edit the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Manage the local product comparison tray
    Compare {
        /// Tray file
        #[arg(long, default_value = ".lunaria-compare.json", global = true)]
        file: PathBuf,

        #[command(subcommand)]
        action: CompareAction,
    },
    /// Run a scripted checkout
    Checkout {
        #[command(subcommand)]
        action: CheckoutAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Reload and print the cart
    Show,
    /// Add a product
    Add {
        /// Product ID
        #[arg(short, long)]
        product: i64,

        /// Quantity
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes the line)
    Set {
        /// Cart line ID
        #[arg(short, long)]
        item: i64,

        /// New quantity
        #[arg(short, long)]
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Cart line ID
        #[arg(short, long)]
        item: i64,
    },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Reload and print the wishlist
    Show,
    /// Save a product
    Add {
        /// Product ID
        #[arg(short, long)]
        product: i64,
    },
    /// Remove a saved product
    Remove {
        /// Product ID
        #[arg(short, long)]
        product: i64,
    },
}

#[derive(Subcommand)]
enum CompareAction {
    /// Print the tray
    Show,
    /// Pin a product
    Add {
        /// Product ID
        #[arg(short, long)]
        product: i64,
    },
    /// Unpin a product
    Remove {
        /// Product ID
        #[arg(short, long)]
        product: i64,
    },
    /// Empty the tray
    Clear,
}

#[derive(Subcommand)]
enum CheckoutAction {
    /// Run address selection, payment and order creation in one go
    Run {
        /// Address ID; defaults to the saved default address
        #[arg(long)]
        address: Option<i64>,

        /// Payment method
        #[arg(long, value_enum, default_value_t = MethodArg::Card)]
        method: MethodArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Card,
    CashOnDelivery,
    BankTransfer,
}

impl From<MethodArg> for PaymentMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Card => Self::Card,
            MethodArg::CashOnDelivery => Self::CashOnDelivery,
            MethodArg::BankTransfer => Self::BankTransfer,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Cart { action } => {
            let ctx = commands::SessionContext::signed_in()?;
            match action {
                CartAction::Show => commands::cart::show(&ctx).await?,
                CartAction::Add { product, quantity } => {
                    commands::cart::add(&ctx, product, quantity).await?;
                }
                CartAction::Set { item, quantity } => {
                    commands::cart::set_quantity(&ctx, item, quantity).await?;
                }
                CartAction::Remove { item } => commands::cart::remove(&ctx, item).await?,
                CartAction::Clear => commands::cart::clear(&ctx).await?,
            }
        }
        Commands::Wishlist { action } => {
            let ctx = commands::SessionContext::signed_in()?;
            match action {
                WishlistAction::Show => commands::wishlist::show(&ctx).await?,
                WishlistAction::Add { product } => commands::wishlist::add(&ctx, product).await?,
                WishlistAction::Remove { product } => {
                    commands::wishlist::remove(&ctx, product).await?;
                }
            }
        }
        Commands::Compare { file, action } => match action {
            CompareAction::Show => commands::compare::show(&file)?,
            CompareAction::Add { product } => commands::compare::add(&file, product).await?,
            CompareAction::Remove { product } => commands::compare::remove(&file, product)?,
            CompareAction::Clear => commands::compare::clear(&file)?,
        },
        Commands::Checkout { action } => match action {
            CheckoutAction::Run { address, method } => {
                commands::checkout::run(address, method.into()).await?;
            }
        },
    }
    Ok(())
}
