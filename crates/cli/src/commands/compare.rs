//! Comparison tray commands.
//!
//! The tray lives in a local JSON file and never requires a signed-in
//! shopper; only `add` touches the network, to resolve the product.

use std::path::Path;

use lunaria_core::ProductId;
use lunaria_session::{CompareOutcome, ComparisonStore, MAX_COMPARE};

use super::{CliError, SessionContext};

/// Print the tray.
///
/// # Errors
///
/// Configuration problems.
#[allow(clippy::print_stdout)]
pub fn show(file: &Path) -> Result<(), CliError> {
    let ctx = SessionContext::anonymous()?;
    let store = ComparisonStore::load(ctx.client, file);
    let state = store.current();
    if state.entries.is_empty() {
        println!("Comparison tray is empty");
        return Ok(());
    }
    for entry in &state.entries {
        println!(
            "  [{}] {} @ {}",
            entry.product.id, entry.product.name, entry.product.unit_price
        );
    }
    println!("{} of {MAX_COMPARE} slots used", state.entries.len());
    Ok(())
}

/// Pin a product.
///
/// # Errors
///
/// Configuration problems or catalog failures.
#[allow(clippy::print_stdout)]
pub async fn add(file: &Path, product: i64) -> Result<(), CliError> {
    let ctx = SessionContext::anonymous()?;
    let store = ComparisonStore::load(ctx.client, file);
    match store.add(ProductId::new(product)).await? {
        CompareOutcome::Added => println!("Pinned product {product}"),
        CompareOutcome::AlreadyPresent => println!("Product {product} is already pinned"),
        CompareOutcome::LimitReached => {
            println!("Comparison tray is full ({MAX_COMPARE} products); remove one first");
        }
        CompareOutcome::Unavailable => println!("Product {product} is no longer available"),
    }
    Ok(())
}

/// Unpin a product.
///
/// # Errors
///
/// Configuration problems.
#[allow(clippy::print_stdout)]
pub fn remove(file: &Path, product: i64) -> Result<(), CliError> {
    let ctx = SessionContext::anonymous()?;
    let store = ComparisonStore::load(ctx.client, file);
    if store.remove(ProductId::new(product)) {
        println!("Unpinned product {product}");
    } else {
        println!("Product {product} was not pinned");
    }
    Ok(())
}

/// Empty the tray.
///
/// # Errors
///
/// Configuration problems.
#[allow(clippy::print_stdout)]
pub fn clear(file: &Path) -> Result<(), CliError> {
    let ctx = SessionContext::anonymous()?;
    let store = ComparisonStore::load(ctx.client, file);
    store.clear();
    println!("Comparison tray cleared");
    Ok(())
}
