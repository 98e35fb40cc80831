//! Wishlist commands.

use lunaria_core::ProductId;

use super::{CliError, SessionContext};

/// Reload the wishlist from the backend and print it.
///
/// # Errors
///
/// Store or transport failures.
#[allow(clippy::print_stdout)]
pub async fn show(ctx: &SessionContext) -> Result<(), CliError> {
    ctx.wishlist.reload().await?;
    let state = ctx.wishlist.current();
    if state.items.is_empty() {
        println!("Wishlist is empty");
        return Ok(());
    }
    for item in &state.items {
        println!(
            "  [{}] {} @ {}",
            item.product.id, item.product.name, item.product.unit_price
        );
    }
    Ok(())
}

/// Save a product.
///
/// # Errors
///
/// Store or transport failures.
#[allow(clippy::print_stdout)]
pub async fn add(ctx: &SessionContext, product: i64) -> Result<(), CliError> {
    ctx.wishlist.reload().await?;
    ctx.wishlist.add(ProductId::new(product)).await?;
    println!("Saved product {product}");
    Ok(())
}

/// Remove a saved product.
///
/// # Errors
///
/// Store or transport failures.
#[allow(clippy::print_stdout)]
pub async fn remove(ctx: &SessionContext, product: i64) -> Result<(), CliError> {
    ctx.wishlist.reload().await?;
    ctx.wishlist.remove(ProductId::new(product)).await?;
    println!("Removed product {product}");
    Ok(())
}
