//! Cart commands.

use lunaria_core::{CartItemId, ProductId};

use super::{CliError, SessionContext};

/// Reload the cart from the backend and print it.
///
/// # Errors
///
/// Store or transport failures.
#[allow(clippy::print_stdout)]
pub async fn show(ctx: &SessionContext) -> Result<(), CliError> {
    ctx.cart.reload().await?;
    let state = ctx.cart.current();
    if state.is_empty() {
        println!("Cart is empty");
        return Ok(());
    }
    for item in &state.items {
        println!(
            "  [{}] {:>3} x {} @ {} = {}",
            item.id,
            item.quantity,
            item.product.name,
            item.product.unit_price,
            item.line_total()
        );
    }
    println!("Total: {} ({} items)", state.total_price, state.total_items);
    Ok(())
}

/// Add a product line, then print the resulting cart.
///
/// # Errors
///
/// Store or transport failures.
pub async fn add(ctx: &SessionContext, product: i64, quantity: u32) -> Result<(), CliError> {
    ctx.cart.reload().await?;
    ctx.cart.add(ProductId::new(product), quantity).await?;
    print_summary(ctx);
    Ok(())
}

/// Set a line's quantity; zero removes the line.
///
/// # Errors
///
/// Store or transport failures.
pub async fn set_quantity(ctx: &SessionContext, item: i64, quantity: u32) -> Result<(), CliError> {
    ctx.cart.reload().await?;
    ctx.cart
        .update_quantity(CartItemId::new(item), quantity)
        .await?;
    print_summary(ctx);
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Store or transport failures.
pub async fn remove(ctx: &SessionContext, item: i64) -> Result<(), CliError> {
    ctx.cart.reload().await?;
    ctx.cart.remove(CartItemId::new(item)).await?;
    print_summary(ctx);
    Ok(())
}

/// Remove every line.
///
/// # Errors
///
/// Store or transport failures.
pub async fn clear(ctx: &SessionContext) -> Result<(), CliError> {
    ctx.cart.reload().await?;
    ctx.cart.clear().await?;
    print_summary(ctx);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_summary(ctx: &SessionContext) {
    let state = ctx.cart.current();
    println!(
        "Cart now holds {} items, total {}",
        state.total_items, state.total_price
    );
}
