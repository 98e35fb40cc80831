//! Scripted checkout command.
//!
//! Drives one full attempt: reload the cart, pick an address, pick a payment
//! method, authorize the card when needed, submit. Card details come from
//! `CARD_HOLDER`, `CARD_NUMBER`, `CARD_EXP_MONTH`, `CARD_EXP_YEAR` and
//! `CARD_CVC` so they never appear in shell history.

use secrecy::SecretString;

use lunaria_api::{CardDetails, PaymentClient};
use lunaria_core::{AddressId, PaymentMethod};
use lunaria_session::{CheckoutError, CheckoutFlow};

use super::{CliError, SessionContext};

/// Run a checkout end to end.
///
/// # Errors
///
/// Any classified store, checkout or gateway failure.
#[allow(clippy::print_stdout)]
pub async fn run(address: Option<i64>, method: PaymentMethod) -> Result<(), CliError> {
    let ctx = SessionContext::signed_in()?;
    let payment = PaymentClient::new(&ctx.config.payment)?;
    let flow = CheckoutFlow::new(
        ctx.client.clone(),
        payment,
        ctx.cart.clone(),
        ctx.identity_rx.clone(),
    );

    ctx.cart.reload().await?;
    flow.begin().await?;
    if let Some(total) = flow.total() {
        println!("Checking out {total}");
    }

    let address_id = match address {
        Some(id) => AddressId::new(id),
        None => flow
            .addresses()
            .iter()
            .find(|a| a.is_default)
            .map(|a| a.id)
            .ok_or(CheckoutError::NoAddressSelected)?,
    };
    flow.select_address(address_id)?;
    flow.select_payment(method)?;

    if method.requires_authorization() {
        let card = card_from_env()?;
        flow.authorize(card).await?;
        println!("Card authorized");
    }

    let order = flow.submit().await?;
    println!(
        "Order {} confirmed: {} ({} lines, status {:?})",
        order.id,
        order.total,
        order.items.len(),
        order.status
    );
    Ok(())
}

fn card_from_env() -> Result<CardDetails, CliError> {
    let required = |name: &'static str| {
        std::env::var(name).map_err(|_| CliError::MissingEnvVar(name))
    };
    let exp_month: u8 = required("CARD_EXP_MONTH")?
        .parse()
        .map_err(|e: std::num::ParseIntError| {
            CliError::InvalidEnvVar("CARD_EXP_MONTH", e.to_string())
        })?;
    let exp_year: u16 = required("CARD_EXP_YEAR")?
        .parse()
        .map_err(|e: std::num::ParseIntError| {
            CliError::InvalidEnvVar("CARD_EXP_YEAR", e.to_string())
        })?;
    Ok(CardDetails {
        cardholder_name: required("CARD_HOLDER")?,
        number: SecretString::from(required("CARD_NUMBER")?),
        exp_month,
        exp_year,
        cvc: SecretString::from(required("CARD_CVC")?),
    })
}
