//! Order pricing
//!
//! All monetary arithmetic goes through `Decimal` and is rounded half-up
//! to 2 decimal places before storage/serialization as `f64`.
//!
//! total = subtotal + tax + delivery fee + service fee - discount

use rust_decimal::prelude::*;

use crate::core::config::PricingConfig;
use crate::db::models::{OrderItem, OrderPricing};

const DECIMAL_PLACES: u32 = 2;

fn dec(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Round half-up to 2 decimal places and convert back to f64
pub fn round2(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Unit price: effective base price plus the chosen customization surcharges
pub fn unit_price(base_price: f64, surcharges: &[f64]) -> f64 {
    let total = surcharges
        .iter()
        .fold(dec(base_price), |acc, s| acc + dec(*s));
    round2(total)
}

/// Line total: unit price x quantity
pub fn line_total(unit_price: f64, quantity: i32) -> f64 {
    round2(dec(unit_price) * Decimal::from(quantity))
}

/// Sum of line totals
pub fn subtotal(items: &[OrderItem]) -> f64 {
    round2(items.iter().fold(Decimal::ZERO, |acc, i| acc + dec(i.line_total)))
}

/// Compute the full pricing breakdown for an order.
///
/// `promo_code` must already be validated against the configured code;
/// passing it here applies the configured percentage to the subtotal.
pub fn price_order(
    config: &PricingConfig,
    subtotal: f64,
    delivery_fee: f64,
    promo_code: Option<&str>,
) -> OrderPricing {
    let sub = dec(subtotal);
    let tax = sub * dec(config.tax_rate);
    let service_fee = sub * dec(config.service_fee_rate);
    let delivery = dec(delivery_fee);
    let discount = match promo_code {
        Some(_) => sub * dec(config.promo_percent) / Decimal::from(100),
        None => Decimal::ZERO,
    };
    let total = sub + tax + delivery + service_fee - discount;

    OrderPricing {
        subtotal: round2(sub),
        tax: round2(tax),
        delivery_fee: round2(delivery),
        service_fee: round2(service_fee),
        discount: round2(discount),
        promo_code: promo_code.map(|c| c.to_string()),
        total: round2(total),
    }
}

/// Convert an amount to minor units (cents) for the payment processor
pub fn to_minor_units(amount: f64) -> i64 {
    (dec(amount) * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}
