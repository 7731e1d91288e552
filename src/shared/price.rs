//! Price utilities for the stockwatch crate.
//!
//! All prices are `rust_decimal::Decimal` values. Percentage changes are
//! computed on prices rounded to cents, matching what is displayed.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places prices are rounded to before computing.
pub const PRICE_DECIMALS: u32 = 2;

/// Round a price to cents, midpoint away from zero.
///
/// # Example
///
/// ```ignore
/// assert_eq!(round_price(dec!(10.005)), dec!(10.01));
/// ```
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Signed percentage change of `price` relative to `base`.
///
/// Both inputs are rounded to cents first. The magnitude is taken relative to
/// the larger of the two prices, and the sign is negative when the price is
/// below the base. Equal prices (or a zero denominator) give zero.
///
/// Returns `None` if the intermediate values overflow `Decimal`.
pub fn change_percentage(base: Decimal, price: Decimal) -> Option<Decimal> {
    let base = round_price(base);
    let price = round_price(price);

    let high = base.max(price);
    let low = base.min(price);
    let scaled = high.checked_sub(low)?.checked_mul(Decimal::ONE_HUNDRED)?;
    let magnitude = scaled.checked_div(high).unwrap_or(Decimal::ZERO);

    Some(if base > price { -magnitude } else { magnitude })
}

/// Format a price with two decimals (e.g. `"110.00"`).
pub fn format_price(price: Decimal) -> String {
    format!("{:.2}", round_price(price))
}

/// Format a signed percentage with two decimals (e.g. `"+9.09%"`).
pub fn format_percentage(change: Decimal) -> String {
    let rounded = round_price(change);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("{:.2}%", rounded)
    } else {
        format!("+{:.2}%", rounded.abs())
    }
}

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render a price series as a one-line block chart, scaled between the
/// lowest (`▁`) and highest (`█`) price in the series. A flat series is all `▁`.
pub fn format_sparkline<I>(prices: I) -> String
where
    I: IntoIterator<Item = Decimal>,
{
    let prices: Vec<Decimal> = prices.into_iter().collect();
    let (Some(low), Some(high)) = (prices.iter().min(), prices.iter().max()) else {
        return String::new();
    };
    let top = SPARK_LEVELS.len() - 1;
    let span = high.checked_sub(*low).filter(|s| !s.is_zero());

    prices
        .iter()
        .map(|price| {
            let level = span
                .and_then(|span| {
                    price
                        .checked_sub(*low)?
                        .checked_mul(Decimal::from(top))?
                        .checked_div(span)
                })
                .and_then(|level| level.round().to_usize())
                .unwrap_or(0);
            SPARK_LEVELS[level.min(top)]
        })
        .collect()
}
