//! State encoding: quantizes the two continuous signals into a table key.

use crate::error::{PolicyError, PolicyResult};
use crate::utils::decimal::{from_f64, round_half_even};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal places kept for the sentiment bucket.
pub const SENTIMENT_DECIMALS: u32 = 1;

/// Decimal places kept for the price-change bucket.
pub const PRICE_DECIMALS: u32 = 2;

/// Discrete state key for value table lookup.
///
/// Both buckets are exact decimals so two inputs that round to the same pair
/// compare and hash identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    /// Sentiment score rounded to one decimal place
    pub sentiment: Decimal,
    /// Price-change ratio rounded to two decimal places
    pub price_change: Decimal,
}

impl StateKey {
    /// Build a key from raw decimals, rounding to the bucket precision.
    ///
    /// Buckets are normalized so `-0.00` and `0` are the same key.
    pub fn new(sentiment: Decimal, price_change: Decimal) -> Self {
        Self {
            sentiment: round_half_even(sentiment, SENTIMENT_DECIMALS).normalize(),
            price_change: round_half_even(price_change, PRICE_DECIMALS).normalize(),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.sentiment, self.price_change)
    }
}

/// Quantize a sentiment score and a price-change ratio into a state key.
///
/// Rounding is half-to-even applied to the shortest decimal form of each
/// float, so `0.25` buckets to `0.2` and `0.35` to `0.4`. Ranges are not
/// checked: finite values past the decimal range share the saturated edge
/// bucket. Only NaN and infinities are rejected.
pub fn encode_state(sentiment_score: f64, price_change: f64) -> PolicyResult<StateKey> {
    let sentiment = from_f64(sentiment_score).ok_or(PolicyError::UnrepresentableInput {
        field: "sentiment_score",
        value: sentiment_score,
    })?;
    let price = from_f64(price_change).ok_or(PolicyError::UnrepresentableInput {
        field: "price_change",
        value: price_change,
    })?;

    Ok(StateKey::new(sentiment, price))
}
