//! Input signals consumed by the policy.
//!
//! The sentiment score arrives already computed; this module labels it and
//! turns price quotes into the price-change ratio the policy encodes.

mod quote;
mod sentiment;

#[cfg(test)]
pub use quote::MockQuoteProvider;
pub use quote::{normalize_symbol, PriceQuote, QuoteProvider, StaticQuoteBook};
pub use sentiment::SentimentLabel;
