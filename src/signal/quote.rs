//! Price quotes and the provider seam used to look them up by ticker.

use crate::utils::decimal::checked_ratio;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Daily open/close quote for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub close: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub volume: Option<Decimal>,
}

impl PriceQuote {
    /// Create a quote; the symbol is upper-cased.
    pub fn new(symbol: &str, open: Decimal, close: Decimal) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            open,
            close,
            volume: None,
        }
    }

    /// Set the traded volume.
    pub fn with_volume(mut self, volume: Decimal) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Relative change `(close - open) / open`; `None` when open is zero.
    pub fn price_change(&self) -> Option<Decimal> {
        checked_ratio(self.close - self.open, self.open)
    }
}

/// Canonical ticker form used for lookups.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Source of price quotes by ticker symbol.
///
/// Implementations match symbols case-insensitively and return `Ok(None)`
/// for unknown tickers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetch the latest quote for a symbol.
    async fn quote(&self, symbol: &str) -> anyhow::Result<Option<PriceQuote>>;
}

/// In-memory quote book.
#[derive(Debug, Clone, Default)]
pub struct StaticQuoteBook {
    quotes: HashMap<String, PriceQuote>,
}

impl StaticQuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a quote.
    pub fn insert(&mut self, quote: PriceQuote) {
        self.quotes.insert(normalize_symbol(&quote.symbol), quote);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_quote(mut self, quote: PriceQuote) -> Self {
        self.insert(quote);
        self
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[async_trait]
impl QuoteProvider for StaticQuoteBook {
    async fn quote(&self, symbol: &str) -> anyhow::Result<Option<PriceQuote>> {
        Ok(self.quotes.get(&normalize_symbol(symbol)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_change() {
        let quote = PriceQuote::new("aapl", dec!(100), dec!(101.37));
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price_change(), Some(dec!(0.0137)));

        let down = PriceQuote::new("TSLA", dec!(200), dec!(190));
        assert_eq!(down.price_change(), Some(dec!(-0.05)));
    }

    #[test]
    fn test_zero_open_has_no_change() {
        let quote = PriceQuote::new("XYZ", Decimal::ZERO, dec!(5));
        assert_eq!(quote.price_change(), None);
    }

    #[tokio::test]
    async fn test_static_book_lookup_is_case_insensitive() {
        let book = StaticQuoteBook::new()
            .with_quote(PriceQuote::new("MSFT", dec!(400), dec!(404)).with_volume(dec!(1200000)));

        let quote = book.quote(" msft ").await.unwrap().unwrap();
        assert_eq!(quote.volume, Some(dec!(1200000)));
        assert!(book.quote("GOOG").await.unwrap().is_none());
        assert_eq!(book.len(), 1);
    }
}
