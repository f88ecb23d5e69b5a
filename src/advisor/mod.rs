//! Request pipeline: sentiment score and ticker in, recommendation out.
//!
//! Looks up the ticker's quote, derives the price change (zero when no usable
//! quote exists), runs one policy step and reports the result. The engine sits
//! behind a mutex held for the whole step, so concurrent requests on the same
//! state cannot lose updates.

use crate::config::{PolicyConfig, SignalConfig};
use crate::policy::{
    Action, ActionValues, EngineStats, PolicyEngine, SelectionReason, StateKey, ValueTable,
};
use crate::signal::{normalize_symbol, PriceQuote, QuoteProvider, SentimentLabel};
use crate::utils::decimal::to_f64;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Why the price change of a request is what it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Derived from the ticker's quote
    Quote,
    /// No ticker was given
    NoSymbol,
    /// The provider has no quote for the ticker
    NotFound,
    /// The quote's open price is zero
    InvalidQuote,
}

/// Result of one advisory request.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub timestamp: DateTime<Utc>,
    pub symbol: Option<String>,
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
    pub quote: Option<PriceQuote>,
    pub price_source: PriceSource,
    pub price_change: f64,
    pub state: StateKey,
    pub action: Action,
    pub reason: SelectionReason,
    pub reward: f64,
    pub updated_value: Option<f64>,
    pub row: Option<ActionValues>,
}

/// Shared advisory service over a quote provider.
pub struct Advisor<P: QuoteProvider> {
    engine: Arc<Mutex<PolicyEngine<StdRng>>>,
    provider: P,
    signal: SignalConfig,
}

impl<P: QuoteProvider> Advisor<P> {
    /// Create an advisor resuming from `table`.
    pub fn new(
        policy: PolicyConfig,
        signal: SignalConfig,
        provider: P,
        table: ValueTable,
    ) -> Result<Self> {
        let engine =
            PolicyEngine::with_table(policy, table).context("Failed to create policy engine")?;
        Ok(Self::from_engine(engine, signal, provider))
    }

    /// Wrap an existing engine.
    pub fn from_engine(engine: PolicyEngine<StdRng>, signal: SignalConfig, provider: P) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            provider,
            signal,
        }
    }

    /// Produce a recommendation for a sentiment score and optional ticker.
    pub async fn analyze(&self, sentiment_score: f64, symbol: Option<&str>) -> Result<Recommendation> {
        let symbol = symbol.map(normalize_symbol).filter(|s| !s.is_empty());
        let sentiment_label = SentimentLabel::classify(sentiment_score, &self.signal);

        let (quote, price_source, price_change) = match symbol.as_deref() {
            None => (None, PriceSource::NoSymbol, 0.0),
            Some(sym) => {
                let quote = self
                    .provider
                    .quote(sym)
                    .await
                    .with_context(|| format!("Failed to fetch quote for {}", sym))?;
                match quote {
                    None => {
                        warn!(symbol = sym, "No price data found, assuming zero price change");
                        (None, PriceSource::NotFound, 0.0)
                    }
                    Some(q) => match q.price_change() {
                        Some(change) => (Some(q), PriceSource::Quote, to_f64(change)),
                        None => {
                            warn!(symbol = sym, "Quote has zero open price, assuming zero price change");
                            (Some(q), PriceSource::InvalidQuote, 0.0)
                        }
                    },
                }
            }
        };

        let step = {
            let mut engine = self.engine.lock().await;
            engine
                .step(sentiment_score, price_change)
                .context("Failed to run policy step")?
        };

        info!(
            symbol = symbol.as_deref().unwrap_or("-"),
            sentiment = sentiment_score,
            label = %sentiment_label,
            price_change,
            state = %step.decision.state,
            action = %step.decision.action,
            reason = step.decision.reason.as_str(),
            "Recommendation produced"
        );

        Ok(Recommendation {
            timestamp: Utc::now(),
            symbol,
            sentiment_score,
            sentiment_label,
            quote,
            price_source,
            price_change,
            state: step.decision.state,
            action: step.decision.action,
            reason: step.decision.reason,
            reward: step.reward,
            updated_value: step.updated_value,
            row: step.row,
        })
    }

    /// Complete any transition held back in successor mode.
    pub async fn flush(&self) -> Option<f64> {
        self.engine.lock().await.flush()
    }

    /// Copy of the current value table.
    pub async fn snapshot(&self) -> ValueTable {
        self.engine.lock().await.table().clone()
    }

    pub async fn stats(&self) -> EngineStats {
        self.engine.lock().await.stats()
    }
}

impl<P: QuoteProvider + Clone> Clone for Advisor<P> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            provider: self.provider.clone(),
            signal: self.signal.clone(),
        }
    }
}
