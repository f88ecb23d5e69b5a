//! Sentiment labels derived from a compound polarity score.

use crate::config::SignalConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse label for a compound sentiment score in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Classify with explicit thresholds (inclusive on both sides).
    pub fn classify(score: f64, thresholds: &SignalConfig) -> Self {
        if score >= thresholds.positive_threshold {
            SentimentLabel::Positive
        } else if score <= thresholds.negative_threshold {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = SignalConfig::default();
        assert_eq!(SentimentLabel::classify(0.05, &t), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::classify(0.7, &t), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::classify(-0.05, &t), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::classify(0.0499, &t), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::classify(-0.0499, &t), SentimentLabel::Neutral);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = SignalConfig {
            positive_threshold: 0.5,
            negative_threshold: -0.5,
        };
        assert_eq!(SentimentLabel::classify(0.4, &t), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::classify(-0.6, &t), SentimentLabel::Negative);
    }
}
