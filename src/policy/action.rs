//! The fixed action set of the policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A trading recommendation.
///
/// The declaration order is the tie-break order used by greedy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// All actions in their fixed order.
    pub const ALL: [Action; 3] = [Action::Buy, Action::Sell, Action::Hold];

    /// Number of actions.
    pub const COUNT: usize = 3;

    /// Slot of this action inside a value row.
    pub fn index(&self) -> usize {
        match self {
            Action::Buy => 0,
            Action::Sell => 1,
            Action::Hold => 2,
        }
    }

    /// Reconstruct from a slot index.
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Get display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "Buy",
            Action::Sell => "Sell",
            Action::Hold => "Hold",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Action::Buy),
            "sell" => Ok(Action::Sell),
            "hold" => Ok(Action::Hold),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_order() {
        assert_eq!(Action::ALL, [Action::Buy, Action::Sell, Action::Hold]);
        for (i, action) in Action::ALL.iter().enumerate() {
            assert_eq!(action.index(), i);
            assert_eq!(Action::from_index(i), Some(*action));
        }
        assert_eq!(Action::from_index(3), None);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("BUY".parse::<Action>().unwrap(), Action::Buy);
        assert_eq!(" sell ".parse::<Action>().unwrap(), Action::Sell);
        assert_eq!(Action::Hold.to_string(), "Hold");
        assert!("short".parse::<Action>().is_err());
    }
}
