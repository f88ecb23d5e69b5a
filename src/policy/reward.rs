//! Reward assigned to an action given the realized price change.

use super::action::Action;

/// Buying earns the price change, selling earns its negation, holding earns nothing.
pub fn reward(action: Action, price_change: f64) -> f64 {
    match action {
        Action::Buy => price_change,
        Action::Sell => -price_change,
        Action::Hold => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_by_action() {
        assert_eq!(reward(Action::Buy, 0.0137), 0.0137);
        assert_eq!(reward(Action::Sell, 0.0137), -0.0137);
        assert_eq!(reward(Action::Hold, 0.0137), 0.0);
        assert_eq!(reward(Action::Sell, -0.02), 0.02);
    }
}
