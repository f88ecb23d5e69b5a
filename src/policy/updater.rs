//! One-step temporal-difference value updates.

use super::action::Action;
use super::state::StateKey;
use super::table::ValueTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where the future-value estimate of an update comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapMode {
    /// Max over the updated state's own row (each decision is its own episode)
    #[default]
    SameState,
    /// Max over the row of the next observed state
    Successor,
}

/// Apply `Q(s,a) += alpha * (r + gamma * max_a' Q(s,a') - Q(s,a))`.
///
/// The future term is taken from the same state's row after it has been
/// ensured to exist, so it includes the old value itself. Returns the stored
/// value. Rewards are not validated; NaN or infinite rewards are stored.
pub fn update_value(
    table: &mut ValueTable,
    state: StateKey,
    action: Action,
    reward: f64,
    alpha: f64,
    gamma: f64,
) -> f64 {
    let row = table.row_mut(state);
    let old = row.get(action);
    let future = row.max_value();
    let new = td_target(old, reward, future, alpha, gamma);
    row.set(action, new);

    debug!(%state, %action, reward, old, future, new, "Value updated");
    new
}

/// Apply a Q-learning update bootstrapping from a successor state.
///
/// `next = None` marks a terminal transition. An unseen successor
/// contributes 0.0 and is not inserted.
pub fn update_value_with_successor(
    table: &mut ValueTable,
    state: StateKey,
    action: Action,
    reward: f64,
    next: Option<&StateKey>,
    alpha: f64,
    gamma: f64,
) -> f64 {
    let future = next
        .and_then(|next| table.get(next))
        .map(|row| row.max_value())
        .unwrap_or(0.0);

    let row = table.row_mut(state);
    let old = row.get(action);
    let new = td_target(old, reward, future, alpha, gamma);
    row.set(action, new);

    debug!(
        %state,
        %action,
        reward,
        old,
        future,
        new,
        terminal = next.is_none(),
        "Value updated from successor"
    );
    new
}

fn td_target(old: f64, reward: f64, future: f64, alpha: f64, gamma: f64) -> f64 {
    old + alpha * (reward + gamma * future - old)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::table::ActionValues;
    use rust_decimal_macros::dec;

    const EPS: f64 = 1e-12;

    fn key() -> StateKey {
        StateKey::new(dec!(0.4), dec!(0.01))
    }

    #[test]
    fn test_first_update_on_fresh_state() {
        let mut table = ValueTable::new();
        let new = update_value(&mut table, key(), Action::Buy, 1.0, 0.1, 0.9);

        assert!((new - 0.1).abs() < EPS);
        let row = table.get(&key()).unwrap();
        assert!((row.get(Action::Buy) - 0.1).abs() < EPS);
        assert_eq!(row.get(Action::Sell), 0.0);
        assert_eq!(row.get(Action::Hold), 0.0);
    }

    #[test]
    fn test_future_includes_own_row() {
        let mut table = ValueTable::new();
        table.insert_row(key(), ActionValues::new(0.0, 0.5, 0.0));

        // 0 + 0.1 * (0.2 + 0.9 * 0.5 - 0) = 0.065
        let new = update_value(&mut table, key(), Action::Buy, 0.2, 0.1, 0.9);
        assert!((new - 0.065).abs() < EPS);
        assert_eq!(table.value(&key(), Action::Sell), 0.5);
    }

    #[test]
    fn test_zero_learning_rate_is_idempotent() {
        let mut table = ValueTable::new();
        table.insert_row(key(), ActionValues::new(0.3, -0.1, 0.2));

        for reward in [1.0, -4.0, 0.5, 100.0] {
            for action in Action::ALL {
                update_value(&mut table, key(), action, reward, 0.0, 0.9);
            }
        }

        assert_eq!(table.get(&key()).unwrap().as_array(), [0.3, -0.1, 0.2]);
    }

    #[test]
    fn test_update_creates_complete_row() {
        let mut table = ValueTable::new();
        update_value(&mut table, key(), Action::Hold, 0.0, 0.1, 0.9);

        let row = table.get(&key()).unwrap();
        assert_eq!(row.iter().count(), 3);
        assert_eq!(row.as_array(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_nan_reward_propagates() {
        let mut table = ValueTable::new();
        let new = update_value(&mut table, key(), Action::Sell, f64::NAN, 0.1, 0.9);

        assert!(new.is_nan());
        assert!(table.value(&key(), Action::Sell).is_nan());
        assert_eq!(table.value(&key(), Action::Buy), 0.0);
    }

    #[test]
    fn test_nan_future_contaminates_other_actions() {
        let mut table = ValueTable::new();
        table.insert_row(key(), ActionValues::new(f64::NAN, 0.2, 0.1));

        let new = update_value(&mut table, key(), Action::Sell, 0.1, 0.1, 0.9);
        assert!(new.is_nan());
        assert!(table.value(&key(), Action::Sell).is_nan());
        assert_eq!(table.value(&key(), Action::Hold), 0.1);
    }

    #[test]
    fn test_repeated_rewards_approach_fixed_point() {
        // Same-state bootstrapping converges to r / (1 - gamma) for the best action.
        let mut table = ValueTable::new();
        for _ in 0..2_000 {
            update_value(&mut table, key(), Action::Buy, 0.01, 0.1, 0.9);
        }
        assert!((table.value(&key(), Action::Buy) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_successor_uses_next_row() {
        let mut table = ValueTable::new();
        let next = StateKey::new(dec!(-0.2), dec!(0.03));
        table.insert_row(key(), ActionValues::new(0.0, 0.9, 0.0));
        table.insert_row(next, ActionValues::new(0.4, 0.1, 0.0));

        // 0 + 0.5 * (1 + 0.5 * 0.4 - 0) = 0.6
        let new =
            update_value_with_successor(&mut table, key(), Action::Buy, 1.0, Some(&next), 0.5, 0.5);
        assert!((new - 0.6).abs() < EPS);
    }

    #[test]
    fn test_successor_unseen_or_terminal_contributes_zero() {
        let mut table = ValueTable::new();
        let next = StateKey::new(dec!(0.9), dec!(0));

        let a = update_value_with_successor(&mut table, key(), Action::Sell, 1.0, Some(&next), 0.1, 0.9);
        assert!((a - 0.1).abs() < EPS);
        assert!(!table.contains(&next));

        let b = update_value_with_successor(&mut table, key(), Action::Hold, 1.0, None, 0.1, 0.9);
        assert!((b - 0.1).abs() < EPS);
    }
}
