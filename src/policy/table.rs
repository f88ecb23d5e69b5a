//! The learned value table.

use super::action::Action;
use super::state::StateKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value estimates for the three actions of one state.
///
/// A row always carries all three slots, so a partially populated state
/// cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionValues([f64; Action::COUNT]);

impl ActionValues {
    /// Row with every action at 0.0.
    pub fn zeroed() -> Self {
        Self([0.0; Action::COUNT])
    }

    /// Build a row from explicit Buy, Sell and Hold values.
    pub fn new(buy: f64, sell: f64, hold: f64) -> Self {
        Self([buy, sell, hold])
    }

    /// Value of an action.
    pub fn get(&self, action: Action) -> f64 {
        self.0[action.index()]
    }

    /// Overwrite the value of an action.
    pub fn set(&mut self, action: Action, value: f64) {
        self.0[action.index()] = value;
    }

    /// Highest value in the row.
    ///
    /// Same scan as [`best_action`](Self::best_action), so a NaN in an earlier
    /// slot is returned as is.
    pub fn max_value(&self) -> f64 {
        self.get(self.best_action())
    }

    /// Action with the highest value, first in fixed order on ties.
    ///
    /// A later slot wins only when strictly greater. NaN never compares
    /// greater, and a NaN leader is never displaced.
    pub fn best_action(&self) -> Action {
        let mut best = Action::Buy;
        let mut best_value = self.get(Action::Buy);
        for action in &Action::ALL[1..] {
            let value = self.get(*action);
            if value > best_value {
                best = *action;
                best_value = value;
            }
        }
        best
    }

    /// Iterate `(action, value)` pairs in fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (Action, f64)> + '_ {
        Action::ALL.iter().map(move |a| (*a, self.get(*a)))
    }

    /// Raw slots in fixed order.
    pub fn as_array(&self) -> [f64; Action::COUNT] {
        self.0
    }
}

/// Mapping from state key to per-action value estimates.
///
/// Grows monotonically: rows are created lazily and never removed.
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    rows: HashMap<StateKey, ActionValues>,
}

impl ValueTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Row for a state, if it has been created.
    pub fn get(&self, state: &StateKey) -> Option<&ActionValues> {
        self.rows.get(state)
    }

    /// Whether a row exists for the state.
    pub fn contains(&self, state: &StateKey) -> bool {
        self.rows.contains_key(state)
    }

    /// Row for a state, creating a zeroed row first if absent.
    pub fn row_mut(&mut self, state: StateKey) -> &mut ActionValues {
        self.rows.entry(state).or_insert_with(ActionValues::zeroed)
    }

    /// Value for a state/action pair; 0.0 when the state is unseen.
    pub fn value(&self, state: &StateKey, action: Action) -> f64 {
        self.rows.get(state).map(|row| row.get(action)).unwrap_or(0.0)
    }

    /// Insert or replace a complete row (used when restoring a snapshot).
    pub fn insert_row(&mut self, state: StateKey, values: ActionValues) {
        self.rows.insert(state, values);
    }

    /// Number of states with a row.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over all rows in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &ActionValues)> {
        self.rows.iter()
    }

    /// Rows sorted by state key, for stable display and snapshots.
    pub fn sorted_rows(&self) -> Vec<(StateKey, ActionValues)> {
        let mut rows: Vec<(StateKey, ActionValues)> =
            self.rows.iter().map(|(k, v)| (*k, *v)).collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    /// Mean over every stored value, `None` for an empty table.
    pub fn mean_value(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        let total: f64 = self.rows.values().flat_map(|row| row.as_array()).sum();
        Some(total / (self.rows.len() * Action::COUNT) as f64)
    }
}

impl FromIterator<(StateKey, ActionValues)> for ValueTable {
    fn from_iter<I: IntoIterator<Item = (StateKey, ActionValues)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
