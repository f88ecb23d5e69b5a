//! Epsilon-greedy action selection.

use super::action::Action;
use super::state::StateKey;
use super::table::ValueTable;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why an action was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Random action drawn with probability epsilon
    Explore,
    /// Random action because the state has no row yet
    UnseenState,
    /// Highest-valued action of a known state
    Exploit,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionReason::Explore => "explore",
            SelectionReason::UnseenState => "unseen_state",
            SelectionReason::Exploit => "exploit",
        }
    }

    pub fn is_random(&self) -> bool {
        !matches!(self, SelectionReason::Exploit)
    }
}

/// An action together with the branch that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub action: Action,
    pub reason: SelectionReason,
}

/// Choose an action and report which branch fired.
///
/// Exactly one uniform draw is consumed before branching, so a seeded
/// generator yields the same sequence whether or not the state is known.
/// The table is only read; absent states never get a row here.
pub fn choose_action<R: Rng + ?Sized>(
    state: &StateKey,
    table: &ValueTable,
    epsilon: f64,
    rng: &mut R,
) -> Selection {
    let explore = rng.gen::<f64>() < epsilon;

    let selection = match table.get(state) {
        Some(row) if !explore => Selection {
            action: row.best_action(),
            reason: SelectionReason::Exploit,
        },
        known => Selection {
            action: random_action(rng),
            reason: if known.is_none() {
                SelectionReason::UnseenState
            } else {
                SelectionReason::Explore
            },
        },
    };

    debug!(
        %state,
        action = %selection.action,
        reason = selection.reason.as_str(),
        epsilon,
        "Action selected"
    );
    selection
}

/// Epsilon-greedy selection over the fixed action set.
pub fn select_action<R: Rng + ?Sized>(
    state: &StateKey,
    table: &ValueTable,
    epsilon: f64,
    rng: &mut R,
) -> Action {
    choose_action(state, table, epsilon, rng).action
}

fn random_action<R: Rng + ?Sized>(rng: &mut R) -> Action {
    *Action::ALL.choose(rng).unwrap_or(&Action::Hold)
}
