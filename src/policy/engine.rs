//! Policy engine: owns the value table and runs the encode/select/update cycle.

use super::action::Action;
use super::reward::reward;
use super::selector::{choose_action, SelectionReason};
use super::state::{encode_state, StateKey};
use super::table::{ActionValues, ValueTable};
use super::updater::{update_value, update_value_with_successor, BootstrapMode};
use crate::config::PolicyConfig;
use crate::error::PolicyResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Counters describing the engine's activity since it was created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    /// Total number of actions selected
    pub decisions: u64,
    /// Random actions drawn with probability epsilon
    pub explorations: u64,
    /// Random actions forced by an unseen state
    pub unseen_state_explorations: u64,
    /// Greedy actions
    pub exploitations: u64,
    /// Value updates applied
    pub updates: u64,
    /// Sum of all rewards observed
    pub total_reward: f64,
    /// Number of states with a row (filled from the table on read)
    pub states_visited: usize,
    /// Mean over every stored value (filled from the table on read)
    pub mean_value: Option<f64>,
}

impl EngineStats {
    /// Add another set of activity counters to this one.
    ///
    /// Table-derived fields are left untouched.
    pub fn accumulate(&mut self, other: &EngineStats) {
        self.decisions += other.decisions;
        self.explorations += other.explorations;
        self.unseen_state_explorations += other.unseen_state_explorations;
        self.exploitations += other.exploitations;
        self.updates += other.updates;
        self.total_reward += other.total_reward;
    }

    fn record_selection(&mut self, reason: SelectionReason) {
        self.decisions += 1;
        match reason {
            SelectionReason::Explore => self.explorations += 1,
            SelectionReason::UnseenState => self.unseen_state_explorations += 1,
            SelectionReason::Exploit => self.exploitations += 1,
        }
    }
}

/// A selected action for an encoded state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: StateKey,
    pub action: Action,
    pub reason: SelectionReason,
}

/// Outcome of one full request: decision, reward and the learned value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub decision: Decision,
    pub reward: f64,
    /// Value stored for the decision's state/action, or `None` when the
    /// update is deferred until the successor state is observed
    pub updated_value: Option<f64>,
    /// The state's row after the update (or current row when deferred)
    pub row: Option<ActionValues>,
}

/// A transition waiting for its successor state.
#[derive(Debug, Clone, Copy)]
struct PendingTransition {
    state: StateKey,
    action: Action,
    reward: f64,
}

/// Tabular Q-learning policy with epsilon-greedy exploration.
///
/// The value table lives for as long as the engine does; the host decides
/// when to snapshot or restore it.
pub struct PolicyEngine<R: Rng = StdRng> {
    config: PolicyConfig,
    table: ValueTable,
    rng: R,
    stats: EngineStats,
    pending: Option<PendingTransition>,
}

impl PolicyEngine<StdRng> {
    /// Create an engine with an empty table.
    ///
    /// Uses `config.seed` when set, otherwise seeds from entropy.
    pub fn new(config: PolicyConfig) -> PolicyResult<Self> {
        Self::with_table(config, ValueTable::new())
    }

    /// Create an engine resuming from a previously learned table.
    pub fn with_table(config: PolicyConfig, table: ValueTable) -> PolicyResult<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng_and_table(config, rng, table)
    }
}

impl<R: Rng> PolicyEngine<R> {
    /// Create an engine with an explicit random source and an empty table.
    pub fn with_rng(config: PolicyConfig, rng: R) -> PolicyResult<Self> {
        Self::with_rng_and_table(config, rng, ValueTable::new())
    }

    /// Create an engine with an explicit random source and table.
    pub fn with_rng_and_table(config: PolicyConfig, rng: R, table: ValueTable) -> PolicyResult<Self> {
        config.validate()?;

        info!(
            alpha = config.alpha,
            gamma = config.gamma,
            epsilon = config.epsilon,
            bootstrap = ?config.bootstrap,
            states = table.len(),
            "Policy engine initialized"
        );

        Ok(Self {
            config,
            table,
            rng,
            stats: EngineStats::default(),
            pending: None,
        })
    }

    /// Encode the signals and select an action. Does not touch the table.
    pub fn decide(&mut self, sentiment_score: f64, price_change: f64) -> PolicyResult<Decision> {
        let state = encode_state(sentiment_score, price_change)?;
        Ok(self.decide_for(state))
    }

    /// Select an action for an already-encoded state.
    pub fn decide_for(&mut self, state: StateKey) -> Decision {
        let selection = choose_action(&state, &self.table, self.config.epsilon, &mut self.rng);
        self.stats.record_selection(selection.reason);

        Decision {
            state,
            action: selection.action,
            reason: selection.reason,
        }
    }

    /// Apply a same-state update for a taken action.
    ///
    /// Always updates immediately, whatever the bootstrap mode.
    pub fn learn(&mut self, state: StateKey, action: Action, reward: f64) -> f64 {
        self.record_reward(reward);
        update_value(
            &mut self.table,
            state,
            action,
            reward,
            self.config.alpha,
            self.config.gamma,
        )
    }

    /// Apply an update bootstrapping from `next` (`None` for terminal).
    pub fn learn_transition(
        &mut self,
        state: StateKey,
        action: Action,
        reward: f64,
        next: Option<&StateKey>,
    ) -> f64 {
        self.record_reward(reward);
        update_value_with_successor(
            &mut self.table,
            state,
            action,
            reward,
            next,
            self.config.alpha,
            self.config.gamma,
        )
    }

    /// Run one request: encode, select, compute the reward, update.
    ///
    /// In successor mode the previous request's transition is completed with
    /// this request's state before selecting, and this request's update is
    /// held back until the next call or [`flush`](Self::flush).
    pub fn step(&mut self, sentiment_score: f64, price_change: f64) -> PolicyResult<Step> {
        let state = encode_state(sentiment_score, price_change)?;

        if self.config.bootstrap == BootstrapMode::Successor {
            if let Some(prev) = self.pending.take() {
                self.learn_transition(prev.state, prev.action, prev.reward, Some(&state));
            }
        }

        let decision = self.decide_for(state);
        let reward = reward(decision.action, price_change);

        let updated_value = match self.config.bootstrap {
            BootstrapMode::SameState => Some(self.learn(state, decision.action, reward)),
            BootstrapMode::Successor => {
                self.pending = Some(PendingTransition {
                    state,
                    action: decision.action,
                    reward,
                });
                None
            }
        };

        debug!(
            %state,
            action = %decision.action,
            reason = decision.reason.as_str(),
            reward,
            ?updated_value,
            "Policy step complete"
        );

        Ok(Step {
            decision,
            reward,
            updated_value,
            row: self.table.get(&state).copied(),
        })
    }

    /// Complete a held-back transition as terminal. Returns the stored value.
    pub fn flush(&mut self) -> Option<f64> {
        let prev = self.pending.take()?;
        Some(self.learn_transition(prev.state, prev.action, prev.reward, None))
    }

    /// Whether a transition is waiting for its successor.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    /// Consume the engine, returning the learned table.
    pub fn into_table(self) -> ValueTable {
        self.table
    }

    /// Activity counters merged with table-derived figures.
    pub fn stats(&self) -> EngineStats {
        let mut stats = self.stats.clone();
        stats.states_visited = self.table.len();
        stats.mean_value = self.table.mean_value();
        stats
    }

    fn record_reward(&mut self, reward: f64) {
        self.stats.updates += 1;
        self.stats.total_reward += reward;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config(epsilon: f64, bootstrap: BootstrapMode) -> PolicyConfig {
        PolicyConfig {
            epsilon,
            seed: Some(7),
            bootstrap,
            ..PolicyConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = PolicyConfig {
            gamma: 1.2,
            ..PolicyConfig::default()
        };
        assert!(PolicyEngine::new(bad).is_err());
    }

    #[test]
    fn test_end_to_end_first_request() {
        let mut engine = PolicyEngine::new(config(0.0, BootstrapMode::SameState)).unwrap();

        let step = engine.step(0.42, 0.0137).unwrap();
        let state = StateKey::new(dec!(0.4), dec!(0.01));

        assert_eq!(step.decision.state, state);
        assert_eq!(step.decision.reason, SelectionReason::UnseenState);

        let row = engine.table().get(&state).copied().unwrap();
        let expected = match step.decision.action {
            Action::Buy => [0.00137, 0.0, 0.0],
            Action::Sell => [0.0, -0.00137, 0.0],
            Action::Hold => [0.0, 0.0, 0.0],
        };
        for (got, want) in row.as_array().iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "got {} want {}", got, want);
        }
        assert_eq!(step.row, Some(row));
    }

    #[test]
    fn test_end_to_end_buy_value() {
        let mut engine = PolicyEngine::new(config(0.0, BootstrapMode::SameState)).unwrap();

        let decision = engine.decide(0.42, 0.0137).unwrap();
        assert_eq!(decision.reason, SelectionReason::UnseenState);
        assert!(engine.table().is_empty());

        let value = engine.learn(decision.state, Action::Buy, 0.0137);
        assert!((value - 0.00137).abs() < 1e-12);

        let row = engine.table().get(&decision.state).unwrap();
        assert_eq!(row.get(Action::Sell), 0.0);
        assert_eq!(row.get(Action::Hold), 0.0);
    }

    #[test]
    fn test_greedy_after_learning() {
        let mut engine = PolicyEngine::new(config(0.0, BootstrapMode::SameState)).unwrap();
        let state = encode_state(0.8, 0.05).unwrap();

        engine.learn(state, Action::Buy, 0.05);
        engine.learn(state, Action::Sell, -0.05);

        for _ in 0..20 {
            let decision = engine.decide_for(state);
            assert_eq!(decision.action, Action::Buy);
            assert_eq!(decision.reason, SelectionReason::Exploit);
        }
    }

    #[test]
    fn test_stats_track_branches() {
        let mut engine = PolicyEngine::new(config(0.0, BootstrapMode::SameState)).unwrap();

        engine.step(0.1, 0.02).unwrap();
        engine.step(0.1, 0.02).unwrap();

        let stats = engine.stats();
        assert_eq!(stats.decisions, 2);
        assert_eq!(stats.unseen_state_explorations, 1);
        assert_eq!(stats.exploitations, 1);
        assert_eq!(stats.explorations, 0);
        assert_eq!(stats.updates, 2);
        assert_eq!(stats.states_visited, 1);
        assert!(stats.mean_value.is_some());
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let run = || {
            let mut engine = PolicyEngine::new(config(0.5, BootstrapMode::SameState)).unwrap();
            (0..40)
                .map(|i| {
                    let change = (i as f64 - 20.0) / 1000.0;
                    engine.step(0.3, change).unwrap().decision.action
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_successor_mode_defers_update() {
        let mut engine = PolicyEngine::new(config(0.0, BootstrapMode::Successor)).unwrap();

        let first = engine.step(0.5, 0.02).unwrap();
        assert_eq!(first.updated_value, None);
        assert!(engine.has_pending());
        assert!(engine.table().is_empty());

        engine.step(-0.5, -0.02).unwrap();
        assert!(engine.table().contains(&first.decision.state));

        let flushed = engine.flush();
        assert!(flushed.is_some());
        assert!(!engine.has_pending());
        assert_eq!(engine.table().len(), 2);
        assert_eq!(engine.flush(), None);
    }

    #[test]
    fn test_non_finite_signal_is_an_error() {
        let mut engine = PolicyEngine::new(config(0.2, BootstrapMode::SameState)).unwrap();
        assert!(engine.step(f64::NAN, 0.0).is_err());
        assert_eq!(engine.stats().decisions, 0);
    }
}
