//! Decision policy: tabular Q-learning over discretized sentiment/price states.
//!
//! Each request runs three steps in order:
//! - `state`: quantize (sentiment score, price change) into a [`StateKey`]
//! - `selector`: epsilon-greedy choice among Buy, Sell and Hold
//! - `updater`: one-step temporal-difference correction of the value table
//!
//! [`PolicyEngine`] owns the table, configuration and random source and
//! composes the three steps; the free functions are usable on their own.

mod action;
mod engine;
mod reward;
mod selector;
mod state;
mod table;
mod updater;

pub use action::Action;
pub use engine::{Decision, EngineStats, PolicyEngine, Step};
pub use reward::reward;
pub use selector::{choose_action, select_action, Selection, SelectionReason};
pub use state::{encode_state, StateKey, PRICE_DECIMALS, SENTIMENT_DECIMALS};
pub use table::{ActionValues, ValueTable};
pub use updater::{update_value, update_value_with_successor, BootstrapMode};
