//! # Sentiment Advisor
//!
//! Turns a sentiment score and a price move into a Buy/Sell/Hold
//! recommendation using a tabular Q-learning policy that learns online.
//!
//! ## Architecture
//!
//! - `policy`: State encoding, epsilon-greedy selection, TD value updates
//! - `signal`: Sentiment labels, price quotes and the quote provider seam
//! - `advisor`: Concurrency-safe request pipeline over the policy engine
//! - `persistence`: SQLite snapshot of the value table and decision history
//! - `config`: Configuration management and validation
//! - `error`: Policy error types
//! - `utils`: Decimal conversion helpers

pub mod advisor;
pub mod config;
pub mod error;
pub mod persistence;
pub mod policy;
pub mod signal;
pub mod utils;

pub use config::Config;
pub use error::PolicyError;
