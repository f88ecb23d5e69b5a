//! SQLite persistence for the learned value table.
//!
//! Persists policy state to survive restarts:
//! - Value table rows (state key -> Buy/Sell/Hold estimates)
//! - Lifetime activity counters
//! - Decision history

use crate::advisor::Recommendation;
use crate::policy::{Action, ActionValues, EngineStats, StateKey, ValueTable};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Persisted policy state.
#[derive(Debug, Clone)]
pub struct PersistedState {
    pub table: ValueTable,
    pub stats: EngineStats,
    pub last_saved: DateTime<Utc>,
}

/// A decision read back from the history table.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: Option<String>,
    pub sentiment_score: f64,
    pub price_change: f64,
    pub state: StateKey,
    pub action: Action,
    pub reason: String,
    pub reward: f64,
}

/// SQLite-based persistence manager.
pub struct PersistenceManager {
    conn: Connection,
}

impl PersistenceManager {
    /// Create a new persistence manager, initializing the database if needed.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        let manager = Self { conn };
        manager.init_schema()?;

        info!("Persistence manager initialized at {:?}", db_path.as_ref());
        Ok(manager)
    }

    /// Initialize database schema.
    ///
    /// Floats are stored as TEXT so NaN and infinities survive a round trip.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- Learned values, one complete row per state
            CREATE TABLE IF NOT EXISTS value_table (
                sentiment_bucket TEXT NOT NULL,
                price_bucket TEXT NOT NULL,
                buy TEXT NOT NULL,
                sell TEXT NOT NULL,
                hold TEXT NOT NULL,
                PRIMARY KEY (sentiment_bucket, price_bucket)
            );

            -- Lifetime counters (singleton row)
            CREATE TABLE IF NOT EXISTS engine_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                decisions INTEGER NOT NULL,
                explorations INTEGER NOT NULL,
                unseen_state_explorations INTEGER NOT NULL,
                exploitations INTEGER NOT NULL,
                updates INTEGER NOT NULL,
                total_reward TEXT NOT NULL,
                last_saved TEXT NOT NULL
            );

            -- Decision history
            CREATE TABLE IF NOT EXISTS decisions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                symbol TEXT,
                sentiment_score TEXT NOT NULL,
                price_change TEXT NOT NULL,
                sentiment_bucket TEXT NOT NULL,
                price_bucket TEXT NOT NULL,
                action TEXT NOT NULL,
                reason TEXT NOT NULL,
                reward TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_decisions_timestamp ON decisions(timestamp);
            "#,
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Save the value table and lifetime counters, replacing the previous snapshot.
    pub fn save_state(&self, table: &ValueTable, stats: &EngineStats) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now();

        tx.execute(
            r#"
            INSERT INTO engine_state (id, decisions, explorations, unseen_state_explorations,
                                      exploitations, updates, total_reward, last_saved)
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                decisions = ?1,
                explorations = ?2,
                unseen_state_explorations = ?3,
                exploitations = ?4,
                updates = ?5,
                total_reward = ?6,
                last_saved = ?7
            "#,
            params![
                stats.decisions,
                stats.explorations,
                stats.unseen_state_explorations,
                stats.exploitations,
                stats.updates,
                stats.total_reward.to_string(),
                now.to_rfc3339(),
            ],
        )?;

        // Clear and reinsert rows
        tx.execute("DELETE FROM value_table", [])?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO value_table (sentiment_bucket, price_bucket, buy, sell, hold)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for (state, row) in table.iter() {
                stmt.execute(params![
                    state.sentiment.to_string(),
                    state.price_change.to_string(),
                    row.get(Action::Buy).to_string(),
                    row.get(Action::Sell).to_string(),
                    row.get(Action::Hold).to_string(),
                ])?;
            }
        }

        tx.commit()?;

        debug!(states = table.len(), decisions = stats.decisions, "State saved to database");
        Ok(())
    }

    /// Load the value table and counters from the database.
    pub fn load_state(&self) -> Result<Option<PersistedState>> {
        let state_row: Option<(u64, u64, u64, u64, u64, String, String)> = self
            .conn
            .query_row(
                r#"
                SELECT decisions, explorations, unseen_state_explorations, exploitations,
                       updates, total_reward, last_saved
                FROM engine_state WHERE id = 1
                "#,
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((decisions, explorations, unseen, exploitations, updates, reward, last_saved)) =
            state_row
        else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            r#"
            SELECT sentiment_bucket, price_bucket, buy, sell, hold
            FROM value_table
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut table = ValueTable::new();
        for row in rows {
            let (sentiment, price, buy, sell, hold) = row?;
            match parse_row(&sentiment, &price, &buy, &sell, &hold) {
                Some((state, values)) => table.insert_row(state, values),
                None => warn!(%sentiment, %price, "Skipping unreadable value table row"),
            }
        }

        let state = PersistedState {
            table,
            stats: EngineStats {
                decisions,
                explorations,
                unseen_state_explorations: unseen,
                exploitations,
                updates,
                total_reward: reward.parse().unwrap_or_else(|_| {
                    warn!(%reward, "Unreadable total reward, resetting to 0");
                    0.0
                }),
                ..EngineStats::default()
            },
            last_saved: parse_timestamp(&last_saved),
        };

        info!(
            states = state.table.len(),
            decisions = state.stats.decisions,
            last_saved = %state.last_saved,
            "Loaded state from database"
        );

        Ok(Some(state))
    }

    /// Record a decision in the history table.
    pub fn record_decision(&self, rec: &Recommendation) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO decisions (timestamp, symbol, sentiment_score, price_change,
                                   sentiment_bucket, price_bucket, action, reason, reward)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                rec.timestamp.to_rfc3339(),
                rec.symbol,
                rec.sentiment_score.to_string(),
                rec.price_change.to_string(),
                rec.state.sentiment.to_string(),
                rec.state.price_change.to_string(),
                rec.action.as_str(),
                rec.reason.as_str(),
                rec.reward.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Most recent decisions, newest first.
    pub fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT timestamp, symbol, sentiment_score, price_change, sentiment_bucket,
                   price_bucket, action, reason, reward
            FROM decisions
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let records: Vec<DecisionRecord> = stmt
            .query_map([limit], |row| {
                let ts: String = row.get(0)?;
                let sentiment: String = row.get(4)?;
                let price: String = row.get(5)?;
                let action: String = row.get(6)?;
                Ok((
                    ts,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    sentiment,
                    price,
                    action,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })?
            .filter_map(|row| match row {
                Ok(fields) => Some(fields),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable decision row");
                    None
                }
            })
            .filter_map(|fields| {
                let ts = fields.0.clone();
                let record = parse_decision(fields);
                if record.is_none() {
                    warn!(timestamp = %ts, "Skipping malformed decision row");
                }
                record
            })
            .collect();

        Ok(records)
    }

    /// Check if we have any saved state.
    pub fn has_state(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM engine_state WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Clear all data (for testing or reset).
    pub fn clear_all(&self) -> Result<()> {
        warn!("Clearing all persistence data");
        self.conn.execute_batch(
            r#"
            DELETE FROM engine_state;
            DELETE FROM value_table;
            DELETE FROM decisions;
            "#,
        )?;
        Ok(())
    }
}

fn parse_row(
    sentiment: &str,
    price: &str,
    buy: &str,
    sell: &str,
    hold: &str,
) -> Option<(StateKey, ActionValues)> {
    let state = StateKey::new(
        Decimal::from_str(sentiment).ok()?,
        Decimal::from_str(price).ok()?,
    );
    let values = ActionValues::new(buy.parse().ok()?, sell.parse().ok()?, hold.parse().ok()?);
    Some((state, values))
}

fn parse_timestamp(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Raw text columns of a `decisions` row, in SELECT order.
type DecisionFields = (
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
);

fn parse_decision(fields: DecisionFields) -> Option<DecisionRecord> {
    let (ts, symbol, score, change, sentiment, price, action, reason, reward) = fields;
    Some(DecisionRecord {
        timestamp: parse_timestamp(&ts),
        symbol,
        sentiment_score: score.parse().ok()?,
        price_change: change.parse().ok()?,
        state: StateKey::new(
            Decimal::from_str(&sentiment).ok()?,
            Decimal::from_str(&price).ok()?,
        ),
        action: action.parse().ok()?,
        reason,
        reward: reward.parse().ok()?,
    })
}
