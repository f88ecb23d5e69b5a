//! Sentiment Advisor - Main Entry Point

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentiment_advisor::advisor::{Advisor, PriceSource, Recommendation};
use sentiment_advisor::config::Config;
use sentiment_advisor::persistence::PersistenceManager;
use sentiment_advisor::policy::{Action, EngineStats, ValueTable};
use sentiment_advisor::signal::{PriceQuote, StaticQuoteBook};
use std::path::Path;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Sentiment Advisor CLI
#[derive(Parser)]
#[command(name = "sentiment-advisor")]
#[command(version, about = "Sentiment-driven Buy/Sell/Hold advisor with online Q-learning")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend an action for a sentiment score and optional price quote
    Recommend {
        /// Compound sentiment score in [-1, 1]
        #[arg(short, long, allow_hyphen_values = true)]
        sentiment: f64,

        /// Stock ticker symbol
        #[arg(short = 'y', long)]
        symbol: Option<String>,

        /// Opening price of the ticker
        #[arg(short, long, requires = "symbol")]
        open: Option<Decimal>,

        /// Closing price of the ticker
        #[arg(short, long, requires = "open")]
        close: Option<Decimal>,

        /// Traded volume of the ticker
        #[arg(short, long)]
        volume: Option<Decimal>,

        /// Path to SQLite database (default: from configuration)
        #[arg(short, long)]
        db: Option<String>,

        /// Do not load or save the value table
        #[arg(long)]
        no_persist: bool,

        /// Print the recommendation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the learned value table and activity counters
    Status {
        /// Path to SQLite database (default: from configuration)
        #[arg(short, long)]
        db: Option<String>,

        /// Show learned rows and recent decisions
        #[arg(short, long)]
        verbose: bool,
    },

    /// Delete all persisted policy data
    Reset {
        /// Path to SQLite database (default: from configuration)
        #[arg(short, long)]
        db: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    let config = Config::load()?;
    config.validate()?;

    match cli.command {
        Commands::Recommend {
            sentiment,
            symbol,
            open,
            close,
            volume,
            db,
            no_persist,
            json,
        } => {
            let quote = match (symbol.as_deref(), open, close) {
                (Some(sym), Some(open), Some(close)) => {
                    let quote = PriceQuote::new(sym, open, close);
                    Some(match volume {
                        Some(v) => quote.with_volume(v),
                        None => quote,
                    })
                }
                _ => None,
            };
            let db_path = (!no_persist)
                .then(|| db.unwrap_or_else(|| config.persistence.db_path.clone()));

            run_recommend(&config, sentiment, symbol.as_deref(), quote, db_path.as_deref(), json)
                .await
        }
        Commands::Status { db, verbose } => {
            let db_path = db.unwrap_or_else(|| config.persistence.db_path.clone());
            show_status(&db_path, verbose, config.persistence.history_limit)
        }
        Commands::Reset { db } => {
            let db_path = db.unwrap_or_else(|| config.persistence.db_path.clone());
            reset(&db_path)
        }
    }
}

/// Initialize logging with stderr and rolling file output.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "sentiment-advisor.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the program duration
    Box::leak(Box::new(_guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("sentiment_advisor=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stderr.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

fn open_store(db_path: &str) -> Result<PersistenceManager> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    PersistenceManager::new(db_path)
}

/// Run one advisory request, persisting the learned table afterwards.
async fn run_recommend(
    config: &Config,
    sentiment: f64,
    symbol: Option<&str>,
    quote: Option<PriceQuote>,
    db_path: Option<&str>,
    json: bool,
) -> Result<()> {
    let store = db_path.map(open_store).transpose()?;

    let (table, lifetime_stats) = match store.as_ref().map(|s| s.load_state()).transpose()? {
        Some(Some(state)) => {
            info!(states = state.table.len(), "📂 [PERSISTENCE] Restoring value table");
            (state.table, state.stats)
        }
        _ => {
            info!("📂 [PERSISTENCE] Starting with an empty value table");
            (ValueTable::new(), EngineStats::default())
        }
    };

    let book = match quote {
        Some(q) => StaticQuoteBook::new().with_quote(q),
        None => StaticQuoteBook::new(),
    };

    let advisor = Advisor::new(config.policy.clone(), config.signal.clone(), book, table)?;
    let rec = advisor.analyze(sentiment, symbol).await?;
    if advisor.flush().await.is_some() {
        info!("Completed pending transition as terminal");
    }

    if let Some(store) = &store {
        let mut stats = lifetime_stats;
        stats.accumulate(&advisor.stats().await);
        store.save_state(&advisor.snapshot().await, &stats)?;
        store.record_decision(&rec)?;
    } else {
        warn!("Persistence disabled, learned values will be discarded");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rec)?);
    } else {
        print_recommendation(&rec);
    }
    Ok(())
}

fn print_recommendation(rec: &Recommendation) {
    println!("🧠 Sentiment: {} ({:.4})", rec.sentiment_label, rec.sentiment_score);

    match (&rec.quote, rec.price_source) {
        (Some(q), PriceSource::Quote) => {
            println!("\n📊 {} Price Info:", q.symbol);
            println!("   Open:   {}", q.open);
            println!("   Close:  {}", q.close);
            if let Some(volume) = q.volume {
                println!("   Volume: {}", volume);
            }
            println!("   Change: {:+.2}%", rec.price_change * 100.0);
        }
        (_, PriceSource::InvalidQuote) => {
            println!("\n⚠️  Quote for {} has a zero open price", rec.symbol.as_deref().unwrap_or("-"));
        }
        (_, PriceSource::NotFound) => {
            println!("\n⚠️  No price data found for {}", rec.symbol.as_deref().unwrap_or("-"));
        }
        _ => {}
    }

    println!("\n🤖 RL Suggestion: {}", rec.action);
    println!("   State:  {}  ({})", rec.state, rec.reason.as_str());
    if let Some(row) = rec.row {
        println!(
            "   Values: Buy {:.6} | Sell {:.6} | Hold {:.6}",
            row.get(Action::Buy),
            row.get(Action::Sell),
            row.get(Action::Hold)
        );
    }
}

/// Show the persisted policy state.
fn show_status(db_path: &str, verbose: bool, history_limit: usize) -> Result<()> {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              SENTIMENT ADVISOR STATUS                      ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    if !Path::new(db_path).exists() {
        println!("\n❌ Database not found: {}", db_path);
        println!("   No recommendation has been persisted yet, or the database path is incorrect.");
        return Ok(());
    }

    let persistence = PersistenceManager::new(db_path)?;

    let Some(state) = persistence.load_state()? else {
        println!("\n❌ No saved state found in database.");
        return Ok(());
    };

    let stats = &state.stats;
    let random = stats.explorations + stats.unseen_state_explorations;
    let random_pct = if stats.decisions > 0 {
        random as f64 / stats.decisions as f64 * 100.0
    } else {
        0.0
    };

    println!("\n📊 Value Table");
    println!("   ├─ States Learned:   {}", state.table.len());
    match state.table.mean_value() {
        Some(mean) => println!("   ├─ Mean Value:       {:.6}", mean),
        None => println!("   ├─ Mean Value:       -"),
    }
    println!("   └─ Last Updated:     {}", state.last_saved.format("%Y-%m-%d %H:%M:%S UTC"));

    println!("\n📈 Activity");
    println!("   ├─ Decisions:        {}", stats.decisions);
    println!("   ├─ Exploitations:    {}", stats.exploitations);
    println!("   ├─ Explorations:     {} ({} unseen state)", random, stats.unseen_state_explorations);
    println!("   ├─ Random Share:     {:.1}%", random_pct);
    println!("   └─ Total Reward:     {:.6}", stats.total_reward);

    if verbose {
        if !state.table.is_empty() {
            println!("\n🧮 Learned Rows (sentiment, price change)");
            for (key, row) in state.table.sorted_rows() {
                println!(
                    "   ├─ {:<16} Buy {:>10.6} | Sell {:>10.6} | Hold {:>10.6} → {}",
                    key.to_string(),
                    row.get(Action::Buy),
                    row.get(Action::Sell),
                    row.get(Action::Hold),
                    row.best_action()
                );
            }
        }

        let recent = persistence.recent_decisions(history_limit)?;
        if !recent.is_empty() {
            println!("\n🕑 Recent Decisions");
            for d in &recent {
                println!(
                    "   ├─ {} {:<6} s={:+.3} Δ={:+.4} {} → {} ({}, r={:+.5})",
                    d.timestamp.format("%Y-%m-%d %H:%M"),
                    d.symbol.as_deref().unwrap_or("-"),
                    d.sentiment_score,
                    d.price_change,
                    d.state,
                    d.action,
                    d.reason,
                    d.reward
                );
            }
        }
    }

    println!();
    Ok(())
}

/// Clear all persisted data.
fn reset(db_path: &str) -> Result<()> {
    if !Path::new(db_path).exists() {
        println!("Nothing to reset: {} does not exist", db_path);
        return Ok(());
    }
    PersistenceManager::new(db_path)?.clear_all()?;
    println!("🧹 Cleared value table and decision history in {}", db_path);
    Ok(())
}
