use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use zigzag_proximity::strategy::{Bar, EntryMode, StrategyConfig, Tick, ZigZagStrategy};
use zigzag_proximity::SimBroker;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a bar CSV through the ZigZag proximity-zone strategy")]
struct Args {
    /// CSV of primary-series bars (timestamp,open,high,low,close)
    #[arg(short, long)]
    bars: PathBuf,

    /// Symbol label for the run
    #[arg(short, long, default_value = "NQ.c.0")]
    symbol: String,

    /// Contracts per entry
    #[arg(long, default_value_t = 1)]
    contracts: i32,

    /// Minimum price increment
    #[arg(long, default_value_t = 0.25)]
    tick_size: f64,

    /// Bars required before trading logic runs
    #[arg(long, default_value_t = 20)]
    bars_required: usize,

    /// Reversal threshold for pivot confirmation (points)
    #[arg(short, long, default_value_t = 60.0)]
    deviation: f64,

    /// Zone distance on the far side of a pivot (points)
    #[arg(long, default_value_t = 2.0)]
    zone_above: f64,

    /// Zone distance on the approach side of a pivot (points)
    #[arg(long, default_value_t = 2.0)]
    zone_below: f64,

    /// Stop loss distance (points)
    #[arg(long, default_value_t = 10.0)]
    stop_loss: f64,

    /// Profit target distance (points)
    #[arg(long, default_value_t = 15.0)]
    profit_target: f64,

    /// Breakeven trigger (points, 0 = disabled)
    #[arg(long, default_value_t = 20.0)]
    breakeven: f64,

    /// Trailing stop increment (points, 0 = disabled)
    #[arg(long, default_value_t = 0.0)]
    trailing_stop: f64,

    /// Daily loss ceiling (points, 0 = disabled)
    #[arg(long, default_value_t = 0.0)]
    daily_max_loss: f64,

    /// Weekly loss ceiling (points, 0 = disabled)
    #[arg(long, default_value_t = 0.0)]
    weekly_max_loss: f64,

    /// Tick retracement for entry confirmation (points, 0 = bar close)
    #[arg(long, default_value_t = 0.0)]
    reversal_distance: f64,

    /// Rest limit orders at pivots instead of waiting for reversal bars
    #[arg(long)]
    limit_entries: bool,

    /// First entry time of day, exchange local (HH:MM)
    #[arg(long, default_value = "00:00")]
    start_time: String,

    /// Last entry time of day, exchange local (HH:MM)
    #[arg(long, default_value = "23:59")]
    end_time: String,

    /// Exchange timezone
    #[arg(long, default_value = "America/New_York")]
    timezone: String,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("zigzag_proximity=info".parse().unwrap())
                .add_directive("zigzag_replay=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    config.validate()?;

    let bars = load_bars(&args.bars)
        .with_context(|| format!("Failed to load bars from {}", args.bars.display()))?;
    info!("Loaded {} bars from {}", bars.len(), args.bars.display());

    let mut strategy = ZigZagStrategy::new(config);
    let mut broker = SimBroker::new();

    for bar in &bars {
        // Walk the bar's range as a synthetic fine stream: open first,
        // adverse extreme before favorable extreme, close last
        let walk = if bar.is_down() {
            [bar.open, bar.high, bar.low, bar.close]
        } else {
            [bar.open, bar.low, bar.high, bar.close]
        };
        for price in walk {
            broker.on_price(price);
            pump_updates(&mut strategy, &mut broker);
            strategy.on_tick(&Tick {
                timestamp: bar.timestamp,
                price,
            });
            broker.apply(strategy.take_requests());
            pump_updates(&mut strategy, &mut broker);
        }

        // Coarse evaluation at the close; market orders fill there
        strategy.on_bar(bar);
        broker.apply(strategy.take_requests());
        pump_updates(&mut strategy, &mut broker);
    }

    let summary = strategy.summary();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("\n=== Replay summary: {} ({}) ===", summary.symbol, summary.protocol);
        println!("Bars processed:    {}", summary.stats.bars_processed);
        println!("Pivots confirmed:  {}", summary.stats.pivots_confirmed);
        println!("Zones invalidated: {}", summary.stats.zones_invalidated);
        println!(
            "Trades:            {} ({} wins / {} losses)",
            summary.stats.entries, summary.stats.wins, summary.stats.losses
        );
        println!("Total P&L:         {:+.2} pts", summary.stats.total_pnl_points);
        println!("Open day P&L:      {:+.2} pts", summary.daily_pnl_points);
        println!("Open week P&L:     {:+.2} pts", summary.weekly_pnl_points);
        if summary.halted_daily || summary.halted_weekly {
            println!(
                "Halted:            daily={} weekly={}",
                summary.halted_daily, summary.halted_weekly
            );
        }
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<StrategyConfig> {
    let timezone = args
        .timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid timezone {}: {}", args.timezone, e))?;
    Ok(StrategyConfig {
        symbol: args.symbol.clone(),
        contracts: args.contracts,
        tick_size: args.tick_size,
        bars_required_to_trade: args.bars_required,
        deviation_value: args.deviation,
        zone_above_points: args.zone_above,
        zone_below_points: args.zone_below,
        stop_loss_points: args.stop_loss,
        profit_target_points: args.profit_target,
        breakeven_points: args.breakeven,
        trailing_stop_points: args.trailing_stop,
        daily_max_loss_points: args.daily_max_loss,
        weekly_max_loss_points: args.weekly_max_loss,
        reversal_distance_points: args.reversal_distance,
        entry_mode: if args.limit_entries {
            EntryMode::LimitEntry
        } else {
            EntryMode::BarReversal
        },
        trading_start: parse_time(&args.start_time)?,
        trading_end: parse_time(&args.end_time)?,
        timezone,
        atm_template: String::new(),
    })
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .with_context(|| format!("Invalid time of day: {}", value))
}

fn load_bars(path: &PathBuf) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();
    for record in reader.deserialize() {
        let bar: Bar = record?;
        bars.push(bar);
    }
    Ok(bars)
}

fn pump_updates(strategy: &mut ZigZagStrategy, broker: &mut SimBroker) {
    loop {
        let updates = broker.drain_updates();
        if updates.is_empty() {
            break;
        }
        for update in &updates {
            strategy.on_position(&broker.position());
            strategy.on_order_update(update);
            broker.apply(strategy.take_requests());
        }
    }
    strategy.on_position(&broker.position());
}
