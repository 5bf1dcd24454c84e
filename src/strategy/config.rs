//! Strategy configuration

use anyhow::{bail, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// How entries are confirmed once a zone qualifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryMode {
    /// Wait for a reversal candle at bar close, enter at market
    BarReversal,
    /// Keep a resting limit order at the nearest untraded pivot
    LimitEntry,
}

impl Default for EntryMode {
    fn default() -> Self {
        Self::BarReversal
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BarReversal => write!(f, "BarReversal"),
            Self::LimitEntry => write!(f, "LimitEntry"),
        }
    }
}

/// The confirmation protocol actually in effect for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryProtocol {
    BarReversal,
    TickReversal,
    LimitChase,
}

/// Configuration for the ZigZag proximity strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Symbol being traded (e.g. "NQ.c.0")
    pub symbol: String,

    /// Number of contracts per entry
    pub contracts: i32,

    /// Minimum price increment of the instrument (NQ = 0.25)
    pub tick_size: f64,

    /// Bars the primary series must have before any trading logic runs
    pub bars_required_to_trade: usize,

    /// Minimum reversal from the running extremum to confirm a pivot (points)
    pub deviation_value: f64,

    /// Zone distance on the far side of a pivot (points)
    pub zone_above_points: f64,

    /// Zone distance on the approach side of a pivot (points)
    pub zone_below_points: f64,

    /// Stop loss distance from entry (points)
    pub stop_loss_points: f64,

    /// Profit target distance from entry (points)
    pub profit_target_points: f64,

    /// Unrealized profit that moves the stop to breakeven (0 = disabled)
    pub breakeven_points: f64,

    /// Trailing stop increment (0 = disabled)
    pub trailing_stop_points: f64,

    /// Daily cumulative loss ceiling in points (0 = disabled)
    pub daily_max_loss_points: f64,

    /// Weekly cumulative loss ceiling in points (0 = disabled)
    pub weekly_max_loss_points: f64,

    /// Required retracement from the in-zone extremum on the tick stream
    /// (0 = bar-close confirmation, >0 = tick confirmation)
    pub reversal_distance_points: f64,

    /// Entry mode when the tick protocol is not selected
    pub entry_mode: EntryMode,

    /// First time of day entries are allowed (exchange local)
    pub trading_start: NaiveTime,

    /// Last time of day entries are allowed (exchange local)
    pub trading_end: NaiveTime,

    /// Exchange timezone for the time filter and calendar rolls
    pub timezone: Tz,

    /// ATM template name; empty = unmanaged bracket orders
    pub atm_template: String,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            symbol: "NQ.c.0".to_string(),
            contracts: 1,
            tick_size: 0.25,
            bars_required_to_trade: 20,
            deviation_value: 60.0,
            zone_above_points: 2.0,
            zone_below_points: 2.0,
            stop_loss_points: 10.0,
            profit_target_points: 15.0,
            breakeven_points: 20.0,
            trailing_stop_points: 0.0,
            daily_max_loss_points: 0.0,
            weekly_max_loss_points: 0.0,
            reversal_distance_points: 0.0,
            entry_mode: EntryMode::BarReversal,
            trading_start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            trading_end: NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
            timezone: chrono_tz::America::New_York,
            atm_template: String::new(),
        }
    }
}

impl StrategyConfig {
    /// Validate parameter ranges before a run starts
    pub fn validate(&self) -> Result<()> {
        if self.deviation_value <= 0.0 {
            bail!("deviation_value must be > 0 (got {})", self.deviation_value);
        }
        if self.zone_above_points < 0.0 || self.zone_below_points < 0.0 {
            bail!("zone distances must be >= 0");
        }
        if self.stop_loss_points <= 0.0 {
            bail!("stop_loss_points must be > 0 (got {})", self.stop_loss_points);
        }
        if self.profit_target_points <= 0.0 {
            bail!("profit_target_points must be > 0 (got {})", self.profit_target_points);
        }
        if self.breakeven_points < 0.0
            || self.trailing_stop_points < 0.0
            || self.daily_max_loss_points < 0.0
            || self.weekly_max_loss_points < 0.0
        {
            bail!("risk thresholds must be >= 0 (0 disables)");
        }
        if self.reversal_distance_points < 0.0 {
            bail!("reversal_distance_points must be >= 0");
        }
        if self.tick_size <= 0.0 {
            bail!("tick_size must be > 0 (got {})", self.tick_size);
        }
        if self.contracts <= 0 {
            bail!("contracts must be > 0 (got {})", self.contracts);
        }
        Ok(())
    }

    /// The confirmation protocol selected by this config.
    /// A positive reversal distance always selects the tick protocol.
    pub fn protocol(&self) -> EntryProtocol {
        if self.reversal_distance_points > 0.0 {
            EntryProtocol::TickReversal
        } else {
            match self.entry_mode {
                EntryMode::BarReversal => EntryProtocol::BarReversal,
                EntryMode::LimitEntry => EntryProtocol::LimitChase,
            }
        }
    }

    /// Check the time-of-day filter (inclusive on both ends)
    pub fn is_trading_time(&self, local_time: NaiveTime) -> bool {
        local_time >= self.trading_start && local_time <= self.trading_end
    }

    /// Quantize a price to integer ticks for identity comparisons
    pub fn price_key(&self, price: f64) -> i64 {
        (price / self.tick_size).round() as i64
    }
}
