//! Position risk management
//!
//! Exit price placement, breakeven promotion, trailing-stop ratchet, and
//! time-windowed loss accounting. Daily P&L accrues per trade at exit
//! fills; weekly P&L accrues from daily totals at the day roll only.
//! Halts are sticky for their period: they block new entries but never
//! interfere with managing an open position.

use chrono::{Datelike, Duration, NaiveDate};
use tracing::{info, warn};

use super::config::StrategyConfig;
use crate::execution::PositionSide;

/// Calendar boundary crossings detected from bar timestamps
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarRoll {
    pub new_day: bool,
    pub new_week: bool,
}

/// Cumulative loss accounting against daily/weekly ceilings
#[derive(Debug, Default)]
pub struct RiskAccumulators {
    pub daily_pnl_points: f64,
    pub weekly_pnl_points: f64,
    pub trading_halted_today: bool,
    pub trading_halted_this_week: bool,
    current_trading_day: Option<NaiveDate>,
    current_trading_week: Option<NaiveDate>,
}

impl RiskAccumulators {
    /// Detect day/week boundaries for `local_date` (exchange local).
    /// At a day roll the closing day's total batches into the weekly
    /// counter before the daily reset; the weekly halt is evaluated on
    /// that batched total. The week resets at the Monday boundary.
    pub fn roll(&mut self, local_date: NaiveDate, config: &StrategyConfig) -> CalendarRoll {
        let mut roll = CalendarRoll::default();

        if self.current_trading_day.map_or(true, |d| local_date > d) {
            if self.current_trading_day.is_some() {
                self.weekly_pnl_points += self.daily_pnl_points;
                info!(
                    "Daily reset: {} | previous day {:.2} pts | weekly total {:.2} pts",
                    local_date, self.daily_pnl_points, self.weekly_pnl_points
                );
                if config.weekly_max_loss_points > 0.0
                    && self.weekly_pnl_points <= -config.weekly_max_loss_points
                {
                    self.trading_halted_this_week = true;
                    warn!(
                        "TRADING HALTED: weekly max loss reached ({:.2} pts)",
                        self.weekly_pnl_points
                    );
                }
                roll.new_day = true;
            }
            self.current_trading_day = Some(local_date);
            self.daily_pnl_points = 0.0;
            self.trading_halted_today = false;
        }

        let days_to_monday = i64::from(local_date.weekday().num_days_from_monday());
        let week_start = local_date - Duration::days(days_to_monday);
        if self.current_trading_week.map_or(true, |w| week_start > w) {
            if self.current_trading_week.is_some() {
                info!(
                    "Weekly reset: week of {} | previous week {:.2} pts",
                    week_start, self.weekly_pnl_points
                );
                roll.new_week = true;
            }
            self.current_trading_week = Some(week_start);
            self.weekly_pnl_points = 0.0;
            self.trading_halted_this_week = false;
        }

        roll
    }

    /// Record a realized trade result and evaluate the daily ceiling
    pub fn record_trade(&mut self, pnl_points: f64, config: &StrategyConfig) {
        self.daily_pnl_points += pnl_points;
        info!(
            "P&L: trade {:+.2} pts | daily {:.2} pts | weekly {:.2} pts",
            pnl_points, self.daily_pnl_points, self.weekly_pnl_points
        );
        if config.daily_max_loss_points > 0.0
            && self.daily_pnl_points <= -config.daily_max_loss_points
        {
            self.trading_halted_today = true;
            warn!(
                "TRADING HALTED: daily max loss reached ({:.2} pts)",
                self.daily_pnl_points
            );
        }
    }

    /// New entries are suppressed while either period's halt is active
    pub fn halted(&self) -> bool {
        self.trading_halted_today || self.trading_halted_this_week
    }
}

/// Manages exits for the open position and owns the loss accumulators
#[derive(Debug, Default)]
pub struct PositionRiskManager {
    pub accum: RiskAccumulators,
    last_entry_price: f64,
    breakeven_set: bool,
    trailing_active: bool,
    next_trailing_trigger: f64,
}

impl PositionRiskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn last_entry_price(&self) -> f64 {
        self.last_entry_price
    }

    /// New entries are suppressed while either period's halt is active
    pub fn halted(&self) -> bool {
        self.accum.halted()
    }

    /// Entry filled: anchor P&L accounting to the average fill price
    pub fn on_entry_fill(&mut self, avg_price: f64) {
        self.last_entry_price = avg_price;
    }

    /// Initial exit prices as fixed point offsets from the entry
    pub fn exit_prices(&self, side: PositionSide, avg_price: f64, config: &StrategyConfig) -> (f64, f64) {
        match side {
            PositionSide::Long => (
                avg_price - config.stop_loss_points,
                avg_price + config.profit_target_points,
            ),
            PositionSide::Short => (
                avg_price + config.stop_loss_points,
                avg_price - config.profit_target_points,
            ),
            PositionSide::Flat => (0.0, 0.0),
        }
    }

    /// Breakeven and trailing management on the fine price stream.
    /// Returns the new stop price when the stop should move.
    pub fn manage_exits(
        &mut self,
        price: f64,
        side: PositionSide,
        avg_price: f64,
        current_stop: f64,
        config: &StrategyConfig,
    ) -> Option<f64> {
        let favorable = match side {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
            PositionSide::Flat => return None,
        };

        // Breakeven promotion, at most once per trade
        if config.breakeven_points > 0.0 && !self.breakeven_set {
            let unrealized = (price - avg_price) * favorable;
            if unrealized >= config.breakeven_points {
                self.breakeven_set = true;
                let breakeven_price = avg_price + config.tick_size * favorable;
                info!(
                    "Breakeven: stop moved to {:.2} (entry {:.2})",
                    breakeven_price, avg_price
                );
                // Trailing engages right after breakeven when enabled
                if config.trailing_stop_points > 0.0 && !self.trailing_active {
                    self.trailing_active = true;
                    self.next_trailing_trigger = price + config.trailing_stop_points * favorable;
                    info!("Trailing armed, next trigger {:.2}", self.next_trailing_trigger);
                }
                return Some(breakeven_price);
            }
        }

        if config.trailing_stop_points > 0.0 {
            // With breakeven disabled, trailing arms immediately
            if config.breakeven_points == 0.0 && !self.trailing_active {
                self.trailing_active = true;
                self.next_trailing_trigger = avg_price + config.trailing_stop_points * favorable;
                info!(
                    "Trailing armed, next trigger {:.2} (no breakeven)",
                    self.next_trailing_trigger
                );
            }

            let triggered = self.trailing_active
                && (price - self.next_trailing_trigger) * favorable >= 0.0;
            if triggered {
                let new_stop = current_stop + config.trailing_stop_points * favorable;
                self.next_trailing_trigger = price + config.trailing_stop_points * favorable;
                info!(
                    "Trailing: stop {:.2} -> {:.2} | next trigger {:.2}",
                    current_stop, new_stop, self.next_trailing_trigger
                );
                return Some(new_stop);
            }
        }

        None
    }

    /// Exit filled: realize P&L against the last entry price.
    /// `exit_is_sell` is true when the fill closed a long position.
    pub fn on_exit_fill(&mut self, exit_is_sell: bool, fill_price: f64, config: &StrategyConfig) -> f64 {
        let pnl_points = if exit_is_sell {
            fill_price - self.last_entry_price
        } else {
            self.last_entry_price - fill_price
        };
        if self.last_entry_price > 0.0 {
            self.accum.record_trade(pnl_points, config);
        }
        self.clear_trade_state();
        pnl_points
    }

    /// Position went flat outside the normal fill path (session close,
    /// manual cancel): drop per-trade state, keep the accumulators.
    pub fn on_flat(&mut self) {
        self.clear_trade_state();
    }

    fn clear_trade_state(&mut self) {
        self.breakeven_set = false;
        self.trailing_active = false;
        self.next_trailing_trigger = 0.0;
        self.last_entry_price = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StrategyConfig {
        StrategyConfig::default()
    }

    #[test]
    fn test_exit_prices_by_side() {
        let risk = PositionRiskManager::new();
        let config = config(); // SL 10, PT 15

        assert_eq!(risk.exit_prices(PositionSide::Long, 100.0, &config), (90.0, 115.0));
        assert_eq!(risk.exit_prices(PositionSide::Short, 100.0, &config), (110.0, 85.0));
    }

    #[test]
    fn test_breakeven_fires_once() {
        let mut risk = PositionRiskManager::new();
        let mut config = config();
        config.breakeven_points = 20.0;
        config.trailing_stop_points = 0.0;
        risk.on_entry_fill(100.0);

        assert!(risk
            .manage_exits(119.0, PositionSide::Long, 100.0, 90.0, &config)
            .is_none());

        let stop = risk
            .manage_exits(120.0, PositionSide::Long, 100.0, 90.0, &config)
            .unwrap();
        assert_eq!(stop, 100.25); // entry + one tick

        // Never fires a second time, however far price runs
        assert!(risk
            .manage_exits(150.0, PositionSide::Long, 100.0, 100.25, &config)
            .is_none());
    }

    #[test]
    fn test_trailing_immediate_when_breakeven_disabled() {
        // Spec scenario: trailing 5, no breakeven, long from 100.
        // Trigger starts at 105; a tick at 105.2 ratchets the stop +5
        // and advances the trigger to 110.2.
        let mut risk = PositionRiskManager::new();
        let mut config = config();
        config.breakeven_points = 0.0;
        config.trailing_stop_points = 5.0;
        risk.on_entry_fill(100.0);

        assert!(risk
            .manage_exits(104.9, PositionSide::Long, 100.0, 90.0, &config)
            .is_none());
        assert_eq!(risk.next_trailing_trigger, 105.0);

        let stop = risk
            .manage_exits(105.2, PositionSide::Long, 100.0, 90.0, &config)
            .unwrap();
        assert_eq!(stop, 95.0);
        assert_eq!(risk.next_trailing_trigger, 110.2);

        // Pullback below the trigger never loosens the stop
        assert!(risk
            .manage_exits(108.0, PositionSide::Long, 100.0, 95.0, &config)
            .is_none());
    }

    #[test]
    fn test_trailing_after_breakeven() {
        let mut risk = PositionRiskManager::new();
        let mut config = config();
        config.breakeven_points = 10.0;
        config.trailing_stop_points = 5.0;
        risk.on_entry_fill(100.0);

        // Breakeven move arms trailing at price + 5
        let stop = risk
            .manage_exits(110.0, PositionSide::Long, 100.0, 90.0, &config)
            .unwrap();
        assert_eq!(stop, 100.25);
        assert_eq!(risk.next_trailing_trigger, 115.0);

        let stop = risk
            .manage_exits(115.0, PositionSide::Long, 100.0, 100.25, &config)
            .unwrap();
        assert_eq!(stop, 105.25);
        assert_eq!(risk.next_trailing_trigger, 120.0);
    }

    #[test]
    fn test_trailing_short_direction() {
        let mut risk = PositionRiskManager::new();
        let mut config = config();
        config.breakeven_points = 0.0;
        config.trailing_stop_points = 5.0;
        risk.on_entry_fill(100.0);

        let stop = risk
            .manage_exits(94.8, PositionSide::Short, 100.0, 110.0, &config)
            .unwrap();
        assert_eq!(stop, 105.0);
        assert_eq!(risk.next_trailing_trigger, 89.8);
    }

    #[test]
    fn test_daily_halt_sticky_until_next_day() {
        let mut risk = PositionRiskManager::new();
        let mut config = config();
        config.daily_max_loss_points = 20.0;

        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        risk.accum.roll(monday, &config);

        risk.on_entry_fill(100.0);
        risk.on_exit_fill(true, 90.0, &config); // -10
        assert!(!risk.accum.halted());

        risk.on_entry_fill(100.0);
        risk.on_exit_fill(true, 85.0, &config); // -15, total -25
        assert!(risk.accum.trading_halted_today);
        assert!(risk.accum.halted());
        assert!(risk.halted());

        // Same date again: still halted
        risk.accum.roll(monday, &config);
        assert!(risk.accum.halted());

        // Next date lifts the daily halt
        risk.accum.roll(monday.succ_opt().unwrap(), &config);
        assert!(!risk.accum.halted());
    }

    #[test]
    fn test_weekly_accrual_and_halt() {
        let mut risk = PositionRiskManager::new();
        let mut config = config();
        config.daily_max_loss_points = 100.0;
        config.weekly_max_loss_points = 30.0;

        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        risk.accum.roll(monday, &config);

        risk.on_entry_fill(100.0);
        risk.on_exit_fill(true, 80.0, &config); // -20
        // Weekly accrues only at the day roll, not per trade
        assert_eq!(risk.accum.weekly_pnl_points, 0.0);

        let tuesday = monday.succ_opt().unwrap();
        risk.accum.roll(tuesday, &config);
        assert_eq!(risk.accum.weekly_pnl_points, -20.0);
        assert!(!risk.accum.trading_halted_this_week);

        risk.on_entry_fill(100.0);
        risk.on_exit_fill(true, 85.0, &config); // -15
        let wednesday = tuesday.succ_opt().unwrap();
        risk.accum.roll(wednesday, &config);
        assert_eq!(risk.accum.weekly_pnl_points, -35.0);
        assert!(risk.accum.trading_halted_this_week);
        assert!(risk.accum.halted());

        // Monday boundary resets the weekly counters and the halt
        let next_monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        risk.accum.roll(next_monday, &config);
        assert_eq!(risk.accum.weekly_pnl_points, 0.0);
        assert!(!risk.accum.halted());
    }

    #[test]
    fn test_exit_fill_resets_trade_state() {
        let mut risk = PositionRiskManager::new();
        let mut config = config();
        config.breakeven_points = 5.0;
        risk.on_entry_fill(100.0);
        risk.manage_exits(106.0, PositionSide::Long, 100.0, 90.0, &config);
        assert!(risk.breakeven_set);

        let pnl = risk.on_exit_fill(true, 115.0, &config);
        assert_eq!(pnl, 15.0);
        assert!(!risk.breakeven_set);
        assert_eq!(risk.last_entry_price(), 0.0);
    }
}
