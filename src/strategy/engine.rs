//! Strategy facade
//!
//! Wires pivot detection, zone bookkeeping, entry confirmation, and risk
//! management to the order lifecycle. The host feeds closed primary bars,
//! fine-stream ticks, order updates, and position snapshots; the facade
//! queues broker requests in response. Everything runs single-threaded in
//! event order.
//!
//! Per-bar ordering is load-bearing: entry checks run before zone
//! invalidation, so a zone pierced and reversed within one bar can still
//! produce an entry on that bar.

use serde::Serialize;
use tracing::{debug, info};

use super::bars::{Bar, Tick};
use super::config::{EntryProtocol, StrategyConfig};
use super::entry::{Direction, EntryEngine, EntrySignal};
use super::risk::PositionRiskManager;
use super::zigzag::{PivotKind, ZigZagTracker};
use super::zones::ZoneBook;
use crate::execution::{
    AtmBracket, BrokerRequest, ExecutionEvent, FillOutcome, OrderLifecycleController, OrderSide,
    OrderUpdate, Position, PositionSide,
};

/// Counters accumulated over a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub bars_processed: usize,
    pub ticks_processed: usize,
    pub pivots_confirmed: usize,
    pub zones_invalidated: usize,
    pub entries: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_pnl_points: f64,
}

/// End-of-run report
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub symbol: String,
    pub protocol: String,
    #[serde(flatten)]
    pub stats: RunStats,
    pub daily_pnl_points: f64,
    pub weekly_pnl_points: f64,
    pub halted_daily: bool,
    pub halted_weekly: bool,
}

/// The ZigZag proximity-zone strategy
pub struct ZigZagStrategy {
    config: StrategyConfig,
    tracker: ZigZagTracker,
    book: ZoneBook,
    entries: EntryEngine,
    risk: PositionRiskManager,
    controller: OrderLifecycleController,
    atm: AtmBracket,
    atm_outbox: Vec<BrokerRequest>,
    position: Position,
    stats: RunStats,
    daily_halt_reported: bool,
    weekly_halt_reported: bool,
}

impl ZigZagStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        let tracker = ZigZagTracker::new(config.deviation_value);
        let book = ZoneBook::new(
            config.zone_above_points,
            config.zone_below_points,
            config.tick_size,
        );
        let atm = AtmBracket::new(&config.atm_template);
        info!(
            "Strategy ready: {} | protocol {:?} | deviation {} | zones {}/{}",
            config.symbol,
            config.protocol(),
            config.deviation_value,
            config.zone_above_points,
            config.zone_below_points
        );
        Self {
            config,
            tracker,
            book,
            entries: EntryEngine::new(),
            risk: PositionRiskManager::new(),
            controller: OrderLifecycleController::new(),
            atm,
            atm_outbox: Vec::new(),
            position: Position::flat(),
            stats: RunStats::default(),
            daily_halt_reported: false,
            weekly_halt_reported: false,
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn book(&self) -> &ZoneBook {
        &self.book
    }

    /// Subscribe to execution events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.controller.subscribe()
    }

    /// Drain broker requests queued since the last call
    pub fn take_requests(&mut self) -> Vec<BrokerRequest> {
        let mut requests = self.controller.take_requests();
        requests.append(&mut self.atm_outbox);
        requests
    }

    /// Latest position snapshot from the host
    pub fn on_position(&mut self, position: &Position) {
        let went_flat = !self.position.is_flat() && position.is_flat();
        self.position = *position;
        if went_flat {
            self.atm.on_strategy_flat();
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            symbol: self.config.symbol.clone(),
            protocol: format!("{:?}", self.config.protocol()),
            stats: self.stats.clone(),
            daily_pnl_points: self.risk.accum.daily_pnl_points,
            weekly_pnl_points: self.risk.accum.weekly_pnl_points,
            halted_daily: self.risk.accum.trading_halted_today,
            halted_weekly: self.risk.accum.trading_halted_this_week,
        }
    }

    /// Restore the strategy to its pre-run state
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.book.reset();
        self.entries.reset();
        self.risk.reset();
        self.controller.reset();
        self.atm.reset();
        self.atm_outbox.clear();
        self.position = Position::flat();
        self.stats = RunStats::default();
        self.daily_halt_reported = false;
        self.weekly_halt_reported = false;
    }

    /// Whether a new entry may be initiated right now
    fn can_enter(&self, local_time: chrono::NaiveTime) -> bool {
        self.stats.bars_processed >= self.config.bars_required_to_trade
            && !self.risk.halted()
            && self.config.is_trading_time(local_time)
            && self.position.is_flat()
            && !self.controller.has_working_entry()
            && !self.controller.has_working_exits()
            && (!self.atm.is_configured() || self.atm.can_create())
    }

    /// Calendar maintenance, driven by whichever stream sees the
    /// boundary first. Resting entry limits do not survive the session.
    fn roll_calendar(&mut self, local_date: chrono::NaiveDate) {
        let roll = self.risk.accum.roll(local_date, &self.config);
        if roll.new_day {
            self.controller.cancel_all_pending_limits();
            self.daily_halt_reported = false;
        }
        if roll.new_week {
            self.weekly_halt_reported = false;
        }
        self.report_halts();
    }

    /// Process a closed bar from the primary series
    pub fn on_bar(&mut self, bar: &Bar) {
        let bar_index = self.stats.bars_processed;
        let local = bar.timestamp.with_timezone(&self.config.timezone);
        let local_time = local.time();
        self.roll_calendar(local.date_naive());

        if let Some(pivot) = self.tracker.process_bar(bar_index, bar) {
            self.book.add_pivot(pivot);
            self.stats.pivots_confirmed += 1;
        }
        self.book.update_lines(bar_index, bar);

        // Entry checks run against the pre-maintenance zone state
        match self.config.protocol() {
            EntryProtocol::BarReversal => {
                if self.can_enter(local_time) {
                    if let Some(signal) = self.entries.check_bar_close(bar_index, bar, &self.book) {
                        self.fire_entry(&signal);
                    }
                }
            }
            EntryProtocol::TickReversal => {
                // Confirmed on the fine stream in on_tick
            }
            EntryProtocol::LimitChase => {
                if self.can_enter(local_time) {
                    self.maintain_limits(bar_index, bar.close);
                } else {
                    self.controller.cancel_all_pending_limits();
                }
            }
        }

        let invalidated = self.book.update_zones(bar_index, bar);
        for dropped in &invalidated {
            self.cancel_limit_at(dropped.kind, dropped.price);
        }
        self.stats.zones_invalidated += invalidated.len();

        self.stats.bars_processed += 1;
    }

    /// Process a fine-stream tick: exit management, tick-protocol entry
    /// confirmation, and flat-position reconciliation.
    pub fn on_tick(&mut self, tick: &Tick) {
        self.stats.ticks_processed += 1;
        self.atm.poll();

        // The fine stream sees a new day before its first bar close;
        // prior-day limits must be gone before any entry can fill
        let local = tick.timestamp.with_timezone(&self.config.timezone);
        self.roll_calendar(local.date_naive());

        if !self.position.is_flat() {
            if let Some(current_stop) = self.controller.stop_price() {
                if let Some(new_stop) = self.risk.manage_exits(
                    tick.price,
                    self.position.side,
                    self.position.avg_price,
                    current_stop,
                    &self.config,
                ) {
                    self.controller.modify_stop(new_stop);
                }
            }
            return;
        }

        // Flat: clean up exit orders a cancelled or external fill left behind
        if self.controller.reconcile_flat(&self.position) {
            self.risk.on_flat();
        }

        if self.config.protocol() == EntryProtocol::TickReversal {
            if self.can_enter(local.time()) {
                let bar_index = self.stats.bars_processed.saturating_sub(1);
                if let Some(signal) = self.entries.check_tick(
                    bar_index,
                    tick.price,
                    self.config.reversal_distance_points,
                    &self.book,
                ) {
                    self.fire_entry(&signal);
                }
            }
        }
    }

    /// Route an order update from the host
    pub fn on_order_update(&mut self, update: &OrderUpdate) {
        let Some(outcome) = self.controller.handle_update(update) else {
            return;
        };
        match outcome {
            FillOutcome::EntryFilled {
                side,
                avg_price,
                quantity,
            } => self.on_entry_filled(side, avg_price, quantity),
            FillOutcome::PendingLimitFilled {
                side,
                avg_price,
                pivot_price,
            } => {
                // The pivot is consumed by the fill, not the placement
                let kind = match side {
                    OrderSide::Buy => PivotKind::Low,
                    OrderSide::Sell => PivotKind::High,
                };
                self.book.mark_traded(kind, pivot_price);
                self.on_entry_filled(side, avg_price, self.config.contracts);
            }
            FillOutcome::ExitFilled {
                kind,
                avg_price,
                exit_is_sell,
            } => {
                let pnl = self.risk.on_exit_fill(exit_is_sell, avg_price, &self.config);
                self.stats.total_pnl_points += pnl;
                // A scratch (breakeven stop-out) counts as neither
                if pnl > 0.0 {
                    self.stats.wins += 1;
                } else if pnl < 0.0 {
                    self.stats.losses += 1;
                }
                let _ = self.controller.event_sender().send(ExecutionEvent::ExitFilled {
                    kind,
                    fill_price: avg_price,
                    pnl_points: pnl,
                });
                self.report_halts();
            }
            FillOutcome::EntryFailed => {
                debug!("Entry order failed, slot cleared");
                self.atm.on_entry_terminal();
            }
            FillOutcome::ExitCleared { .. } | FillOutcome::PendingCleared { .. } => {}
        }
    }

    fn on_entry_filled(&mut self, side: OrderSide, avg_price: f64, quantity: i32) {
        self.risk.on_entry_fill(avg_price);
        self.stats.entries += 1;
        let position_side = match side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
        };
        let (stop, target) = self.risk.exit_prices(position_side, avg_price, &self.config);
        self.controller
            .place_exit_orders(side, quantity, Some(stop), Some(target));
    }

    fn fire_entry(&mut self, signal: &EntrySignal) {
        let side = match signal.direction {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        };
        // Market protocols consume the pivot at submission
        self.book
            .mark_traded(signal.direction.pivot_kind(), signal.pivot_price);

        if self.atm.is_configured() {
            if let Some(request) = self
                .atm
                .create(side, self.config.contracts, signal.entry_price)
            {
                self.atm_outbox.push(BrokerRequest::AtmCreate(request));
            }
        } else {
            self.controller.submit_entry(side, self.config.contracts);
        }
    }

    /// Keep one resting limit per side at the closest untraded pivot
    fn maintain_limits(&mut self, bar_index: usize, current_price: f64) {
        for direction in [Direction::Short, Direction::Long] {
            let side = match direction {
                Direction::Long => OrderSide::Buy,
                Direction::Short => OrderSide::Sell,
            };
            let Some(target) =
                self.entries
                    .desired_limit(direction, current_price, bar_index, &self.book)
            else {
                continue;
            };
            let resting = self.controller.pending_limit(side);
            let already_there = resting.map_or(false, |(pivot, _)| {
                self.config.price_key(pivot) == self.config.price_key(target.pivot_price)
            });
            if !already_there {
                self.controller.place_pending_limit(
                    side,
                    self.config.contracts,
                    target.pivot_price,
                    target.limit_price,
                );
            }
        }
    }

    /// Cancel a resting limit chasing a pivot that just went away
    fn cancel_limit_at(&mut self, kind: PivotKind, price: f64) {
        let side = match kind {
            PivotKind::High => OrderSide::Sell,
            PivotKind::Low => OrderSide::Buy,
        };
        if let Some((pivot, _)) = self.controller.pending_limit(side) {
            if self.config.price_key(pivot) == self.config.price_key(price) {
                self.controller.cancel_pending_limit(side);
            }
        }
    }

    fn report_halts(&mut self) {
        if self.risk.accum.trading_halted_today && !self.daily_halt_reported {
            self.daily_halt_reported = true;
            let _ = self
                .controller
                .event_sender()
                .send(ExecutionEvent::DailyHaltReached {
                    pnl_points: self.risk.accum.daily_pnl_points,
                });
        }
        if self.risk.accum.trading_halted_this_week && !self.weekly_halt_reported {
            self.weekly_halt_reported = true;
            let _ = self
                .controller
                .event_sender()
                .send(ExecutionEvent::WeeklyHaltReached {
                    pnl_points: self.risk.accum.weekly_pnl_points,
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{OrderKind, OrderState, SimBroker};
    use crate::strategy::config::EntryMode;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn bar(hour: u32, minute: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2025, 3, 4, hour, minute, 0).unwrap(),
            open,
            high,
            low,
            close,
        }
    }

    fn test_config() -> StrategyConfig {
        StrategyConfig {
            deviation_value: 10.0,
            bars_required_to_trade: 3,
            breakeven_points: 0.0,
            ..StrategyConfig::default()
        }
    }

    fn order_update(id: Uuid, state: OrderState, price: f64) -> OrderUpdate {
        OrderUpdate {
            id,
            state,
            avg_fill_price: price,
            filled_quantity: 1,
            timestamp: Utc::now(),
        }
    }

    fn submitted_id(requests: &[BrokerRequest], kind: OrderKind) -> Uuid {
        requests
            .iter()
            .find_map(|r| match r {
                BrokerRequest::Submit(t) if t.kind == kind => Some(t.id),
                _ => None,
            })
            .expect("order not submitted")
    }

    /// Feed one bar through strategy and broker, pumping fills until quiet
    fn step(strategy: &mut ZigZagStrategy, broker: &mut SimBroker, bar: &Bar) {
        broker.on_price(bar.close);
        strategy.on_bar(bar);
        broker.apply(strategy.take_requests());
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

    /// Bars that confirm a swing high at 105 on bar 4 and leave its zone
    fn pivot_setup() -> Vec<Bar> {
        vec![
            bar(14, 30, 100.0, 101.0, 99.0, 100.5),
            bar(14, 31, 100.5, 102.0, 100.0, 101.0),
            bar(14, 32, 101.0, 103.0, 100.5, 102.5), // seeds Up trend
            bar(14, 33, 103.0, 105.0, 102.5, 104.5), // extremum 105
            bar(14, 34, 100.0, 100.5, 94.0, 95.0),   // confirms HIGH @ 105
            bar(14, 35, 96.0, 97.0, 95.0, 96.5),     // leaves the zone below
        ]
    }

    #[test]
    fn test_bar_reversal_round_trip() {
        let mut strategy = ZigZagStrategy::new(test_config());
        let mut broker = SimBroker::new();

        for b in pivot_setup() {
            step(&mut strategy, &mut broker, &b);
        }
        assert_eq!(strategy.stats().pivots_confirmed, 1);
        assert!(broker.position().is_flat());

        // Re-entry into the zone with a bearish close fires a short
        let signal_bar = bar(14, 36, 103.6, 104.5, 103.0, 103.2);
        step(&mut strategy, &mut broker, &signal_bar);
        assert_eq!(strategy.stats().entries, 1);
        assert_eq!(broker.position().side, PositionSide::Short);

        // Target sits at 103.2 - 15; drive price through it
        let exit_bar = bar(14, 40, 95.0, 96.0, 87.5, 88.0);
        step(&mut strategy, &mut broker, &exit_bar);
        assert!(broker.position().is_flat());
        assert_eq!(strategy.stats().wins, 1);
        assert_eq!(strategy.stats().total_pnl_points, 15.0);
        assert_eq!(strategy.summary().daily_pnl_points, 15.0);
    }

    #[test]
    fn test_pivot_consumed_at_submission() {
        let mut strategy = ZigZagStrategy::new(test_config());
        let mut broker = SimBroker::new();

        for b in pivot_setup() {
            step(&mut strategy, &mut broker, &b);
        }
        assert!(!strategy.book().is_traded(PivotKind::High, 105.0));

        let signal_bar = bar(14, 36, 103.6, 104.5, 103.0, 103.2);
        step(&mut strategy, &mut broker, &signal_bar);
        assert_eq!(strategy.stats().entries, 1);
        // Consumed for the rest of the run, even before any exit
        assert!(strategy.book().is_traded(PivotKind::High, 105.0));
    }

    #[test]
    fn test_time_filter_blocks_entry() {
        let mut config = test_config();
        config.trading_start = chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        config.trading_end = chrono::NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        let mut strategy = ZigZagStrategy::new(config);
        let mut broker = SimBroker::new();

        // 14:xx UTC is 09:xx New York, before the window opens
        for b in pivot_setup() {
            step(&mut strategy, &mut broker, &b);
        }
        step(&mut strategy, &mut broker, &bar(14, 36, 103.6, 104.5, 103.0, 103.2));
        assert_eq!(strategy.stats().entries, 0);
        assert!(broker.position().is_flat());
    }

    #[test]
    fn test_limit_chase_places_and_fills() {
        let mut config = test_config();
        config.entry_mode = EntryMode::LimitEntry;
        let mut strategy = ZigZagStrategy::new(config);
        let mut broker = SimBroker::new();

        for b in pivot_setup() {
            step(&mut strategy, &mut broker, &b);
        }
        // A sell limit should rest at pivot - below = 103
        assert_eq!(broker.working_count(), 1);

        // Price trades up through the limit
        step(&mut strategy, &mut broker, &bar(14, 36, 99.0, 103.5, 98.5, 103.0));
        assert_eq!(strategy.stats().entries, 1);
        assert_eq!(broker.position().side, PositionSide::Short);
    }

    #[test]
    fn test_tick_reversal_entry() {
        let mut config = test_config();
        config.reversal_distance_points = 3.0;
        let mut strategy = ZigZagStrategy::new(config);
        let mut broker = SimBroker::new();

        for b in pivot_setup() {
            step(&mut strategy, &mut broker, &b);
        }

        let ts = Utc.with_ymd_and_hms(2025, 3, 4, 14, 36, 0).unwrap();
        for price in [103.5, 104.2, 101.0] {
            strategy.on_tick(&Tick { timestamp: ts, price });
            broker.on_price(price);
            broker.apply(strategy.take_requests());
            for update in broker.drain_updates() {
                strategy.on_position(&broker.position());
                strategy.on_order_update(&update);
                broker.apply(strategy.take_requests());
            }
            strategy.on_position(&broker.position());
        }

        // 104.2 - 101.0 >= 3: short fired and filled
        assert_eq!(strategy.stats().entries, 1);
        assert_eq!(broker.position().side, PositionSide::Short);
    }

    #[test]
    fn test_daily_halt_blocks_next_entry() {
        let mut config = test_config();
        config.daily_max_loss_points = 5.0;
        let mut strategy = ZigZagStrategy::new(config);
        let mut broker = SimBroker::new();

        for b in pivot_setup() {
            step(&mut strategy, &mut broker, &b);
        }
        step(&mut strategy, &mut broker, &bar(14, 36, 103.6, 104.5, 103.0, 103.2));
        assert_eq!(strategy.stats().entries, 1);

        // Stop the short out at 113.2 for a 10 pt loss
        step(&mut strategy, &mut broker, &bar(14, 40, 110.0, 114.0, 109.0, 113.5));
        assert_eq!(strategy.stats().losses, 1);
        assert!(strategy.summary().halted_daily);

        // A fresh setup the same day cannot enter
        step(&mut strategy, &mut broker, &bar(14, 50, 113.0, 113.5, 100.0, 101.0));
        step(&mut strategy, &mut broker, &bar(14, 51, 101.0, 102.0, 100.5, 101.5));
        let before = strategy.stats().entries;
        step(&mut strategy, &mut broker, &bar(14, 52, 112.5, 113.5, 112.0, 112.2));
        assert_eq!(strategy.stats().entries, before);
    }

    #[test]
    fn test_limit_cancelled_by_next_day_ticks() {
        let mut config = test_config();
        config.entry_mode = EntryMode::LimitEntry;
        let mut strategy = ZigZagStrategy::new(config);
        let mut broker = SimBroker::new();

        for b in pivot_setup() {
            step(&mut strategy, &mut broker, &b);
        }
        // Sell limit resting at 103 from the first session
        assert_eq!(broker.working_count(), 1);

        // The next day's fine stream arrives before its first bar close;
        // the first tick cancels the limit, the second would have filled it
        let next_day = Utc.with_ymd_and_hms(2025, 3, 5, 14, 30, 0).unwrap();
        for price in [100.0, 103.5] {
            broker.on_price(price);
            for update in broker.drain_updates() {
                strategy.on_position(&broker.position());
                strategy.on_order_update(&update);
            }
            strategy.on_tick(&Tick {
                timestamp: next_day,
                price,
            });
            broker.apply(strategy.take_requests());
            for update in broker.drain_updates() {
                strategy.on_position(&broker.position());
                strategy.on_order_update(&update);
            }
        }

        assert_eq!(strategy.stats().entries, 0);
        assert_eq!(broker.working_count(), 0);
        assert!(broker.position().is_flat());
    }

    #[test]
    fn test_event_stream_reports_round_trip() {
        let mut config = test_config();
        config.daily_max_loss_points = 5.0;
        let mut strategy = ZigZagStrategy::new(config);
        let mut broker = SimBroker::new();
        let mut rx = strategy.subscribe();

        for b in pivot_setup() {
            step(&mut strategy, &mut broker, &b);
        }
        step(&mut strategy, &mut broker, &bar(14, 36, 103.6, 104.5, 103.0, 103.2));
        step(&mut strategy, &mut broker, &bar(14, 40, 110.0, 114.0, 109.0, 113.5));

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        let submitted = events
            .iter()
            .position(|e| matches!(e, ExecutionEvent::EntrySubmitted { side: OrderSide::Sell, .. }))
            .expect("entry submission reported");
        let filled = events
            .iter()
            .position(|e| matches!(e, ExecutionEvent::EntryFilled { fill_price, .. } if *fill_price == 103.2))
            .expect("entry fill reported");
        let exited = events
            .iter()
            .position(|e| matches!(e, ExecutionEvent::ExitFilled { pnl_points, .. } if *pnl_points == -10.0))
            .expect("exit fill reported");
        assert!(submitted < filled && filled < exited);
        assert!(events
            .iter()
            .any(|e| matches!(e, ExecutionEvent::DailyHaltReached { pnl_points } if *pnl_points == -10.0)));
    }

    #[test]
    fn test_scratch_exit_counts_neither_win_nor_loss() {
        let mut strategy = ZigZagStrategy::new(test_config());
        let mut broker = SimBroker::new();
        for b in pivot_setup() {
            step(&mut strategy, &mut broker, &b);
        }

        // Drive the order updates by hand to force an exit at the entry price
        strategy.on_bar(&bar(14, 36, 103.6, 104.5, 103.0, 103.2));
        let entry_id = submitted_id(&strategy.take_requests(), OrderKind::Entry);
        strategy.on_order_update(&order_update(entry_id, OrderState::Filled, 103.2));

        let target_id = submitted_id(&strategy.take_requests(), OrderKind::Target);
        strategy.on_order_update(&order_update(target_id, OrderState::Filled, 103.2));

        assert_eq!(strategy.stats().entries, 1);
        assert_eq!(strategy.stats().total_pnl_points, 0.0);
        assert_eq!(strategy.stats().wins, 0);
        assert_eq!(strategy.stats().losses, 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut strategy = ZigZagStrategy::new(test_config());
        let mut broker = SimBroker::new();
        for b in pivot_setup() {
            step(&mut strategy, &mut broker, &b);
        }
        assert!(strategy.stats().bars_processed > 0);

        strategy.reset();
        assert_eq!(strategy.stats().bars_processed, 0);
        assert_eq!(strategy.stats().pivots_confirmed, 0);
        assert!(strategy.book().highs().is_empty());
    }
}
